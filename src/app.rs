//! The application: container, router, script routes and fallback handlers
//! assembled from one [`AppConfig`].

use std::any::Any;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, info_span};

use crate::config::AppConfig;
use crate::container::Container;
use crate::error::{Error, Result};
use crate::factory::{Arguments, Catalog};
use crate::handler::{Handler, SharedRoute};
use crate::handlers::Handlers;
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::route::{RoutesConfig, ScriptRoute, register_kernel_routes};
use crate::router::{Lookup, Router};

pub struct App {
    container: Arc<Container>,
    router: Router,
    scripts: BTreeMap<String, ScriptRoute>,
    handlers: Handlers,
}

impl App {
    /// Builds the whole application.
    ///
    /// Kernel route types are added to `catalog` unless it already defines
    /// them. Modules run in configuration order; a route configured directly
    /// wins over a module route with the same ident.
    pub fn new(mut config: AppConfig, mut catalog: Catalog) -> Result<Self> {
        config.routes.normalize();
        config.validate()?;
        register_kernel_routes(&mut catalog);

        let container = Container::new(Arc::new(config), Arc::new(catalog))?;
        let routes = collect_routes(&container)?;

        let mut router = Router::new();
        for config in routes.templates.values() {
            let route = build_route(&container, "template", config)?;
            router.insert(&config.route.methods_or(Method::Get), &config.route.path(), route)?;
        }
        for config in routes.actions.values() {
            let route = build_route(&container, "action", config)?;
            router.insert(&config.route.methods_or(Method::Post), &config.route.path(), route)?;
        }

        info!(
            templates = routes.templates.len(),
            actions = routes.actions.len(),
            scripts = routes.scripts.len(),
            maintenance = container.config().maintenance,
            "application ready"
        );

        let scripts = routes
            .scripts
            .into_iter()
            .map(|(ident, config)| {
                (ident, ScriptRoute::new(config, Arc::clone(container.scripts())))
            })
            .collect();

        let handlers = Handlers::new(&container);
        Ok(Self { container, router, scripts, handlers })
    }

    /// Mounts a code-defined route.
    ///
    /// # Panics
    ///
    /// Panics if the path is malformed or already taken for `method`.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.router = self.router.on(method, path, handler);
        self
    }

    /// Answers one request. Never fails: errors and panics in routes become
    /// error-handler responses.
    pub fn handle(&self, mut req: Request) -> Response {
        let span = info_span!(
            "request",
            channel = %self.container.config().logger.channel,
            method = %req.method(),
            path = %req.path(),
        );
        let _enter = span.enter();

        if self.container.config().maintenance {
            return self.handlers.shutdown(&req);
        }

        let res = match self.router.lookup(req.method(), req.path()) {
            Lookup::Found(route, params) => {
                req.params = params;
                match panic::catch_unwind(AssertUnwindSafe(|| route.handle(&req))) {
                    Ok(Ok(res)) => res,
                    Ok(Err(e)) => {
                        error!(error = %e, "route failed");
                        self.handlers.error(&req, &e.to_string())
                    }
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        error!(panic = %message, "route panicked");
                        self.handlers.error(&req, &message)
                    }
                }
            }
            Lookup::MethodNotAllowed(allowed) => self.handlers.not_allowed(&req, &allowed),
            Lookup::NotFound => self.handlers.not_found(&req),
        };

        debug!(status = res.status_code(), "request handled");
        res
    }

    /// Answers a request whose method kiln does not know.
    pub(crate) fn unsupported_method(&self, req: &Request) -> Response {
        if self.container.config().maintenance {
            return self.handlers.shutdown(req);
        }
        self.handlers.not_allowed(req, &self.router.allowed_methods(req.path()))
    }

    /// Runs the script route `ident` with `argv` (no binary name).
    pub fn run_script<I, S>(&self, ident: &str, argv: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString> + Clone,
    {
        let script = self.scripts.get(ident).ok_or_else(|| Error::UnknownIdentifier {
            identifier: ident.to_owned(),
            resolved: String::new(),
        })?;
        script.invoke(argv)
    }

    pub fn scripts(&self) -> impl Iterator<Item = &ScriptRoute> {
        self.scripts.values()
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    pub fn router(&self) -> &Router {
        &self.router
    }
}

fn collect_routes(container: &Container) -> Result<RoutesConfig> {
    let mut routes = container.config().routes.clone();
    for ident in &container.config().modules {
        let module = container.modules().create(ident, None)?;
        let mut contributed = RoutesConfig::default();
        module.setup(&mut contributed)?;
        contributed.normalize();
        contributed.validate()?;
        debug!(
            module = %ident,
            templates = contributed.templates.len(),
            actions = contributed.actions.len(),
            scripts = contributed.scripts.len(),
            "module set up"
        );
        routes.merge_missing(contributed);
    }
    Ok(routes)
}

fn build_route<C: Serialize>(container: &Container, kind: &str, config: &C) -> Result<SharedRoute> {
    let arguments = Arguments::new().with("config", serde_json::to_value(config)?);
    let route = container.routes().create(kind, Some(&arguments))?;
    Ok(Arc::from(route))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "route panicked".to_owned()
    }
}
