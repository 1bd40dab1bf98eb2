use std::sync::Arc;

use tracing::{debug, warn};

use super::{Route, TemplateRouteConfig, with_headers};
use crate::container::Container;
use crate::error::{Error, Result};
use crate::factory::{Factory, UnknownFields};
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;
use crate::template::Template;

/// Renders a template, or redirects.
pub struct TemplateRoute {
    config: TemplateRouteConfig,
    engine: Option<String>,
    templates: Option<Arc<Factory<dyn Template>>>,
}

impl TemplateRoute {
    pub fn new(config: TemplateRouteConfig) -> Self {
        let engine = config.engine.clone();
        Self { config, engine, templates: None }
    }

    pub fn config(&self) -> &TemplateRouteConfig {
        &self.config
    }

    fn templates(&self) -> Result<&Factory<dyn Template>> {
        self.templates.as_deref().ok_or_else(|| {
            Error::invalid_configuration(format!(
                "template route `{}` has no template factory",
                self.config.route.ident
            ))
        })
    }
}

impl Route for TemplateRoute {
    fn set_dependencies(&mut self, container: &Container) -> Result<()> {
        self.templates = Some(Arc::clone(container.templates()));
        if self.engine.is_none() {
            self.engine = Some(container.config().view.default_engine.clone());
        }
        Ok(())
    }

    fn handle(&self, req: &Request) -> Result<Response> {
        if let Some(target) = &self.config.redirect {
            let status = self.config.redirect_status()?;
            debug!(
                route = %self.config.route.ident,
                target = %target,
                status = status.code(),
                "redirecting"
            );
            return Ok(with_headers(Response::redirect(target, status), &self.config.route.headers));
        }

        let mut template = self.templates()?.create(self.config.template(), None)?;
        template.set_data(&self.config.template_data, UnknownFields::Ignore)?;

        if !template.init(req) {
            warn!(
                route = %self.config.route.ident,
                template = %self.config.template(),
                "template init failed"
            );
            return Ok(Response::status(Status::InternalServerError));
        }

        let engine = self.engine.as_deref().unwrap_or_default();
        let mut res = Response::html(template.render(engine)?);
        if let Some(cache_control) = self.config.cache_control() {
            res = res.with_header("cache-control", &cache_control);
        }
        Ok(with_headers(res, &self.config.route.headers))
    }
}
