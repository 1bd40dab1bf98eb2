//! Routes: the objects the router dispatches to.
//!
//! Config-driven routes are built through the route factory, so an
//! application can replace a kernel route type by registering its own
//! `TemplateRoute` or `ActionRoute` before the app starts. Script routes
//! never go through the router and are plain structs.

mod action;
mod config;
mod script;
mod template;

use std::collections::BTreeMap;

use crate::container::Container;
use crate::error::Result;
use crate::factory::{Arguments, Catalog};
use crate::request::Request;
use crate::response::Response;

pub use action::ActionRoute;
pub use config::{
    ActionRouteConfig, RouteConfig, RoutesConfig, ScriptRouteConfig, TemplateRouteConfig,
};
pub use script::ScriptRoute;
pub use template::TemplateRoute;

/// Catalog name of the kernel template route.
pub const TEMPLATE_ROUTE: &str = "TemplateRoute";
/// Catalog name of the kernel action route.
pub const ACTION_ROUTE: &str = "ActionRoute";

/// Something the router can dispatch a request to.
pub trait Route: Send + Sync {
    /// Second-phase injection, called once by the route factory.
    fn set_dependencies(&mut self, _container: &Container) -> Result<()> {
        Ok(())
    }

    fn handle(&self, req: &Request) -> Result<Response>;
}

/// Registers the kernel route types unless the catalog already has types
/// under those names.
pub fn register_kernel_routes(catalog: &mut Catalog) {
    if !catalog.contains(TEMPLATE_ROUTE) {
        catalog.register::<dyn Route, _>(TEMPLATE_ROUTE, |args: &Arguments| {
            Ok(Box::new(TemplateRoute::new(args.parse("config")?)))
        });
    }
    if !catalog.contains(ACTION_ROUTE) {
        catalog.register::<dyn Route, _>(ACTION_ROUTE, |args: &Arguments| {
            Ok(Box::new(ActionRoute::new(args.parse("config")?)))
        });
    }
}

fn with_headers(mut res: Response, headers: &BTreeMap<String, String>) -> Response {
    for (name, value) in headers {
        res = res.with_header(name, value);
    }
    res
}
