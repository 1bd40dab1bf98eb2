//! Application modules.
//!
//! A module is a bundle of routes contributed at start-up. Modules are
//! named in `AppConfig::modules` and built through the module factory,
//! so a module type `BlogModule` is enabled with the identifier `blog`.

use crate::error::Result;
use crate::route::RoutesConfig;

pub trait Module: Send {
    /// Adds this module's routes. A route configured on the application
    /// itself wins over a module route with the same ident.
    fn setup(&self, routes: &mut RoutesConfig) -> Result<()>;
}
