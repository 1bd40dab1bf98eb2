//! Closures as routes.
//!
//! The router holds routes of different concrete types in one table, so
//! every entry is a shared trait object ([`SharedRoute`]). Config-driven
//! routes come out of the route factory already boxed; code-defined
//! routes are plain closures wrapped here:
//!
//! ```text
//! |req: &Request| "ok"                    ← user writes this
//!        ↓ app.on(Method::Get, "/ping", …)
//! handler.into_route()                    ← Handler blanket impl
//!        ↓
//! Arc::new(FnRoute(closure))              ← stored as SharedRoute
//!        ↓
//! route.handle(&req) at request time      ← one vtable dispatch
//! ```

use std::sync::Arc;

use crate::error::Result;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::route::Route;

/// A route shared by the router across concurrent requests.
pub type SharedRoute = Arc<dyn Route>;

/// Implemented for every closure usable as a route:
///
/// ```text
/// Fn(&Request) -> impl IntoResponse
/// ```
///
/// The trait is sealed: only the blanket impl below satisfies it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_route(self) -> SharedRoute;
}

mod private {
    pub trait Sealed {}
}

impl<F, R> private::Sealed for F
where
    F: Fn(&Request) -> R + Send + Sync + 'static,
    R: IntoResponse,
{
}

impl<F, R> Handler for F
where
    F: Fn(&Request) -> R + Send + Sync + 'static,
    R: IntoResponse,
{
    fn into_route(self) -> SharedRoute {
        Arc::new(FnRoute(self))
    }
}

/// Bridges a typed closure to the [`Route`] trait object.
struct FnRoute<F>(F);

impl<F, R> Route for FnRoute<F>
where
    F: Fn(&Request) -> R + Send + Sync,
    R: IntoResponse,
{
    fn handle(&self, req: &Request) -> Result<Response> {
        Ok((self.0)(req).into_response())
    }
}
