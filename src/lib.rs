//! # kiln
//!
//! An application kernel: typed object factories, config-driven routes and
//! fallback handlers on a minimal hyper core.
//!
//! ## The pieces
//!
//! - [`Catalog`]: an explicit registry of named constructors, each tied to
//!   one capability (`dyn Action`, `dyn Widget`, …).
//! - [`Factory`]: turns a short identifier (`"foo/bar-baz"`) into a typed
//!   object (`Foo::BarBazWidget`), with aliases, a default type, shared
//!   construction arguments and a post-construction callback.
//! - [`Builder`]: builds an object from an options map and pushes the rest
//!   of the map into it.
//! - [`Container`]: the configuration plus one factory per controller kind.
//! - [`Email`]: messages built through the email factory, sent directly or
//!   through an [`EmailQueue`].
//! - [`App`]: template, action and script routes assembled from an
//!   [`AppConfig`], with not-found, not-allowed, error and maintenance
//!   handlers.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use kiln::{App, Catalog, ConfigLoader, Method, Request, Server};
//!
//! #[tokio::main]
//! async fn main() -> kiln::Result<()> {
//!     let config = ConfigLoader::new().with_config_path("kiln.toml").load()?;
//!     kiln::init_logging(&config.logger)?;
//!
//!     let app = App::new(config, Catalog::new())?
//!         .on(Method::Get, "/ping", |_: &Request| "pong");
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//! ```

mod app;
mod config;
mod container;
mod error;
mod handler;
mod handlers;
mod logging;
mod method;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod action;
pub mod email;
pub mod factory;
pub mod module;
pub mod route;
pub mod script;
pub mod template;

pub use action::{Action, ActionMode, ActionState};
pub use app::App;
pub use config::{
    AppConfig, CONFIG_ENV_PREFIX, ConfigLoader, LoggerConfig, ViewConfig, WidgetsConfig,
};
pub use container::Container;
pub use email::{
    Email, EmailConfig, EmailQueue, EmailQueueManager, EmailState, Mailbox, MemoryQueue,
};
pub use error::{BoxError, Error, Result};
pub use factory::{
    Arguments, Builder, Catalog, Configurable, Factory, ResolutionRule, UnknownFields,
};
pub use handler::{Handler, SharedRoute};
pub use handlers::{HandlerConfig, Handlers, HandlersConfig, escape_html};
pub use logging::{init_logging, parse_log_level};
pub use method::{Method, UnknownMethod};
pub use module::Module;
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use route::{Route, RoutesConfig};
pub use router::Router;
pub use script::{Script, ScriptArgument, ScriptState};
pub use server::Server;
pub use status::Status;
pub use template::{Template, Widget};
