use std::sync::Arc;

use super::{ActionRouteConfig, Route, with_headers};
use crate::action::{self, Action};
use crate::container::Container;
use crate::error::{Error, Result};
use crate::factory::{Factory, UnknownFields};
use crate::request::Request;
use crate::response::Response;

/// Runs a fresh action per request.
pub struct ActionRoute {
    config: ActionRouteConfig,
    actions: Option<Arc<Factory<dyn Action>>>,
}

impl ActionRoute {
    pub fn new(config: ActionRouteConfig) -> Self {
        Self { config, actions: None }
    }

    pub fn config(&self) -> &ActionRouteConfig {
        &self.config
    }
}

impl Route for ActionRoute {
    fn set_dependencies(&mut self, container: &Container) -> Result<()> {
        self.actions = Some(Arc::clone(container.actions()));
        Ok(())
    }

    fn handle(&self, req: &Request) -> Result<Response> {
        let actions = self.actions.as_deref().ok_or_else(|| {
            Error::invalid_configuration(format!(
                "action route `{}` has no action factory",
                self.config.route.ident
            ))
        })?;

        let mut action = actions.create(self.config.route.controller(), None)?;
        action.set_data(&self.config.action_data, UnknownFields::Ignore)?;

        let res = action::respond(action.as_mut(), req)?;
        Ok(with_headers(res, &self.config.route.headers))
    }
}
