use std::ffi::OsString;
use std::sync::Arc;

use tracing::info;

use super::ScriptRouteConfig;
use crate::error::Result;
use crate::factory::{Factory, UnknownFields};
use crate::script::{self, Script};

/// A named command-line entry point.
pub struct ScriptRoute {
    config: ScriptRouteConfig,
    scripts: Arc<Factory<dyn Script>>,
}

impl ScriptRoute {
    pub fn new(config: ScriptRouteConfig, scripts: Arc<Factory<dyn Script>>) -> Self {
        Self { config, scripts }
    }

    pub fn config(&self) -> &ScriptRouteConfig {
        &self.config
    }

    /// Builds the script and runs it with `argv` (no binary name).
    pub fn invoke<I, S>(&self, argv: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString> + Clone,
    {
        let mut script = self.scripts.create(self.config.route.controller(), None)?;
        if script.state().ident().is_empty() {
            script.state_mut().set_ident(self.config.route.ident.clone());
        }
        script.set_data(&self.config.script_data, UnknownFields::Ignore)?;

        info!(script = %self.config.route.ident, "invoking script");
        script::invoke(script.as_mut(), argv)
    }
}
