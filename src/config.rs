//! Application configuration.
//!
//! Sources are merged in this order, later ones winning:
//!
//! 1. `AppConfig::default()`
//! 2. a TOML file, if one is given and exists
//! 3. `KILN_*` environment variables, `__` separating nested keys
//!    (`KILN_VIEW__DEFAULT_ENGINE=tera`)

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::email::EmailConfig;
use crate::error::{Error, Result};
use crate::handlers::HandlersConfig;
use crate::logging::parse_log_level;
use crate::route::RoutesConfig;

/// Prefix of configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "KILN";

/// Separator for nested keys in environment variable names.
pub const CONFIG_ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Exposes error details in responses.
    pub debug: bool,
    /// Answers every request with the shutdown handler.
    pub maintenance: bool,
    pub base_url: String,
    pub view: ViewConfig,
    pub logger: LoggerConfig,
    pub handlers: HandlersConfig,
    pub routes: RoutesConfig,
    /// Module identifiers, set up in order.
    pub modules: Vec<String>,
    /// Construction arguments handed to every kernel factory.
    pub arguments: Map<String, Value>,
    pub widgets: WidgetsConfig,
    pub email: EmailConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debug: false,
            maintenance: false,
            base_url: "/".to_owned(),
            view: ViewConfig::default(),
            logger: LoggerConfig::default(),
            handlers: HandlersConfig::default(),
            routes: RoutesConfig::default(),
            modules: Vec::new(),
            arguments: Map::new(),
            widgets: WidgetsConfig::default(),
            email: EmailConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        parse_log_level(&self.logger.level)?;
        if self.view.default_engine.trim().is_empty() {
            return Err(Error::invalid_configuration("view.default_engine cannot be empty"));
        }
        if let Some(module) = self.modules.iter().find(|m| m.trim().is_empty()) {
            return Err(Error::invalid_configuration(format!(
                "invalid module identifier `{module}`"
            )));
        }
        self.email.validate()?;
        self.routes.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Engine passed to templates whose route names none.
    pub default_engine: String,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self { default_engine: "mustache".to_owned() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetsConfig {
    /// Widget built when an options map names no type. Without it there
    /// is no widget builder.
    pub default_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub active: bool,
    pub level: String,
    pub json: bool,
    /// Recorded on the root span of every request.
    pub channel: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self { active: true, level: "info".to_owned(), json: false, channel: "kiln".to_owned() }
    }
}

/// Loads an [`AppConfig`] from defaults, a TOML file and the environment.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    env_prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None, env_prefix: CONFIG_ENV_PREFIX.to_owned() }
    }

    pub fn with_config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Merges every source, fills route idents and validates.
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        if let Some(path) = &self.config_path {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
                info!(path = %path.display(), "configuration loaded");
            } else {
                warn!(path = %path.display(), "configuration file not found");
            }
        }

        let env = Env::prefixed(&format!("{}_", self.env_prefix)).split(CONFIG_ENV_SEPARATOR);
        figment = figment.merge(env);

        let mut config: AppConfig = figment.extract()?;
        config.routes.normalize();
        config.validate()?;
        Ok(config)
    }
}
