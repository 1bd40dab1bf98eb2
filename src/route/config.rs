//! Route configuration.
//!
//! ```toml
//! [routes.templates.home]
//! route = "/"
//! cache = true
//! cache_ttl = 600
//!
//! [routes.templates.old-home]
//! redirect = "/"
//! redirect_mode = 308
//!
//! [routes.actions.subscribe]
//! action_data = { list = "weekly" }
//!
//! [routes.scripts.import]
//! controller = "catalog/import"
//! ```
//!
//! The table key is the route's ident. Everything else has a default
//! derived from it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::method::Method;
use crate::response::check_header;
use crate::status::Status;

/// Fields shared by every route kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    pub ident: String,
    /// URL path; `/` + ident when unset.
    pub route: Option<String>,
    /// Empty means the kind's default method.
    pub methods: Vec<Method>,
    /// Controller identifier; the ident when unset.
    pub controller: Option<String>,
    /// Extra headers set on every response.
    pub headers: BTreeMap<String, String>,
}

impl RouteConfig {
    pub fn new(ident: impl Into<String>) -> Self {
        Self { ident: ident.into(), ..Self::default() }
    }

    pub fn path(&self) -> String {
        match &self.route {
            Some(route) => route.clone(),
            None => format!("/{}", self.ident),
        }
    }

    pub fn controller(&self) -> &str {
        self.controller.as_deref().unwrap_or(&self.ident)
    }

    pub fn methods_or(&self, default: Method) -> Vec<Method> {
        if self.methods.is_empty() { vec![default] } else { self.methods.clone() }
    }

    fn validate(&self, kind: &str) -> Result<()> {
        if self.ident.is_empty() {
            return Err(Error::invalid_configuration(format!("{kind} route without an ident")));
        }
        let path = self.path();
        if !path.starts_with('/') {
            return Err(Error::invalid_configuration(format!(
                "{kind} route `{}`: path `{path}` must start with `/`",
                self.ident
            )));
        }
        for (name, value) in &self.headers {
            check_header(name, value).map_err(|e| {
                Error::invalid_configuration(format!("{kind} route `{}`: {e}", self.ident))
            })?;
        }
        Ok(())
    }
}

/// A page route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateRouteConfig {
    #[serde(flatten)]
    pub route: RouteConfig,
    /// Template identifier; the controller when unset.
    pub template: Option<String>,
    /// Rendering engine; the application's default when unset.
    pub engine: Option<String>,
    pub template_data: Map<String, Value>,
    /// Redirect target. When set, nothing is rendered.
    pub redirect: Option<String>,
    pub redirect_mode: Option<u16>,
    pub cache: bool,
    /// Seconds; only meaningful with `cache`.
    pub cache_ttl: Option<u64>,
}

impl TemplateRouteConfig {
    pub const DEFAULT_REDIRECT: Status = Status::MovedPermanently;

    pub fn new(ident: impl Into<String>) -> Self {
        Self { route: RouteConfig::new(ident), ..Self::default() }
    }

    pub fn template(&self) -> &str {
        self.template.as_deref().unwrap_or_else(|| self.route.controller())
    }

    pub fn redirect_status(&self) -> Result<Status> {
        let Some(code) = self.redirect_mode else {
            return Ok(Self::DEFAULT_REDIRECT);
        };
        Status::try_from(code)
            .ok()
            .filter(|s| s.is_redirect())
            .ok_or_else(|| {
                Error::invalid_configuration(format!(
                    "template route `{}`: redirect_mode {code} is not a redirect status",
                    self.route.ident
                ))
            })
    }

    fn validate(&self) -> Result<()> {
        self.route.validate("template")?;
        self.redirect_status()?;
        if let Some(target) = &self.redirect {
            check_header("location", target).map_err(|_| {
                Error::invalid_configuration(format!(
                    "template route `{}`: redirect target {target:?} is not a valid location",
                    self.route.ident
                ))
            })?;
        }
        Ok(())
    }

    /// `cache-control` value, when caching is on.
    pub fn cache_control(&self) -> Option<String> {
        match (self.cache, self.cache_ttl) {
            (false, _) => None,
            (true, Some(ttl)) => Some(format!("public, max-age={ttl}")),
            (true, None) => Some("public".to_owned()),
        }
    }
}

/// An action route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionRouteConfig {
    #[serde(flatten)]
    pub route: RouteConfig,
    pub action_data: Map<String, Value>,
}

impl ActionRouteConfig {
    pub fn new(ident: impl Into<String>) -> Self {
        Self { route: RouteConfig::new(ident), ..Self::default() }
    }
}

/// A command-line route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptRouteConfig {
    #[serde(flatten)]
    pub route: RouteConfig,
    pub script_data: Map<String, Value>,
}

impl ScriptRouteConfig {
    pub fn new(ident: impl Into<String>) -> Self {
        Self { route: RouteConfig::new(ident), ..Self::default() }
    }
}

/// Every configured route, by kind and ident.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutesConfig {
    pub templates: BTreeMap<String, TemplateRouteConfig>,
    pub actions: BTreeMap<String, ActionRouteConfig>,
    pub scripts: BTreeMap<String, ScriptRouteConfig>,
}

impl RoutesConfig {
    pub fn add_template(&mut self, config: TemplateRouteConfig) -> &mut Self {
        self.templates.insert(config.route.ident.clone(), config);
        self
    }

    pub fn add_action(&mut self, config: ActionRouteConfig) -> &mut Self {
        self.actions.insert(config.route.ident.clone(), config);
        self
    }

    pub fn add_script(&mut self, config: ScriptRouteConfig) -> &mut Self {
        self.scripts.insert(config.route.ident.clone(), config);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty() && self.actions.is_empty() && self.scripts.is_empty()
    }

    /// Fills empty idents from the table keys.
    pub fn normalize(&mut self) {
        fn fill(key: &str, route: &mut RouteConfig) {
            if route.ident.is_empty() {
                route.ident = key.to_owned();
            }
        }
        for (key, config) in &mut self.templates {
            fill(key, &mut config.route);
        }
        for (key, config) in &mut self.actions {
            fill(key, &mut config.route);
        }
        for (key, config) in &mut self.scripts {
            fill(key, &mut config.route);
        }
    }

    pub fn validate(&self) -> Result<()> {
        for config in self.templates.values() {
            config.validate()?;
        }
        for config in self.actions.values() {
            config.route.validate("action")?;
            for key in ["success_url", "failure_url"] {
                if let Some(Value::String(url)) = config.action_data.get(key) {
                    check_header("location", url).map_err(|_| {
                        Error::invalid_configuration(format!(
                            "action route `{}`: {key} {url:?} is not a valid location",
                            config.route.ident
                        ))
                    })?;
                }
            }
        }
        for config in self.scripts.values() {
            if config.route.ident.is_empty() {
                return Err(Error::invalid_configuration("script route without an ident"));
            }
        }
        Ok(())
    }

    /// Adds routes from `other` whose idents are not configured yet.
    pub fn merge_missing(&mut self, other: RoutesConfig) {
        for (key, config) in other.templates {
            self.templates.entry(key).or_insert(config);
        }
        for (key, config) in other.actions {
            self.actions.entry(key).or_insert(config);
        }
        for (key, config) in other.scripts {
            self.scripts.entry(key).or_insert(config);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn routes(value: Value) -> RoutesConfig {
        let mut routes: RoutesConfig = serde_json::from_value(value).unwrap();
        routes.normalize();
        routes
    }

    #[test]
    fn defaults_derive_from_ident() {
        let routes = routes(json!({"templates": {"about": {}}}));
        let about = &routes.templates["about"];
        assert_eq!(about.route.path(), "/about");
        assert_eq!(about.route.controller(), "about");
        assert_eq!(about.template(), "about");
        assert_eq!(about.route.methods_or(Method::Get), [Method::Get]);
        assert_eq!(about.redirect_status().unwrap(), Status::MovedPermanently);
    }

    #[test]
    fn flattened_fields_deserialize() {
        let routes = routes(json!({"actions": {"subscribe": {
            "route": "/api/subscribe",
            "methods": ["post", "PUT"],
            "controller": "newsletter/subscribe",
            "action_data": {"list": "weekly"}
        }}}));
        let subscribe = &routes.actions["subscribe"];
        assert_eq!(subscribe.route.path(), "/api/subscribe");
        assert_eq!(subscribe.route.methods, [Method::Post, Method::Put]);
        assert_eq!(subscribe.route.controller(), "newsletter/subscribe");
        assert_eq!(subscribe.action_data["list"], "weekly");
    }

    #[test]
    fn non_redirect_mode_is_invalid() {
        let routes = routes(json!({"templates": {"old": {"redirect": "/", "redirect_mode": 200}}}));
        assert!(matches!(routes.validate(), Err(Error::InvalidConfiguration { .. })));
    }

    #[test]
    fn redirect_target_must_be_a_valid_location() {
        let routes = routes(json!({"templates": {"old": {"redirect": "/a\nSet-Cookie: x=1"}}}));
        let err = routes.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration { .. }));
        assert!(err.to_string().contains("redirect target"));
    }

    #[test]
    fn action_urls_must_be_valid_locations() {
        let routes = routes(json!({"actions": {"signup": {
            "action_data": {"failure_url": "/sorry\r\n"}
        }}}));
        let err = routes.validate().unwrap_err();
        assert!(err.to_string().contains("failure_url"));
    }

    #[test]
    fn route_headers_must_be_valid() {
        let invalid = routes(json!({"templates": {"home": {"headers": {"x frame": "DENY"}}}}));
        assert!(matches!(invalid.validate(), Err(Error::InvalidConfiguration { .. })));

        let headers = json!({"x-frame-options": "DENY"});
        let valid = routes(json!({"templates": {"home": {"headers": headers}}}));
        assert!(valid.validate().is_ok());
    }

    #[test]
    fn relative_path_is_invalid() {
        let routes = routes(json!({"actions": {"ping": {"route": "ping"}}}));
        let err = routes.validate().unwrap_err();
        assert!(err.to_string().contains("must start with `/`"));
    }

    #[test]
    fn cache_control_follows_ttl() {
        let mut config = TemplateRouteConfig::new("home");
        assert_eq!(config.cache_control(), None);
        config.cache = true;
        assert_eq!(config.cache_control().as_deref(), Some("public"));
        config.cache_ttl = Some(600);
        assert_eq!(config.cache_control().as_deref(), Some("public, max-age=600"));
    }

    #[test]
    fn merge_missing_keeps_existing_routes() {
        let mut configured = routes(json!({"templates": {"home": {"route": "/start"}}}));
        let mut contributed = RoutesConfig::default();
        contributed
            .add_template(TemplateRouteConfig::new("home"))
            .add_action(ActionRouteConfig::new("contact"));

        configured.merge_missing(contributed);

        assert_eq!(configured.templates["home"].route.path(), "/start");
        assert!(configured.actions.contains_key("contact"));
    }
}
