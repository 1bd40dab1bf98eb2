//! Action controllers: request handlers that do something and answer with
//! JSON results or a redirect.
//!
//! Concrete actions embed an [`ActionState`] for the common fields and
//! implement [`Action::run`]. [`respond`] turns a finished action into a
//! response according to its mode.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::container::Container;
use crate::error::{Error, Result};
use crate::factory::Configurable;
use crate::request::Request;
use crate::response::{Response, check_header};
use crate::status::Status;

/// How an action answers once it has run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionMode {
    /// `results()` as JSON; 200 on success, 400 otherwise.
    #[default]
    Json,
    /// 303 to the success or failure URL.
    Redirect,
}

/// Fields shared by every action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionState {
    mode: ActionMode,
    success: bool,
    success_url: Option<String>,
    failure_url: Option<String>,
}

impl ActionState {
    pub fn mode(&self) -> ActionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ActionMode) -> &mut Self {
        self.mode = mode;
        self
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn set_success(&mut self, success: bool) -> &mut Self {
        self.success = success;
        self
    }

    pub fn success_url(&self) -> Option<&str> {
        self.success_url.as_deref()
    }

    pub fn set_success_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.success_url = Some(url.into());
        self
    }

    pub fn failure_url(&self) -> Option<&str> {
        self.failure_url.as_deref()
    }

    pub fn set_failure_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.failure_url = Some(url.into());
        self
    }

    /// The success URL after a successful run, the failure URL otherwise.
    pub fn redirect_url(&self) -> Option<&str> {
        if self.success { self.success_url() } else { self.failure_url() }
    }

    /// Applies `mode`, `success_url` and `failure_url`; other keys are left
    /// to the concrete action.
    pub fn set_field(&mut self, key: &str, value: &Value) -> Result<bool> {
        match key {
            "mode" => {
                self.mode = serde_json::from_value(value.clone())
                    .map_err(|_| {
                        Error::invalid_configuration(format!("invalid action mode `{value}`"))
                    })?;
            }
            "success_url" => {
                self.set_success_url(expect_location(key, value)?);
            }
            "failure_url" => {
                self.set_failure_url(expect_location(key, value)?);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

fn expect_str<'a>(key: &str, value: &'a Value) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| Error::invalid_configuration(format!("`{key}` must be a string")))
}

fn expect_location<'a>(key: &str, value: &'a Value) -> Result<&'a str> {
    let url = expect_str(key, value)?;
    check_header("location", url)
        .map_err(|_| {
            Error::invalid_configuration(format!("`{key}` {url:?} is not a valid location"))
        })?;
    Ok(url)
}

/// An action controller.
pub trait Action: Configurable + Send {
    /// Second-phase injection, called once by the action factory.
    ///
    /// Copy out what the action needs; do not keep the container.
    fn set_dependencies(&mut self, _container: &Container) -> Result<()> {
        Ok(())
    }

    fn state(&self) -> &ActionState;

    fn state_mut(&mut self) -> &mut ActionState;

    /// Performs the action. Set the success flag on the state.
    fn run(&mut self, req: &Request) -> Result<()>;

    /// Payload for JSON mode.
    fn results(&self) -> Value {
        json!({ "success": self.state().success() })
    }
}

/// Runs `action` and renders its outcome.
pub fn respond(action: &mut dyn Action, req: &Request) -> Result<Response> {
    action.run(req)?;

    let state = action.state();
    match state.mode() {
        ActionMode::Json => {
            let status = if state.success() { Status::Ok } else { Status::BadRequest };
            Ok(Response::json_value(status, &action.results()))
        }
        ActionMode::Redirect => {
            let url = state.redirect_url().ok_or_else(|| {
                Error::invalid_configuration(if state.success() {
                    "redirect action succeeded but has no success_url"
                } else {
                    "redirect action failed but has no failure_url"
                })
            })?;
            check_header("location", url)?;
            Ok(Response::redirect(url, Status::SeeOther))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::factory::UnknownFields;
    use crate::method::Method;

    #[derive(Default)]
    struct SubscribeAction {
        state: ActionState,
        email: Option<String>,
    }

    impl Configurable for SubscribeAction {
        fn set_field(&mut self, key: &str, value: &Value) -> Result<bool> {
            self.state.set_field(key, value)
        }
    }

    impl Action for SubscribeAction {
        fn state(&self) -> &ActionState {
            &self.state
        }
        fn state_mut(&mut self) -> &mut ActionState {
            &mut self.state
        }
        fn run(&mut self, req: &Request) -> Result<()> {
            self.email = std::str::from_utf8(req.body())
                .ok()
                .filter(|s| s.contains('@'))
                .map(str::to_owned);
            let success = self.email.is_some();
            self.state_mut().set_success(success);
            Ok(())
        }
        fn results(&self) -> Value {
            json!({ "success": self.state.success(), "email": self.email })
        }
    }

    fn configured(data: Value) -> SubscribeAction {
        let mut action = SubscribeAction::default();
        let Value::Object(map) = data else { unreachable!() };
        action.set_data(&map, UnknownFields::Reject).unwrap();
        action
    }

    #[test]
    fn json_mode_reports_results() {
        let mut action = configured(json!({}));
        let req = Request::new(Method::Post, "/subscribe").with_body("a@b.c");
        let res = respond(&mut action, &req).unwrap();
        assert_eq!(res.status_code(), 200);
        assert_eq!(res.body(), br#"{"email":"a@b.c","success":true}"#);
    }

    #[test]
    fn json_mode_failure_is_bad_request() {
        let mut action = configured(json!({}));
        let res = respond(&mut action, &Request::new(Method::Post, "/subscribe")).unwrap();
        assert_eq!(res.status_code(), 400);
    }

    #[test]
    fn redirect_mode_picks_url_by_outcome() {
        let data = json!({"mode": "redirect", "success_url": "/thanks", "failure_url": "/oops"});

        let mut ok = configured(data.clone());
        let res = respond(&mut ok, &Request::new(Method::Post, "/").with_body("a@b.c")).unwrap();
        assert_eq!(res.header("location"), Some("/thanks"));

        let mut failed = configured(data);
        let res = respond(&mut failed, &Request::new(Method::Post, "/")).unwrap();
        assert_eq!(res.status_code(), 303);
        assert_eq!(res.header("location"), Some("/oops"));
    }

    #[test]
    fn redirect_without_url_is_an_error() {
        let mut action = configured(json!({"mode": "redirect"}));
        assert!(respond(&mut action, &Request::new(Method::Post, "/")).is_err());
    }

    #[test]
    fn unsendable_urls_are_rejected() {
        let mut action = SubscribeAction::default();
        let err = action
            .state
            .set_field("success_url", &json!("/ok\nSet-Cookie: x=1"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration { .. }));
        assert_eq!(action.state.success_url(), None);

        action.state.set_field("mode", &json!("redirect")).unwrap();
        action.state.set_failure_url("/bad\r\n");
        assert!(respond(&mut action, &Request::new(Method::Post, "/")).is_err());
    }

    #[test]
    fn invalid_mode_is_rejected() {
        let mut action = SubscribeAction::default();
        let err = action.state.set_field("mode", &json!("xml")).unwrap_err();
        assert!(err.to_string().contains("invalid action mode"));
    }
}
