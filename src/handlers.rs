//! Fallback handlers for requests no route answers.
//!
//! Each handler negotiates its body on the `accept` header and can be
//! rendered through a template instead:
//!
//! ```toml
//! [handlers.not_found]
//! message = "Nothing here."
//! template = "errors/not-found"
//! ```
//!
//! The template receives `status`, `message` and, for the error handler in
//! debug mode, `details`. If it cannot be built or rendered the built-in
//! body is used.

use std::fmt::Write as _;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::warn;

use crate::container::Container;
use crate::error::{Error, Result};
use crate::factory::{Factory, UnknownFields};
use crate::method::Method;
use crate::request::Request;
use crate::response::{ContentType, Response};
use crate::status::Status;
use crate::template::Template;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Overrides the default message.
    pub message: Option<String>,
    /// Template identifier used for the body.
    pub template: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlersConfig {
    pub not_found: HandlerConfig,
    pub not_allowed: HandlerConfig,
    pub error: HandlerConfig,
    pub shutdown: HandlerConfig,
}

/// The four fallback handlers.
pub struct Handlers {
    config: HandlersConfig,
    debug: bool,
    engine: String,
    templates: Arc<Factory<dyn Template>>,
}

impl Handlers {
    pub fn new(container: &Container) -> Self {
        let config = container.config();
        Self {
            config: config.handlers.clone(),
            debug: config.debug,
            engine: config.view.default_engine.clone(),
            templates: Arc::clone(container.templates()),
        }
    }

    /// `404 Not Found`.
    pub fn not_found(&self, req: &Request) -> Response {
        self.respond(
            req,
            Status::NotFound,
            &self.config.not_found,
            "The requested page could not be found.",
            None,
        )
    }

    /// `405 Method Not Allowed` with an `allow` header.
    pub fn not_allowed(&self, req: &Request, allowed: &[Method]) -> Response {
        let allow = allowed.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
        self.respond(
            req,
            Status::MethodNotAllowed,
            &self.config.not_allowed,
            "The request method is not supported for this page.",
            None,
        )
        .with_header("allow", &allow)
    }

    /// `500 Internal Server Error`. `details` are shown only in debug mode.
    pub fn error(&self, req: &Request, details: &str) -> Response {
        let details = self.debug.then_some(details);
        self.respond(
            req,
            Status::InternalServerError,
            &self.config.error,
            "An error occurred while processing your request.",
            details,
        )
    }

    /// `503 Service Unavailable`, for maintenance mode.
    pub fn shutdown(&self, req: &Request) -> Response {
        self.respond(
            req,
            Status::ServiceUnavailable,
            &self.config.shutdown,
            "The site is down for maintenance. Please check back soon.",
            None,
        )
        .with_header("retry-after", "3600")
    }

    fn respond(
        &self,
        req: &Request,
        status: Status,
        config: &HandlerConfig,
        default_message: &str,
        details: Option<&str>,
    ) -> Response {
        let message = config.message.as_deref().unwrap_or(default_message);

        if req.wants_json() {
            let mut error = json!({ "status": status.code(), "message": message });
            if let Some(details) = details {
                error["details"] = Value::from(details);
            }
            return Response::json_value(status, &json!({ "error": error }));
        }

        if let Some(template) = &config.template {
            match self.render(template, req, status, message, details) {
                Ok(html) => {
                    return Response::builder()
                        .status(status)
                        .bytes(ContentType::Html, html.into_bytes());
                }
                Err(e) => warn!(
                    template = %template,
                    status = status.code(),
                    error = %e,
                    "handler template failed"
                ),
            }
        }

        if req.wants_html() {
            let html = default_page(status, message, details);
            return Response::builder().status(status).bytes(ContentType::Html, html.into_bytes());
        }

        let mut text = format!("{} {}: {message}", status.code(), status.reason());
        if let Some(details) = details {
            let _ = write!(text, "\n\n{details}");
        }
        Response::builder().status(status).text(text)
    }

    fn render(
        &self,
        identifier: &str,
        req: &Request,
        status: Status,
        message: &str,
        details: Option<&str>,
    ) -> Result<String> {
        let mut template = self.templates.create(identifier, None)?;

        let mut data = Map::new();
        data.insert("status".to_owned(), Value::from(status.code()));
        data.insert("message".to_owned(), Value::from(message));
        if let Some(details) = details {
            data.insert("details".to_owned(), Value::from(details));
        }
        template.set_data(&data, UnknownFields::Ignore)?;

        if !template.init(req) {
            return Err(Error::invalid_configuration(format!(
                "template `{identifier}` refused to initialise"
            )));
        }
        template.render(&self.engine)
    }
}

fn default_page(status: Status, message: &str, details: Option<&str>) -> String {
    let title = format!("{} {}", status.code(), status.reason());
    let mut html = format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body><h1>{}</h1><p>{}</p>",
        escape_html(status.reason()),
        escape_html(message),
    );
    if let Some(details) = details {
        let _ = write!(html, "<pre>{}</pre>", escape_html(details));
    }
    html.push_str("</body></html>");
    html
}

/// Escapes the five HTML-significant characters.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_html_covers_markup() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn default_page_escapes_details() {
        let page = default_page(Status::InternalServerError, "oops", Some("<script>"));
        assert!(page.contains("<title>500 Internal Server Error</title>"));
        assert!(page.contains("<pre>&lt;script&gt;</pre>"));
    }
}
