//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.

use bytes::Bytes;
use http_body_util::Full;
use serde::Serialize;

use tracing::error;

use crate::error::{Error, Result};
use crate::status::Status;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Content-type values kiln's controllers produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentType {
    Html,  // text/html; charset=utf-8
    Json,  // application/json
    Text,  // text/plain; charset=utf-8
    Xml,   // application/xml
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html => "text/html; charset=utf-8",
            Self::Json => "application/json",
            Self::Text => "text/plain; charset=utf-8",
            Self::Xml  => "application/xml",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use kiln::{Response, Status};
///
/// Response::text("hello");
/// Response::html("<h1>hello</h1>");
/// Response::redirect("/login", Status::SeeOther);
/// Response::builder()
///     .status(Status::Created)
///     .header("location", "/posts/42")
///     .json(br#"{"id":42}"#.to_vec());
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    pub(crate) body: Vec<u8>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) status: u16,
}

impl Response {
    /// `200 OK`, `application/json`.
    pub fn json(body: Vec<u8>) -> Self {
        Self::builder().json(body)
    }

    /// A serializable value as `application/json` with the given status.
    ///
    /// Serialization failures become a bare `500`.
    pub fn json_value<T: Serialize>(status: Status, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => Self::builder().status(status).json(bytes),
            Err(_) => Self::status(Status::InternalServerError),
        }
    }

    /// `200 OK`, `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// `200 OK`, `text/html; charset=utf-8`.
    pub fn html(body: impl Into<String>) -> Self {
        Self::builder().bytes(ContentType::Html, body.into().into_bytes())
    }

    /// Response with no body.
    pub fn status(code: Status) -> Self {
        Self { body: Vec::new(), headers: Vec::new(), status: code.code() }
    }

    /// Redirect to `location` with a 3xx status.
    pub fn redirect(location: &str, code: Status) -> Self {
        Self::builder().status(code).header("location", location).no_body()
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: Status::Ok.code() }
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Adds a header to an already-built response.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Converts into the `http` type hyper writes to the socket.
    ///
    /// A header that is not valid HTTP turns the whole response into a bare
    /// `500`.
    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            if let Err(e) = check_header(name, value) {
                error!(
                    error = %e,
                    status = self.status,
                    "dropping response with an invalid header"
                );
                return server_error();
            }
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
            .body(Full::new(Bytes::from(self.body)))
            .unwrap_or_else(|_| server_error())
    }
}

fn server_error() -> http::Response<Full<Bytes>> {
    let mut fallback = http::Response::new(Full::new(Bytes::new()));
    *fallback.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
    fallback
}

/// Fails unless `name: value` can be written as an HTTP header.
pub(crate) fn check_header(name: &str, value: &str) -> Result<()> {
    if http::HeaderName::from_bytes(name.as_bytes()).is_err() {
        return Err(Error::invalid_configuration(format!("`{name}` is not a valid header name")));
    }
    if http::HeaderValue::from_str(value).is_err() {
        return Err(Error::invalid_configuration(format!(
            "invalid `{name}` header value {value:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_sets_location() {
        let res = Response::redirect("/login", Status::SeeOther);
        assert_eq!(res.status_code(), 303);
        assert_eq!(res.header("Location"), Some("/login"));
        assert!(res.body().is_empty());
    }

    #[test]
    fn into_inner_keeps_valid_headers() {
        let inner = Response::text("ok").with_header("x-good", "1").into_inner();
        assert_eq!(inner.status(), http::StatusCode::OK);
        assert!(inner.headers().contains_key("x-good"));
        assert_eq!(inner.headers().len(), 2);
    }

    #[test]
    fn invalid_header_is_a_server_error() {
        let inner = Response::text("ok").with_header("bad header", "2").into_inner();
        assert_eq!(inner.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(inner.headers().is_empty());

        let inner =
            Response::redirect("/a\nSet-Cookie: x=1", Status::MovedPermanently).into_inner();
        assert_eq!(inner.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(inner.headers().get("location").is_none());
    }

    #[test]
    fn check_header_rejects_line_breaks() {
        assert!(check_header("location", "/thanks").is_ok());
        let err = check_header("location", "/a\r\nx: y");
        assert!(matches!(err, Err(Error::InvalidConfiguration { .. })));
        assert!(check_header("bad header", "1").is_err());
    }

    #[test]
    fn json_value_serializes() {
        let res = Response::json_value(Status::BadRequest, &serde_json::json!({"success": false}));
        assert_eq!(res.status_code(), 400);
        assert_eq!(res.body(), br#"{"success":false}"#);
    }
}
