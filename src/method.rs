//! HTTP method as a typed enum.
//!
//! Route configuration names methods as strings (`methods = ["GET", "post"]`);
//! they are parsed case-insensitively here. On the wire, methods are matched
//! exactly as RFC 9110 §9.1 requires, and anything outside this list is
//! answered with `405 Method Not Allowed`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An RFC 9110 request method.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Method {
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
}

impl Method {
    pub const ALL: [Method; 9] = [
        Self::Connect,
        Self::Delete,
        Self::Get,
        Self::Head,
        Self::Options,
        Self::Patch,
        Self::Post,
        Self::Put,
        Self::Trace,
    ];

    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Delete  => "DELETE",
            Self::Get     => "GET",
            Self::Head    => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch   => "PATCH",
            Self::Post    => "POST",
            Self::Put     => "PUT",
            Self::Trace   => "TRACE",
        }
    }

    /// Exact, case-sensitive match of a wire method.
    pub fn from_wire(method: &http::Method) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == method.as_str())
    }
}

/// Error returned when a method string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown HTTP method `{0}`")]
pub struct UnknownMethod(pub String);

/// Case-insensitive; meant for configuration values.
impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownMethod(s.to_owned()))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Method {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Method {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_strings_parse_case_insensitively() {
        assert_eq!("post".parse::<Method>(), Ok(Method::Post));
        assert_eq!("GET".parse::<Method>(), Ok(Method::Get));
        assert!("BREW".parse::<Method>().is_err());
    }

    #[test]
    fn wire_methods_match_exactly() {
        assert_eq!(Method::from_wire(&http::Method::PATCH), Some(Method::Patch));
        let custom = http::Method::from_bytes(b"get").unwrap();
        assert_eq!(Method::from_wire(&custom), None);
    }

    #[test]
    fn deserializes_from_json() {
        let methods: Vec<Method> = serde_json::from_str(r#"["get", "DELETE"]"#).unwrap();
        assert_eq!(methods, [Method::Get, Method::Delete]);
    }
}
