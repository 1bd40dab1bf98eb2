//! HTTP status codes used by kiln's routes and handlers.
//!
//! ```rust
//! use kiln::{Response, Status};
//!
//! Response::status(Status::NoContent);
//! assert_eq!(u16::from(Status::SeeOther), 303);
//! assert!(Status::try_from(302).unwrap().is_redirect());
//! ```

macro_rules! statuses {
    ($($variant:ident = $code:literal, $reason:literal;)+) => {
        /// A typed HTTP status code.
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        pub enum Status {
            $($variant,)+
        }

        impl Status {
            pub fn code(self) -> u16 {
                match self {
                    $(Self::$variant => $code,)+
                }
            }

            /// The canonical reason phrase (e.g. `"Not Found"`).
            pub fn reason(self) -> &'static str {
                match self {
                    $(Self::$variant => $reason,)+
                }
            }
        }

        impl TryFrom<u16> for Status {
            type Error = u16;

            fn try_from(code: u16) -> Result<Self, u16> {
                match code {
                    $($code => Ok(Self::$variant),)+
                    other => Err(other),
                }
            }
        }
    };
}

statuses! {
    Ok                   = 200, "OK";
    Created              = 201, "Created";
    Accepted             = 202, "Accepted";
    NoContent            = 204, "No Content";
    MultipleChoices      = 300, "Multiple Choices";
    MovedPermanently     = 301, "Moved Permanently";
    Found                = 302, "Found";
    SeeOther             = 303, "See Other";
    NotModified          = 304, "Not Modified";
    TemporaryRedirect    = 307, "Temporary Redirect";
    PermanentRedirect    = 308, "Permanent Redirect";
    BadRequest           = 400, "Bad Request";
    Unauthorized         = 401, "Unauthorized";
    Forbidden            = 403, "Forbidden";
    NotFound             = 404, "Not Found";
    MethodNotAllowed     = 405, "Method Not Allowed";
    Conflict             = 409, "Conflict";
    UnprocessableContent = 422, "Unprocessable Content";
    TooManyRequests      = 429, "Too Many Requests";
    InternalServerError  = 500, "Internal Server Error";
    NotImplemented       = 501, "Not Implemented";
    BadGateway           = 502, "Bad Gateway";
    ServiceUnavailable   = 503, "Service Unavailable";
    GatewayTimeout       = 504, "Gateway Timeout";
}

impl Status {
    pub fn is_redirect(self) -> bool {
        (300..400).contains(&self.code())
    }

    pub fn is_success(self) -> bool {
        (200..300).contains(&self.code())
    }
}

impl From<Status> for u16 {
    fn from(status: Status) -> u16 {
        status.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_try_from() {
        for code in [200, 303, 404, 503] {
            assert_eq!(Status::try_from(code).map(Status::code), Ok(code));
        }
        assert_eq!(Status::try_from(299), Err(299));
    }

    #[test]
    fn redirect_range() {
        assert!(Status::MovedPermanently.is_redirect());
        assert!(!Status::NotModified.is_success());
        assert!(!Status::Ok.is_redirect());
    }
}
