//! Unified error type.

use thiserror::Error;

/// A boxed error returned by constructors and controllers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias used throughout kiln.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type returned by kiln's fallible operations.
///
/// Factory and builder failures are surfaced to the immediate caller. The
/// HTTP dispatch layer is the only place that turns them into responses
/// (through the configured error handler).
#[derive(Error, Debug)]
pub enum Error {
    /// The identifier resolved to no registered type and no default was
    /// configured.
    #[error("unknown identifier `{identifier}` (resolved to `{resolved}`)")]
    UnknownIdentifier {
        /// The identifier as requested.
        identifier: String,
        /// The type name the resolution rule produced.
        resolved: String,
    },

    /// The resolved type exists but does not satisfy the factory's
    /// capability or naming suffix.
    #[error("type `{type_name}` does not satisfy `{capability}`")]
    CapabilityMismatch {
        /// The registered type name.
        type_name: String,
        /// What the factory requires.
        capability: String,
    },

    /// The constructor or the post-construction callback failed.
    #[error("failed to construct `{type_name}`: {source}")]
    Construction {
        /// The type that was being built.
        type_name: String,
        /// The underlying failure.
        #[source]
        source: BoxError,
    },

    /// Malformed construction arguments or configuration data.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        /// Description of the problem.
        message: String,
    },

    /// Configuration could not be loaded or extracted.
    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Script command-line arguments were rejected.
    #[error("invalid script arguments: {0}")]
    Arguments(#[from] clap::Error),

    /// I/O failure (binding, accepting, prompting).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON conversion failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for [`Error::InvalidConfiguration`].
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration { message: message.into() }
    }

    /// Shorthand for [`Error::Construction`].
    pub fn construction(type_name: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Construction { type_name: type_name.into(), source: source.into() }
    }
}

impl From<figment::Error> for Error {
    fn from(e: figment::Error) -> Self {
        Self::Config(Box::new(e))
    }
}
