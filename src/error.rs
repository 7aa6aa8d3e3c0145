//! Error types for the routing engine.

use thiserror::Error;

use crate::lookup::LookupError;

/// Result type alias for routing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building a route table or dispatching a request.
///
/// "No rule matched" is not an error: it is reported as
/// [`Outcome::NotRoutable`](crate::Outcome::NotRoutable).
#[derive(Debug, Error)]
pub enum Error {
    /// A rule pattern did not compile to a valid expression.
    #[error("invalid route pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The lookup collaborator could not be reached.
    #[error("lookup failed: {0}")]
    Lookup(#[from] LookupError),

    /// Comparison operator outside `== === != <> !== > >= < <=`.
    #[error("unsupported comparison operator `{0}`")]
    UnsupportedOperator(String),

    /// A dynamic destination or before hook failed.
    #[error("route callback failed: {0}")]
    Callback(String),

    /// A page id in the configuration was not numeric.
    #[error("invalid page id `{0}`")]
    InvalidPageId(String),

    /// JSON body serialization failed.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Route configuration could not be parsed.
    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// IO error while reading configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
