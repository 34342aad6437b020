use std::{
    error::Error,
    fmt::{self, Display},
    sync::Arc,
};
use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of an extmod-related operation.
pub type ExtmodResult<T> = Result<T, ExtmodError>;

/// An error that occurred while loading or projecting an external module.
#[derive(pretty_error_debug::Debug, Error)]
pub enum ExtmodError {
    /// An I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An error that can represent any error.
    #[error(transparent)]
    Custom(#[from] AnyError),

    /// An error that occurred during an HTTP request.
    #[error("http request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// An error that occurred during an HTTP middleware operation.
    #[error("http middleware error: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    /// The server answered a bundle request with a non-success status.
    #[error("unexpected status {status} while fetching {url}")]
    UnexpectedStatus {
        /// The bundle URL.
        url: String,

        /// The HTTP status code returned.
        status: u16,
    },

    /// The fetched resource is not a valid bundle document.
    #[error("invalid bundle at {url}: {source}")]
    InvalidBundle {
        /// The bundle URL.
        url: String,

        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The bundle requires a global binding that the host has not seeded.
    #[error("bundle {url} requires global `{name}` which is not bound")]
    MissingGlobal {
        /// The bundle URL.
        url: String,

        /// The name of the missing global.
        name: String,
    },

    /// The bundle executed but did not publish anything under the registration key.
    #[error("loaded {url} but it did not publish `{key}`")]
    MissingExport {
        /// The bundle URL.
        url: String,

        /// The registration key that was expected.
        key: String,
    },

    /// The value published under the registration key has the wrong shape.
    #[error("value published by {url} under `{key}` has an unexpected shape: {source}")]
    InvalidExport {
        /// The bundle URL.
        url: String,

        /// The registration key.
        key: String,

        /// The underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },

    /// A shared load failed; every caller joined on that load receives this error.
    #[error("loading {url} failed: {source}")]
    LoadFailed {
        /// The module URL.
        url: String,

        /// The error produced by the shared load.
        #[source]
        source: Arc<ExtmodError>,
    },

    /// An error that occurred when a join handle returned an error.
    #[error("join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),

    /// An error that occurred when parsing a configuration file.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// An error that occurred when an invalid global binding was supplied.
    #[error("invalid global binding: {0}")]
    InvalidGlobal(String),
}

/// An error that can represent any error.
#[derive(Debug)]
pub struct AnyError {
    error: anyhow::Error,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ExtmodError {
    /// Creates a new `Err` result.
    pub fn custom(error: impl Into<anyhow::Error>) -> ExtmodError {
        ExtmodError::Custom(AnyError {
            error: error.into(),
        })
    }

    /// Returns the innermost error, looking through shared load failures.
    pub fn root(&self) -> &ExtmodError {
        match self {
            ExtmodError::LoadFailed { source, .. } => source.root(),
            error => error,
        }
    }
}

impl AnyError {
    /// Downcasts the error to a `T`.
    pub fn downcast<T>(&self) -> Option<&T>
    where
        T: Display + fmt::Debug + Send + Sync + 'static,
    {
        self.error.downcast_ref::<T>()
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Creates an `Ok` `ExtmodResult`.
#[allow(non_snake_case)]
pub fn Ok<T>(value: T) -> ExtmodResult<T> {
    Result::Ok(value)
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl PartialEq for AnyError {
    fn eq(&self, other: &Self) -> bool {
        self.error.to_string() == other.error.to_string()
    }
}

impl Display for AnyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl Error for AnyError {}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
