/*!
 * Error types for the hfspaces-translate engine.
 *
 * Transport problems are reported as `ProviderError`, the engine's own
 * taxonomy is `TranslationError`, and everything that leaves the `fetch`
 * boundary is flattened into a `TranslationFailure` carrying the
 * message/status pair the host error channel expects.
 */

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when working with the remote backends
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

/// Errors that can occur during a batch translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The selected model needs a key that is not configured
    #[error("No {credential} provided for model {model}")]
    MissingCredential {
        /// Model identifier that was requested
        model: String,
        /// Name of the missing option (`api_key` or `spaces_key`)
        credential: &'static str,
    },

    /// The model is in neither registry
    #[error("Invalid model: {0}")]
    UnknownModel(String),

    /// Connect or send was rejected by the backend
    #[error("Transport failure: {0}")]
    Transport(#[from] ProviderError),

    /// The Space connection attempt failed earlier; there is no client to send to
    #[error("No client for space {space}: {reason}")]
    NoClient {
        /// Space address
        space: String,
        /// Why the connection failed
        reason: String,
    },

    /// The reply could not be mapped back onto the request
    #[error("Parse mismatch: recovered {actual} of {expected} items")]
    ParseMismatch {
        /// Number of texts in the request
        expected: usize,
        /// Number of items recovered from the reply
        actual: usize,
        /// The raw reply, kept for diagnostics
        payload: String,
    },

    /// Connect or send exceeded its deadline
    #[error("Timed out while {stage} after {after:?}")]
    Timeout {
        /// "connecting" or "waiting for a reply"
        stage: &'static str,
        /// Deadline that was exceeded
        after: Duration,
    },
}

/// Kind of a failure surfaced to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    MissingCredential,
    TransportFailure,
    ParseMismatch,
    UnknownModel,
    Timeout,
}

impl FailureKind {
    /// Status tag forwarded to the host error UI
    pub fn status(self) -> u16 {
        match self {
            Self::MissingCredential => 400,
            Self::ParseMismatch => 200,
            Self::TransportFailure => 529,
            Self::UnknownModel => 404,
            Self::Timeout => 504,
        }
    }

    /// Whether the host should stop retrying this engine instance
    pub fn aborts_engine(self) -> bool {
        matches!(self, Self::MissingCredential)
    }
}

/// Failure object handed to the host: a kind, a user-facing message and a status tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationFailure {
    pub kind: FailureKind,
    pub message: String,
    pub status: u16,
}

impl TranslationFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: kind.status(),
        }
    }
}

impl fmt::Display for TranslationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (status {})", self.message, self.status)
    }
}

impl std::error::Error for TranslationFailure {}

impl From<TranslationError> for TranslationFailure {
    fn from(error: TranslationError) -> Self {
        match error {
            TranslationError::MissingCredential { .. } => {
                Self::new(FailureKind::MissingCredential, error.to_string())
            }
            TranslationError::UnknownModel(_) => {
                Self::new(FailureKind::UnknownModel, error.to_string())
            }
            // Transport details stay in the logs
            TranslationError::Transport(_) | TranslationError::NoClient { .. } => {
                Self::new(FailureKind::TransportFailure, "Error while fetching.")
            }
            TranslationError::ParseMismatch { expected, actual, payload } => {
                let message = if actual == 0 {
                    format!("Failed to parse: {}", payload)
                } else {
                    format!(
                        "Unexpected error: length {} out of {}.\n\n{}",
                        actual, expected, payload
                    )
                };
                Self::new(FailureKind::ParseMismatch, message)
            }
            TranslationError::Timeout { .. } => Self::new(FailureKind::Timeout, error.to_string()),
        }
    }
}

/// Main application error type used by the command line front end
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a translation call
    #[error("Translation failed: {0}")]
    Translation(#[from] TranslationFailure),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
