//! # Error Types
//!
//! Domain errors for the batch caption driver, split along the failure
//! taxonomy the driver exposes to its supervisor:
//!
//! - **Fatal**: configuration and argument errors. The process must exit
//!   non-zero before any request is sent to the inference server.
//! - **Recoverable**: a per-image generation failure. The task is skipped
//!   (its image copy is kept, no text file is written) and the run
//!   continues.
//! - **Transient**: readiness-probe connectivity failures. These are
//!   retried by the wait policy and only surface when the policy gives up.

use std::{error::Error as StdError, fmt, io, path::PathBuf};

/// Result type alias using the driver's error type.
pub type CaptionResult<T> = Result<T, CaptionError>;

/// Errors produced by the batch caption driver.
#[derive(Debug)]
pub enum CaptionError {
    /// The configuration file is missing, unreadable, or malformed.
    Config { path: PathBuf, reason: String },
    /// The mode argument is not one of the recognized spellings.
    InvalidMode { value: String },
    /// A filesystem operation failed.
    Io {
        operation: &'static str,
        path: PathBuf,
        source: io::Error,
    },
    /// An HTTP request could not be sent or its response could not be read.
    Http {
        operation: &'static str,
        source: reqwest::Error,
    },
    /// The completions endpoint answered with a non-success status.
    Generation { status: u16, body: String },
    /// The completions response did not contain a choice.
    EmptyResponse,
    /// The wait policy gave up before the server reported ready.
    NotReady { attempts: u64 },
    /// The progress protocol or a status line could not be written.
    Output { source: io::Error },
}

impl CaptionError {
    /// Create a configuration error.
    pub fn config(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid-mode argument error.
    pub fn invalid_mode(value: impl Into<String>) -> Self {
        Self::InvalidMode {
            value: value.into(),
        }
    }

    /// Create an I/O error tagged with the operation that failed.
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Create an HTTP transport error.
    pub fn http(operation: &'static str, source: reqwest::Error) -> Self {
        Self::Http { operation, source }
    }

    /// True for errors that must abort the run before any request is sent.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::InvalidMode { .. } | Self::Io { .. } | Self::Output { .. }
        )
    }

    /// True for per-image failures the driver skips and continues past.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Generation { .. } | Self::Http { .. } | Self::EmptyResponse
        )
    }
}

impl fmt::Display for CaptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { path, reason } => {
                write!(f, "configuration error in '{}': {}", path.display(), reason)
            }
            Self::InvalidMode { value } => {
                write!(
                    f,
                    "invalid generation mode '{value}': expected 'captions' or 'tags'"
                )
            }
            Self::Io {
                operation,
                path,
                source,
            } => {
                write!(
                    f,
                    "I/O error during {} on '{}': {}",
                    operation,
                    path.display(),
                    source
                )
            }
            Self::Http { operation, source } => {
                write!(f, "HTTP error during {operation}: {source}")
            }
            Self::Generation { status, body } => {
                write!(f, "generation request failed with status {status}: {body}")
            }
            Self::EmptyResponse => {
                write!(f, "completions response contained no choices")
            }
            Self::NotReady { attempts } => {
                write!(f, "inference server not ready after {attempts} probes")
            }
            Self::Output { source } => {
                write!(f, "failed to write progress output: {source}")
            }
        }
    }
}

impl StdError for CaptionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Http { source, .. } => Some(source),
            Self::Output { source } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for CaptionError {
    fn from(source: io::Error) -> Self {
        Self::Output { source }
    }
}
