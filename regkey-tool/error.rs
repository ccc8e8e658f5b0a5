use regkey_raw::{RawError, ValueTag};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegError {
    #[error("Cannot access registry key {path}: {source}")]
    Access { path: String, source: RawError },

    #[error("Registry value not found: {name}")]
    NotFound { name: String },

    #[error("Registry value {name} is {found}, expected {expected}")]
    TypeMismatch {
        name: String,
        expected: ValueTag,
        found: ValueTag,
    },

    #[error("Registry value {name} out of range: {reason}")]
    ValueRange { name: String, reason: String },

    #[error("Registry operation failed: {0}")]
    Platform(#[from] RawError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RegError {
    /// Classify a failure to open `path`: denied or missing paths are `Access`.
    pub(crate) fn access(path: &str, err: RawError) -> Self {
        if err.is_access_denied() || err.is_not_found() {
            RegError::Access {
                path: path.to_string(),
                source: err,
            }
        } else {
            RegError::Platform(err)
        }
    }

    /// Classify a failure to write through the key at `path`.
    ///
    /// Only a refused write is `Access`; every other status is `Platform`.
    pub(crate) fn write(path: &str, err: RawError) -> Self {
        if err.is_access_denied() {
            RegError::Access {
                path: path.to_string(),
                source: err,
            }
        } else {
            RegError::Platform(err)
        }
    }

    /// Classify a failure to read the value `name`.
    pub(crate) fn value(name: &str, err: RawError) -> Self {
        if err.is_not_found() {
            RegError::NotFound {
                name: name.to_string(),
            }
        } else {
            RegError::Platform(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, RegError>;
