//! Status codes returned by the registry API and the raw error type

/// Win32 status codes the registry calls report
pub mod code {
    pub const ERROR_SUCCESS: u32 = 0;
    pub const ERROR_FILE_NOT_FOUND: u32 = 2;
    pub const ERROR_PATH_NOT_FOUND: u32 = 3;
    pub const ERROR_ACCESS_DENIED: u32 = 5;
    pub const ERROR_INVALID_HANDLE: u32 = 6;
    pub const ERROR_INVALID_PARAMETER: u32 = 87;
    pub const ERROR_MORE_DATA: u32 = 234;
    pub const ERROR_NO_MORE_ITEMS: u32 = 259;
}

pub type Result<T> = std::result::Result<T, RawError>;

/// Errors that can occur during raw registry calls
#[derive(Debug, thiserror::Error)]
pub enum RawError {
    #[error("{op} failed with status {code} ({})", describe(.code))]
    Status { op: &'static str, code: u32 },

    #[error("{op} needs a larger buffer")]
    MoreData {
        op: &'static str,
        required: Option<usize>,
    },

    #[error("{op} needs a buffer larger than the {limit} element limit")]
    BufferLimit { op: &'static str, limit: usize },

    #[error("Name contains an interior NUL: {0:?}")]
    InvalidName(String),

    #[error("The Windows registry is not available on this platform")]
    Unsupported,
}

impl RawError {
    /// Map a non-zero status from `op` to an error.
    ///
    /// `required` is the size the platform reported when it asked for more
    /// data, if it reported one.
    pub fn from_status(op: &'static str, code: u32, required: Option<usize>) -> Self {
        if code == code::ERROR_MORE_DATA {
            RawError::MoreData { op, required }
        } else {
            RawError::Status { op, code }
        }
    }

    pub fn code(&self) -> Option<u32> {
        match self {
            RawError::Status { code, .. } => Some(*code),
            RawError::MoreData { .. } => Some(code::ERROR_MORE_DATA),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self.code(),
            Some(code::ERROR_FILE_NOT_FOUND | code::ERROR_PATH_NOT_FOUND)
        )
    }

    pub fn is_access_denied(&self) -> bool {
        self.code() == Some(code::ERROR_ACCESS_DENIED)
    }

    pub fn is_no_more_items(&self) -> bool {
        self.code() == Some(code::ERROR_NO_MORE_ITEMS)
    }
}

/// Turn a status code into a zero-or-error result.
pub fn check(op: &'static str, code: u32) -> Result<()> {
    if code == code::ERROR_SUCCESS {
        Ok(())
    } else {
        Err(RawError::from_status(op, code, None))
    }
}

fn describe(code: &u32) -> &'static str {
    match *code {
        code::ERROR_SUCCESS => "success",
        code::ERROR_FILE_NOT_FOUND => "file not found",
        code::ERROR_PATH_NOT_FOUND => "path not found",
        code::ERROR_ACCESS_DENIED => "access denied",
        code::ERROR_INVALID_HANDLE => "invalid handle",
        code::ERROR_INVALID_PARAMETER => "invalid parameter",
        code::ERROR_MORE_DATA => "more data is available",
        code::ERROR_NO_MORE_ITEMS => "no more items",
        _ => "unrecognized status",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_error_display() {
        let err = RawError::Status {
            op: "RegOpenKeyExW",
            code: code::ERROR_ACCESS_DENIED,
        };
        assert_eq!(
            err.to_string(),
            "RegOpenKeyExW failed with status 5 (access denied)"
        );
        assert!(err.is_access_denied());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_from_status() {
        let err = RawError::from_status("RegQueryValueExW", code::ERROR_MORE_DATA, Some(4096));
        assert!(matches!(
            err,
            RawError::MoreData {
                required: Some(4096),
                ..
            }
        ));

        let err = RawError::from_status("RegQueryValueExW", code::ERROR_PATH_NOT_FOUND, None);
        assert!(err.is_not_found());

        assert!(check("RegCloseKey", code::ERROR_SUCCESS).is_ok());
        assert!(check("RegEnumKeyExW", code::ERROR_NO_MORE_ITEMS)
            .unwrap_err()
            .is_no_more_items());
    }

    #[test]
    fn test_unsupported_has_no_code() {
        assert_eq!(RawError::Unsupported.code(), None);
        assert_eq!(RawError::InvalidName("a\0b".into()).code(), None);
    }
}
