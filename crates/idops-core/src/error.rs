//! Error types for the idops libraries
//!
//! Error definitions with transient/permanent classification. Directory and
//! table-sync operations surface separate enums because their callers recover
//! differently: a failed bind is retried by the session constructor, while a
//! tripped sync cap rolls the destination back and stops the run.

use thiserror::Error;

/// Error that can occur during directory operations.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The session could not be bound after exhausting all attempts.
    #[error("bind failed: {message}")]
    BindFailed { message: String },

    /// A search operation failed.
    #[error("search failed: {message}")]
    SearchFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An add operation failed.
    #[error("create failed: {message}")]
    CreateFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A modify or modrdn operation failed.
    #[error("modify failed: {message}")]
    ModifyFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A delete operation failed.
    #[error("delete failed: {message}")]
    DeleteFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A move (modrdn with new superior) failed.
    #[error("move failed: {message}")]
    MoveFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The named entry does not exist in the directory.
    #[error("not found: {identifier}")]
    NotFound { identifier: String },

    /// A required argument was absent or malformed.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The credential provider could not supply a secret.
    #[error("credential lookup failed: {message}")]
    Credential { message: String },

    /// An attribute value could not be decoded.
    #[error("decode failed: {message}")]
    Decode { message: String },

    /// Underlying protocol/transport error passed through.
    #[error("protocol error: {message}")]
    Protocol {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl DirectoryError {
    /// Check if this error is transient and the operation may be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DirectoryError::BindFailed { .. } | DirectoryError::Protocol { .. }
        )
    }

    /// Check if this error is permanent and retry won't help.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            DirectoryError::BindFailed { .. } => "BIND_FAILED",
            DirectoryError::SearchFailed { .. } => "SEARCH_FAILED",
            DirectoryError::CreateFailed { .. } => "CREATE_FAILED",
            DirectoryError::ModifyFailed { .. } => "MODIFY_FAILED",
            DirectoryError::DeleteFailed { .. } => "DELETE_FAILED",
            DirectoryError::MoveFailed { .. } => "MOVE_FAILED",
            DirectoryError::NotFound { .. } => "NOT_FOUND",
            DirectoryError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            DirectoryError::Credential { .. } => "CREDENTIAL",
            DirectoryError::Decode { .. } => "DECODE",
            DirectoryError::Protocol { .. } => "PROTOCOL",
        }
    }

    // Convenience constructors

    /// Create a search failure without an underlying source.
    pub fn search_failed(message: impl Into<String>) -> Self {
        DirectoryError::SearchFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a search failure wrapping a transport error.
    pub fn search_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DirectoryError::SearchFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a modify failure without an underlying source.
    pub fn modify_failed(message: impl Into<String>) -> Self {
        DirectoryError::ModifyFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a modify failure wrapping a transport error.
    pub fn modify_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DirectoryError::ModifyFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a protocol error without an underlying source.
    pub fn protocol(message: impl Into<String>) -> Self {
        DirectoryError::Protocol {
            message: message.into(),
            source: None,
        }
    }

    /// Create a protocol error wrapping a transport error.
    pub fn protocol_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DirectoryError::Protocol {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        DirectoryError::InvalidArgument {
            message: message.into(),
        }
    }
}

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Error that can occur during table synchronization.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A probed column has a driver type the engine cannot compare.
    #[error("unsupported column type: {column} ({type_name})")]
    Unsupported { column: String, type_name: String },

    /// A required argument was absent or malformed.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Source and destination projections disagree.
    #[error("schema mismatch:\n{diff}")]
    SchemaMismatch { diff: String },

    /// The configured insert cap was reached without `force`.
    #[error("insert cap reached ({limit})")]
    MaxInsertsReached { limit: u32 },

    /// The configured delete cap was reached without `force`.
    #[error("delete cap reached ({limit})")]
    MaxDeletesReached { limit: u32 },

    /// Underlying database driver error passed through.
    #[error("driver error: {message}")]
    Driver {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl SyncError {
    /// Check if this error is transient and the run may be retried as-is.
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Driver { .. })
    }

    /// Check if this error is permanent and retry won't help.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            SyncError::Unsupported { .. } => "UNSUPPORTED_TYPE",
            SyncError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            SyncError::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
            SyncError::MaxInsertsReached { .. } => "MAX_INSERTS",
            SyncError::MaxDeletesReached { .. } => "MAX_DELETES",
            SyncError::Driver { .. } => "DRIVER",
        }
    }

    // Convenience constructors

    /// Create a driver error without an underlying source.
    pub fn driver(message: impl Into<String>) -> Self {
        SyncError::Driver {
            message: message.into(),
            source: None,
        }
    }

    /// Create a driver error wrapping an underlying error.
    pub fn driver_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        SyncError::Driver {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        SyncError::InvalidArgument {
            message: message.into(),
        }
    }
}

/// Result type for table-sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_error_codes() {
        assert_eq!(
            DirectoryError::BindFailed {
                message: "x".to_string()
            }
            .error_code(),
            "BIND_FAILED"
        );
        assert_eq!(
            DirectoryError::search_failed("x").error_code(),
            "SEARCH_FAILED"
        );
        assert_eq!(
            DirectoryError::invalid_argument("x").error_code(),
            "INVALID_ARGUMENT"
        );
    }

    #[test]
    fn test_directory_transient_classification() {
        assert!(DirectoryError::protocol("lost").is_transient());
        assert!(DirectoryError::BindFailed {
            message: "x".to_string()
        }
        .is_transient());
        assert!(DirectoryError::NotFound {
            identifier: "jdoe".to_string()
        }
        .is_permanent());
        assert!(DirectoryError::invalid_argument("x").is_permanent());
    }

    #[test]
    fn test_directory_error_display() {
        let err = DirectoryError::NotFound {
            identifier: "jdoe".to_string(),
        };
        assert_eq!(err.to_string(), "not found: jdoe");

        let err = DirectoryError::BindFailed {
            message: "invalid credentials".to_string(),
        };
        assert_eq!(err.to_string(), "bind failed: invalid credentials");
    }

    #[test]
    fn test_sync_error_codes() {
        assert_eq!(
            SyncError::MaxInsertsReached { limit: 10 }.error_code(),
            "MAX_INSERTS"
        );
        assert_eq!(
            SyncError::Unsupported {
                column: "c".to_string(),
                type_name: "RAW".to_string()
            }
            .error_code(),
            "UNSUPPORTED_TYPE"
        );
    }

    #[test]
    fn test_sync_error_display() {
        let err = SyncError::MaxDeletesReached { limit: 5 };
        assert_eq!(err.to_string(), "delete cap reached (5)");

        let err = SyncError::Unsupported {
            column: "payload".to_string(),
            type_name: "BFILE".to_string(),
        };
        assert_eq!(err.to_string(), "unsupported column type: payload (BFILE)");
    }

    #[test]
    fn test_error_with_source() {
        let source = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = DirectoryError::protocol_with_source("transport down", source);
        if let DirectoryError::Protocol { source, .. } = &err {
            assert!(source.is_some());
        } else {
            panic!("expected Protocol variant");
        }
    }
}
