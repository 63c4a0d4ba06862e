use std::fmt;
use thiserror::Error;

/// Entity kinds a shop can reference or that a lookup can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum EntityKind {
    Shop,
    Seller,
    Category,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Shop => "shop",
            EntityKind::Seller => "seller",
            EntityKind::Category => "category",
        };
        f.write_str(name)
    }
}

/// Reasons a new shop is refused before it is persisted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{entity} {id} does not exist")]
    ReferenceNotFound { entity: EntityKind, id: i64 },

    #[error("{entity} {id} is disabled")]
    EntityDisabled { entity: EntityKind, id: i64 },
}

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid argument `{field}`: {reason}")]
    InvalidArgument { field: String, reason: String },

    #[error("Search index unavailable: {message}")]
    SearchUnavailable { message: String },

    #[error("Deadline exceeded during {operation}")]
    DeadlineExceeded { operation: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Upstream,
    Storage,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// Process exit code used by the CLI.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Medium => 2, // 可重試
            ErrorSeverity::High => 1,   // 請求錯誤
            ErrorSeverity::Critical => 3,
        }
    }
}

impl ShopError {
    pub fn invalid_argument(field: &str, reason: impl Into<String>) -> Self {
        ShopError::InvalidArgument {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn search_unavailable(message: impl Into<String>) -> Self {
        ShopError::SearchUnavailable {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ShopError::Validation(_) | ShopError::InvalidArgument { .. } => ErrorCategory::Input,
            ShopError::SearchUnavailable { .. } | ShopError::DeadlineExceeded { .. } => {
                ErrorCategory::Upstream
            }
            ShopError::Database(_)
            | ShopError::Storage { .. }
            | ShopError::Serialization(_)
            | ShopError::Io(_) => ErrorCategory::Storage,
            ShopError::Config { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::High,
            ErrorCategory::Upstream => ErrorSeverity::Medium,
            ErrorCategory::Storage | ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ShopError::Validation(ValidationError::ReferenceNotFound { entity, id }) => {
                format!("The referenced {} ({}) could not be found", entity, id)
            }
            ShopError::Validation(ValidationError::EntityDisabled { entity, id }) => {
                format!("The referenced {} ({}) has been disabled", entity, id)
            }
            ShopError::InvalidArgument { field, reason } => {
                format!("Invalid value for {}: {}", field, reason)
            }
            ShopError::SearchUnavailable { .. } => "Search is temporarily unavailable".to_string(),
            ShopError::DeadlineExceeded { .. } => "The request took too long".to_string(),
            ShopError::Config { message } => format!("Configuration problem: {}", message),
            _ => "An internal storage error occurred".to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => "Check the request parameters and referenced ids",
            ErrorCategory::Upstream => "Retry later or check the search cluster health",
            ErrorCategory::Storage => "Check the database connection and schema",
            ErrorCategory::Configuration => "Fix the configuration file and restart",
        }
    }
}

pub type Result<T> = std::result::Result<T, ShopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ShopError::from(ValidationError::ReferenceNotFound {
            entity: EntityKind::Seller,
            id: 4,
        });
        assert_eq!(err.to_string(), "Validation failed: seller 4 does not exist");
        assert_eq!(err.category(), ErrorCategory::Input);
    }

    #[test]
    fn test_severity_ordering() {
        let upstream = ShopError::search_unavailable("timeout");
        let storage = ShopError::Storage {
            message: "gone".to_string(),
        };
        assert!(upstream.severity() < storage.severity());
    }

    #[test]
    fn test_every_failure_exits_non_zero() {
        let errors = [
            ShopError::invalid_argument("name", "empty"),
            ShopError::search_unavailable("down"),
            ShopError::DeadlineExceeded {
                operation: "store.shops".to_string(),
            },
            ShopError::Storage {
                message: "gone".to_string(),
            },
            ShopError::Config {
                message: "bad".to_string(),
            },
        ];
        let codes: Vec<i32> = errors.iter().map(|e| e.severity().exit_code()).collect();
        assert_eq!(codes, vec![1, 2, 2, 3, 3]);
    }
}
