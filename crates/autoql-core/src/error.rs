use thiserror::Error;

/// Core error types for class registration and type lookup.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid type path: {0}")]
    InvalidTypePath(String),

    #[error("Unknown class: {0}")]
    UnknownClass(String),

    #[error("Class already registered: {0}")]
    DuplicateClass(String),

    #[error("Invalid class definition for {class}: {message}")]
    InvalidClass { class: String, message: String },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a new InvalidTypePath error
    pub fn invalid_type_path(path: impl Into<String>) -> Self {
        Self::InvalidTypePath(path.into())
    }

    /// Create a new UnknownClass error
    pub fn unknown_class(path: impl Into<String>) -> Self {
        Self::UnknownClass(path.into())
    }

    /// Create a new InvalidClass error
    pub fn invalid_class(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidClass {
            class: class.into(),
            message: message.into(),
        }
    }

    /// Check if this error was caused by the registration input rather than by serialization
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTypePath(_)
                | Self::UnknownClass(_)
                | Self::DuplicateClass(_)
                | Self::InvalidClass { .. }
        )
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
