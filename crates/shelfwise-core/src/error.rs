use thiserror::Error;

/// Validation errors for caller-supplied input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("isbn cannot be empty")]
    EmptyIsbn,
    #[error("isbn must have 10 or 13 digits, got {len}")]
    InvalidIsbnLength { len: usize },
    #[error("isbn contains invalid character '{ch}' at index {index}")]
    InvalidIsbnCharacter { ch: char, index: usize },
    #[error("isbn checksum mismatch: expected '{expected}', found '{found}'")]
    InvalidIsbnChecksum { expected: char, found: char },

    #[error("search title cannot be empty")]
    EmptySearchTitle,
    #[error("search limit must be greater than zero")]
    InvalidSearchLimit,
}

/// Invalid resolver configuration values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {key} has invalid value '{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("{field} must be greater than zero")]
    MustBePositive { field: &'static str },
}

/// Error returned while assembling a resolver.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}
