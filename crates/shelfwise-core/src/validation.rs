//! ISBN validation seam.
//!
//! The resolver never parses identifiers itself; it asks an [`IsbnValidator`]
//! for an accept/reject outcome and the normalized [`Isbn`].

use crate::{Isbn, ValidationError};

/// Accepts or rejects raw ISBN input, producing the normalized identifier.
pub trait IsbnValidator: Send + Sync {
    fn validate(&self, raw: &str) -> Result<Isbn, ValidationError>;
}

/// Default validator: format and checksum verification via [`Isbn::parse`].
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardIsbnValidator;

impl IsbnValidator for StandardIsbnValidator {
    fn validate(&self, raw: &str) -> Result<Isbn, ValidationError> {
        Isbn::parse(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_validator_normalizes() {
        let isbn = StandardIsbnValidator
            .validate("0 306 40615 2")
            .expect("valid isbn10");
        assert_eq!(isbn.as_str(), "0306406152");
    }

    #[test]
    fn standard_validator_rejects_garbage() {
        let err = StandardIsbnValidator.validate("abc").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidIsbnCharacter { .. }));
    }
}
