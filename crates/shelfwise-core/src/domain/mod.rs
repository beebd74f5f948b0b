//! # Domain Models
//!
//! Canonical domain types for shelfwise book metadata.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Isbn`] | Checksum-verified, normalized ISBN-10/ISBN-13 |
//! | [`BookRecord`] | Resolved book metadata |
//! | [`AuthorRef`] | Author reference (name, surname, full name) |
//! | [`CategoryRef`] | Category reference with its classification type |
//! | [`Dimensions`] | Physical dimensions reported upstream |
//!
//! ## Validation
//!
//! ```rust
//! use shelfwise_core::{Isbn, ValidationError};
//!
//! let isbn = Isbn::parse("978-0-306-40615-7").unwrap();
//! assert_eq!(isbn.as_str(), "9780306406157");
//!
//! let invalid = Isbn::parse("9780306406158");
//! assert!(matches!(invalid, Err(ValidationError::InvalidIsbnChecksum { .. })));
//! ```

mod book;
mod isbn;

pub use book::{AuthorRef, BookRecord, CategoryRef, Dimensions, SUBJECT_CATEGORY};
pub use isbn::Isbn;
