//! Upstream metadata source contract.
//!
//! [`MetadataSource`] is the seam between the resolver and whatever third
//! party actually knows about books. Implementations report failures through
//! [`SourceError`], whose kind decides how the resolver reacts:
//!
//! | Kind | Breaker | Cached | Resolver reaction |
//! |------|---------|--------|-------------------|
//! | [`NotFound`](SourceErrorKind::NotFound) | success | yes | fallback record |
//! | [`InvalidRequest`](SourceErrorKind::InvalidRequest) | success | no | fallback record |
//! | [`Unavailable`](SourceErrorKind::Unavailable) | failure | no | fallback record |
//! | [`RateLimited`](SourceErrorKind::RateLimited) | failure | no | fallback record |
//! | [`Timeout`](SourceErrorKind::Timeout) | failure | no | fallback record |
//! | [`Internal`](SourceErrorKind::Internal) | failure | no | fallback record |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::{BookRecord, Isbn, ValidationError};

/// Upstream error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    NotFound,
    Unavailable,
    RateLimited,
    Timeout,
    InvalidRequest,
    Internal,
}

/// Structured upstream error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn not_found(isbn: &Isbn) -> Self {
        Self {
            kind: SourceErrorKind::NotFound,
            message: format!("no book found for isbn '{isbn}'"),
            retryable: false,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn timeout(after: Duration) -> Self {
        Self {
            kind: SourceErrorKind::Timeout,
            message: format!("upstream call timed out after {}ms", after.as_millis()),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    /// Marks the error as final so retry loops stop on it.
    pub fn non_retryable(mut self) -> Self {
        self.retryable = false;
        self
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    /// Whether this error should count against upstream health.
    ///
    /// Confirmed absences and rejected requests prove the upstream answered.
    pub const fn is_upstream_failure(&self) -> bool {
        !matches!(
            self.kind,
            SourceErrorKind::NotFound | SourceErrorKind::InvalidRequest
        )
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::Timeout => "source.timeout",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Request payload for title search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleSearchRequest {
    pub title: String,
    pub limit: usize,
}

impl TitleSearchRequest {
    pub fn new(title: impl Into<String>, limit: usize) -> Result<Self, ValidationError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ValidationError::EmptySearchTitle);
        }
        if limit == 0 {
            return Err(ValidationError::InvalidSearchLimit);
        }
        Ok(Self {
            title: title.trim().to_owned(),
            limit,
        })
    }
}

pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Upstream metadata contract.
///
/// | Method | Description |
/// |--------|-------------|
/// | [`name`](MetadataSource::name) | Identifier used in logs |
/// | [`fetch_by_isbn`](MetadataSource::fetch_by_isbn) | Resolve one normalized ISBN |
/// | [`search_by_title`](MetadataSource::search_by_title) | Title search |
/// | [`probe`](MetadataSource::probe) | Lightweight liveness check |
///
/// Implementations must be `Send + Sync`; the resolver shares one instance
/// across all in-flight lookups and applies its own timeout around each call.
pub trait MetadataSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetches metadata for an already validated ISBN.
    ///
    /// # Errors
    ///
    /// Returns [`SourceErrorKind::NotFound`] when upstream confirms the ISBN
    /// is unknown, and a transport kind for anything else.
    fn fetch_by_isbn<'a>(&'a self, isbn: &'a Isbn) -> SourceFuture<'a, BookRecord>;

    fn search_by_title<'a>(&'a self, req: TitleSearchRequest) -> SourceFuture<'a, Vec<BookRecord>>;

    fn probe<'a>(&'a self) -> SourceFuture<'a, ()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_not_an_upstream_failure() {
        let isbn = Isbn::parse("9780306406157").expect("valid isbn");
        assert!(!SourceError::not_found(&isbn).is_upstream_failure());
        assert!(SourceError::unavailable("down").is_upstream_failure());
        assert!(SourceError::timeout(Duration::from_secs(1)).is_upstream_failure());
    }

    #[test]
    fn display_includes_code() {
        let error = SourceError::rate_limited("slow down");
        assert_eq!(error.to_string(), "slow down (source.rate_limited)");
    }

    #[test]
    fn search_request_rejects_blank_title_and_zero_limit() {
        assert_eq!(
            TitleSearchRequest::new("   ", 5),
            Err(ValidationError::EmptySearchTitle)
        );
        assert_eq!(
            TitleSearchRequest::new("Dune", 0),
            Err(ValidationError::InvalidSearchLimit)
        );
        assert_eq!(
            TitleSearchRequest::new(" Dune ", 3).map(|req| req.title),
            Ok(String::from("Dune"))
        );
    }
}
