//! Outcome types returned by the resolver.
//!
//! Every layer (cache, breaker rejection, upstream, fallback, local
//! validation) reports through [`LookupResult`], so callers map a single
//! shape onto their transport responses.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::time::Duration;

use serde::Serialize;

use crate::cache::CacheStats;
use crate::circuit_breaker::CircuitState;
use crate::BookRecord;

/// Where a lookup outcome came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupSource {
    Cache,
    Api,
    Fallback,
    /// Answered without reaching upstream: invalid input, or an open circuit
    /// while fallback is disabled.
    Local,
}

impl LookupSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Api => "api",
            Self::Fallback => "fallback",
            Self::Local => "local",
        }
    }
}

impl Display for LookupSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single ISBN lookup.
///
/// `success()` is true exactly when `book()` is present; the constructors are
/// the only way to build a value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupResult {
    success: bool,
    isbn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    book: Option<BookRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    source: LookupSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_time_ms: Option<u64>,
}

impl LookupResult {
    pub fn found(isbn: impl Into<String>, book: BookRecord, source: LookupSource) -> Self {
        Self {
            success: true,
            isbn: isbn.into(),
            book: Some(book),
            error: None,
            source,
            response_time_ms: None,
        }
    }

    pub fn failure(
        isbn: impl Into<String>,
        error: impl Into<String>,
        source: LookupSource,
    ) -> Self {
        Self {
            success: false,
            isbn: isbn.into(),
            book: None,
            error: Some(error.into()),
            source,
            response_time_ms: None,
        }
    }

    pub fn with_source(mut self, source: LookupSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_response_time(mut self, elapsed: Duration) -> Self {
        self.response_time_ms = Some(duration_ms(elapsed));
        self
    }

    pub const fn success(&self) -> bool {
        self.success
    }

    pub fn isbn(&self) -> &str {
        &self.isbn
    }

    pub fn book(&self) -> Option<&BookRecord> {
        self.book.as_ref()
    }

    pub fn into_book(self) -> Option<BookRecord> {
        self.book
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub const fn source(&self) -> LookupSource {
        self.source
    }

    pub const fn response_time_ms(&self) -> Option<u64> {
        self.response_time_ms
    }
}

/// Aggregate counts for a batch lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Distinct ISBNs resolved (duplicates in the request count once).
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub cached: usize,
    pub api_calls: usize,
}

impl BatchSummary {
    pub(crate) fn record(&mut self, result: &LookupResult) {
        self.total += 1;
        match result.source() {
            LookupSource::Cache => self.cached += 1,
            LookupSource::Api => self.api_calls += 1,
            LookupSource::Fallback | LookupSource::Local => {}
        }
        if result.success() {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Outcome of a batch lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchResult {
    /// One entry per distinct requested ISBN, keyed by the requested string.
    pub results: BTreeMap<String, LookupResult>,
    pub summary: BatchSummary,
    pub errors: Vec<String>,
}

/// Outcome of an uncached title search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleSearchResult {
    pub success: bool,
    pub books: Vec<BookRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
}

impl TitleSearchResult {
    pub(crate) fn found(books: Vec<BookRecord>, elapsed: Duration) -> Self {
        Self {
            success: true,
            books,
            error: None,
            response_time_ms: Some(duration_ms(elapsed)),
        }
    }

    pub(crate) fn failure(error: impl Into<String>, elapsed: Option<Duration>) -> Self {
        Self {
            success: false,
            books: Vec::new(),
            error: Some(error.into()),
            response_time_ms: elapsed.map(duration_ms),
        }
    }
}

/// Operational view of the upstream and the resolver's local state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceHealth {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub circuit_state: CircuitState,
    pub cache: CacheStats,
}

pub(crate) fn duration_ms(elapsed: Duration) -> u64 {
    elapsed.as_millis().min(u128::from(u64::MAX)) as u64
}
