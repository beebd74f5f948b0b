//! Resolution orchestrator.
//!
//! [`BookResolver`] composes the cache, circuit breaker, upstream source and
//! fallback table. A single lookup walks the layers in order and stops at the
//! first one that can answer:
//!
//! | Step | Layer | Outcome source |
//! |------|-------|----------------|
//! | 1 | [`IsbnValidator`] rejects input | `local` |
//! | 2 | [`LookupCache`] holds a found record | `cache` |
//! | 3 | [`CircuitBreaker`] admits the call, [`MetadataSource`] finds the book | `api` |
//! | 4 | anything else | `fallback` (or a failure when fallback is disabled: `api` after an upstream call, `local` when the breaker refused it) |
//!
//! Every public operation returns a plain value; upstream errors never escape.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::adapters::GoogleBooksAdapter;
use crate::cache::{CacheStats, LookupCache};
use crate::circuit_breaker::{CircuitBreaker, CircuitSnapshot, CircuitState};
use crate::config::ResolverConfig;
use crate::error::CoreError;
use crate::fallback::{FallbackProvider, FallbackSeed, FallbackStats};
use crate::lookup::{BatchResult, LookupResult, LookupSource, ServiceHealth, TitleSearchResult};
use crate::metadata_source::{
    MetadataSource, SourceError, SourceErrorKind, SourceFuture, TitleSearchRequest,
};
use crate::validation::{IsbnValidator, StandardIsbnValidator};
use crate::Isbn;

const BREAKER_OPEN: &str = "circuit breaker is open; upstream call skipped";

/// Effective resilience settings reported by [`BookResolver::get_resilience_stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResilienceSettings {
    pub failure_threshold: u32,
    pub cooldown_ms: u64,
    pub half_open_max_probes: u32,
    pub cache_max_size: usize,
    pub fallback_enabled: bool,
    pub upstream_timeout_ms: u64,
    pub batch_concurrency: usize,
}

impl From<&ResolverConfig> for ResilienceSettings {
    fn from(config: &ResolverConfig) -> Self {
        Self {
            failure_threshold: config.circuit_breaker.failure_threshold,
            cooldown_ms: crate::lookup::duration_ms(config.circuit_breaker.cooldown),
            half_open_max_probes: config.circuit_breaker.half_open_max_probes,
            cache_max_size: config.cache.max_size,
            fallback_enabled: config.fallback_enabled,
            upstream_timeout_ms: crate::lookup::duration_ms(config.upstream_timeout),
            batch_concurrency: config.batch_concurrency,
        }
    }
}

/// Read-only view over every resilience component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResilienceStats {
    pub circuit_breaker: CircuitSnapshot,
    pub fallback: FallbackStats,
    pub cache: CacheStats,
    pub config: ResilienceSettings,
}

/// Resilient ISBN resolver.
///
/// Cheap to share behind an [`Arc`]; every component guards its own state
/// and no lock is held while the upstream call is in flight.
pub struct BookResolver {
    source: Arc<dyn MetadataSource>,
    validator: Arc<dyn IsbnValidator>,
    cache: Arc<LookupCache>,
    breaker: Arc<CircuitBreaker>,
    fallback: Arc<FallbackProvider>,
    config: ResolverConfig,
}

impl std::fmt::Debug for BookResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookResolver")
            .field("source", &self.source.name())
            .field("cache", &self.cache)
            .field("breaker", &self.breaker)
            .field("fallback", &self.fallback)
            .field("config", &self.config)
            .finish()
    }
}

/// Builder wiring a [`BookResolver`] from injectable components.
///
/// Components that are not supplied are created from the configuration.
/// Without an explicit source the Google Books adapter is used, with its API
/// key read from the environment.
///
/// # Example
///
/// ```rust,ignore
/// use shelfwise_core::{BookResolverBuilder, ResolverConfig};
///
/// let resolver = BookResolverBuilder::new()
///     .with_config(ResolverConfig::from_env()?)
///     .build()?;
/// let result = resolver.lookup_book("978-0-14-143951-8").await;
/// ```
#[derive(Default)]
pub struct BookResolverBuilder {
    source: Option<Arc<dyn MetadataSource>>,
    validator: Option<Arc<dyn IsbnValidator>>,
    cache: Option<Arc<LookupCache>>,
    breaker: Option<Arc<CircuitBreaker>>,
    fallback: Option<Arc<FallbackProvider>>,
    config: ResolverConfig,
}

impl BookResolverBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: Arc<dyn MetadataSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Uses the Google Books adapter over reqwest, reading
    /// `SHELFWISE_GOOGLE_BOOKS_API_KEY` (or `GOOGLE_BOOKS_API_KEY`).
    pub fn with_google_books(self) -> Self {
        self.with_source(Arc::new(GoogleBooksAdapter::from_env()))
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn IsbnValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_cache(mut self, cache: Arc<LookupCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_circuit_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = Some(breaker);
        self
    }

    pub fn with_fallback(mut self, fallback: Arc<FallbackProvider>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Validates the configuration and assembles the resolver.
    pub fn build(self) -> Result<BookResolver, CoreError> {
        self.config.validate()?;

        let validator = self
            .validator
            .unwrap_or_else(|| Arc::new(StandardIsbnValidator));
        let source = self
            .source
            .unwrap_or_else(|| Arc::new(GoogleBooksAdapter::from_env()));
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(LookupCache::new(self.config.cache)));
        let breaker = self
            .breaker
            .unwrap_or_else(|| Arc::new(CircuitBreaker::new(self.config.circuit_breaker)));
        let fallback = self
            .fallback
            .unwrap_or_else(|| Arc::new(FallbackProvider::new(Arc::clone(&validator))));

        tracing::debug!(source = source.name(), config = ?self.config, "book resolver assembled");

        Ok(BookResolver {
            source,
            validator,
            cache,
            breaker,
            fallback,
            config: self.config,
        })
    }
}

impl BookResolver {
    /// Resolver over `source` with default components and configuration.
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        let validator: Arc<dyn IsbnValidator> = Arc::new(StandardIsbnValidator);
        let config = ResolverConfig::default();
        Self {
            source,
            fallback: Arc::new(FallbackProvider::new(Arc::clone(&validator))),
            validator,
            cache: Arc::new(LookupCache::new(config.cache)),
            breaker: Arc::new(CircuitBreaker::new(config.circuit_breaker)),
            config,
        }
    }

    pub fn builder() -> BookResolverBuilder {
        BookResolverBuilder::new()
    }

    /// Production resolver: `SHELFWISE_*` configuration over Google Books.
    pub fn from_env() -> Result<Self, CoreError> {
        BookResolverBuilder::new()
            .with_config(ResolverConfig::from_env()?)
            .with_google_books()
            .build()
    }

    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Resolves one ISBN through cache, breaker, upstream and fallback.
    #[tracing::instrument(skip(self), fields(source = self.source.name()))]
    pub async fn lookup_book(&self, isbn: &str) -> LookupResult {
        let started = Instant::now();
        match self.validator.validate(isbn) {
            Ok(normalized) => self.resolve(&normalized, started).await,
            Err(error) => {
                tracing::debug!(%error, "rejected isbn before lookup");
                LookupResult::failure(isbn, error.to_string(), LookupSource::Local)
                    .with_response_time(started.elapsed())
            }
        }
    }

    /// Resolves every distinct ISBN with bounded concurrency.
    ///
    /// Duplicates are resolved once and keyed by the requested string;
    /// `summary.total` counts distinct ISBNs.
    #[tracing::instrument(skip_all, fields(requested = isbns.len()))]
    pub async fn lookup_books<S>(&self, isbns: &[S]) -> BatchResult
    where
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let distinct = isbns
            .iter()
            .map(|isbn| isbn.as_ref())
            .enumerate()
            .filter(|(_, isbn)| seen.insert(*isbn))
            .collect::<Vec<_>>();

        let mut outcomes = stream::iter(distinct)
            .map(|(position, isbn)| async move { (position, isbn, self.lookup_book(isbn).await) })
            .buffer_unordered(self.config.batch_concurrency)
            .collect::<Vec<_>>()
            .await;
        outcomes.sort_unstable_by_key(|(position, _, _)| *position);

        let mut batch = BatchResult::default();
        for (position, isbn, result) in outcomes {
            batch.summary.record(&result);
            if !result.success() {
                batch.errors.push(format!(
                    "#{position} {isbn}: {}",
                    result.error().unwrap_or("lookup failed")
                ));
            }
            batch.results.insert(isbn.to_owned(), result);
        }

        tracing::info!(
            total = batch.summary.total,
            successful = batch.summary.successful,
            failed = batch.summary.failed,
            cached = batch.summary.cached,
            api_calls = batch.summary.api_calls,
            "batch lookup finished"
        );
        batch
    }

    /// Uncached title search. Neither consults nor updates the breaker.
    #[tracing::instrument(skip(self))]
    pub async fn search_by_title(&self, title: &str, limit: usize) -> TitleSearchResult {
        let request = match TitleSearchRequest::new(title, limit.min(self.config.max_search_limit)) {
            Ok(request) => request,
            Err(error) => return TitleSearchResult::failure(error.to_string(), None),
        };

        let started = Instant::now();
        match self.call_upstream(self.source.search_by_title(request)).await {
            Ok(books) => TitleSearchResult::found(books, started.elapsed()),
            Err(error) => {
                tracing::warn!(%error, "title search failed");
                TitleSearchResult::failure(error.to_string(), Some(started.elapsed()))
            }
        }
    }

    /// Live upstream probe. Reports breaker state without changing it.
    #[tracing::instrument(skip(self))]
    pub async fn check_service_health(&self) -> ServiceHealth {
        let started = Instant::now();
        let outcome = self.call_upstream(self.source.probe()).await;
        let elapsed = crate::lookup::duration_ms(started.elapsed());

        if let Err(error) = &outcome {
            tracing::warn!(%error, "upstream health probe failed");
        }

        ServiceHealth {
            available: outcome.is_ok(),
            response_time_ms: Some(elapsed),
            error: outcome.err().map(|error| error.to_string()),
            circuit_state: self.breaker.state(),
            cache: self.cache.stats(),
        }
    }

    pub fn get_resilience_stats(&self) -> ResilienceStats {
        ResilienceStats {
            circuit_breaker: self.breaker.snapshot(),
            fallback: self.fallback.stats(),
            cache: self.cache.stats(),
            config: ResilienceSettings::from(&self.config),
        }
    }

    /// Closes the circuit. Cache and fallback data are left untouched.
    pub fn reset_resilience(&self) {
        self.breaker.reset();
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        tracing::info!("lookup cache cleared");
    }

    pub fn get_cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Seeds a fallback entry; a blank title gets the default `"Book {isbn}"`.
    ///
    /// Returns `false` when the ISBN is rejected.
    pub fn add_fallback_book(&self, isbn: &str, title: &str) -> bool {
        let seed = FallbackSeed::titled(title.trim());
        let added = self.fallback.add_entry(isbn, seed);
        if added {
            tracing::info!(isbn, "fallback entry added");
        }
        added
    }

    /// Drops custom fallback entries and restores the built-in dataset.
    pub fn clear_fallback_data(&self) {
        self.fallback.clear();
    }

    pub fn fallback_stats(&self) -> FallbackStats {
        self.fallback.stats()
    }

    async fn resolve(&self, isbn: &Isbn, started: Instant) -> LookupResult {
        let key = isbn.as_str();

        if let Some(cached) = self.cache.get(key) {
            if cached.success() {
                return cached
                    .with_source(LookupSource::Cache)
                    .with_response_time(started.elapsed());
            }

            tracing::debug!(isbn = key, "cached not-found outcome; skipping upstream");
            if self.config.fallback_enabled {
                return self.fallback.lookup(key).with_response_time(started.elapsed());
            }
            return cached
                .with_source(LookupSource::Cache)
                .with_response_time(started.elapsed());
        }

        if !self.breaker.allow_request() {
            tracing::debug!(isbn = key, "circuit open; serving fallback");
            return self.degrade(key, BREAKER_OPEN, LookupSource::Local, started);
        }

        match self.call_upstream(self.source.fetch_by_isbn(isbn)).await {
            Ok(book) => {
                self.breaker.record_success();
                let result = LookupResult::found(key, book, LookupSource::Api);
                self.cache.put(key, result.clone());
                result.with_response_time(started.elapsed())
            }
            Err(error) if !error.is_upstream_failure() => {
                self.breaker.record_success();
                if error.kind() == SourceErrorKind::NotFound {
                    self.cache.put(
                        key,
                        LookupResult::failure(key, error.to_string(), LookupSource::Api),
                    );
                }
                tracing::debug!(isbn = key, %error, "upstream answered without a book");
                self.degrade(key, error.to_string(), LookupSource::Api, started)
            }
            Err(error) => {
                self.breaker.record_failure();
                tracing::warn!(isbn = key, %error, "upstream lookup failed");
                self.degrade(key, error.to_string(), LookupSource::Api, started)
            }
        }
    }

    /// `source` tags the failure returned when fallback is disabled: `Api`
    /// once upstream was called, `Local` when the breaker refused the call.
    fn degrade(
        &self,
        isbn: &str,
        error: impl Into<String>,
        source: LookupSource,
        started: Instant,
    ) -> LookupResult {
        let result = if self.config.fallback_enabled {
            self.fallback.lookup(isbn)
        } else {
            LookupResult::failure(isbn, error, source)
        };
        result.with_response_time(started.elapsed())
    }

    async fn call_upstream<T>(&self, call: SourceFuture<'_, T>) -> Result<T, SourceError> {
        let limit: Duration = self.config.upstream_timeout;
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(SourceError::timeout(limit)))
    }
}
