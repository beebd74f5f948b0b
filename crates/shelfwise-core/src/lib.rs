//! # Shelfwise Core
//!
//! Resilient ISBN metadata resolution for the shelfwise library tracker.
//!
//! ## Overview
//!
//! Book metadata comes from a third-party API that is slow, rate limited and
//! occasionally down. This crate makes that dependency behave predictably:
//!
//! - **Lookup cache** so repeated lookups never leave the process
//! - **Circuit breaker** so a failing upstream is not hammered
//! - **Fallback data** so every valid ISBN still yields a usable record
//! - **Resolver** combining the three for single, batch and title lookups
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Upstream adapters (Google Books) |
//! | [`cache`] | Bounded LRU cache of lookup outcomes |
//! | [`circuit_breaker`] | Circuit breaker guarding upstream calls |
//! | [`config`] | Resolver configuration and environment loading |
//! | [`domain`] | Domain models (Isbn, BookRecord, authors, categories) |
//! | [`error`] | Core error types |
//! | [`fallback`] | Curated fallback table and minimal records |
//! | [`http_client`] | HTTP client abstraction |
//! | [`lookup`] | Lookup, batch, search and health results |
//! | [`metadata_source`] | Upstream source trait and errors |
//! | [`resolver`] | The resolution orchestrator |
//! | [`retry`] | Backoff policy for adapters |
//! | [`validation`] | ISBN validator trait |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shelfwise_core::BookResolver;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let resolver = BookResolver::from_env()?;
//!
//!     let result = resolver.lookup_book("978-0-14-143951-8").await;
//!     if let Some(book) = result.book() {
//!         println!("{} ({})", book.title, result.source());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Caller         │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  BookResolver   │────▶│ LookupCache      │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Circuit Breaker │────▶│ FallbackProvider │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ MetadataSource  │────▶│ HTTP Client      │
//! │ (Adapter Trait) │     │ (reqwest)        │
//! └─────────────────┘     └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Resolver operations return values, never `Result`s. Upstream failures are
//! classified by [`SourceErrorKind`] before they are folded into a
//! [`LookupResult`]:
//!
//! ```rust
//! use shelfwise_core::{SourceError, SourceErrorKind};
//!
//! fn counts_against_upstream(error: &SourceError) -> bool {
//!     match error.kind() {
//!         SourceErrorKind::NotFound | SourceErrorKind::InvalidRequest => false,
//!         _ => true,
//!     }
//! }
//!
//! assert!(counts_against_upstream(&SourceError::unavailable("down")));
//! ```
//!
//! ## Logging
//!
//! Events are emitted through `tracing`; the library never installs a
//! subscriber.
//!
//! ## Security
//!
//! - API keys are read from environment variables only (never logged)
//! - All HTTP requests use TLS via rustls

pub mod adapters;
pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod domain;
pub mod error;
pub mod fallback;
pub mod http_client;
pub mod lookup;
pub mod metadata_source;
pub mod resolver;
pub mod retry;
pub mod validation;

// Adapter implementations
pub use adapters::GoogleBooksAdapter;

// Caching
pub use cache::{CacheConfig, CacheStats, LookupCache};

// Circuit breaker
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitSnapshot, CircuitState};

// Configuration
pub use config::ResolverConfig;

// Domain models
pub use domain::{AuthorRef, BookRecord, CategoryRef, Dimensions, Isbn, SUBJECT_CATEGORY};

// Error types
pub use error::{ConfigError, CoreError, ValidationError};

// Fallback data
pub use fallback::{Confidence, FallbackEntry, FallbackProvider, FallbackSeed, FallbackStats, DEFAULT_ENTRY_COUNT};

// HTTP client types
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};

// Lookup results
pub use lookup::{BatchResult, BatchSummary, LookupResult, LookupSource, ServiceHealth, TitleSearchResult};

// Upstream source contract
pub use metadata_source::{MetadataSource, SourceError, SourceErrorKind, SourceFuture, TitleSearchRequest};

// Orchestrator
pub use resolver::{BookResolver, BookResolverBuilder, ResilienceSettings, ResilienceStats};

// Retry logic
pub use retry::{Backoff, RetryConfig};

// Validation
pub use validation::{IsbnValidator, StandardIsbnValidator};
