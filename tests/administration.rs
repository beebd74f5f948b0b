//! Behavior-driven tests for operational and administrative operations

mod support;

use std::time::Duration;

use shelfwise_core::{
    CircuitBreakerConfig, CircuitState, LookupSource, ResolverConfig, DEFAULT_ENTRY_COUNT,
};
use support::{resolver, resolver_with, ScriptedSource, PRIDE_AND_PREJUDICE, UNLISTED_A, UNLISTED_B};

fn fragile_config() -> ResolverConfig {
    ResolverConfig {
        circuit_breaker: CircuitBreakerConfig {
            failure_threshold: 1,
            cooldown: Duration::from_secs(60),
            half_open_max_probes: 1,
        },
        ..ResolverConfig::default()
    }
}

#[tokio::test]
async fn reset_resilience_closes_circuit_and_leaves_cache_and_fallback_alone() {
    // Given: A cached book, a custom fallback entry, and an open circuit
    let source = ScriptedSource::healthy();
    let resolver = resolver_with(source.clone(), fragile_config());
    resolver.lookup_book(UNLISTED_A).await;
    assert!(resolver.add_fallback_book(UNLISTED_B, "Field Notes"));
    source.set_default(support::Reply::Unavailable);
    resolver.lookup_book(PRIDE_AND_PREJUDICE).await;
    assert_eq!(resolver.circuit_state(), CircuitState::Open);

    // When: Resilience is reset
    resolver.reset_resilience();

    // Then: The circuit is closed with a clean failure history
    let stats = resolver.get_resilience_stats();
    assert_eq!(stats.circuit_breaker.state, CircuitState::Closed);
    assert_eq!(stats.circuit_breaker.consecutive_failures, 0);
    assert!(stats.circuit_breaker.last_failure_at.is_none());

    // And: Cache and fallback data survived
    assert_eq!(stats.cache.size, 1);
    assert_eq!(stats.fallback.static_data_count, DEFAULT_ENTRY_COUNT + 1);
    assert_eq!(resolver.lookup_book(UNLISTED_A).await.source(), LookupSource::Cache);
}

#[tokio::test]
async fn clear_cache_empties_entries_and_counters() {
    // Given: A cache with entries and hit/miss history
    let source = ScriptedSource::healthy();
    let resolver = resolver(source.clone());
    resolver.lookup_book(UNLISTED_A).await;
    resolver.lookup_book(UNLISTED_A).await;

    // When: The cache is cleared
    resolver.clear_cache();

    // Then: Statistics start over
    let stats = resolver.get_cache_stats();
    assert_eq!(stats.size, 0);
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 0);
    assert_eq!(stats.hit_rate, 0.0);

    // And: The next lookup goes back to the API
    assert_eq!(resolver.lookup_book(UNLISTED_A).await.source(), LookupSource::Api);
    assert_eq!(source.fetch_calls(), 2);
}

#[tokio::test]
async fn seeded_fallback_book_is_served_while_upstream_is_down() {
    // Given: A failing upstream
    let resolver = resolver(ScriptedSource::failing());

    // When: An operator seeds a fallback entry using a hyphenated ISBN
    assert!(resolver.add_fallback_book("978-0-306-40615-7", "The Art of Measurement"));

    // Then: Lookups for that ISBN serve the seeded title
    let result = resolver.lookup_book(UNLISTED_A).await;
    assert_eq!(result.source(), LookupSource::Fallback);
    let book = result.book().expect("seeded book");
    assert_eq!(book.title, "The Art of Measurement");
    assert_eq!(book.authors[0].full_name, "Unknown Author");

    // And: The stats list the normalized ISBN in sorted order
    let stats = resolver.fallback_stats();
    assert!(stats.available_isbns.contains(&UNLISTED_A.to_owned()));
    let mut sorted = stats.available_isbns.clone();
    sorted.sort();
    assert_eq!(stats.available_isbns, sorted);
}

#[tokio::test]
async fn blank_fallback_title_gets_default() {
    let resolver = resolver(ScriptedSource::failing());

    assert!(resolver.add_fallback_book(UNLISTED_B, "   "));

    let book = resolver
        .lookup_book(UNLISTED_B)
        .await
        .into_book()
        .expect("seeded book");
    assert_eq!(book.title, format!("Book {UNLISTED_B}"));
}

#[test]
fn invalid_fallback_isbn_is_rejected() {
    let resolver = resolver(ScriptedSource::healthy());

    assert!(!resolver.add_fallback_book("12345", "Nothing"));
    assert!(!resolver.add_fallback_book("9780306406158", "Bad checksum"));
    assert_eq!(resolver.fallback_stats().static_data_count, DEFAULT_ENTRY_COUNT);
}

#[test]
fn clear_fallback_data_restores_defaults() {
    // Given: Two custom fallback entries
    let resolver = resolver(ScriptedSource::healthy());
    assert!(resolver.add_fallback_book(UNLISTED_A, "One"));
    assert!(resolver.add_fallback_book(UNLISTED_B, "Two"));
    assert_eq!(resolver.fallback_stats().static_data_count, DEFAULT_ENTRY_COUNT + 2);

    // When: Fallback data is cleared
    resolver.clear_fallback_data();

    // Then: Only the built-in dataset remains
    let stats = resolver.fallback_stats();
    assert_eq!(stats.static_data_count, DEFAULT_ENTRY_COUNT);
    assert!(!stats.available_isbns.contains(&UNLISTED_A.to_owned()));
    assert!(stats.available_isbns.contains(&PRIDE_AND_PREJUDICE.to_owned()));
}

#[test]
fn resilience_stats_report_effective_settings_as_json() {
    // Given: A resolver with custom settings
    let resolver = resolver_with(
        ScriptedSource::healthy(),
        ResolverConfig {
            upstream_timeout: Duration::from_millis(2_500),
            batch_concurrency: 8,
            ..fragile_config()
        },
    );

    // When: Stats are rendered for an operator
    let json = serde_json::to_value(resolver.get_resilience_stats()).expect("serializable");

    // Then: Every component is present with snake_case fields
    assert_eq!(json["circuit_breaker"]["state"], "closed");
    assert_eq!(json["circuit_breaker"]["consecutive_failures"], 0);
    assert_eq!(json["fallback"]["static_data_count"], DEFAULT_ENTRY_COUNT);
    assert_eq!(json["cache"]["max_size"], 1_000);
    assert_eq!(json["config"]["failure_threshold"], 1);
    assert_eq!(json["config"]["cooldown_ms"], 60_000);
    assert_eq!(json["config"]["upstream_timeout_ms"], 2_500);
    assert_eq!(json["config"]["batch_concurrency"], 8);
    assert_eq!(json["config"]["fallback_enabled"], true);
}
