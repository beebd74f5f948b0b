//! Fallback book data used when upstream is unusable.
//!
//! Two tiers: a curated table keyed by normalized ISBN, and a deterministic
//! minimal record synthesized for anything else. [`FallbackProvider::lookup`]
//! therefore always produces a book.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::validation::{IsbnValidator, StandardIsbnValidator};
use crate::{AuthorRef, BookRecord, CategoryRef, LookupResult, LookupSource};

/// Number of entries present after construction or [`FallbackProvider::clear`].
pub const DEFAULT_ENTRY_COUNT: usize = 6;

const CURATED_SOURCE: &str = "curated";

/// How much a fallback entry should be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl Display for Confidence {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row of the fallback table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackEntry {
    pub isbn: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<AuthorRef>,
    #[serde(default)]
    pub categories: Vec<CategoryRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
}

impl FallbackEntry {
    fn render(&self) -> BookRecord {
        let mut book = BookRecord::new(self.isbn.clone(), self.title.clone());
        book.authors = if self.authors.is_empty() {
            vec![AuthorRef::unknown()]
        } else {
            self.authors.clone()
        };
        book.categories = if self.categories.is_empty() {
            vec![CategoryRef::unknown()]
        } else {
            self.categories.clone()
        };
        book.publishers = self.publisher.iter().cloned().collect();
        book.edition_date = self.edition_date.clone();
        book.description = self.provenance();
        book
    }

    fn provenance(&self) -> Option<String> {
        let source = self.source.as_deref()?;
        Some(match self.confidence {
            Some(confidence) => {
                format!("Book information from {source} source ({confidence} confidence)")
            }
            None => format!("Book information from {source} source"),
        })
    }
}

/// Partial data supplied when seeding a fallback entry; missing fields are defaulted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackSeed {
    pub title: Option<String>,
    pub authors: Vec<AuthorRef>,
    pub categories: Vec<CategoryRef>,
    pub publisher: Option<String>,
    pub edition_date: Option<String>,
    pub source: Option<String>,
    pub confidence: Option<Confidence>,
}

impl FallbackSeed {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_author(mut self, author: AuthorRef) -> Self {
        self.authors.push(author);
        self
    }

    pub fn with_category(mut self, category: CategoryRef) -> Self {
        self.categories.push(category);
        self
    }

    pub fn with_provenance(mut self, source: impl Into<String>, confidence: Confidence) -> Self {
        self.source = Some(source.into());
        self.confidence = Some(confidence);
        self
    }
}

/// Fallback table statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackStats {
    pub static_data_count: usize,
    /// Sorted normalized ISBNs present in the table.
    pub available_isbns: Vec<String>,
}

/// Curated fallback table plus minimal-record synthesis.
pub struct FallbackProvider {
    validator: Arc<dyn IsbnValidator>,
    entries: RwLock<BTreeMap<String, FallbackEntry>>,
}

impl Default for FallbackProvider {
    fn default() -> Self {
        Self::new(Arc::new(StandardIsbnValidator))
    }
}

impl FallbackProvider {
    /// Creates a provider seeded with the built-in defaults.
    pub fn new(validator: Arc<dyn IsbnValidator>) -> Self {
        Self {
            validator,
            entries: RwLock::new(default_table()),
        }
    }

    /// Resolves `isbn` from the curated table, or synthesizes a minimal record.
    pub fn lookup(&self, isbn: &str) -> LookupResult {
        let book = match self.read().get(isbn) {
            Some(entry) => entry.render(),
            None => minimal_record(isbn),
        };
        LookupResult::found(isbn, book, LookupSource::Fallback)
    }

    pub fn contains(&self, isbn: &str) -> bool {
        self.read().contains_key(isbn)
    }

    /// Stores or overwrites the entry for `isbn`.
    ///
    /// Returns `false` when the ISBN is rejected by the validator.
    pub fn add_entry(&self, isbn: &str, seed: FallbackSeed) -> bool {
        let normalized = match self.validator.validate(isbn) {
            Ok(normalized) => normalized,
            Err(error) => {
                tracing::debug!(isbn, %error, "rejected fallback entry");
                return false;
            }
        };

        let key = normalized.as_str().to_owned();
        let title = seed
            .title
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| format!("Book {key}"));
        let entry = FallbackEntry {
            isbn: key.clone(),
            title,
            authors: seed.authors,
            categories: seed.categories,
            publisher: seed.publisher,
            edition_date: seed.edition_date,
            source: seed.source,
            confidence: seed.confidence,
        };

        self.write().insert(key, entry);
        true
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> FallbackStats {
        let entries = self.read();
        FallbackStats {
            static_data_count: entries.len(),
            available_isbns: entries.keys().cloned().collect(),
        }
    }

    /// Discards every entry and reseeds the built-in defaults.
    pub fn clear(&self) {
        *self.write() = default_table();
        tracing::info!(entries = DEFAULT_ENTRY_COUNT, "fallback table reset to defaults");
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, FallbackEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, FallbackEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for FallbackProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackProvider")
            .field("entries", &self.len())
            .finish()
    }
}

/// Deterministic placeholder for an ISBN with no known metadata.
pub fn minimal_record(isbn: &str) -> BookRecord {
    let suffix_start = isbn
        .char_indices()
        .rev()
        .nth(3)
        .map(|(index, _)| index)
        .unwrap_or(0);

    BookRecord::new(isbn, format!("Book {}", &isbn[suffix_start..]))
        .with_author(AuthorRef::unknown())
        .with_category(CategoryRef::unknown())
}

fn default_table() -> BTreeMap<String, FallbackEntry> {
    let classic = |isbn: &str, title: &str, author: &str, subject: &str, publisher: &str, year: &str| {
        FallbackEntry {
            isbn: isbn.to_owned(),
            title: title.to_owned(),
            authors: vec![AuthorRef::from_full_name(author)],
            categories: vec![CategoryRef::subject(subject)],
            publisher: Some(publisher.to_owned()),
            edition_date: Some(year.to_owned()),
            source: Some(CURATED_SOURCE.to_owned()),
            confidence: Some(Confidence::High),
        }
    };

    [
        classic("9780141439518", "Pride and Prejudice", "Jane Austen", "Fiction", "Penguin Classics", "2003"),
        classic("9780141439600", "A Tale of Two Cities", "Charles Dickens", "Fiction", "Penguin Classics", "2003"),
        classic("9780141441146", "Jane Eyre", "Charlotte Brontë", "Fiction", "Penguin Classics", "2006"),
        classic("9780486280615", "Adventures of Huckleberry Finn", "Mark Twain", "Fiction", "Dover Publications", "1994"),
        classic("9780486282114", "Frankenstein", "Mary Shelley", "Fiction", "Dover Publications", "1994"),
        classic("9780486415871", "Crime and Punishment", "Fyodor Dostoyevsky", "Fiction", "Dover Publications", "2001"),
    ]
    .into_iter()
    .map(|entry| (entry.isbn.clone(), entry))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_seeded() {
        let provider = FallbackProvider::default();
        assert_eq!(provider.len(), DEFAULT_ENTRY_COUNT);

        let stats = provider.stats();
        assert_eq!(stats.static_data_count, DEFAULT_ENTRY_COUNT);
        let mut sorted = stats.available_isbns.clone();
        sorted.sort();
        assert_eq!(stats.available_isbns, sorted);
    }

    #[test]
    fn default_isbns_pass_validation() {
        for isbn in FallbackProvider::default().stats().available_isbns {
            assert!(
                StandardIsbnValidator.validate(&isbn).is_ok(),
                "default entry {isbn} must be a valid isbn"
            );
        }
    }

    #[test]
    fn curated_entry_renders_provenance() {
        let provider = FallbackProvider::default();
        let result = provider.lookup("9780141439518");

        assert!(result.success());
        assert_eq!(result.source(), LookupSource::Fallback);
        let book = result.book().expect("book present");
        assert_eq!(book.title, "Pride and Prejudice");
        assert_eq!(book.authors[0].surname, "Austen");
        assert_eq!(
            book.description.as_deref(),
            Some("Book information from curated source (high confidence)")
        );
    }

    #[test]
    fn minimal_record_is_deterministic() {
        let provider = FallbackProvider::default();
        let first = provider.lookup("9780123456789");
        let second = provider.lookup("9780123456789");

        assert_eq!(first, second);
        let book = first.book().expect("synthetic book present");
        assert_eq!(book.title, "Book 6789");
        assert_eq!(book.authors.len(), 1);
        assert_eq!(book.authors[0].name, "Unknown");
        assert_eq!(book.authors[0].surname, "Author");
        assert_eq!(book.authors[0].full_name, "Unknown Author");
        assert_eq!(book.categories, vec![CategoryRef::new("Unknown", "subject")]);
        assert!(book.description.is_none());
    }

    #[test]
    fn minimal_record_handles_short_keys() {
        assert_eq!(minimal_record("12").title, "Book 12");
    }

    #[test]
    fn add_entry_defaults_missing_fields() {
        let provider = FallbackProvider::default();
        assert!(provider.add_entry("978-0-306-40615-7", FallbackSeed::default()));

        let book = provider.lookup("9780306406157").into_book().expect("book");
        assert_eq!(book.title, "Book 9780306406157");
        assert_eq!(book.authors, vec![AuthorRef::unknown()]);
        assert!(book.description.is_none());
    }

    #[test]
    fn add_entry_source_without_confidence() {
        let provider = FallbackProvider::default();
        let seed = FallbackSeed {
            source: Some(String::from("manual")),
            ..FallbackSeed::titled("Notes")
        };
        assert!(provider.add_entry("0306406152", seed));

        let book = provider.lookup("0306406152").into_book().expect("book");
        assert_eq!(book.description.as_deref(), Some("Book information from manual source"));
    }

    #[test]
    fn add_entry_rejects_invalid_isbn() {
        let provider = FallbackProvider::default();
        assert!(!provider.add_entry("123", FallbackSeed::titled("Nope")));
        assert_eq!(provider.len(), DEFAULT_ENTRY_COUNT);
    }

    #[test]
    fn clear_restores_defaults() {
        let provider = FallbackProvider::default();
        assert!(provider.add_entry("9780306406157", FallbackSeed::titled("Custom")));
        assert_eq!(provider.len(), DEFAULT_ENTRY_COUNT + 1);

        provider.clear();

        assert_eq!(provider.len(), DEFAULT_ENTRY_COUNT);
        assert!(!provider.contains("9780306406157"));
        assert!(provider.contains("9780141439518"));
    }
}
