//! Upstream metadata adapters.

pub mod google_books;

pub use google_books::GoogleBooksAdapter;
