//! Scripted upstream used by the behavior tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shelfwise_core::{
    AuthorRef, BookRecord, BookResolver, BookResolverBuilder, Isbn, MetadataSource,
    ResolverConfig, SourceError, SourceFuture, TitleSearchRequest,
};

pub const PRIDE_AND_PREJUDICE: &str = "9780141439518";
pub const FRANKENSTEIN: &str = "9780486282114";

// Valid ISBNs absent from the built-in fallback table.
pub const UNLISTED_A: &str = "9780306406157";
pub const UNLISTED_B: &str = "9780140449136";
pub const UNLISTED_C: &str = "9780486411095";
pub const UNLISTED_D: &str = "9780140268867";

/// How the scripted source answers a fetch.
#[derive(Debug, Clone)]
pub enum Reply {
    Book(String),
    SlowBook(String, Duration),
    NotFound,
    Unavailable,
    /// Never completes within any reasonable timeout.
    Hang,
}

pub struct ScriptedSource {
    default_reply: Mutex<Reply>,
    replies: Mutex<HashMap<String, Reply>>,
    search_reply: Mutex<Result<Vec<BookRecord>, SourceError>>,
    probe_healthy: AtomicBool,
    fetch_calls: AtomicUsize,
    search_calls: AtomicUsize,
    last_search_limit: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedSource {
    pub fn answering(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            default_reply: Mutex::new(reply),
            replies: Mutex::new(HashMap::new()),
            search_reply: Mutex::new(Ok(Vec::new())),
            probe_healthy: AtomicBool::new(true),
            fetch_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            last_search_limit: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    /// Every ISBN resolves to `"Upstream {isbn}"`.
    pub fn healthy() -> Arc<Self> {
        Self::answering(Reply::Book(String::from("Upstream")))
    }

    pub fn failing() -> Arc<Self> {
        Self::answering(Reply::Unavailable)
    }

    pub fn set_default(&self, reply: Reply) {
        *self.default_reply.lock().expect("reply lock") = reply;
    }

    pub fn set_reply(&self, isbn: &str, reply: Reply) {
        self.replies
            .lock()
            .expect("reply lock")
            .insert(isbn.to_owned(), reply);
    }

    pub fn set_search_reply(&self, reply: Result<Vec<BookRecord>, SourceError>) {
        *self.search_reply.lock().expect("search lock") = reply;
    }

    pub fn set_probe_healthy(&self, healthy: bool) {
        self.probe_healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn last_search_limit(&self) -> usize {
        self.last_search_limit.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn reply_for(&self, isbn: &str) -> Reply {
        self.replies
            .lock()
            .expect("reply lock")
            .get(isbn)
            .cloned()
            .unwrap_or_else(|| self.default_reply.lock().expect("reply lock").clone())
    }
}

impl MetadataSource for ScriptedSource {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn fetch_by_isbn<'a>(&'a self, isbn: &'a Isbn) -> SourceFuture<'a, BookRecord> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.reply_for(isbn.as_str());

        Box::pin(async move {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);

            let outcome = match reply {
                Reply::Book(title) => Ok(book(isbn.as_str(), &title)),
                Reply::SlowBook(title, delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(book(isbn.as_str(), &title))
                }
                Reply::NotFound => Err(SourceError::not_found(isbn)),
                Reply::Unavailable => Err(SourceError::unavailable("scripted upstream is down")),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(3_600)).await;
                    Err(SourceError::unavailable("unreachable"))
                }
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            outcome
        })
    }

    fn search_by_title<'a>(&'a self, req: TitleSearchRequest) -> SourceFuture<'a, Vec<BookRecord>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.last_search_limit.store(req.limit, Ordering::SeqCst);
        let reply = self.search_reply.lock().expect("search lock").clone();
        Box::pin(async move { reply.map(|books| books.into_iter().take(req.limit).collect()) })
    }

    fn probe<'a>(&'a self) -> SourceFuture<'a, ()> {
        let healthy = self.probe_healthy.load(Ordering::SeqCst);
        Box::pin(async move {
            if healthy {
                Ok(())
            } else {
                Err(SourceError::unavailable("probe refused"))
            }
        })
    }
}

pub fn book(isbn: &str, title: &str) -> BookRecord {
    BookRecord::new(isbn, format!("{title} {isbn}")).with_author(AuthorRef::new("Test", "Author"))
}

pub fn resolver_with(source: Arc<ScriptedSource>, config: ResolverConfig) -> BookResolver {
    BookResolverBuilder::new()
        .with_source(source)
        .with_config(config)
        .build()
        .expect("test config is valid")
}

pub fn resolver(source: Arc<ScriptedSource>) -> BookResolver {
    resolver_with(source, ResolverConfig::default())
}
