use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use shelfwise_core::{
    GoogleBooksAdapter, HttpClient, HttpError, HttpRequest, HttpResponse, Isbn, MetadataSource,
    RetryConfig, SourceErrorKind, TitleSearchRequest,
};

#[path = "../support/mod.rs"]
mod support;

use support::{Reply, ScriptedSource};

/// Answers Google Books queries from canned payloads keyed by the `q` prefix.
struct CannedGoogleBooks;

impl CannedGoogleBooks {
    fn respond(request: &HttpRequest) -> HttpResponse {
        let query = request.query_param("q").unwrap_or_default();
        if let Some(isbn) = query.strip_prefix("isbn:") {
            if isbn == support::UNLISTED_D {
                return HttpResponse::ok_json(r#"{"totalItems": 0}"#);
            }
            return HttpResponse::ok_json(volumes(&[(isbn, "Canned Volume")]));
        }
        if query.starts_with("intitle:") {
            return HttpResponse::ok_json(volumes(&[
                ("9780141439518", "Pride and Prejudice"),
                ("9780141439600", "A Tale of Two Cities"),
                ("9780141441146", "Jane Eyre"),
            ]));
        }
        HttpResponse::with_status(400, "unsupported query")
    }
}

impl HttpClient for CannedGoogleBooks {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let response = Self::respond(&request);
        Box::pin(async move { Ok(response) })
    }
}

fn volumes(entries: &[(&str, &str)]) -> String {
    let items = entries
        .iter()
        .map(|(isbn, title)| {
            serde_json::json!({
                "volumeInfo": {
                    "title": title,
                    "authors": ["Canned Author"],
                    "industryIdentifiers": [{"type": "ISBN_13", "identifier": isbn}],
                }
            })
        })
        .collect::<Vec<_>>();
    serde_json::json!({ "totalItems": items.len(), "items": items }).to_string()
}

#[derive(Clone)]
struct SourceCase {
    name: &'static str,
    source: Arc<dyn MetadataSource>,
}

fn source_cases() -> Vec<SourceCase> {
    let scripted = ScriptedSource::healthy();
    scripted.set_reply(support::UNLISTED_D, Reply::NotFound);
    scripted.set_search_reply(Ok(vec![
        support::book("9780141439518", "Pride and Prejudice"),
        support::book("9780141439600", "A Tale of Two Cities"),
        support::book("9780141441146", "Jane Eyre"),
    ]));

    vec![
        SourceCase {
            name: "google_books",
            source: Arc::new(
                GoogleBooksAdapter::new(Arc::new(CannedGoogleBooks))
                    .with_retry(RetryConfig::no_retry()),
            ),
        },
        SourceCase {
            name: "scripted",
            source: scripted,
        },
    ]
}

#[tokio::test]
async fn fetch_returns_record_for_requested_isbn_for_all_sources() {
    let isbn = Isbn::parse(support::UNLISTED_A).expect("valid isbn");

    for case in source_cases() {
        let book = case
            .source
            .fetch_by_isbn(&isbn)
            .await
            .unwrap_or_else(|error| panic!("source '{}' fetch failed: {error}", case.name));

        assert_eq!(book.isbn_code, isbn.as_str(), "source '{}': isbn", case.name);
        assert!(!book.title.is_empty(), "source '{}': title", case.name);
        assert!(!book.authors.is_empty(), "source '{}': authors", case.name);
    }
}

#[tokio::test]
async fn unknown_isbn_is_reported_as_not_found_for_all_sources() {
    let isbn = Isbn::parse(support::UNLISTED_D).expect("valid isbn");

    for case in source_cases() {
        let error = case
            .source
            .fetch_by_isbn(&isbn)
            .await
            .expect_err("unknown isbn must fail");

        assert_eq!(error.kind(), SourceErrorKind::NotFound, "source '{}'", case.name);
        assert_eq!(error.code(), "source.not_found", "source '{}'", case.name);
        assert!(!error.is_upstream_failure(), "source '{}'", case.name);
    }
}

#[tokio::test]
async fn title_search_respects_limit_for_all_sources() {
    for case in source_cases() {
        let request = TitleSearchRequest::new("classics", 2).expect("valid request");

        let books = case
            .source
            .search_by_title(request)
            .await
            .unwrap_or_else(|error| panic!("source '{}' search failed: {error}", case.name));

        assert!(books.len() <= 2, "source '{}': limit", case.name);
        assert!(
            books.iter().all(|book| !book.isbn_code.is_empty()),
            "source '{}': every result carries an isbn",
            case.name
        );
    }
}

#[tokio::test]
async fn probe_succeeds_for_all_healthy_sources() {
    for case in source_cases() {
        case.source
            .probe()
            .await
            .unwrap_or_else(|error| panic!("source '{}' probe failed: {error}", case.name));
        assert!(!case.source.name().is_empty());
    }
}
