use std::env;
use std::sync::Arc;

use serde::Deserialize;

use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::metadata_source::{MetadataSource, SourceError, SourceFuture, TitleSearchRequest};
use crate::retry::RetryConfig;
use crate::{AuthorRef, BookRecord, CategoryRef, Dimensions, Isbn};

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/books/v1";

const PROBE_QUERY: &str = "isbn:9780306406157";

/// Google Books volumes API adapter.
#[derive(Clone)]
pub struct GoogleBooksAdapter {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    api_key: Option<String>,
    retry: RetryConfig,
    request_timeout_ms: u64,
}

impl Default for GoogleBooksAdapter {
    fn default() -> Self {
        Self::new(Arc::new(ReqwestHttpClient::default()))
    }
}

impl std::fmt::Debug for GoogleBooksAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleBooksAdapter")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("retry", &self.retry)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

impl GoogleBooksAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_key: None,
            retry: RetryConfig::default(),
            request_timeout_ms: 5_000,
        }
    }

    /// Production adapter over reqwest with the API key taken from
    /// `SHELFWISE_GOOGLE_BOOKS_API_KEY` or `GOOGLE_BOOKS_API_KEY`.
    pub fn from_env() -> Self {
        let adapter = Self::default();
        match api_key_from_env() {
            Some(key) => adapter.with_api_key(key),
            None => adapter,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = (!api_key.trim().is_empty()).then_some(api_key);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    fn volumes_request(&self, query: String) -> HttpRequest {
        let mut request = HttpRequest::get(format!("{}/volumes", self.base_url))
            .with_query("q", query)
            .with_header("Accept", "application/json")
            .with_timeout_ms(self.request_timeout_ms);
        if let Some(key) = &self.api_key {
            request = request.with_query("key", key.clone());
        }
        request
    }

    /// Sends one GET; `Ok(None)` means upstream answered 404.
    async fn send_once(&self, request: HttpRequest) -> Result<Option<String>, SourceError> {
        let response = self.http_client.execute(request).await.map_err(|error| {
            let mapped =
                SourceError::unavailable(format!("google books transport error: {}", error.message()));
            if error.retryable() {
                mapped
            } else {
                mapped.non_retryable()
            }
        })?;

        match response.status {
            status if (200..300).contains(&status) => Ok(Some(response.body)),
            404 => Ok(None),
            429 => Err(SourceError::rate_limited(
                "google books rate limit exceeded (status 429)",
            )),
            status => {
                let error = SourceError::unavailable(format!(
                    "google books upstream returned status {status}"
                ));
                if self.retry.should_retry_status(status) {
                    Err(error)
                } else {
                    Err(error.non_retryable())
                }
            }
        }
    }

    async fn fetch_volumes(&self, request: HttpRequest) -> Result<Option<VolumesPayload>, SourceError> {
        tracing::debug!(url = %redacted_url(&request), "querying google books");
        let body = self.retry.run(|| self.send_once(request.clone())).await?;
        body.map(|body| {
            serde_json::from_str::<VolumesPayload>(&body).map_err(|error| {
                SourceError::internal(format!("google books returned malformed payload: {error}"))
            })
        })
        .transpose()
    }
}

impl MetadataSource for GoogleBooksAdapter {
    fn name(&self) -> &'static str {
        "google_books"
    }

    fn fetch_by_isbn<'a>(&'a self, isbn: &'a Isbn) -> SourceFuture<'a, BookRecord> {
        Box::pin(async move {
            let request = self.volumes_request(format!("isbn:{isbn}"));
            let payload = self.fetch_volumes(request).await?;

            payload
                .filter(|payload| payload.total_items > 0)
                .and_then(|payload| payload.items.into_iter().next())
                .map(|item| normalize_volume(isbn.as_str(), item.volume_info))
                .ok_or_else(|| SourceError::not_found(isbn))
        })
    }

    fn search_by_title<'a>(&'a self, req: TitleSearchRequest) -> SourceFuture<'a, Vec<BookRecord>> {
        Box::pin(async move {
            let request = self
                .volumes_request(format!("intitle:{}", req.title))
                .with_query("maxResults", req.limit.to_string());
            let Some(payload) = self.fetch_volumes(request).await? else {
                return Ok(Vec::new());
            };

            Ok(payload
                .items
                .into_iter()
                .filter_map(|item| {
                    let isbn = item.volume_info.preferred_isbn()?;
                    Some(normalize_volume(&isbn, item.volume_info))
                })
                .take(req.limit)
                .collect())
        })
    }

    fn probe<'a>(&'a self) -> SourceFuture<'a, ()> {
        Box::pin(async move {
            let request = self
                .volumes_request(PROBE_QUERY.to_owned())
                .with_query("maxResults", "1");
            self.send_once(request).await.map(|_| ())
        })
    }
}

/// Reads the API key the same way [`GoogleBooksAdapter::from_env`] does.
pub fn api_key_from_env() -> Option<String> {
    env::var("SHELFWISE_GOOGLE_BOOKS_API_KEY")
        .or_else(|_| env::var("GOOGLE_BOOKS_API_KEY"))
        .ok()
        .filter(|key| !key.trim().is_empty())
}

fn redacted_url(request: &HttpRequest) -> String {
    let mut redacted = request.clone();
    for (name, value) in &mut redacted.query {
        if name.as_str() == "key" {
            *value = String::from("***");
        }
    }
    redacted.full_url()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumesPayload {
    #[serde(default)]
    total_items: u64,
    #[serde(default)]
    items: Vec<VolumeItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeItem {
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct VolumeInfo {
    title: Option<String>,
    subtitle: Option<String>,
    authors: Vec<String>,
    publisher: Option<String>,
    published_date: Option<String>,
    description: Option<String>,
    industry_identifiers: Vec<IndustryIdentifier>,
    page_count: Option<u32>,
    categories: Vec<String>,
    language: Option<String>,
    image_links: Option<ImageLinks>,
    dimensions: Option<Dimensions>,
    print_type: Option<String>,
}

impl VolumeInfo {
    fn preferred_isbn(&self) -> Option<String> {
        ["ISBN_13", "ISBN_10"].iter().find_map(|kind| {
            self.industry_identifiers
                .iter()
                .find(|identifier| identifier.kind == *kind)
                .map(|identifier| identifier.identifier.clone())
        })
    }
}

#[derive(Debug, Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ImageLinks {
    extra_large: Option<String>,
    large: Option<String>,
    medium: Option<String>,
    small: Option<String>,
    thumbnail: Option<String>,
    small_thumbnail: Option<String>,
}

impl ImageLinks {
    /// Largest first.
    fn into_urls(self) -> Vec<String> {
        [
            self.extra_large,
            self.large,
            self.medium,
            self.small,
            self.thumbnail,
            self.small_thumbnail,
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

fn normalize_volume(isbn: &str, info: VolumeInfo) -> BookRecord {
    let title = info
        .title
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| String::from("Untitled"));

    let mut book = BookRecord::new(isbn, title);
    book.subtitle = info.subtitle;
    book.authors = info
        .authors
        .iter()
        .filter(|name| !name.trim().is_empty())
        .map(|name| AuthorRef::from_full_name(name))
        .collect();
    book.categories = info.categories.into_iter().map(CategoryRef::subject).collect();
    book.edition_date = info.published_date;
    book.publishers = info.publisher.into_iter().collect();
    book.pages = info.page_count.filter(|pages| *pages > 0);
    book.language = info.language;
    book.description = info.description;
    book.cover_urls = info.image_links.map(ImageLinks::into_urls).unwrap_or_default();
    book.physical_format = info.print_type;
    book.dimensions = info.dimensions;
    book
}
