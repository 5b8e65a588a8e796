//! Zotero web API client.
//!
//! [`ApiClient`] builds authenticated requests and interprets responses;
//! the network itself sits behind the [`Transport`] trait so sessions can be
//! driven by [`HttpTransport`] in production and [`mock::MockTransport`] in
//! tests. Non-success statuses are terminal: nothing here retries.

pub mod transport;
pub mod mock;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::link::parse_link_header;
use crate::settings::Settings;
use crate::{
    Bibliography, CitationFragment, ItemSummary, LibraryReference, SearchQuery, SearchResultPage,
};

pub use self::transport::HttpTransport;

/// Header carrying the API key on every request.
pub const API_KEY_HEADER: &str = "Zotero-API-Key";

/// Appended to HTTP failures shown to the user.
pub const CONFIG_HINT: &str = "Please verify the library ID and API key.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The API answered with a non-success status.
    #[error("{status} {status_text}")]
    Http { status: u16, status_text: String },
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
    /// A cursor URL pointing outside the configured API.
    #[error("refusing to send credentials to {0}")]
    ForeignUrl(String),
    #[error("invalid item key: {0:?}")]
    InvalidItemKey(String),
}

impl ApiError {
    /// The error text plus, for HTTP failures, a hint to check configuration.
    /// 4xx and 5xx are reported the same way.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Http { .. } => format!("{} {}", self, CONFIG_HINT),
            other => other.to_string(),
        }
    }
}

/// A fully described GET request handed to a [`Transport`].
#[derive(Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// Endpoint URL, or an opaque cursor URL when `params` is empty.
    pub url: String,
    pub params: Vec<(String, String)>,
    pub api_key: String,
}

impl ApiRequest {
    /// Value of the first query parameter named `name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl std::fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRequest")
            .field("url", &self.url)
            .field("params", &self.params)
            .field("api_key", &"***")
            .finish()
    }
}

/// Status, paging header and body of one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub link: Option<String>,
    pub body: String,
}

impl RawResponse {
    /// A response with the canonical reason phrase for `status`.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            status_text: canonical_reason(status).to_string(),
            link: None,
            body: body.into(),
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Collect status, `Link` header and body text from a reqwest response.
    pub async fn from_response(resp: reqwest::Response) -> Result<Self, ApiError> {
        let status = resp.status();
        let link = resp
            .headers()
            .get(reqwest::header::LINK)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = resp
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            link,
            body,
        })
    }
}

fn canonical_reason(status: u16) -> &'static str {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
}

/// Sends requests built by [`ApiClient`].
pub trait Transport: Send + Sync {
    fn get<'a>(
        &'a self,
        request: &'a ApiRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse, ApiError>> + Send + 'a>>;
}

#[derive(Debug, Deserialize)]
struct ItemJson {
    key: String,
    #[serde(default)]
    data: ItemData,
    #[serde(default)]
    meta: ItemMeta,
}

#[derive(Debug, Default, Deserialize)]
struct ItemData {
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemMeta {
    creator_summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CitationJson {
    #[serde(default)]
    key: String,
    #[serde(default)]
    citation: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl From<ItemJson> for ItemSummary {
    fn from(item: ItemJson) -> Self {
        ItemSummary {
            key: item.key,
            title: non_empty(item.data.title),
            creator_summary: non_empty(item.meta.creator_summary),
        }
    }
}

/// Authenticated access to one library.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    api_key: String,
    library: LibraryReference,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("library", &self.library)
            .finish()
    }
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, settings: &Settings) -> Self {
        Self {
            transport,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            library: settings.library.clone(),
        }
    }

    pub fn library(&self) -> &LibraryReference {
        &self.library
    }

    /// GET `{base}/{library}/{endpoint_path}` with `params`.
    pub async fn request(
        &self,
        endpoint_path: &str,
        params: &[(&str, String)],
    ) -> Result<RawResponse, ApiError> {
        let url = format!(
            "{}/{}/{}",
            self.base_url,
            self.library.path(),
            endpoint_path.trim_start_matches('/')
        );
        let params = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        self.send(ApiRequest {
            url,
            params,
            api_key: self.api_key.clone(),
        })
        .await
    }

    /// GET an opaque URL (a paging cursor) exactly as given.
    ///
    /// Only URLs under the configured base are fetched, since the request
    /// carries the API key.
    pub async fn request_url(&self, url: &str) -> Result<RawResponse, ApiError> {
        if !self.is_api_url(url) {
            tracing::warn!(url, "rejected cursor outside the API base URL");
            return Err(ApiError::ForeignUrl(url.to_string()));
        }
        self.send(ApiRequest {
            url: url.to_string(),
            params: Vec::new(),
            api_key: self.api_key.clone(),
        })
        .await
    }

    fn is_api_url(&self, url: &str) -> bool {
        url.strip_prefix(&self.base_url)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?']))
    }

    async fn send(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
        tracing::debug!(url = %request.url, params = ?request.params, "zotero request");
        let response = self.transport.get(&request).await.inspect_err(|e| {
            tracing::warn!(url = %request.url, error = %e, "zotero request failed");
        })?;
        if !response.is_success() {
            tracing::warn!(
                url = %request.url,
                status = response.status,
                "zotero request returned an error status"
            );
            return Err(ApiError::Http {
                status: response.status,
                status_text: response.status_text,
            });
        }
        Ok(response)
    }

    /// Top-level items matching `query`, or the page behind its cursor.
    pub async fn search_items(
        &self,
        query: &SearchQuery,
        limit: u32,
    ) -> Result<SearchResultPage, ApiError> {
        let response = match query.cursor.as_deref() {
            Some(cursor) => self.request_url(cursor).await?,
            None => {
                let params = [
                    ("q", query.text.clone()),
                    ("qmode", "titleCreatorYear".to_string()),
                    ("sort", query.sort.as_str().to_string()),
                    ("limit", limit.to_string()),
                ];
                self.request("items/top", &params).await?
            }
        };

        let links = response
            .link
            .as_deref()
            .map(parse_link_header)
            .unwrap_or_default();
        let items: Vec<ItemJson> = response.json()?;
        Ok(SearchResultPage {
            items: items.into_iter().map(ItemSummary::from).collect(),
            previous: links.previous,
            next: links.next,
        })
    }

    /// One item with its citation rendered in `style`.
    pub async fn item_citation(
        &self,
        item_key: &str,
        style: &str,
    ) -> Result<CitationFragment, ApiError> {
        if item_key.is_empty() || !item_key.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ApiError::InvalidItemKey(item_key.to_string()));
        }
        let params = [
            ("include", "citation".to_string()),
            ("style", style.to_string()),
        ];
        let response = self
            .request(&format!("items/{}", item_key), &params)
            .await?;
        let item: CitationJson = response.json()?;
        let item_key = if item.key.is_empty() {
            item_key.to_string()
        } else {
            item.key
        };
        Ok(CitationFragment {
            item_key,
            rendered_html: item.citation,
        })
    }

    /// A combined bibliography for `item_keys`, sent as given.
    pub async fn bibliography(
        &self,
        item_keys: &[String],
        style: &str,
        locale: &str,
        linkwrap: bool,
    ) -> Result<Bibliography, ApiError> {
        let params = [
            ("itemKey", item_keys.join(",")),
            ("format", "bib".to_string()),
            ("style", style.to_string()),
            ("locale", locale.to_string()),
            ("linkwrap", if linkwrap { "1" } else { "0" }.to_string()),
        ];
        let response = self.request("items", &params).await?;
        Ok(Bibliography {
            rendered_html: response.body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockTransport;
    use super::*;
    use crate::SortKey;

    fn client(mock: Arc<MockTransport>) -> ApiClient {
        let settings = Settings {
            api_key: "secret".into(),
            library: LibraryReference::new(crate::LibraryType::Users, "123"),
            ..Settings::default()
        };
        ApiClient::new(mock, &settings)
    }

    #[test]
    fn http_error_displays_status_and_text() {
        let err = ApiError::Http {
            status: 403,
            status_text: "Forbidden".into(),
        };
        assert_eq!(err.to_string(), "403 Forbidden");
        assert!(err.user_message().starts_with("403 Forbidden "));
        assert!(err.user_message().contains("library ID and API key"));
    }

    #[test]
    fn raw_response_uses_canonical_reason() {
        assert_eq!(RawResponse::new(404, "").status_text, "Not Found");
        assert_eq!(RawResponse::new(599, "").status_text, "");
    }

    #[tokio::test]
    async fn from_response_reads_link_and_body() {
        let http_resp = http::Response::builder()
            .status(200)
            .header("link", "<https://api.zotero.org/x?start=25>; rel=\"next\"")
            .body("[]")
            .unwrap();
        let resp = RawResponse::from_response(reqwest::Response::from(http_resp))
            .await
            .unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.status_text, "OK");
        assert_eq!(
            resp.link.as_deref(),
            Some("<https://api.zotero.org/x?start=25>; rel=\"next\"")
        );
        assert_eq!(resp.body, "[]");
    }

    #[tokio::test]
    async fn from_response_without_link_header() {
        let http_resp = http::Response::builder().status(503).body("").unwrap();
        let resp = RawResponse::from_response(reqwest::Response::from(http_resp))
            .await
            .unwrap();
        assert!(resp.link.is_none());
        assert_eq!(resp.status_text, "Service Unavailable");
        assert!(!resp.is_success());
    }

    #[tokio::test]
    async fn request_attaches_key_and_library_path() {
        let mock = Arc::new(MockTransport::new(RawResponse::new(200, "[]")));
        let api = client(mock.clone());
        api.request("items/top", &[("q", "x".into())]).await.unwrap();

        let sent = mock.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].url, "https://api.zotero.org/users/123/items/top");
        assert_eq!(sent[0].api_key, "secret");
        assert_eq!(sent[0].param("q"), Some("x"));
    }

    #[tokio::test]
    async fn non_success_becomes_http_error() {
        let mock = Arc::new(MockTransport::new(RawResponse::new(500, "oops")));
        let api = client(mock);
        let err = api.request("items", &[]).await.unwrap_err();
        assert_eq!(
            err,
            ApiError::Http {
                status: 500,
                status_text: "Internal Server Error".into()
            }
        );
    }

    #[tokio::test]
    async fn search_parses_items_and_links() {
        let body = r#"[
            {"key": "AB1", "data": {"title": "Climate Change"}, "meta": {"creatorSummary": "Doe"}},
            {"key": "AB2", "data": {"title": ""}, "meta": {}}
        ]"#;
        let link = "<https://api.zotero.org/users/123/items/top?start=25>; rel=\"next\", \
                    <https://api.zotero.org/users/123/items/top?start=50>; rel=\"last\"";
        let mock = Arc::new(MockTransport::new(RawResponse::new(200, body).with_link(link)));
        let api = client(mock.clone());

        let page = api
            .search_items(&SearchQuery::new("climate", SortKey::Creator), 25)
            .await
            .unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].title.as_deref(), Some("Climate Change"));
        assert_eq!(page.items[1].title, None);
        assert_eq!(page.items[1].creator_summary, None);
        assert_eq!(page.previous, None);
        assert_eq!(
            page.next.as_deref(),
            Some("https://api.zotero.org/users/123/items/top?start=25")
        );

        let sent = &mock.requests()[0];
        assert_eq!(sent.param("qmode"), Some("titleCreatorYear"));
        assert_eq!(sent.param("sort"), Some("creator"));
        assert_eq!(sent.param("limit"), Some("25"));
    }

    #[tokio::test]
    async fn search_with_cursor_fetches_url_verbatim() {
        let mock = Arc::new(MockTransport::new(RawResponse::new(200, "[]")));
        let api = client(mock.clone());
        let cursor = "https://api.zotero.org/users/123/items/top?q=a&start=25";
        api.search_items(&SearchQuery::from_cursor(cursor, SortKey::Title), 25)
            .await
            .unwrap();

        let sent = &mock.requests()[0];
        assert_eq!(sent.url, cursor);
        assert!(sent.params.is_empty());
        assert_eq!(sent.api_key, "secret");
    }

    #[tokio::test]
    async fn cursor_on_foreign_host_is_not_fetched() {
        let mock = Arc::new(MockTransport::new(RawResponse::new(200, "[]")));
        let api = client(mock.clone());

        for url in [
            "https://evil.example/steal",
            "https://api.zotero.org.evil.example/users/123/items",
            "http://api.zotero.org/users/123/items",
        ] {
            let err = api
                .search_items(&SearchQuery::from_cursor(url, SortKey::Title), 25)
                .await
                .unwrap_err();
            assert_eq!(err, ApiError::ForeignUrl(url.to_string()));
        }
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn whitespace_title_is_kept() {
        let body = r#"[{"key": "AB1", "data": {"title": " "}, "meta": {"creatorSummary": " "}}]"#;
        let mock = Arc::new(MockTransport::new(RawResponse::new(200, body)));
        let api = client(mock);
        let page = api
            .search_items(&SearchQuery::new("x", SortKey::Title), 25)
            .await
            .unwrap();
        assert_eq!(page.items[0].title.as_deref(), Some(" "));
        assert_eq!(page.items[0].creator_summary.as_deref(), Some(" "));
    }

    #[tokio::test]
    async fn item_key_with_query_characters_is_rejected() {
        let mock = Arc::new(MockTransport::new(RawResponse::new(200, "{}")));
        let api = client(mock.clone());
        for key in ["AB1?x=y", "../AB1", ""] {
            let err = api.item_citation(key, "apa").await.unwrap_err();
            assert_eq!(err, ApiError::InvalidItemKey(key.to_string()));
        }
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn malformed_json_is_decode_error() {
        let mock = Arc::new(MockTransport::new(RawResponse::new(200, "<html>")));
        let api = client(mock);
        let err = api
            .search_items(&SearchQuery::new("x", SortKey::Title), 25)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn bibliography_sends_linkwrap_flag() {
        let mock = Arc::new(MockTransport::new(RawResponse::new(200, "<div/>")));
        let api = client(mock.clone());
        let keys = vec!["A".to_string(), "B".to_string()];
        let bib = api.bibliography(&keys, "apa", "de-DE", true).await.unwrap();
        assert_eq!(bib.rendered_html, "<div/>");

        let sent = &mock.requests()[0];
        assert_eq!(sent.url, "https://api.zotero.org/users/123/items");
        assert_eq!(sent.param("itemKey"), Some("A,B"));
        assert_eq!(sent.param("format"), Some("bib"));
        assert_eq!(sent.param("locale"), Some("de-DE"));
        assert_eq!(sent.param("linkwrap"), Some("1"));
    }
}
