//! Turning a selected item into an inserted citation.

use crate::api::{ApiClient, ApiError};
use crate::editor::EditorAdapter;
use crate::CitationFragment;

/// Fetch the citation for `item_key` rendered in `style`.
pub async fn resolve(
    client: &ApiClient,
    item_key: &str,
    style: &str,
) -> Result<CitationFragment, ApiError> {
    client.item_citation(item_key, style).await
}

/// Resolve `item_key` and insert the tagged fragment at the cursor.
///
/// The editor is only touched once the request has succeeded.
pub async fn insert_citation(
    client: &ApiClient,
    editor: &mut dyn EditorAdapter,
    item_key: &str,
    style: &str,
) -> Result<CitationFragment, ApiError> {
    let fragment = resolve(client, item_key, style).await?;
    editor.insert_fragment(&fragment.to_html());
    tracing::info!(item_key = %fragment.item_key, style, "inserted citation");
    Ok(fragment)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::api::RawResponse;
    use crate::api::mock::MockTransport;
    use crate::editor::HtmlDocument;
    use crate::settings::Settings;

    #[tokio::test]
    async fn inserts_span_tagged_with_key() {
        let body = r#"{"key": "AB1", "citation": "<span>(Doe, 2020)</span>"}"#;
        let mock = Arc::new(MockTransport::new(RawResponse::new(200, body)));
        let client = ApiClient::new(mock.clone(), &Settings::default());
        let mut doc = HtmlDocument::new("<p>See </p>");
        doc.set_cursor(7);

        insert_citation(&client, &mut doc, "AB1", "apa").await.unwrap();

        assert_eq!(
            doc.html(),
            "<p>See <span class=\"zotero-citation-AB1\"><span>(Doe, 2020)</span></span></p>"
        );
        let sent = &mock.requests()[0];
        assert!(sent.url.ends_with("/items/AB1"));
        assert_eq!(sent.param("include"), Some("citation"));
        assert_eq!(sent.param("style"), Some("apa"));
    }

    #[tokio::test]
    async fn failure_leaves_document_unchanged() {
        let mock = Arc::new(MockTransport::new(RawResponse::new(404, "Not found")));
        let client = ApiClient::new(mock, &Settings::default());
        let mut doc = HtmlDocument::new("<p>text</p>");

        let err = insert_citation(&client, &mut doc, "NOPE", "apa")
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "404 Not Found");
        assert_eq!(doc.html(), "<p>text</p>");
    }

    #[tokio::test]
    async fn missing_key_in_response_uses_requested_key() {
        let body = r#"{"citation": "(X)"}"#;
        let mock = Arc::new(MockTransport::new(RawResponse::new(200, body)));
        let client = ApiClient::new(mock, &Settings::default());
        let fragment = resolve(&client, "K9", "ieee").await.unwrap();
        assert_eq!(fragment.item_key, "K9");
    }
}
