//! Building a bibliography from the citations already in a document.
//!
//! The key list is recomputed from the content on every call. Repeated
//! citations of one item are sent as repeated keys; the API decides what
//! duplicates mean.

use scraper::{Html, Selector};

use crate::api::ApiClient;
use crate::editor::EditorAdapter;
use crate::{Bibliography, CITATION_CLASS_PREFIX, CoreError};

/// Item keys of every citation element in `html`, in document order.
///
/// An element counts when one of its class tokens starts with
/// `zotero-citation-`; the key is that token's last `-`-separated segment.
pub fn citation_keys(html: &str) -> Vec<String> {
    let document = Html::parse_fragment(html);
    let selector = match Selector::parse(&format!("[class*=\"{}\"]", CITATION_CLASS_PREFIX)) {
        Ok(sel) => sel,
        Err(_) => return Vec::new(),
    };

    document
        .select(&selector)
        .filter_map(|element| {
            element
                .value()
                .classes()
                .find(|class| class.starts_with(CITATION_CLASS_PREFIX))
                .and_then(|class| class.rsplit('-').next())
                .filter(|key| !key.is_empty())
                .map(String::from)
        })
        .collect()
}

/// Request one combined bibliography for the citations in `content_html`.
pub async fn aggregate(
    client: &ApiClient,
    content_html: &str,
    style: &str,
    locale: &str,
    linkwrap: bool,
) -> Result<Bibliography, CoreError> {
    let keys = citation_keys(content_html);
    if keys.is_empty() {
        return Err(CoreError::NoCitations);
    }
    tracing::debug!(count = keys.len(), "requesting bibliography");
    Ok(client.bibliography(&keys, style, locale, linkwrap).await?)
}

/// Aggregate the editor's current content and insert the result verbatim.
pub async fn insert_bibliography(
    client: &ApiClient,
    editor: &mut dyn EditorAdapter,
    style: &str,
    locale: &str,
    linkwrap: bool,
) -> Result<Bibliography, CoreError> {
    let content = editor.current_content();
    let bibliography = aggregate(client, &content, style, locale, linkwrap).await?;
    editor.insert_fragment(&bibliography.rendered_html);
    tracing::info!(style, locale, "inserted bibliography");
    Ok(bibliography)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::api::RawResponse;
    use crate::api::mock::MockTransport;
    use crate::editor::HtmlDocument;
    use crate::settings::Settings;

    #[test]
    fn keys_in_document_order_with_duplicates() {
        let html = r#"<p><span class="zotero-citation-B2">b</span> and
            <span class="zotero-citation-A1">a</span>
            <span class="zotero-citation-B2">b again</span></p>"#;
        assert_eq!(citation_keys(html), vec!["B2", "A1", "B2"]);
    }

    #[test]
    fn extra_classes_do_not_leak_into_key() {
        let html = r#"<span class="highlight zotero-citation-XY7 bold">x</span>"#;
        assert_eq!(citation_keys(html), vec!["XY7"]);
    }

    #[test]
    fn nested_and_non_span_elements_count() {
        let html = r#"<div class="zotero-citation-OUT"><em class="zotero-citation-IN">i</em></div>"#;
        assert_eq!(citation_keys(html), vec!["OUT", "IN"]);
    }

    #[test]
    fn unrelated_classes_are_ignored() {
        let html = r#"<span class="my-zotero-citation-no">x</span><span class="zotero-bib">y</span>"#;
        assert!(citation_keys(html).is_empty());
    }

    #[tokio::test]
    async fn no_citations_means_no_request() {
        let mock = Arc::new(MockTransport::new(RawResponse::new(200, "")));
        let client = ApiClient::new(mock.clone(), &Settings::default());
        let err = aggregate(&client, "<p>plain</p>", "apa", "en-US", false)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NoCitations));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn inserts_body_verbatim_at_cursor() {
        let bib = "<div class=\"csl-bib-body\"><div class=\"csl-entry\">Doe. 2020.</div></div>";
        let mock = Arc::new(MockTransport::new(RawResponse::new(200, bib)));
        let client = ApiClient::new(mock.clone(), &Settings::default());
        let mut doc = HtmlDocument::new("<p><span class=\"zotero-citation-AB1\">(Doe)</span></p>");

        insert_bibliography(&client, &mut doc, "apa", "en-GB", false)
            .await
            .unwrap();

        assert!(doc.html().ends_with(bib));
        let sent = &mock.requests()[0];
        assert_eq!(sent.param("itemKey"), Some("AB1"));
        assert_eq!(sent.param("linkwrap"), Some("0"));
        assert_eq!(sent.param("locale"), Some("en-GB"));
    }

    #[tokio::test]
    async fn failure_leaves_document_unchanged() {
        let mock = Arc::new(MockTransport::new(RawResponse::new(500, "")));
        let client = ApiClient::new(mock, &Settings::default());
        let original = "<p><span class=\"zotero-citation-AB1\">(Doe)</span></p>";
        let mut doc = HtmlDocument::new(original);

        let err = insert_bibliography(&client, &mut doc, "apa", "en-US", false)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "500 Internal Server Error");
        assert_eq!(doc.html(), original);
    }
}
