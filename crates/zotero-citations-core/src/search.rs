//! Search and paging state for the citation dialog.
//!
//! Every search or page navigation replaces the previous results wholesale.
//! Paging controls are shown only for directions the last response
//! advertised, and both are hidden while a request is in flight.

use crate::api::ApiClient;
use crate::{CoreError, SearchQuery, SearchResultPage, SortKey};

pub const NO_TITLE: &str = "[no title]";
pub const NO_CREATOR: &str = "[no creator]";
/// Titles are cut to this many characters in result rows.
pub const TITLE_DISPLAY_CHARS: usize = 100;
/// Shared name of the result radio inputs, making selection exclusive.
pub const SELECTION_GROUP: &str = "zotero-item";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    Loading,
    Loaded(SearchResultPage),
    /// The user-facing error message, rendered as text.
    Errored(String),
}

/// One rendered result line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub key: String,
    pub title: String,
    pub creator: String,
    pub selected: bool,
}

pub type StateObserver = Box<dyn Fn(&SearchState) + Send + Sync>;

pub struct SearchController {
    client: ApiClient,
    sort: SortKey,
    page_size: u32,
    state: SearchState,
    selected: Option<String>,
    observer: Option<StateObserver>,
}

impl SearchController {
    pub fn new(client: ApiClient, sort: SortKey, page_size: u32) -> Self {
        Self {
            client,
            sort,
            page_size,
            state: SearchState::Idle,
            selected: None,
            observer: None,
        }
    }

    /// Call `observer` on every state transition.
    pub fn with_observer(mut self, observer: impl Fn(&SearchState) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn page(&self) -> Option<&SearchResultPage> {
        match &self.state {
            SearchState::Loaded(page) => Some(page),
            _ => None,
        }
    }

    pub fn previous_visible(&self) -> bool {
        self.page().is_some_and(|p| p.previous.is_some())
    }

    pub fn next_visible(&self) -> bool {
        self.page().is_some_and(|p| p.next.is_some())
    }

    /// Submit a fresh query with the configured sort.
    pub async fn search(&mut self, text: &str) -> Result<(), CoreError> {
        self.run(SearchQuery::new(text, self.sort)).await
    }

    pub async fn previous(&mut self) -> Result<(), CoreError> {
        let cursor = self
            .page()
            .and_then(|p| p.previous.clone())
            .ok_or(CoreError::NoCursor("previous"))?;
        self.run(SearchQuery::from_cursor(cursor, self.sort)).await
    }

    pub async fn next(&mut self) -> Result<(), CoreError> {
        let cursor = self
            .page()
            .and_then(|p| p.next.clone())
            .ok_or(CoreError::NoCursor("next"))?;
        self.run(SearchQuery::from_cursor(cursor, self.sort)).await
    }

    /// Load the page behind a cursor URL taken from an earlier response.
    pub async fn open(&mut self, cursor: &str) -> Result<(), CoreError> {
        self.run(SearchQuery::from_cursor(cursor, self.sort)).await
    }

    async fn run(&mut self, query: SearchQuery) -> Result<(), CoreError> {
        self.selected = None;
        self.transition(SearchState::Loading);

        match self.client.search_items(&query, self.page_size).await {
            Ok(page) => {
                tracing::debug!(
                    items = page.items.len(),
                    has_prev = page.previous.is_some(),
                    has_next = page.next.is_some(),
                    "search results loaded"
                );
                self.transition(SearchState::Loaded(page));
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.transition(SearchState::Errored(err.user_message()));
                Err(err)
            }
        }
    }

    fn transition(&mut self, state: SearchState) {
        self.state = state;
        if let Some(observer) = &self.observer {
            observer(&self.state);
        }
    }

    /// Select `key`, replacing any earlier selection.
    pub fn select(&mut self, key: &str) -> Result<(), CoreError> {
        let known = self
            .page()
            .is_some_and(|p| p.items.iter().any(|item| item.key == key));
        if !known {
            return Err(CoreError::UnknownItem(key.to_string()));
        }
        self.selected = Some(key.to_string());
        Ok(())
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Drop results and selection, as when the dialog is hidden.
    pub fn reset(&mut self) {
        self.selected = None;
        self.transition(SearchState::Idle);
    }

    pub fn rows(&self) -> Vec<ResultRow> {
        let Some(page) = self.page() else {
            return Vec::new();
        };
        page.items
            .iter()
            .map(|item| ResultRow {
                key: item.key.clone(),
                title: item
                    .title
                    .as_deref()
                    .map(|t| t.chars().take(TITLE_DISPLAY_CHARS).collect())
                    .unwrap_or_else(|| NO_TITLE.to_string()),
                creator: item
                    .creator_summary
                    .clone()
                    .unwrap_or_else(|| NO_CREATOR.to_string()),
                selected: self.selected.as_deref() == Some(item.key.as_str()),
            })
            .collect()
    }

    /// Markup for the results area in the current state.
    pub fn render_html(&self) -> String {
        match &self.state {
            SearchState::Idle => String::new(),
            SearchState::Loading => "<div class=\"zotero-search-results-loading\">Loading...</div>".to_string(),
            SearchState::Errored(message) => format!(
                "<div class=\"zotero-search-results\">{}</div>",
                escape_html(message)
            ),
            SearchState::Loaded(_) => {
                let mut html = String::from(
                    "<table class=\"zotero-search-results\">\
                     <thead><tr><th></th><th>Title</th><th>Creator</th></tr></thead><tbody>",
                );
                for row in self.rows() {
                    html.push_str(&format!(
                        "<tr><td><input type=\"radio\" name=\"{}\" value=\"{}\"{}></td>\
                         <td>{}</td><td>{}</td></tr>",
                        SELECTION_GROUP,
                        escape_html(&row.key),
                        if row.selected { " checked" } else { "" },
                        escape_html(&row.title),
                        escape_html(&row.creator),
                    ));
                }
                html.push_str("</tbody></table>");
                html
            }
        }
    }
}

pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
