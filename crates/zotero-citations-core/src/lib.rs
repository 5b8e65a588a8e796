//! Zotero web API integration for rich-text editors.
//!
//! The crate searches a Zotero library, resolves a selected item into a
//! rendered citation and builds a bibliography from the citations already
//! present in a document. Editor mutation goes through [`EditorAdapter`];
//! configuration comes in as one immutable [`Settings`] value.

use thiserror::Error;

pub mod api;
pub mod bibliography;
pub mod bridge;
pub mod citation;
pub mod config_file;
pub mod dialog;
pub mod editor;
pub mod link;
pub mod search;
pub mod settings;

// Re-export for convenience
pub use api::{ApiClient, ApiError, HttpTransport, RawResponse, Transport};
pub use bibliography::{aggregate, citation_keys, insert_bibliography};
pub use citation::{insert_citation, resolve};
pub use dialog::{CitationDialog, DialogAction, DialogOutcome};
pub use editor::{EditorAdapter, HtmlDocument};
pub use link::{PageLinks, parse_link_header};
pub use search::{ResultRow, SearchController, SearchState};
pub use settings::{Settings, SettingsError};

/// Class prefix marking an inserted citation; the item key follows it.
pub const CITATION_CLASS_PREFIX: &str = "zotero-citation-";

/// Whether a library belongs to a user account or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LibraryType {
    #[default]
    Users,
    Groups,
}

impl LibraryType {
    /// Path segment used by the web API.
    pub fn as_str(&self) -> &'static str {
        match self {
            LibraryType::Users => "users",
            LibraryType::Groups => "groups",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LibraryType::Users => "User",
            LibraryType::Groups => "Group",
        }
    }
}

impl std::fmt::Display for LibraryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LibraryType {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "users" | "user" => Ok(LibraryType::Users),
            "groups" | "group" => Ok(LibraryType::Groups),
            other => Err(SettingsError::UnknownLibraryType(other.to_string())),
        }
    }
}

/// The remote collection a session queries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LibraryReference {
    pub library_type: LibraryType,
    pub library_id: String,
}

impl LibraryReference {
    pub fn new(library_type: LibraryType, library_id: impl Into<String>) -> Self {
        Self {
            library_type,
            library_id: library_id.into(),
        }
    }

    /// `users/12345` style prefix for endpoint paths.
    pub fn path(&self) -> String {
        format!("{}/{}", self.library_type.as_str(), self.library_id)
    }
}

/// Sort order for item searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortKey {
    #[default]
    Title,
    Creator,
    DateModified,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Title => "title",
            SortKey::Creator => "creator",
            SortKey::DateModified => "dateModified",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Title => "Title",
            SortKey::Creator => "Creator",
            SortKey::DateModified => "Date modified",
        }
    }

    pub const ALL: [SortKey; 3] = [SortKey::Title, SortKey::Creator, SortKey::DateModified];
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SortKey {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "title" => Ok(SortKey::Title),
            "creator" => Ok(SortKey::Creator),
            "dateModified" | "date-modified" => Ok(SortKey::DateModified),
            other => Err(SettingsError::UnknownSortKey(other.to_string())),
        }
    }
}

/// A search submission. When `cursor` is set it replaces the fresh query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub sort: SortKey,
    pub cursor: Option<String>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, sort: SortKey) -> Self {
        Self {
            text: text.into(),
            sort,
            cursor: None,
        }
    }

    pub fn from_cursor(cursor: impl Into<String>, sort: SortKey) -> Self {
        Self {
            text: String::new(),
            sort,
            cursor: Some(cursor.into()),
        }
    }
}

/// Display projection of one remote item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSummary {
    pub key: String,
    pub title: Option<String>,
    pub creator_summary: Option<String>,
}

/// One page of search results with its paging cursors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchResultPage {
    pub items: Vec<ItemSummary>,
    pub previous: Option<String>,
    pub next: Option<String>,
}

/// A rendered citation for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationFragment {
    pub item_key: String,
    pub rendered_html: String,
}

impl CitationFragment {
    /// Container class carrying the item key for later extraction.
    pub fn class_name(&self) -> String {
        format!("{}{}", CITATION_CLASS_PREFIX, self.item_key)
    }

    /// The markup inserted into the document.
    pub fn to_html(&self) -> String {
        format!(
            "<span class=\"{}\">{}</span>",
            self.class_name(),
            self.rendered_html
        )
    }
}

/// A formatted bibliography, inserted verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bibliography {
    pub rendered_html: String,
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("no {0} page available")]
    NoCursor(&'static str),
    #[error("item {0} is not in the current results")]
    UnknownItem(String),
    #[error("the document contains no citations")]
    NoCitations,
}

impl CoreError {
    /// Message shown to the user in place of results.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn citation_fragment_html_carries_key() {
        let fragment = CitationFragment {
            item_key: "AB1".into(),
            rendered_html: "(Doe 2020)".into(),
        };
        assert_eq!(
            fragment.to_html(),
            "<span class=\"zotero-citation-AB1\">(Doe 2020)</span>"
        );
    }

    #[test]
    fn library_path_uses_plural_segment() {
        let lib = LibraryReference::new(LibraryType::Groups, "42");
        assert_eq!(lib.path(), "groups/42");
    }

    #[test]
    fn sort_key_parses_wire_values() {
        assert_eq!("dateModified".parse::<SortKey>().unwrap(), SortKey::DateModified);
        assert_eq!("creator".parse::<SortKey>().unwrap(), SortKey::Creator);
        assert!("year".parse::<SortKey>().is_err());
    }

    #[test]
    fn library_type_rejects_unknown() {
        assert!(matches!(
            "org".parse::<LibraryType>(),
            Err(SettingsError::UnknownLibraryType(_))
        ));
    }
}
