//! One citation dialog session.
//!
//! The dialog owns the immutable settings it was opened with, a search
//! controller, and the confirm step that writes into the editor.

use std::sync::Arc;

use crate::api::{ApiClient, Transport};
use crate::bibliography::insert_bibliography;
use crate::citation::insert_citation;
use crate::editor::EditorAdapter;
use crate::search::SearchController;
use crate::settings::Settings;
use crate::{Bibliography, CitationFragment, CoreError};

/// What confirming the dialog should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogAction {
    /// Insert a citation for the selected result, if one is selected.
    AddCitation,
    AddBibliography,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogOutcome {
    Citation(CitationFragment),
    Bibliography(Bibliography),
    /// A citation was requested with nothing selected.
    Nothing,
}

pub struct CitationDialog {
    settings: Settings,
    client: ApiClient,
    search: SearchController,
}

impl CitationDialog {
    pub fn new(settings: Settings, transport: Arc<dyn Transport>) -> Self {
        let client = ApiClient::new(transport, &settings);
        let search = SearchController::new(client.clone(), settings.search_sort, settings.page_size);
        Self {
            settings,
            client,
            search,
        }
    }

    /// Replace the search controller, e.g. to attach an observer.
    pub fn with_search(mut self, build: impl FnOnce(SearchController) -> SearchController) -> Self {
        self.search = build(self.search);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn search(&self) -> &SearchController {
        &self.search
    }

    pub fn search_mut(&mut self) -> &mut SearchController {
        &mut self.search
    }

    /// Perform `action` against `editor`, then clear the results.
    ///
    /// Results are cleared whether or not the action succeeded; on failure
    /// the editor is left untouched.
    pub async fn confirm(
        &mut self,
        editor: &mut dyn EditorAdapter,
        action: DialogAction,
    ) -> Result<DialogOutcome, CoreError> {
        let outcome = match action {
            DialogAction::AddBibliography => insert_bibliography(
                &self.client,
                editor,
                &self.settings.citation_style,
                &self.settings.bibliography_locale,
                self.settings.bibliography_linkwrap,
            )
            .await
            .map(DialogOutcome::Bibliography),
            DialogAction::AddCitation => match self.search.selected() {
                Some(key) => {
                    let key = key.to_string();
                    insert_citation(&self.client, editor, &key, &self.settings.citation_style)
                        .await
                        .map(DialogOutcome::Citation)
                        .map_err(CoreError::from)
                }
                None => Ok(DialogOutcome::Nothing),
            },
        };
        self.search.reset();
        outcome
    }

    /// Close without acting.
    pub fn close(&mut self) {
        self.search.reset();
    }
}
