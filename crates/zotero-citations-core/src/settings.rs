//! Per-user settings handed to a dialog session.
//!
//! A [`Settings`] value is built once (config file, then environment, then
//! command-line overrides), validated, and passed into the dialog. Nothing
//! reads configuration after that point.

use thiserror::Error;

use crate::config_file::{ApiConfig, CitationConfig, ConfigFile, SearchConfig};
use crate::{LibraryReference, LibraryType, SortKey};

pub const DEFAULT_CITATION_STYLE: &str = "chicago-author-date";
pub const DEFAULT_BIBLIOGRAPHY_LOCALE: &str = "en-US";
pub const DEFAULT_BASE_URL: &str = "https://api.zotero.org";
pub const DEFAULT_PAGE_SIZE: u32 = 25;
/// Largest `limit` the API accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Supported CSL styles as `(id, label)`.
pub const CITATION_STYLES: &[(&str, &str)] = &[
    ("american-medical-association", "AMA"),
    ("apa", "APA"),
    ("chicago-author-date", "Chicago (author-date)"),
    ("chicago-note-bibliography", "Chicago (note, bibliography)"),
    ("elsevier-harvard", "Elsevier Harvard"),
    ("harvard-cite-them-right", "Harvard Cite Them Right"),
    ("ieee", "IEEE"),
    ("modern-humanities-research-association", "MHRA"),
    ("modern-language-association", "MLA"),
    ("nature", "Nature"),
    ("vancouver", "Vancouver"),
];

/// Supported bibliography locales as `(code, label)`.
pub const BIBLIOGRAPHY_LOCALES: &[(&str, &str)] = &[
    ("ar", "Arabic"),
    ("ca-AD", "Catalan"),
    ("cs-CZ", "Czech"),
    ("da-DK", "Danish"),
    ("de-DE", "German (Germany)"),
    ("el-GR", "Greek"),
    ("en-GB", "English (UK)"),
    ("en-US", "English (US)"),
    ("es-ES", "Spanish (Spain)"),
    ("fi-FI", "Finnish"),
    ("fr-FR", "French (France)"),
    ("he-IL", "Hebrew"),
    ("hu-HU", "Hungarian"),
    ("it-IT", "Italian"),
    ("ja-JP", "Japanese"),
    ("ko-KR", "Korean"),
    ("nb-NO", "Norwegian (Bokmål)"),
    ("nl-NL", "Dutch"),
    ("pl-PL", "Polish"),
    ("pt-BR", "Portuguese (Brazil)"),
    ("pt-PT", "Portuguese (Portugal)"),
    ("ru-RU", "Russian"),
    ("sv-SE", "Swedish"),
    ("tr-TR", "Turkish"),
    ("uk-UA", "Ukrainian"),
    ("zh-CN", "Chinese (PRC)"),
    ("zh-TW", "Chinese (Taiwan)"),
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("unknown citation style: {0}")]
    UnknownStyle(String),
    #[error("unknown bibliography locale: {0}")]
    UnknownLocale(String),
    #[error("unknown library type: {0} (expected users or groups)")]
    UnknownLibraryType(String),
    #[error("unknown search sort: {0} (expected title, creator or dateModified)")]
    UnknownSortKey(String),
    #[error("library ID must be numeric, got {0:?}")]
    InvalidLibraryId(String),
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Immutable configuration for one dialog session.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_key: String,
    pub library: LibraryReference,
    pub citation_style: String,
    pub bibliography_locale: String,
    pub bibliography_linkwrap: bool,
    pub search_sort: SortKey,
    /// Results per search page, within `1..=MAX_PAGE_SIZE`.
    pub page_size: u32,
    pub base_url: String,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &(!self.api_key.is_empty()).then_some("***"))
            .field("library", &self.library)
            .field("citation_style", &self.citation_style)
            .field("bibliography_locale", &self.bibliography_locale)
            .field("bibliography_linkwrap", &self.bibliography_linkwrap)
            .field("search_sort", &self.search_sort)
            .field("page_size", &self.page_size)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            library: LibraryReference::default(),
            citation_style: DEFAULT_CITATION_STYLE.to_string(),
            bibliography_locale: DEFAULT_BIBLIOGRAPHY_LOCALE.to_string(),
            bibliography_linkwrap: false,
            search_sort: SortKey::Title,
            page_size: DEFAULT_PAGE_SIZE,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Environment variables consulted by [`Settings::apply_env`].
pub const ENV_VARS: &[&str] = &[
    "ZOTERO_API_KEY",
    "ZOTERO_LIBRARY_TYPE",
    "ZOTERO_LIBRARY_ID",
    "ZOTERO_CITATION_STYLE",
    "ZOTERO_BIBLIOGRAPHY_LOCALE",
    "ZOTERO_BIBLIOGRAPHY_LINKWRAP",
    "ZOTERO_SEARCH_SORT",
];

impl Settings {
    /// Build settings from a loaded config file, filling gaps with defaults.
    pub fn from_config(config: &ConfigFile) -> Result<Self, SettingsError> {
        let mut settings = Settings::default();
        if let Some(api) = &config.api {
            if let Some(key) = &api.api_key {
                settings.api_key = key.clone();
            }
            if let Some(t) = &api.library_type {
                settings.library.library_type = t.parse()?;
            }
            if let Some(id) = &api.library_id {
                settings.library.library_id = id.trim().to_string();
            }
            if let Some(url) = &api.base_url {
                settings.base_url = url.clone();
            }
        }
        if let Some(citations) = &config.citations {
            if let Some(style) = &citations.style {
                settings.set_citation_style(style);
            }
            if let Some(locale) = &citations.bibliography_locale {
                settings.bibliography_locale = locale.clone();
            }
            if let Some(linkwrap) = citations.bibliography_linkwrap {
                settings.bibliography_linkwrap = linkwrap;
            }
        }
        if let Some(search) = &config.search {
            if let Some(sort) = &search.sort {
                settings.search_sort = sort.parse()?;
            }
            if let Some(size) = search.page_size {
                settings.page_size = size;
            }
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Overlay values from `ZOTERO_*` variables returned by `lookup`.
    pub fn apply_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SettingsError> {
        if let Some(key) = lookup("ZOTERO_API_KEY") {
            self.api_key = key;
        }
        if let Some(t) = lookup("ZOTERO_LIBRARY_TYPE") {
            self.library.library_type = t.parse()?;
        }
        if let Some(id) = lookup("ZOTERO_LIBRARY_ID") {
            self.library.library_id = id.trim().to_string();
        }
        if let Some(style) = lookup("ZOTERO_CITATION_STYLE") {
            self.set_citation_style(&style);
        }
        if let Some(locale) = lookup("ZOTERO_BIBLIOGRAPHY_LOCALE") {
            self.bibliography_locale = locale;
        }
        if let Some(flag) = lookup("ZOTERO_BIBLIOGRAPHY_LINKWRAP") {
            self.bibliography_linkwrap = parse_flag("ZOTERO_BIBLIOGRAPHY_LINKWRAP", &flag)?;
        }
        if let Some(sort) = lookup("ZOTERO_SEARCH_SORT") {
            self.search_sort = sort.parse()?;
        }
        self.validate()?;
        Ok(self)
    }

    /// An empty style falls back to the default.
    pub fn set_citation_style(&mut self, style: &str) {
        let style = style.trim();
        self.citation_style = if style.is_empty() {
            DEFAULT_CITATION_STYLE.to_string()
        } else {
            style.to_string()
        };
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !CITATION_STYLES.iter().any(|(id, _)| *id == self.citation_style) {
            return Err(SettingsError::UnknownStyle(self.citation_style.clone()));
        }
        if !BIBLIOGRAPHY_LOCALES
            .iter()
            .any(|(code, _)| *code == self.bibliography_locale)
        {
            return Err(SettingsError::UnknownLocale(
                self.bibliography_locale.clone(),
            ));
        }
        let id = &self.library.library_id;
        if !id.is_empty() && !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(SettingsError::InvalidLibraryId(id.clone()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(SettingsError::InvalidValue {
                name: "page_size",
                value: self.page_size.to_string(),
            });
        }
        Ok(())
    }

    /// The persisted form of these settings.
    pub fn to_config(&self) -> ConfigFile {
        ConfigFile {
            api: Some(ApiConfig {
                api_key: (!self.api_key.is_empty()).then(|| self.api_key.clone()),
                library_type: Some(self.library.library_type.as_str().to_string()),
                library_id: (!self.library.library_id.is_empty())
                    .then(|| self.library.library_id.clone()),
                base_url: (self.base_url != DEFAULT_BASE_URL).then(|| self.base_url.clone()),
            }),
            citations: Some(CitationConfig {
                style: Some(self.citation_style.clone()),
                bibliography_locale: Some(self.bibliography_locale.clone()),
                bibliography_linkwrap: Some(self.bibliography_linkwrap),
            }),
            search: Some(SearchConfig {
                sort: Some(self.search_sort.as_str().to_string()),
                page_size: Some(self.page_size),
            }),
        }
    }

    pub fn citation_style_label(&self) -> &str {
        CITATION_STYLES
            .iter()
            .find(|(id, _)| *id == self.citation_style)
            .map_or(self.citation_style.as_str(), |(_, label)| *label)
    }

    /// Form fields the host registers on its user-settings form.
    pub fn user_setting_fields(&self) -> Vec<SettingField> {
        vec![
            SettingField {
                name: "zotero_citations_citation_style",
                label: "Zotero Citation: Citation style",
                kind: FieldKind::Select,
                options: owned_options(CITATION_STYLES),
                allow_empty: true,
                value: self.citation_style.clone(),
            },
            SettingField {
                name: "zotero_citations_bibliography_locale",
                label: "Zotero Citation: Bibliography locale",
                kind: FieldKind::Select,
                options: owned_options(BIBLIOGRAPHY_LOCALES),
                allow_empty: false,
                value: self.bibliography_locale.clone(),
            },
            SettingField {
                name: "zotero_citations_bibliography_linkwrap",
                label: "Zotero Citation: Bibliography link URLs and DOIs",
                kind: FieldKind::Checkbox,
                options: Vec::new(),
                allow_empty: true,
                value: if self.bibliography_linkwrap { "1" } else { "0" }.to_string(),
            },
            SettingField {
                name: "zotero_citations_api_library_type",
                label: "Zotero Citation: API library type",
                kind: FieldKind::Select,
                options: [LibraryType::Users, LibraryType::Groups]
                    .iter()
                    .map(|t| (t.as_str().to_string(), t.label().to_string()))
                    .collect(),
                allow_empty: false,
                value: self.library.library_type.as_str().to_string(),
            },
            SettingField {
                name: "zotero_citations_api_library_id",
                label: "Zotero Citation: API library ID",
                kind: FieldKind::Number,
                options: Vec::new(),
                allow_empty: true,
                value: self.library.library_id.clone(),
            },
            SettingField {
                name: "zotero_citations_api_key",
                label: "Zotero Citation: API key",
                kind: FieldKind::Text,
                options: Vec::new(),
                allow_empty: true,
                value: self.api_key.clone(),
            },
            SettingField {
                name: "zotero_citations_search_sort",
                label: "Zotero Citation: Search sort by",
                kind: FieldKind::Select,
                options: SortKey::ALL
                    .iter()
                    .map(|s| (s.as_str().to_string(), s.label().to_string()))
                    .collect(),
                allow_empty: false,
                value: self.search_sort.as_str().to_string(),
            },
        ]
    }
}

fn owned_options(table: &[(&str, &str)]) -> Vec<(String, String)> {
    table
        .iter()
        .map(|(v, l)| (v.to_string(), l.to_string()))
        .collect()
}

/// Parse `1`/`0`/`true`/`false`/`yes`/`no`.
pub fn parse_flag(name: &'static str, value: &str) -> Result<bool, SettingsError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(SettingsError::InvalidValue {
            name,
            value: value.to_string(),
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Select,
    Number,
    Text,
    Checkbox,
}

/// Description of one user-settings form element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingField {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    /// `(value, label)` pairs for select fields.
    pub options: Vec<(String, String)>,
    pub allow_empty: bool,
    pub value: String,
}
