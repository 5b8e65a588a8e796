use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub api: Option<ApiConfig>,
    pub citations: Option<CitationConfig>,
    pub search: Option<SearchConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub api_key: Option<String>,
    pub library_type: Option<String>,
    pub library_id: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationConfig {
    pub style: Option<String>,
    pub bibliography_locale: Option<String>,
    pub bibliography_linkwrap: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub sort: Option<String>,
    pub page_size: Option<u32>,
}

/// Platform config directory path: `<config_dir>/zotero-citations/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("zotero-citations").join("config.toml"))
}

/// Load config by cascading CWD `.zotero-citations.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".zotero-citations.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable config file");
            None
        }
    }
}

fn pick<S, T: Clone>(
    base: &Option<S>,
    overlay: &Option<S>,
    field: impl Fn(&S) -> &Option<T>,
) -> Option<T> {
    overlay
        .as_ref()
        .and_then(|s| field(s).clone())
        .or_else(|| base.as_ref().and_then(|s| field(s).clone()))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        api: Some(ApiConfig {
            api_key: pick(&base.api, &overlay.api, |a| &a.api_key),
            library_type: pick(&base.api, &overlay.api, |a| &a.library_type),
            library_id: pick(&base.api, &overlay.api, |a| &a.library_id),
            base_url: pick(&base.api, &overlay.api, |a| &a.base_url),
        }),
        citations: Some(CitationConfig {
            style: pick(&base.citations, &overlay.citations, |c| &c.style),
            bibliography_locale: pick(&base.citations, &overlay.citations, |c| {
                &c.bibliography_locale
            }),
            bibliography_linkwrap: pick(&base.citations, &overlay.citations, |c| {
                &c.bibliography_linkwrap
            }),
        }),
        search: Some(SearchConfig {
            sort: pick(&base.search, &overlay.search, |s| &s.sort),
            page_size: pick(&base.search, &overlay.search, |s| &s.page_size),
        }),
    }
}

/// Save the config to the platform config directory.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf, String> {
    let path = config_path().ok_or_else(|| "Could not determine config directory".to_string())?;
    save_to_path(config, &path)?;
    Ok(path)
}

pub fn save_to_path(config: &ConfigFile, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let content =
        toml::to_string_pretty(config).map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(path, content).map_err(|e| format!("Failed to write config: {}", e))?;
    tracing::info!(path = %path.display(), "saved settings");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_parses() {
        let toml_str = "[api]\nlibrary_id = \"12345\"\n";
        let parsed: ConfigFile = toml::from_str(toml_str).unwrap();
        let api = parsed.api.unwrap();
        assert_eq!(api.library_id.as_deref(), Some("12345"));
        assert!(api.api_key.is_none());
        assert!(parsed.citations.is_none());
    }

    #[test]
    fn merge_overlay_wins() {
        let base = ConfigFile {
            citations: Some(CitationConfig {
                style: Some("apa".into()),
                bibliography_linkwrap: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            citations: Some(CitationConfig {
                style: Some("ieee".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(base, overlay).citations.unwrap();
        assert_eq!(merged.style.as_deref(), Some("ieee"));
        assert_eq!(merged.bibliography_linkwrap, Some(false));
    }

    #[test]
    fn merge_base_preserved_when_overlay_absent() {
        let base = ConfigFile {
            api: Some(ApiConfig {
                api_key: Some("k".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(base, ConfigFile::default());
        assert_eq!(merged.api.unwrap().api_key.as_deref(), Some("k"));
    }

    #[test]
    fn save_then_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = ConfigFile {
            search: Some(SearchConfig {
                sort: Some("creator".into()),
                page_size: Some(50),
            }),
            ..Default::default()
        };
        save_to_path(&config, &path).unwrap();
        assert_eq!(load_from_path(&path), Some(config));
    }

    #[test]
    fn unparsable_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api\nbroken").unwrap();
        assert_eq!(load_from_path(&path), None);
    }
}
