//! Host page bridge.
//!
//! Hosts that embed the editor plugin in a page expose the user's settings
//! as global string constants the plugin reads when it configures itself.
//! Option tables are JSON-encoded `[label, value]` pairs, the shape editor
//! select widgets take.

use crate::settings::{BIBLIOGRAPHY_LOCALES, CITATION_STYLES, Settings};

/// Drop any cache-busting query string from an asset URL.
pub fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

/// `[[label, value], ...]` as JSON.
pub fn options_json(table: &[(&str, &str)]) -> String {
    let pairs: Vec<[&str; 2]> = table.iter().map(|(value, label)| [*label, *value]).collect();
    serde_json::json!(pairs).to_string()
}

/// Escape `s` for use inside a double-quoted JavaScript string literal.
///
/// Non-alphanumeric ASCII is written as `\xHH` and everything above ASCII
/// as `\uHHHH` (surrogate pairs for astral characters), so the result is
/// also safe inside an inline `<script>` element.
pub fn escape_js(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, ',' | '.' | '_') {
            out.push(c);
        } else if c.is_ascii() {
            out.push_str(&format!("\\x{:02X}", c as u32));
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04X}", unit));
            }
        }
    }
    out
}

/// The inline script declaring the plugin's global settings.
pub fn page_script(settings: &Settings, plugin_path: &str) -> String {
    let constants: [(&str, String); 11] = [
        (
            "ZoteroCitationsCkeditorPluginPath",
            strip_query(plugin_path).to_string(),
        ),
        ("ZoteroCitationsCitationStyles", options_json(CITATION_STYLES)),
        (
            "ZoteroCitationsCitationStyle",
            settings.citation_style.clone(),
        ),
        (
            "ZoteroCitationsBibliographyLocales",
            options_json(BIBLIOGRAPHY_LOCALES),
        ),
        (
            "ZoteroCitationsBibliographyLocale",
            settings.bibliography_locale.clone(),
        ),
        (
            "ZoteroCitationsBibliographyLinkwrap",
            if settings.bibliography_linkwrap { "1" } else { "0" }.to_string(),
        ),
        (
            "ZoteroCitationsApiLibraryType",
            settings.library.library_type.as_str().to_string(),
        ),
        (
            "ZoteroCitationsApiLibraryId",
            settings.library.library_id.clone(),
        ),
        ("ZoteroCitationsApiKey", settings.api_key.clone()),
        (
            "ZoteroCitationsSearchSort",
            settings.search_sort.as_str().to_string(),
        ),
        (
            "ZoteroCitationsSearchLimit",
            settings.page_size.to_string(),
        ),
    ];

    constants
        .iter()
        .map(|(name, value)| format!("const {} = \"{}\";\n", name, escape_js(value)))
        .collect()
}
