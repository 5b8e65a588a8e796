use std::io::Write;

use owo_colors::OwoColorize;
use zotero_citations_core::settings::{FieldKind, SettingField};
use zotero_citations_core::{SearchController, SearchState, Settings};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print the current results page, or the error that replaced it.
pub fn print_results(
    w: &mut dyn Write,
    search: &SearchController,
    color: ColorMode,
) -> std::io::Result<()> {
    match search.state() {
        SearchState::Idle => {}
        SearchState::Loading => writeln!(w, "Loading...")?,
        SearchState::Errored(message) => print_error(w, message, color)?,
        SearchState::Loaded(_) => {
            let rows = search.rows();
            if rows.is_empty() {
                writeln!(w, "No items found.")?;
            }
            for (i, row) in rows.iter().enumerate() {
                let marker = if row.selected { "(*)" } else { "( )" };
                if color.enabled() {
                    writeln!(
                        w,
                        "{} {} {}  {}  {}",
                        format!("[{}]", i + 1).bold().yellow(),
                        marker,
                        row.key.dimmed(),
                        row.title.bold(),
                        row.creator
                    )?;
                } else {
                    writeln!(
                        w,
                        "[{}] {} {}  {}  {}",
                        i + 1,
                        marker,
                        row.key,
                        row.title,
                        row.creator
                    )?;
                }
            }

            let mut pager = Vec::new();
            if search.previous_visible() {
                pager.push("p: previous");
            }
            if search.next_visible() {
                pager.push("n: next");
            }
            if !pager.is_empty() {
                if color.enabled() {
                    writeln!(w, "{}", pager.join("  ").cyan())?;
                } else {
                    writeln!(w, "{}", pager.join("  "))?;
                }
            }
        }
    }
    Ok(())
}

/// Print the paging URLs so a later `page` call can follow them.
pub fn print_cursors(w: &mut dyn Write, search: &SearchController) -> std::io::Result<()> {
    if let Some(page) = search.page() {
        if let Some(prev) = &page.previous {
            writeln!(w, "previous: {}", prev)?;
        }
        if let Some(next) = &page.next {
            writeln!(w, "next: {}", next)?;
        }
    }
    Ok(())
}

pub fn print_error(w: &mut dyn Write, message: &str, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{}", message.red())
    } else {
        writeln!(w, "{}", message)
    }
}

pub fn print_success(w: &mut dyn Write, message: &str, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{}", message.green())
    } else {
        writeln!(w, "{}", message)
    }
}

/// Print the effective settings as the user-settings form would show them.
pub fn print_settings(
    w: &mut dyn Write,
    settings: &Settings,
    color: ColorMode,
) -> std::io::Result<()> {
    for field in settings.user_setting_fields() {
        let value = display_value(&field);
        if color.enabled() {
            writeln!(w, "{}: {}", field.label.bold(), value)?;
        } else {
            writeln!(w, "{}: {}", field.label, value)?;
        }
    }
    Ok(())
}

fn display_value(field: &SettingField) -> String {
    if field.name == "zotero_citations_api_key" && !field.value.is_empty() {
        return "***".to_string();
    }
    match field.kind {
        FieldKind::Select => field
            .options
            .iter()
            .find(|(value, _)| *value == field.value)
            .map(|(value, label)| format!("{} ({})", label, value))
            .unwrap_or_else(|| field.value.clone()),
        FieldKind::Checkbox => if field.value == "1" { "yes" } else { "no" }.to_string(),
        FieldKind::Number | FieldKind::Text if field.value.is_empty() => "(not set)".to_string(),
        FieldKind::Number | FieldKind::Text => field.value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_output_hides_api_key() {
        let settings = Settings {
            api_key: "hunter2".into(),
            ..Settings::default()
        };
        let mut buf = Vec::new();
        print_settings(&mut buf, &settings, ColorMode(false)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(!text.contains("hunter2"));
        assert!(text.contains("Zotero Citation: API key: ***"));
        assert!(text.contains("Chicago (author-date) (chicago-author-date)"));
        assert!(text.contains("Zotero Citation: API library ID: (not set)"));
    }
}
