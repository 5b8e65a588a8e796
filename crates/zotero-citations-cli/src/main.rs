use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use zotero_citations_core::config_file;
use zotero_citations_core::{
    CitationDialog, CoreError, DialogAction, DialogOutcome, HtmlDocument, HttpTransport,
    SearchState, Settings,
};

mod output;

use output::ColorMode;

/// Zotero Citations - search a Zotero library and insert citations and bibliographies
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    overrides: SettingsArgs,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

/// Per-invocation overrides; these win over environment and config files.
#[derive(Args, Debug, Default)]
struct SettingsArgs {
    /// Zotero API key
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Library type: users or groups
    #[arg(long, global = true)]
    library_type: Option<String>,

    /// Numeric user or group ID
    #[arg(long, global = true)]
    library_id: Option<String>,

    /// CSL citation style (e.g. apa, ieee)
    #[arg(long, global = true)]
    style: Option<String>,

    /// Bibliography locale (e.g. en-US)
    #[arg(long, global = true)]
    locale: Option<String>,

    /// Wrap URLs and DOIs in bibliography links
    #[arg(long, global = true)]
    linkwrap: Option<bool>,

    /// Search sort: title, creator or dateModified
    #[arg(long, global = true)]
    sort: Option<String>,

    /// Results per page (1-100)
    #[arg(long, global = true)]
    page_size: Option<u32>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search the library by title, creator and year
    Search {
        query: String,

        /// Keep the dialog open: page, select and insert from a prompt
        #[arg(short, long)]
        interactive: bool,

        /// HTML document to insert into (interactive mode)
        #[arg(long)]
        document: Option<PathBuf>,

        /// Byte offset of the insertion point (default: end of document)
        #[arg(long)]
        at: Option<usize>,
    },

    /// Fetch a results page from a previous/next URL printed by `search`
    Page { url: String },

    /// Insert a citation for an item into an HTML document
    Cite {
        item_key: String,

        #[arg(long)]
        document: PathBuf,

        #[arg(long)]
        at: Option<usize>,
    },

    /// Insert a bibliography of every citation in an HTML document
    Bib {
        #[arg(long)]
        document: PathBuf,

        #[arg(long)]
        at: Option<usize>,
    },

    /// Show the effective settings
    Settings {
        /// Persist the effective settings to the platform config file
        #[arg(long)]
        save: bool,
    },

    /// Print the host page script declaring the plugin settings
    PageScript {
        #[arg(long, default_value = "/modules/ZoteroCitations/asset/js/ckeditor/plugins/zotero/")]
        plugin_path: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let color = ColorMode(!cli.no_color);
    let settings = resolve_settings(&cli.overrides)?;
    tracing::debug!(?settings, "resolved settings");

    match cli.command {
        Command::Search {
            query,
            interactive,
            document,
            at,
        } => {
            if interactive {
                interactive_search(settings, &query, document, at, color).await
            } else {
                search(settings, &query, color).await
            }
        }
        Command::Page { url } => page(settings, &url, color).await,
        Command::Cite {
            item_key,
            document,
            at,
        } => cite(settings, &item_key, &document, at, color).await,
        Command::Bib { document, at } => bib(settings, &document, at, color).await,
        Command::Settings { save } => show_settings(&settings, save, color),
        Command::PageScript { plugin_path } => {
            print!(
                "{}",
                zotero_citations_core::bridge::page_script(&settings, &plugin_path)
            );
            Ok(())
        }
    }
}

/// Resolve settings: CLI flags > env vars > config files > defaults.
fn resolve_settings(args: &SettingsArgs) -> anyhow::Result<Settings> {
    let config = config_file::load_config();
    let mut settings =
        Settings::from_config(&config)?.apply_env(|name| std::env::var(name).ok())?;

    if let Some(key) = &args.api_key {
        settings.api_key = key.clone();
    }
    if let Some(t) = &args.library_type {
        settings.library.library_type = t.parse()?;
    }
    if let Some(id) = &args.library_id {
        settings.library.library_id = id.trim().to_string();
    }
    if let Some(style) = &args.style {
        settings.set_citation_style(style);
    }
    if let Some(locale) = &args.locale {
        settings.bibliography_locale = locale.clone();
    }
    if let Some(linkwrap) = args.linkwrap {
        settings.bibliography_linkwrap = linkwrap;
    }
    if let Some(sort) = &args.sort {
        settings.search_sort = sort.parse()?;
    }
    if let Some(size) = args.page_size {
        settings.page_size = size;
    }
    settings.validate()?;
    Ok(settings)
}

fn require_library(settings: &Settings) -> anyhow::Result<()> {
    if settings.library.library_id.is_empty() {
        anyhow::bail!(
            "No library ID configured. Set ZOTERO_LIBRARY_ID, pass --library-id, or add library_id under [api] in {}",
            config_file::config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| ".zotero-citations.toml".to_string())
        );
    }
    Ok(())
}

fn open_dialog(settings: Settings) -> CitationDialog {
    CitationDialog::new(settings, Arc::new(HttpTransport::new())).with_search(|search| {
        search.with_observer(|state| {
            if matches!(state, SearchState::Loading) {
                eprintln!("Loading...");
            }
        })
    })
}

fn load_document(path: &Path, at: Option<usize>) -> anyhow::Result<HtmlDocument> {
    let html = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", path.display(), e))?;
    let mut doc = HtmlDocument::new(html);
    if let Some(offset) = at {
        doc.set_cursor(offset);
    }
    Ok(doc)
}

fn save_document(path: &Path, doc: &HtmlDocument) -> anyhow::Result<()> {
    std::fs::write(path, doc.html())
        .map_err(|e| anyhow::anyhow!("Cannot write {}: {}", path.display(), e))
}

async fn search(settings: Settings, query: &str, color: ColorMode) -> anyhow::Result<()> {
    require_library(&settings)?;
    let mut dialog = open_dialog(settings);
    let mut out = std::io::stdout();

    if let Err(e) = dialog.search_mut().search(query).await {
        anyhow::bail!("{}", e.user_message());
    }
    output::print_results(&mut out, dialog.search(), color)?;
    output::print_cursors(&mut out, dialog.search())?;
    Ok(())
}

async fn page(settings: Settings, url: &str, color: ColorMode) -> anyhow::Result<()> {
    let mut dialog = open_dialog(settings);
    show_page(&mut dialog, url, &mut std::io::stdout(), color).await
}

/// Load a cursor page through the dialog's controller and print it like
/// the first page of a search.
async fn show_page(
    dialog: &mut CitationDialog,
    url: &str,
    out: &mut dyn Write,
    color: ColorMode,
) -> anyhow::Result<()> {
    if let Err(e) = dialog.search_mut().open(url).await {
        anyhow::bail!("{}", e.user_message());
    }
    output::print_results(out, dialog.search(), color)?;
    output::print_cursors(out, dialog.search())?;
    Ok(())
}

async fn cite(
    settings: Settings,
    item_key: &str,
    document: &Path,
    at: Option<usize>,
    color: ColorMode,
) -> anyhow::Result<()> {
    require_library(&settings)?;
    let mut doc = load_document(document, at)?;
    let client = zotero_citations_core::ApiClient::new(Arc::new(HttpTransport::new()), &settings);

    let fragment = zotero_citations_core::insert_citation(
        &client,
        &mut doc,
        item_key,
        &settings.citation_style,
    )
    .await
    .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    save_document(document, &doc)?;
    output::print_success(
        &mut std::io::stdout(),
        &format!(
            "Inserted {} citation for {} into {}",
            settings.citation_style_label(),
            fragment.item_key,
            document.display()
        ),
        color,
    )?;
    Ok(())
}

async fn bib(
    settings: Settings,
    document: &Path,
    at: Option<usize>,
    color: ColorMode,
) -> anyhow::Result<()> {
    require_library(&settings)?;
    let mut doc = load_document(document, at)?;
    let mut dialog = open_dialog(settings);

    dialog
        .confirm(&mut doc, DialogAction::AddBibliography)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    save_document(document, &doc)?;
    output::print_success(
        &mut std::io::stdout(),
        &format!("Inserted bibliography into {}", document.display()),
        color,
    )?;
    Ok(())
}

fn show_settings(settings: &Settings, save: bool, color: ColorMode) -> anyhow::Result<()> {
    let mut out = std::io::stdout();
    output::print_settings(&mut out, settings, color)?;
    if save {
        let path = config_file::save_config(&settings.to_config()).map_err(anyhow::Error::msg)?;
        output::print_success(&mut out, &format!("Saved to {}", path.display()), color)?;
    }
    Ok(())
}

const PROMPT_HELP: &str = "Commands: <number> select, n next, p previous, s <text> search, \
                           c insert citation, b insert bibliography, q quit";

async fn interactive_search(
    settings: Settings,
    query: &str,
    document: Option<PathBuf>,
    at: Option<usize>,
    color: ColorMode,
) -> anyhow::Result<()> {
    require_library(&settings)?;
    let mut doc = match &document {
        Some(path) => Some(load_document(path, at)?),
        None => None,
    };
    let mut dialog = open_dialog(settings);
    let mut out = std::io::stdout();

    // Errors are already shown in the results area; keep the prompt alive.
    let _ = dialog.search_mut().search(query).await;
    output::print_results(&mut out, dialog.search(), color)?;
    writeln!(out, "{}", PROMPT_HELP)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        let result: Result<(), CoreError> = match input {
            "" => continue,
            "q" => break,
            "n" => dialog.search_mut().next().await,
            "p" => dialog.search_mut().previous().await,
            "c" | "b" => {
                let Some(doc) = doc.as_mut() else {
                    output::print_error(&mut out, "Pass --document to insert.", color)?;
                    continue;
                };
                let action = if input == "c" {
                    DialogAction::AddCitation
                } else {
                    DialogAction::AddBibliography
                };
                match dialog.confirm(doc, action).await {
                    Ok(DialogOutcome::Nothing) => {
                        output::print_error(&mut out, "No item selected.", color)?;
                    }
                    Ok(_) => {
                        if let Some(path) = &document {
                            save_document(path, doc)?;
                        }
                        output::print_success(&mut out, "Inserted.", color)?;
                    }
                    Err(e) => output::print_error(&mut out, &e.user_message(), color)?,
                }
                continue;
            }
            other => {
                if let Some(text) = other.strip_prefix("s ") {
                    dialog.search_mut().search(text.trim()).await
                } else if let Ok(n) = other.parse::<usize>() {
                    let key = dialog
                        .search()
                        .rows()
                        .get(n.wrapping_sub(1))
                        .map(|row| row.key.clone());
                    match key {
                        Some(key) => dialog.search_mut().select(&key),
                        None => Err(CoreError::UnknownItem(other.to_string())),
                    }
                } else {
                    writeln!(out, "{}", PROMPT_HELP)?;
                    continue;
                }
            }
        };

        match result {
            // Paging with no cursor leaves the page as it was.
            Err(e @ (CoreError::NoCursor(_) | CoreError::UnknownItem(_))) => {
                output::print_error(&mut out, &e.user_message(), color)?;
            }
            _ => output::print_results(&mut out, dialog.search(), color)?,
        }
    }

    dialog.close();
    Ok(())
}
