//! Postcode Marker - Dutch postal code annotator
//!
//! Entry point for the `postcode-marker` command.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use postcode_marker::activation::should_activate;
use postcode_marker::clipboard::{Clipboard, CommandClipboard, MemoryClipboard};
use postcode_marker::dom::{inner_html, Document, SharedDocument};
use postcode_marker::engine::{trigger_of, CopyOutcome, CODE_ATTR, WRAPPER_CLASS};
use postcode_marker::metrics::{init_metrics, render_metrics};
use postcode_marker::observability::init_tracing;
use postcode_marker::settings::{
    initialize_defaults, load_or_default, FileSettingsStore, Settings, SettingsHandle,
    SettingsStore,
};
use postcode_marker::{Config, Engine, EngineConfig, Error, Result};

/// Postcode Marker - finds Dutch postal codes and adds copy buttons
#[derive(Parser, Debug)]
#[command(name = "postcode-marker")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "POSTCODE_MARKER_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, env = "POSTCODE_MARKER_LOG_JSON", global = true)]
    log_json: bool,

    /// Settings file
    #[arg(
        long,
        env = "POSTCODE_MARKER_SETTINGS",
        default_value = "./postcode-marker.json",
        global = true
    )]
    settings: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Annotate the postal codes in a text file and print the result as HTML
    Annotate {
        /// Input file; each non-empty line becomes a paragraph
        file: PathBuf,

        /// Copy this postal code after annotating
        #[arg(long)]
        copy: Option<String>,

        /// Print Prometheus metrics after the run
        #[arg(long)]
        metrics: bool,

        /// Command receiving copied text on stdin (e.g. "wl-copy")
        #[arg(long, env = "POSTCODE_MARKER_CLIPBOARD_COMMAND")]
        clipboard_command: Option<String>,

        /// Report clipboard failures as warnings
        #[arg(long, env = "POSTCODE_MARKER_DEBUG_CLIPBOARD")]
        debug_clipboard: bool,

        /// Copy feedback duration in milliseconds
        #[arg(long, env = "POSTCODE_MARKER_FEEDBACK_MS", default_value = "1500")]
        feedback_ms: u64,
    },

    /// Inspect or change the stored settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    /// Print the settings in effect
    Show,
    /// Store the defaults unless settings already exist
    Init,
    /// Change one or both toggles
    Set {
        /// Favour responsiveness over scan throughput
        #[arg(long)]
        performance_mode: Option<bool>,

        /// Run on every site
        #[arg(long)]
        whole_site: Option<bool>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.log_json);

    let mut config = Config {
        log_level: cli.log_level,
        log_json: cli.log_json,
        settings_path: cli.settings,
        ..Config::default()
    };
    let store = FileSettingsStore::new(&config.settings_path);

    match cli.command {
        Command::Annotate {
            file,
            copy,
            metrics,
            clipboard_command,
            debug_clipboard,
            feedback_ms,
        } => {
            config.clipboard_command = clipboard_command;
            config.debug_clipboard = debug_clipboard;
            config.feedback_duration = Duration::from_millis(feedback_ms);
            config.validate()?;
            tracing::debug!(?config, "Configuration loaded");

            annotate(&config, &store, &file, copy.as_deref(), metrics).await
        }
        Command::Settings { action } => {
            config.validate()?;
            run_settings(&store, action)
        }
    }
}

async fn annotate(
    config: &Config,
    store: &dyn SettingsStore,
    file: &std::path::Path,
    copy: Option<&str>,
    metrics: bool,
) -> Result<()> {
    init_metrics();

    let input = tokio::fs::read_to_string(file).await?;
    let doc = SharedDocument::new(document_from_lines(&input)?);

    let settings = SettingsHandle::new(load_or_default(store));
    if !should_activate(&settings.current()) {
        tracing::info!("Disabled for all sites, leaving document untouched");
        println!("{}", body_html(&doc));
        return Ok(());
    }

    let memory = MemoryClipboard::new();
    let clipboard: Arc<dyn Clipboard> = match &config.clipboard_command {
        Some(command) => Arc::new(CommandClipboard::parse(command)?),
        None => Arc::new(memory.clone()),
    };

    let engine = Engine::new(
        doc.clone(),
        settings.subscribe(),
        clipboard,
        EngineConfig::from(config),
    );
    let report = engine.scan_now().await;
    tracing::info!(
        candidates = report.candidates,
        wrappers = report.outcome.wrappers_created,
        "Annotated {}",
        file.display()
    );
    println!("{}", body_html(&doc));

    if let Some(code) = copy {
        let trigger = doc.read(|d| {
            let scope = d.body().unwrap_or_else(|| d.root());
            d.elements_with_class(scope, WRAPPER_CLASS)
                .into_iter()
                .find(|&w| d.attribute(w, CODE_ATTR) == Some(code))
                .and_then(|w| trigger_of(d, w))
        });
        let trigger =
            trigger.ok_or_else(|| Error::internal(format!("no postal code '{code}' in document")))?;

        match engine.copy(trigger).await {
            CopyOutcome::Copied(copied) => match memory.contents() {
                Some(payload) => eprintln!("Copied {copied} (clipboard: {payload})"),
                None => eprintln!("Copied {copied}"),
            },
            CopyOutcome::Failed => eprintln!("Could not copy {code}"),
            CopyOutcome::MissingCode => eprintln!("Trigger for {code} has no code"),
        }
    }

    if metrics {
        print!("{}", render_metrics()?);
    }
    Ok(())
}

fn document_from_lines(input: &str) -> Result<Document> {
    let mut doc = Document::with_body();
    let body = doc
        .body()
        .ok_or_else(|| Error::internal("document has no body"))?;
    for line in input.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let paragraph = doc.create_element("p");
        let text = doc.create_text(line);
        doc.append_child(paragraph, text)?;
        doc.append_child(body, paragraph)?;
    }
    Ok(doc)
}

fn body_html(doc: &SharedDocument) -> String {
    doc.read(|d| d.body().map(|body| inner_html(d, body)).unwrap_or_default())
}

fn run_settings(store: &FileSettingsStore, action: SettingsAction) -> Result<()> {
    let settings = match action {
        SettingsAction::Show => load_or_default(store),
        SettingsAction::Init => initialize_defaults(store)?,
        SettingsAction::Set {
            performance_mode,
            whole_site,
        } => {
            let current = load_or_default(store);
            let updated = Settings {
                whole_site_enabled: whole_site.unwrap_or(current.whole_site_enabled),
                performance_mode: performance_mode.unwrap_or(current.performance_mode),
            };
            store.save(&updated)?;
            tracing::info!(path = %store.path().display(), "Settings saved");
            updated
        }
    };

    let json = serde_json::to_string_pretty(&settings)
        .map_err(|e| Error::internal(format!("failed to encode settings: {e}")))?;
    println!("{json}");
    Ok(())
}
