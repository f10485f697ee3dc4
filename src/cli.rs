use crate::api::KnowledgeClient;
use crate::model::ClientConfig;
use crate::orchestrator::ViewStateManager;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "knowledge-browser",
    version,
    about = "Browse, search and extend a knowledge repository from the terminal"
)]
pub struct Cli {
    /// Base URL of the knowledge repository backend
    #[arg(long, default_value = "http://localhost:8080")]
    pub base_url: String,

    /// Per-request timeout; an expired request counts as a failure
    #[arg(long, default_value = "10s")]
    pub timeout: humantime::Duration,

    /// Maximum number of recommendations to request (backend default when unset)
    #[arg(long)]
    pub recommendation_limit: Option<u32>,

    /// Print the resulting view state as JSON and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print a text summary and exit (no TUI)
    #[arg(long, conflicts_with = "json")]
    pub text: bool,

    /// Run a server-side search instead of listing the full catalog
    #[arg(long, conflicts_with_all = ["show", "add"])]
    pub search: Option<String>,

    /// Show one document with its recommendations
    #[arg(long, conflicts_with = "add")]
    pub show: Option<String>,

    /// Submit a new document by URL, then list the refreshed catalog
    #[arg(long)]
    pub add: Option<String>,

    /// Log file for the interactive UI (defaults to the user cache directory)
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,
}

impl Cli {
    pub fn is_interactive(&self) -> bool {
        !self.json && !self.text
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if args.is_interactive() {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_oneshot(args).await;
        }
    }

    run_oneshot(args).await
}

/// Build a `ClientConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> ClientConfig {
    ClientConfig {
        base_url: args.base_url.clone(),
        request_timeout: Duration::from(args.timeout),
        user_agent: format!("knowledge-browser/{}", env!("CARGO_PKG_VERSION")),
        recommendation_limit: args.recommendation_limit,
    }
}

/// Drive one action to quiescence and print the resulting state.
async fn run_oneshot(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let client = KnowledgeClient::new(&cfg).context("failed to build backend client")?;
    let mut manager = ViewStateManager::new(client.clone());

    if let Some(url) = args.add.as_deref() {
        if !manager.create_from_url(url) {
            return Err(anyhow::anyhow!("--add requires a non-empty URL"));
        }
    } else if let Some(id) = args.show.as_deref() {
        manager.select(id);
    } else if let Some(term) = args.search.as_deref() {
        manager.search(term);
    } else {
        manager.start();
    }
    manager.settle().await;

    let state = manager.state().clone();
    let (out_tx, out_handle) = spawn_output_writer();

    if let Some(url) = args.add.as_deref() {
        if state.error.is_none() {
            let _ = out_tx.send(OutputLine::Stderr(format!("Added: {url}")));
        }
    }

    if args.json {
        let out = serde_json::to_string_pretty(&state)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        let summary =
            crate::text_summary::build_text_summary(&state, |id| client.download_url(id));
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }

    drop(out_tx);
    let _ = out_handle.await;

    match state.error {
        Some(err) => Err(anyhow::anyhow!(err)),
        None => Ok(()),
    }
}
