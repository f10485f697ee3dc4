mod api;
mod cli;
mod generation;
mod logging;
mod model;
mod orchestrator;
mod store;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

#[cfg(test)]
#[path = "tests/manager_tests.rs"]
mod manager_tests;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    if args.is_interactive() && cfg!(feature = "tui") {
        // Logging to a file is best-effort; the UI still works without it.
        if let Some(path) = args.log_file.clone().or_else(logging::default_log_path) {
            let _ = logging::init_file(&path);
        }
    } else {
        logging::init_stderr()?;
    }

    cli::run(args).await
}
