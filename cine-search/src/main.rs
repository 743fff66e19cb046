//! cine-search - Search a movie catalogue and filter the results live

mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use libcinesearch::logging::{LogFormat, LoggingConfig};
use libcinesearch::{Config, SearchError, SearchScreen};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::render::{render, OutputFormat};

#[derive(Parser, Debug)]
#[command(name = "cine-search")]
#[command(version, about = "Search a movie catalogue and filter the results live")]
#[command(long_about = r#"Fetch search results from the OMDb API and filter them as you type.

Every line read from stdin becomes the new filter text (case-insensitive
substring match on titles). An empty line clears the filter. The result
list is printed again after every change. Ctrl-D or Ctrl-C ends the session.

EXAMPLES:
    # Interactive session
    cine-search --api-key <KEY>

    # One-shot search, filtered
    cine-search --once --term batman --filter "dark knight"

    # JSON output for scripting
    cine-search --once --format json | jq '.[] | .title'

CONFIGURATION:
    Settings are read from $CINESEARCH_CONFIG or
    ~/.config/cinesearch/config.toml. Command-line flags take precedence.

EXIT CODES:
    0 - Success (including empty results)
    1 - Error (invalid configuration, missing API key, etc.)
    3 - Invalid input
"#)]
struct Cli {
    /// Path to config file (defaults to $CINESEARCH_CONFIG, then the XDG config dir)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Search term sent to the API
    #[arg(short, long, value_name = "TERM")]
    term: Option<String>,

    /// Number of result pages to fetch concurrently
    #[arg(short, long, value_name = "N")]
    pages: Option<u32>,

    /// OMDb API key
    #[arg(long, value_name = "KEY", env = "CINESEARCH_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Initial filter text
    #[arg(short, long, value_name = "TEXT")]
    filter: Option<String>,

    /// Fetch, print the filtered results once and exit
    #[arg(long)]
    once: bool,

    /// Output format: text, json or jsonl
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log format (text, json, pretty); defaults to $CINESEARCH_LOG_FORMAT or text
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = LoggingConfig::from_env(cli.verbose)
        .with_format(cli.log_format)
        .try_init()
    {
        eprintln!("Warning: failed to initialize logging: {}", e);
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<SearchError>()
            .map_or(1, SearchError::exit_code);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let format: OutputFormat = cli.format.parse().map_err(SearchError::InvalidInput)?;
    let config = load_config(&cli)?;

    let screen = SearchScreen::from_config(&config)?;
    if let Some(text) = &cli.filter {
        screen.set_filter_text(Some(text.clone()));
    }

    if cli.once {
        run_once(&screen, format).await
    } else {
        run_interactive(&screen, format).await
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = Config::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.apply_env_overrides();
            config
        }
        None => Config::load()?,
    };

    if let Some(term) = &cli.term {
        config.api.search_term = term.clone();
    }
    if let Some(pages) = cli.pages {
        config.fetch.pages = pages;
    }
    if let Some(key) = &cli.api_key {
        config.api.api_key = Some(key.clone());
    }

    config.validate()?;
    debug!(?config, "Configuration loaded");
    Ok(config)
}

async fn run_once(screen: &SearchScreen, format: OutputFormat) -> Result<()> {
    screen.ready()?;

    if let Some(report) = screen.store().join().await {
        if !report.failed_pages.is_empty() {
            warn!(
                "{} of {} pages failed: {:?}",
                report.failed_pages.len(),
                report.failed_pages.len() + report.loaded_pages.len(),
                report.failed_pages
            );
        }
    }

    let view = screen.current_view();
    render(&mut std::io::stdout().lock(), &view, format).context("Failed to write results")?;
    screen.teardown();
    Ok(())
}

async fn run_interactive(screen: &SearchScreen, format: OutputFormat) -> Result<()> {
    let mut view = screen.view_state().watch();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;

    screen.ready()?;

    loop {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                match line.context("Failed to read filter text")? {
                    Some(line) => screen.set_filter_text(Some(line)),
                    None => {
                        debug!("Input closed, tearing down");
                        input_open = false;
                        screen.teardown();
                    }
                }
            }
            next = view.next() => match next {
                Some(movies) => {
                    render(&mut std::io::stdout().lock(), &movies, format)
                        .context("Failed to write results")?;
                }
                // Pipeline stopped after teardown
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupted, tearing down");
                screen.teardown();
                break;
            }
        }
    }

    Ok(())
}
