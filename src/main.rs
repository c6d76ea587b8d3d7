use anyhow::{Context, Result, bail};
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use intelligence_lens::IntelligenceService;
use intelligence_lens::config::Config;
use intelligence_lens::error::GENERIC_FAILURE_MESSAGE;
use intelligence_lens::session::SessionStatus;
use intelligence_lens::visual;

/// Structured investment analysis of a company, a pasted text or a report.
/// With neither --file nor TEXT, the text is read from stdin.
#[derive(Parser, Debug)]
#[command(name = "intelligence-lens", version, about, long_about = None)]
struct Cli {
    /// PDF or TXT report to analyze instead of text
    #[arg(short, long, conflicts_with = "text")]
    file: Option<PathBuf>,

    /// Let the model ground its answer with web search
    #[arg(long, conflicts_with = "no_search")]
    search: bool,

    /// Answer from the input alone
    #[arg(long)]
    no_search: bool,

    /// Company name or text to analyze
    #[arg(trailing_var_arg = true)]
    text: Vec<String>,
}

impl Cli {
    /// Explicit web search choice; `None` keeps the configured default.
    fn web_search(&self) -> Option<bool> {
        match (self.search, self.no_search) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }

    fn joined_text(&self) -> String {
        self.text.join(" ")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only the report
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("intelligence_lens=info")),
        )
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load();
    if !config.has_api_key() {
        bail!("GEMINI_API_KEY (or API_KEY) must be set to reach the analysis backend");
    }

    let service = IntelligenceService::new(&config)?;
    let mut session = service.new_session();
    if let Some(enabled) = cli.web_search() {
        session.set_use_web_search(enabled);
    }

    if let Some(path) = &cli.file {
        if session.upload(service.collector(), path).await == SessionStatus::Error {
            eprintln!("{}", visual::render_error(session.error().unwrap_or(GENERIC_FAILURE_MESSAGE)));
            std::process::exit(1);
        }
    } else {
        let text = cli.joined_text();
        let text = if text.trim().is_empty() {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read text from stdin")?;
            buf
        } else {
            text
        };
        session.set_text(text);
    }

    if !session.can_run() {
        bail!("nothing to analyze: pass TEXT, --file PATH, or pipe text on stdin");
    }

    eprintln!(
        "Analyzing{}...",
        if session.use_web_search() { " with web search" } else { "" }
    );

    match session.run(service.analyzer()).await {
        SessionStatus::Completed => {
            if let Some(result) = session.result() {
                print!("{}", visual::render(result));
            }
            Ok(())
        }
        _ => {
            eprintln!("{}", visual::render_error(session.error().unwrap_or(GENERIC_FAILURE_MESSAGE)));
            std::process::exit(1);
        }
    }
}
