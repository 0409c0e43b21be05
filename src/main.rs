mod config;
mod explain;
mod pipeline;
mod pr;
mod render;
mod report;
mod ticket;

use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

use explain::{Explainer, OpenAiClient};
use pipeline::{Mode, Pipeline, RunOptions};
use render::{MarkupRenderer, Palette};
use report::Printer;
use ticket::TicketPattern;

/// PR Explainer — walks merged Bitbucket pull requests, looks up the Jira
/// ticket named in each title, and prints an AI-written explanation of the diff.
#[derive(Parser, Debug)]
#[command(name = "pr-explainer", version, about)]
struct Cli {
    /// Jira ticket to process (e.g., TT-3964); PRs for other tickets are skipped
    #[arg(short, long)]
    ticket: Option<String>,

    /// Print each PR's raw diff instead of requesting an explanation
    #[arg(long, conflicts_with = "inspect")]
    raw: bool,

    /// Print a per-hunk listing of added and removed lines instead of an explanation
    #[arg(long)]
    inspect: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Config file path (defaults to .pr-explainer.toml in the current directory)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.raw {
            Mode::RawDiff
        } else if self.inspect {
            Mode::Inspect
        } else {
            Mode::Explain
        }
    }

    /// Colour only when asked for and stdout is a terminal.
    fn use_color(&self, stdout_is_terminal: bool) -> bool {
        !self.no_color && stdout_is_terminal
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    match dotenv {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(e) => debug!(error = %e, "no .env loaded"),
    }

    let cli = Cli::parse();
    let mode = cli.mode();
    let _main_span = info_span!("pr_explain", mode = ?mode).entered();

    info!("loading configuration");
    let config = config::Config::load(cli.config.as_deref())?;

    // Banners (colored) and the rendered body must agree on colour.
    let palette = if cli.use_color(std::io::stdout().is_terminal()) {
        Palette::ansi()
    } else {
        colored::control::set_override(false);
        Palette::plain()
    };

    let http = config.http.build_client()?;
    let source = pr::BitbucketClient::from_config(&config.bitbucket, http.clone())?;
    let tracker = ticket::JiraClient::from_config(&config.jira, http.clone())?;
    let pattern = TicketPattern::new(&config.ticket.pattern)?;

    // Only explain mode talks to the text-generation service, so only it needs a key.
    let generator = match mode {
        Mode::Explain => Some(OpenAiClient::from_config(
            &config.openai,
            http,
            config.http.timeout(),
        )?),
        Mode::RawDiff | Mode::Inspect => None,
    };

    let mut pipeline = Pipeline::new(&source, &tracker, pattern, MarkupRenderer::new(palette.clone()));
    if let Some(generator) = &generator {
        pipeline = pipeline.with_explainer(Explainer::new(generator));
    }

    let options = RunOptions {
        mode,
        ticket_filter: cli.ticket,
        summary: config.summary.mode,
    };

    let stdout = std::io::stdout();
    let mut printer = Printer::new(stdout.lock(), &palette);
    let run_report = pipeline.run(&options, &mut printer).await?;
    info!(processed = run_report.processed, listed = run_report.summary.len(), "done");

    Ok(())
}
