//! CLI entry point for the research digest pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use research_digest::config::{Config, RuntimeMode};
use research_digest::llm::{LlmProvider, providers::OpenAiProvider};
use research_digest::orchestrator::Orchestrator;
use shared::logger::init_logger;
use tokio_util::sync::CancellationToken;

/// Research digest pipeline: discover, rank, read, and publish arXiv papers per topic.
#[derive(Parser)]
#[command(name = "research-digest")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline once: fetch, rank, read, and publish.
    Run {
        /// Path to the pipeline YAML configuration.
        #[arg(long, default_value = "config/pipeline.yaml")]
        config: PathBuf,

        /// Overrides `runtime.mode` from the configuration file.
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Overrides `runtime.paper_limit` from the configuration file.
        #[arg(long)]
        paper_limit: Option<usize>,

        /// Forces the email digest on regardless of `email.enabled`.
        #[arg(long, conflicts_with = "no_email")]
        email: bool,

        /// Forces the email digest off regardless of `email.enabled`.
        #[arg(long)]
        no_email: bool,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    Online,
    Offline,
}

impl From<ModeArg> for RuntimeMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Online => RuntimeMode::Online,
            ModeArg::Offline => RuntimeMode::Offline,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, mode, paper_limit, email, no_email } => {
            run(config, mode, paper_limit, email, no_email).await
        }
    }
}

async fn run(
    config_path: PathBuf,
    mode: Option<ModeArg>,
    paper_limit: Option<usize>,
    email: bool,
    no_email: bool,
) -> anyhow::Result<()> {
    let mut config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    if let Some(mode) = mode {
        config.runtime.mode = mode.into();
    }
    if paper_limit.is_some() {
        config.runtime.paper_limit = paper_limit;
    }
    if email {
        config.email.enabled = true;
    }
    if no_email {
        config.email.enabled = false;
    }

    if let Err(e) = config.validate() {
        eprintln!("configuration error: {e}");
        std::process::exit(1);
    }

    init_logger(config.runtime.console_level.as_deref())?;

    let llm: Option<Arc<dyn LlmProvider>> = match config.runtime.mode {
        RuntimeMode::Online => {
            let mut provider = OpenAiProvider::new(config.openai.relevance_model.clone());
            if let Some(base_url) = &config.openai.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Some(Arc::new(provider) as Arc<dyn LlmProvider>)
        }
        RuntimeMode::Offline => None,
    };

    let cancellation = CancellationToken::new();
    let signal_token = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received; finishing in-flight work and publishing partial results");
            signal_token.cancel();
        }
    });

    let orchestrator = Orchestrator::new(config, llm);
    let result = orchestrator.run(cancellation.clone()).await;

    tracing::info!(
        "run complete: {} topic(s), {} paper(s) fetched, {} selected, {} summarized",
        result.stats.topics_processed,
        result.stats.papers_fetched,
        result.stats.papers_selected,
        result.summaries.len()
    );

    if cancellation.is_cancelled() {
        std::process::exit(130);
    }

    Ok(())
}
