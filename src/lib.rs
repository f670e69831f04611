//! # Research Digest
//!
//! A scheduled pipeline that discovers recent arXiv preprints per configured
//! topic, scores them for relevance, reads the full text of the papers that
//! pass through a fixed five-stage LLM interrogation protocol, and renders
//! the results to a static site and an optional SMTP digest email.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use research_digest::config::Config;
//! use research_digest::llm::providers::OpenAiProvider;
//! use research_digest::orchestrator::Orchestrator;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/pipeline.yaml")?;
//!     let provider = Arc::new(OpenAiProvider::new(&config.openai.relevance_model));
//!     let orchestrator = Orchestrator::new(config, Some(provider));
//!     let result = orchestrator.run(CancellationToken::new()).await;
//!     println!("{} paper(s) summarized", result.summaries.len());
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod fetch;
pub mod llm;
pub mod model;
pub mod orchestrator;
pub mod publish;
pub mod ranker;
pub mod reading;
pub mod report;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use model::{PaperCandidate, PaperSummary, PipelineResult, PipelineStats, ScoredPaper, Topic};
pub use orchestrator::Orchestrator;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use super::{AppError, AppResult, Config, Orchestrator, PaperCandidate, PaperSummary, PipelineResult, Topic};
}
