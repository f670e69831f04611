//! Orchestrator: sequences topics, fans out papers within a topic under a
//! bounded worker pool, and invokes the publishers once every topic has
//! been processed. Grounded in `original_source/src/workflow/
//! pipeline.py::run_pipeline`; concurrency generalizes the teacher's
//! `client/mod.rs` `tokio::join!` parallel-fetch idiom into a
//! `Semaphore`-gated pool sized by `runtime.max_concurrency`.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::archive::ArchiveClient;
use crate::config::Config;
use crate::config::RuntimeMode;
use crate::fetch::ContentFetcher;
use crate::llm::{LlmConfig, LlmProvider};
use crate::model::{PaperCandidate, PaperSummary, PipelineResult, PipelineStats, ScoredPaper, Topic};
use crate::publish;
use crate::ranker::RelevanceRanker;
use crate::reading::ReadingEngine;
use crate::report::ReportBuilder;

pub struct Orchestrator {
    config: Config,
    llm: Option<Arc<dyn LlmProvider>>,
    archive: ArchiveClient,
    fetcher: ContentFetcher,
}

impl Orchestrator {
    pub fn new(config: Config, llm: Option<Arc<dyn LlmProvider>>) -> Self {
        Self { config, llm, archive: ArchiveClient::new(), fetcher: ContentFetcher::new() }
    }

    /// Runs the full pipeline: every configured topic in order, then the
    /// publishers over whatever summaries were completed. Honors
    /// `cancellation`: stops scheduling new papers once tripped, but still
    /// runs publishers over partial results.
    pub async fn run(&self, cancellation: CancellationToken) -> PipelineResult {
        let start = Utc::now();
        let mut stats = PipelineStats { start: Some(start), ..Default::default() };
        let mut summaries: Vec<PaperSummary> = Vec::new();

        let topic_count = self.config.topics.len();
        for (i, topic) in self.config.topics.iter().enumerate() {
            if cancellation.is_cancelled() {
                tracing::info!("cancellation observed; skipping remaining topics");
                break;
            }

            let fetch_spinner = shared::progress::spinner(format!("({}/{topic_count}) fetching topic {}", i + 1, topic.label));
            let mut candidates = self.archive.fetch(topic, &self.config.fetch).await;
            fetch_spinner.finish_and_clear();

            if candidates.is_empty() && matches!(self.config.runtime.mode, RuntimeMode::Offline) {
                tracing::info!("no candidates for topic {} in offline mode; synthesizing a demo candidate", topic.label);
                candidates.push(synthesize_demo_candidate(topic));
            }

            stats.papers_fetched += candidates.len();
            tracing::info!("topic {}: {} candidate(s) after fetch", topic.label, candidates.len());

            if let Some(limit) = self.config.runtime.paper_limit {
                candidates.truncate(limit);
            }

            let is_demo_run = candidates.iter().any(|c| c.arxiv_id.starts_with("demo-"));
            let relevance_provider = self.relevance_provider();
            let ranker = RelevanceRanker::new(relevance_provider.as_ref().map(|(p, c)| (p.as_ref(), c)));
            let scored = ranker.rank(topic, candidates, &self.config.relevance).await;

            let selected: Vec<ScoredPaper> = scored
                .into_iter()
                .filter(|s| is_demo_run || matches!(s.decision, crate::model::RankDecision::Include))
                .collect();

            stats.papers_selected += selected.len();
            tracing::info!("topic {}: {} paper(s) selected after threshold", topic.label, selected.len());

            let topic_summaries = self.process_topic(topic, selected, &cancellation).await;
            summaries.extend(topic_summaries);
            stats.topics_processed += 1;
        }

        publish::build_site(&self.config.site, &self.config.topics, &summaries).unwrap_or_else(|e| {
            tracing::error!("static site build failed: {e}");
        });

        let run_date = start.format("%Y-%m-%d").to_string();
        publish::send_digest(&self.config.email, &summaries, &run_date);

        stats.end = Some(Utc::now());
        PipelineResult { summaries, stats }
    }

    async fn process_topic(&self, topic: &Topic, selected: Vec<ScoredPaper>, cancellation: &CancellationToken) -> Vec<PaperSummary> {
        let max_concurrency = self.config.runtime.max_concurrency.max(1);
        let semaphore = Arc::new(Semaphore::new(max_concurrency));
        let total = selected.len();
        let max_chars = self.config.summarization.max_content_chars;
        let bar = shared::progress::topic_bar(total, &topic.label);

        let results: Vec<Option<PaperSummary>> = stream::iter(selected.into_iter().enumerate())
            .map(|(idx, scored)| {
                let semaphore = semaphore.clone();
                let cancellation = cancellation.clone();
                let topic = topic.clone();
                let bar = bar.clone();
                async move {
                    if cancellation.is_cancelled() {
                        return None;
                    }
                    let _permit = semaphore.acquire().await.ok()?;

                    tracing::info!(
                        "[{}] {} — score {:.1}",
                        scored.candidate.arxiv_id,
                        scored.candidate.title,
                        scored.normalized_score
                    );

                    let summarization_config = self.summarization_llm_config();
                    let provider_pair: Option<(&dyn LlmProvider, &LlmConfig)> =
                        self.llm.as_deref().map(|p| (p, &summarization_config));

                    let content = self.fetcher.resolve(&scored.candidate, provider_pair, max_chars).await;
                    let engine = ReadingEngine::new(provider_pair);
                    let reading = engine.read(&topic, &scored.candidate, &content, &self.config.summarization).await;
                    let summary = ReportBuilder::build(topic.clone(), scored, reading);

                    bar.inc(1);
                    tracing::info!("completed {}/{total} for topic {}", idx + 1, topic.label);
                    Some(summary)
                }
            })
            .buffered(max_concurrency)
            .collect()
            .await;

        bar.finish_and_clear();
        results.into_iter().flatten().collect()
    }

    fn relevance_provider(&self) -> Option<(Arc<dyn LlmProvider>, LlmConfig)> {
        self.llm.clone().map(|p| {
            let config = LlmConfig::new()
                .with_model(self.config.openai.relevance_model.clone())
                .with_temperature(self.config.openai.temperature)
                .with_json_mode(true);
            (p, config)
        })
    }

    fn summarization_llm_config(&self) -> LlmConfig {
        LlmConfig::new()
            .with_model(self.config.openai.summarization_model.clone())
            .with_temperature(self.config.openai.temperature)
            .with_json_mode(true)
    }
}

/// Builds one deterministic candidate so downstream stages remain testable
/// when the archive returns nothing in offline mode. Always cleared for
/// selection regardless of the heuristic score, since its purpose is to
/// exercise the reading engine and report builder, not to model relevance.
fn synthesize_demo_candidate(topic: &Topic) -> PaperCandidate {
    let now = Utc::now();
    let arxiv_id = format!("demo-{}-0001", slugify(&topic.label));
    PaperCandidate::new(
        arxiv_id.clone(),
        format!("A demonstration paper for {}", topic.label),
        format!(
            "This is a synthesized candidate used when no live results are available in offline mode. \
             It stands in for the topic's interest: {}.",
            if topic.interest_prompt.trim().is_empty() { "general research" } else { topic.interest_prompt.as_str() }
        ),
        vec!["Demo Author".to_string()],
        if topic.query.categories.is_empty() { vec!["cs.AI".to_string()] } else { topic.query.categories.clone() },
        now,
        now,
        format!("https://arxiv.org/abs/{arxiv_id}"),
        format!("https://arxiv.org/pdf/{arxiv_id}.pdf"),
    )
}

fn slugify(label: &str) -> String {
    let mut slug = String::new();
    let mut last_was_dash = false;
    for c in label.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    slug.trim_matches('-').to_string()
}
