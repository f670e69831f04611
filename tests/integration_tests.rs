//! End-to-end tests that exercise the pipeline stages wired together
//! the way `Orchestrator::run` wires them, without making any real
//! network or LLM calls. Every scenario here runs entirely offline.

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use research_digest::config::Config;
use research_digest::error::{AppError, AppResult};
use research_digest::fetch::{ContentSource, FetchedContent};
use research_digest::llm::{LlmConfig, LlmProvider, Message};
use research_digest::model::{PaperCandidate, RankDecision, Topic, TopicQuery};
use research_digest::orchestrator::Orchestrator;
use research_digest::publish;
use research_digest::ranker::RelevanceRanker;
use research_digest::reading::ReadingEngine;
use research_digest::report::ReportBuilder;

fn offline_config_yaml() -> &'static str {
    r#"
openai:
  relevance_model: gpt-4o-mini
  summarization_model: gpt-4o-mini
topics:
  - name: retrieval
    label: Retrieval
    query:
      categories: [cs.IR]
      include: [retrieval]
      exclude: [survey]
    interest_prompt: dense retrieval and reranking
relevance:
  scoring_dimensions:
    - name: topic_alignment
      weight: 0.5
    - name: experiment_depth
      weight: 0.5
  pass_threshold: 40.0
runtime:
  mode: offline
  max_concurrency: 2
"#
}

fn candidate(arxiv_id: &str, title: &str, abstract_text: &str, categories: &[&str]) -> PaperCandidate {
    let now = Utc::now();
    PaperCandidate::new(
        arxiv_id.to_string(),
        title.to_string(),
        abstract_text.to_string(),
        vec!["A. Author".to_string()],
        categories.iter().map(|c| c.to_string()).collect(),
        now,
        now,
        format!("https://arxiv.org/abs/{arxiv_id}"),
        format!("https://arxiv.org/pdf/{arxiv_id}.pdf"),
    )
}

fn topic() -> Topic {
    Topic {
        name: "retrieval".to_string(),
        label: "Retrieval".to_string(),
        query: TopicQuery {
            categories: vec!["cs.IR".to_string()],
            include: vec!["retrieval".to_string()],
            exclude: vec!["survey".to_string()],
        },
        interest_prompt: "dense retrieval and reranking".to_string(),
    }
}

/// A test-only provider that fails the structured core-summary call but
/// succeeds at free-text completion, simulating a provider that degrades
/// mid-paper rather than being entirely unreachable.
struct FlakyProvider;

#[async_trait]
impl LlmProvider for FlakyProvider {
    fn name(&self) -> &str {
        "flaky"
    }

    fn default_model(&self) -> &str {
        "flaky-model"
    }

    async fn complete(&self, messages: Vec<Message>, _config: &LlmConfig) -> AppResult<String> {
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        if last.contains("problem") || last.contains("solution") || last.contains("structured") {
            return Err(AppError::Llm("simulated structured-extraction outage".to_string()));
        }
        Ok("This paper addresses a retrieval problem and proposes a new method.".to_string())
    }
}

#[tokio::test]
async fn empty_selection_publishes_an_empty_but_valid_site() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::from_yaml_str(offline_config_yaml()).unwrap();
    let mut site_config = config.site;
    site_config.output_dir = dir.path().join("site").to_string_lossy().to_string();

    publish::build_site(&site_config, &config.topics, &[]).expect("empty-summary site build must still succeed");

    let index = std::fs::read_to_string(dir.path().join("site").join("index.html")).unwrap();
    assert!(index.contains("<html"));
    let manifest = std::fs::read_to_string(dir.path().join("site").join("manifest.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&manifest).unwrap();
    assert_eq!(parsed["topics"]["retrieval"], serde_json::json!([]));
}

#[tokio::test]
async fn offline_pipeline_slice_produces_a_complete_summary_without_a_provider() {
    let config = Config::from_yaml_str(offline_config_yaml()).unwrap();
    let (relevance, summarization) = (config.relevance, config.summarization);
    let t = topic();

    let demo = candidate(
        "demo-retrieval-0001",
        "A demonstration paper for Retrieval",
        "This is a synthesized candidate standing in for dense retrieval and reranking research.",
        &["cs.IR"],
    );

    let ranker = RelevanceRanker::new(None);
    let scored = ranker.rank(&t, vec![demo], &relevance).await;
    assert_eq!(scored.len(), 1);

    let content = FetchedContent {
        source: ContentSource::AbstractOnly,
        text: scored[0].candidate.abstract_text.clone(),
        truncated: false,
    };

    let engine = ReadingEngine::new(None);
    let reading = engine.read(&t, &scored[0].candidate, &content, &summarization).await;
    assert!(reading.core_summary.is_none());
    assert!(!reading.partial);
    assert_eq!(reading.task_list.len(), 5);

    let summary = ReportBuilder::build(t, scored.into_iter().next().unwrap(), reading);
    assert!(summary.markdown.starts_with("# A demonstration paper for Retrieval"));
    assert!(summary.markdown.contains("## Questions"));
    assert!(!summary.partial);
}

#[tokio::test]
async fn deterministic_ranker_repeats_the_same_decision_for_the_same_input() {
    let relevance = Config::from_yaml_str(offline_config_yaml()).unwrap().relevance;
    let t = topic();
    let paper = candidate(
        "2401.00001",
        "A novel method for dense retrieval evaluation",
        "We run a benchmark experiment evaluating retrieval quality against strong baselines.",
        &["cs.IR"],
    );

    let ranker = RelevanceRanker::new(None);
    let first = ranker.rank(&t, vec![paper.clone()], &relevance).await;
    let second = ranker.rank(&t, vec![paper], &relevance).await;

    assert_eq!(first[0].normalized_score, second[0].normalized_score);
    assert_eq!(first[0].decision, second[0].decision);
    assert_eq!(first[0].decision, RankDecision::Include);
}

#[tokio::test]
async fn reading_engine_degrades_to_partial_when_core_summary_extraction_fails() {
    let summarization = Config::from_yaml_str(offline_config_yaml()).unwrap().summarization;
    let t = topic();
    let paper = candidate(
        "2401.00002",
        "Reranking with structured evidence",
        "We study reranking quality using a benchmark of retrieval results.",
        &["cs.IR"],
    );

    let provider = FlakyProvider;
    let config = LlmConfig::new().with_model("flaky-model").with_json_mode(true);
    let engine = ReadingEngine::new(Some((&provider as &dyn LlmProvider, &config)));

    let content = FetchedContent { source: ContentSource::AbstractOnly, text: paper.abstract_text.clone(), truncated: false };
    let reading = engine.read(&t, &paper, &content, &summarization).await;

    assert!(reading.partial, "core summary extraction always fails for this provider; paper must be marked partial");
    let core = reading.core_summary.expect("a placeholder core summary is still produced on total failure");
    assert!(core.is_complete());
    assert!(!reading.brief_summary.trim().is_empty(), "the brief-summary stage should still succeed");
}

#[test]
fn exclude_keyword_marks_a_matching_candidate_for_filtering() {
    let t = topic();
    let survey_paper = candidate(
        "2401.00003",
        "A Survey of Dense Retrieval Methods",
        "This survey reviews recent advances in retrieval.",
        &["cs.IR"],
    );
    let research_paper = candidate(
        "2401.00004",
        "A New Retrieval Method",
        "We propose a new retrieval method and evaluate it.",
        &["cs.IR"],
    );

    let matches_exclude = |c: &PaperCandidate| {
        let text = c.searchable_text();
        t.query.exclude.iter().any(|kw| text.contains(&kw.to_lowercase()))
    };

    assert!(matches_exclude(&survey_paper), "a paper whose text contains the excluded keyword must be flagged");
    assert!(!matches_exclude(&research_paper));
}

#[tokio::test]
async fn cancellation_before_run_skips_every_topic_but_still_publishes() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::from_yaml_str(offline_config_yaml()).unwrap();
    config.site.output_dir = dir.path().join("site").to_string_lossy().to_string();

    let orchestrator = Orchestrator::new(config, None);
    let cancellation = CancellationToken::new();
    cancellation.cancel();

    let result = orchestrator.run(cancellation).await;

    assert_eq!(result.stats.topics_processed, 0);
    assert_eq!(result.stats.papers_fetched, 0);
    assert!(result.summaries.is_empty());
    assert!(dir.path().join("site").join("index.html").exists(), "publishers must still run over the (empty) partial results");
}
