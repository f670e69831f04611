//! Domain entities shared across the pipeline stages.

use chrono::{DateTime, Utc};
use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// A boolean query over the archive's keyword/category grammar.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TopicQuery {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl TopicQuery {
    /// Returns an error unless at least one of `categories`/`include`/`exclude` is non-empty.
    pub fn validate(&self) -> AppResult<()> {
        if self.categories.is_empty() && self.include.is_empty() && self.exclude.is_empty() {
            return Err(AppError::Config(
                "topic query must declare at least one category, include, or exclude keyword"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// A user-configured research topic. Immutable for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    pub label: String,
    pub query: TopicQuery,
    #[serde(default)]
    pub interest_prompt: String,
}

impl Topic {
    pub fn validate(&self) -> AppResult<()> {
        if self.name.is_empty() || !self.name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(AppError::Config(format!(
                "topic name '{}' must be a non-empty, URL-safe slug",
                self.name
            )));
        }
        self.query.validate()
    }
}

/// A paper surfaced by the archive client, before scoring.
#[derive(Debug, Clone, Serialize, Deserialize, new)]
pub struct PaperCandidate {
    pub arxiv_id: String,
    pub title: String,
    pub abstract_text: String,
    pub authors: Vec<String>,
    #[new(default)]
    pub affiliations: Option<Vec<String>>,
    pub categories: Vec<String>,
    pub published: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub arxiv_url: String,
    pub pdf_url: String,
    #[new(default)]
    pub comment: Option<String>,
}

impl PaperCandidate {
    /// Canonical `title + " " + abstract`, lowercased, used for exclude-keyword filtering.
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.title, self.abstract_text).to_lowercase()
    }
}

/// One axis of relevance scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionScore {
    pub name: String,
    pub weight: f64,
    pub value: f64,
}

/// Whether a scored paper clears the topic's pass threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankDecision {
    Include,
    Skip,
}

/// A candidate plus its dimension scores and the ranker's decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPaper {
    pub candidate: PaperCandidate,
    pub scores: Vec<DimensionScore>,
    pub total_score: f64,
    pub normalized_score: f64,
    pub decision: RankDecision,
}

impl ScoredPaper {
    /// Builds a `ScoredPaper` from dimension scores, computing `total_score`/`normalized_score`
    /// and the include/skip decision against `pass_threshold`.
    pub fn new(candidate: PaperCandidate, scores: Vec<DimensionScore>, pass_threshold: f64) -> Self {
        let total_weight: f64 = scores.iter().map(|s| s.weight).sum();
        let total_score: f64 = scores.iter().map(|s| s.weight * s.value).sum();
        let normalized_score = if total_weight > 0.0 {
            (total_score / total_weight) * 100.0
        } else {
            0.0
        };
        let decision = if normalized_score >= pass_threshold {
            RankDecision::Include
        } else {
            RankDecision::Skip
        };
        ScoredPaper {
            candidate,
            scores,
            total_score,
            normalized_score,
            decision,
        }
    }

    /// The dimension with the greatest configured weight, used by the report builder's
    /// "why recommended" section.
    pub fn top_dimension(&self) -> Option<&DimensionScore> {
        self.scores
            .iter()
            .max_by(|a, b| a.weight.partial_cmp(&b.weight).unwrap_or(std::cmp::Ordering::Equal))
    }
}

/// An interest-guided reading question generated by the reading engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskItem {
    pub question: String,
    pub reason: String,
}

/// The narrative answer to one `TaskItem`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskFinding {
    pub task: TaskItem,
    pub answer: String,
    pub confidence: f64,
}

/// The five-field structured view of a paper produced by stage 2 of the reading engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreSummary {
    pub problem: String,
    pub solution: String,
    pub methodology: String,
    pub experiments: String,
    pub conclusion: String,
}

impl CoreSummary {
    /// True when every field is non-empty.
    pub fn is_complete(&self) -> bool {
        !self.problem.trim().is_empty()
            && !self.solution.trim().is_empty()
            && !self.methodology.trim().is_empty()
            && !self.experiments.trim().is_empty()
            && !self.conclusion.trim().is_empty()
    }
}

/// The finished, structured + rendered summary for one paper. Built once by the
/// report builder and never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperSummary {
    pub paper: PaperCandidate,
    pub topic: Topic,
    pub core_summary: Option<CoreSummary>,
    pub task_list: Vec<TaskItem>,
    pub findings: Vec<TaskFinding>,
    pub overview: String,
    pub brief_summary: String,
    pub score: ScoredPaper,
    pub markdown: String,
    pub partial: bool,
}

/// Aggregate run statistics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineStats {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub topics_processed: usize,
    pub papers_fetched: usize,
    pub papers_selected: usize,
}

/// The complete output of one orchestrator run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineResult {
    pub summaries: Vec<PaperSummary>,
    pub stats: PipelineStats,
}
