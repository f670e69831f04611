//! Relevance ranking: one LLM call per candidate in online mode, a lexical
//! heuristic in offline mode. A single candidate's LLM failure degrades only
//! that candidate to the heuristic — the ranking pass itself never fails.

use std::collections::HashSet;

use serde::Deserialize;

use crate::config::RelevanceConfig;
use crate::llm::{LlmConfig, LlmProvider, Message, Prompts, complete_json};
use crate::model::{DimensionScore, PaperCandidate, ScoredPaper, Topic};

const METHODOLOGY_VOCAB: &[&str] = &["method", "approach", "framework", "algorithm", "technique"];
const NOVELTY_VOCAB: &[&str] = &["novel", "new", "first", "improve", "state-of-the-art"];
const EXPERIMENT_VOCAB: &[&str] = &["experiment", "evaluation", "benchmark", "dataset", "ablation"];

pub struct RelevanceRanker<'a> {
    provider: Option<(&'a dyn LlmProvider, &'a LlmConfig)>,
}

impl<'a> RelevanceRanker<'a> {
    /// Online mode: pass a provider + config. Offline mode: pass `None` and
    /// every candidate is scored with the lexical heuristic.
    pub fn new(provider: Option<(&'a dyn LlmProvider, &'a LlmConfig)>) -> Self {
        Self { provider }
    }

    /// Scores every candidate, in input order, against `topic`'s interest
    /// prompt and `relevance`'s configured dimensions.
    pub async fn rank(
        &self,
        topic: &Topic,
        candidates: Vec<PaperCandidate>,
        relevance: &RelevanceConfig,
    ) -> Vec<ScoredPaper> {
        let mut scored = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let scores = match self.provider {
                Some((provider, config)) => match self.score_online(topic, &candidate, relevance, provider, config).await {
                    Ok(scores) => scores,
                    Err(e) => {
                        tracing::warn!(
                            "relevance scoring failed for {}, falling back to heuristic: {e}",
                            candidate.arxiv_id
                        );
                        Self::score_heuristic(topic, &candidate, relevance)
                    }
                },
                None => Self::score_heuristic(topic, &candidate, relevance),
            };
            scored.push(ScoredPaper::new(candidate, scores, relevance.pass_threshold));
        }
        scored
    }

    async fn score_online(
        &self,
        topic: &Topic,
        candidate: &PaperCandidate,
        relevance: &RelevanceConfig,
        provider: &dyn LlmProvider,
        config: &LlmConfig,
    ) -> crate::error::AppResult<Vec<DimensionScore>> {
        let dims: Vec<(String, f64, Option<String>)> = relevance
            .scoring_dimensions
            .iter()
            .map(|d| (d.name.clone(), d.weight, d.description.clone()))
            .collect();

        let prompt = Prompts::relevance_scoring(
            &topic.interest_prompt,
            &candidate.title,
            &candidate.abstract_text,
            &candidate.categories,
            &dims,
        );
        let messages = vec![
            Message::system("You score paper relevance precisely and return JSON only."),
            Message::user(prompt),
        ];

        let response: std::collections::HashMap<String, DimensionResponse> =
            complete_json(provider, messages, config).await?;

        Ok(relevance
            .scoring_dimensions
            .iter()
            .map(|dim| {
                let score = response.get(&dim.name).map(|r| r.score).unwrap_or(0.0);
                let clipped = score.clamp(0.0, 100.0);
                DimensionScore { name: dim.name.clone(), weight: dim.weight, value: clipped / 100.0 }
            })
            .collect())
    }

    /// Lexical heuristic, grounded in `relevance_ranker.py::_score_heuristic`
    /// reconciled with this pipeline's own dimension vocabulary.
    fn score_heuristic(topic: &Topic, candidate: &PaperCandidate, relevance: &RelevanceConfig) -> Vec<DimensionScore> {
        let text = candidate.searchable_text();
        let tokens: HashSet<String> = tokenize(&text);

        relevance
            .scoring_dimensions
            .iter()
            .map(|dim| {
                let score = match dim.name.as_str() {
                    "topic_alignment" => {
                        let keyword_part = keyword_overlap(&topic.query.include, &tokens) * 70.0;
                        let category_part = category_overlap(&topic.query.categories, &candidate.categories) * 30.0;
                        keyword_part + category_part
                    }
                    "methodology_fit" => hit_count(METHODOLOGY_VOCAB, &text).min(5) as f64 / 5.0 * 100.0,
                    "novelty" => (0.4 + 0.6 * (hit_count(NOVELTY_VOCAB, &text).min(3) as f64 / 3.0)) * 100.0,
                    "experiment_depth" | "experiment_coverage" => {
                        (hit_count(EXPERIMENT_VOCAB, &text).min(3) as f64 / 3.0) * 100.0
                    }
                    _ => 50.0,
                };
                let clipped = score.clamp(0.0, 100.0);
                DimensionScore { name: dim.name.clone(), weight: dim.weight, value: clipped / 100.0 }
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct DimensionResponse {
    score: f64,
    #[serde(default)]
    #[allow(dead_code)]
    reason: String,
}

fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn keyword_overlap(keywords: &[String], tokens: &HashSet<String>) -> f64 {
    if keywords.is_empty() {
        return 0.5;
    }
    let hits = keywords
        .iter()
        .filter(|kw| kw.to_lowercase().split_whitespace().all(|w| tokens.contains(w)))
        .count();
    (hits as f64 / keywords.len() as f64).min(1.0)
}

fn category_overlap(want: &[String], have: &[String]) -> f64 {
    if want.is_empty() {
        return 0.5;
    }
    let have_lower: HashSet<String> = have.iter().map(|c| c.to_lowercase()).collect();
    let hits = want.iter().filter(|c| have_lower.contains(&c.to_lowercase())).count();
    (hits as f64 / want.len() as f64).min(1.0)
}

fn hit_count(vocab: &[&str], text: &str) -> usize {
    vocab.iter().filter(|w| text.contains(*w)).count()
}
