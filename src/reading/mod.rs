//! The reading engine: a fixed five-stage interrogation of one paper's
//! content, each stage backed by an LLM call in online mode and a
//! deterministic heuristic in offline mode. Every stage degrades to its
//! fallback on its own failure — a single bad LLM call never aborts the
//! paper, only the stage it occurred in.

mod offline;

use serde::Deserialize;

use crate::config::SummarizationConfig;
use crate::fetch::FetchedContent;
use crate::llm::{LlmConfig, LlmProvider, Message, Prompts, complete_json};
use crate::model::{CoreSummary, PaperCandidate, TaskFinding, TaskItem, Topic};

/// Everything the reading engine produces for one paper; consumed by the
/// report builder.
pub struct ReadingOutput {
    pub brief_summary: String,
    pub core_summary: Option<CoreSummary>,
    pub task_list: Vec<TaskItem>,
    pub findings: Vec<TaskFinding>,
    pub overview: String,
    pub partial: bool,
}

pub struct ReadingEngine<'a> {
    provider: Option<(&'a dyn LlmProvider, &'a LlmConfig)>,
}

impl<'a> ReadingEngine<'a> {
    /// Online mode: pass a provider + config used for every stage's LLM
    /// call. Offline mode: pass `None` and every stage uses its heuristic.
    pub fn new(provider: Option<(&'a dyn LlmProvider, &'a LlmConfig)>) -> Self {
        Self { provider }
    }

    /// Runs all five stages for one paper against its already-resolved
    /// content (stage 0 is the caller's `ContentFetcher::resolve` result).
    pub async fn read(
        &self,
        topic: &Topic,
        candidate: &PaperCandidate,
        content: &FetchedContent,
        summarization: &SummarizationConfig,
    ) -> ReadingOutput {
        let brief_summary = self.stage1_brief(&candidate.title, &content.text).await;
        let (core_summary, partial) = self.stage2_core_summary(candidate, &content.text).await;
        let task_list = self.stage3_questions(candidate, core_summary.as_ref(), topic, summarization).await;
        let findings = self.stage4_answers(&content.text, &task_list, summarization.max_question_retries).await;
        let overview = stage5_overview(&findings, &candidate.abstract_text);

        ReadingOutput { brief_summary, core_summary, task_list, findings, overview, partial }
    }

    /// Stage 1 — 1-2 paragraphs, 5-8 sentences, why-needed / what-proposed / how-or-outcome.
    async fn stage1_brief(&self, title: &str, content: &str) -> String {
        if let Some((provider, config)) = self.provider {
            let messages = vec![
                Message::system("You write concise, well-ordered research briefs."),
                Message::user(Prompts::brief_summary(title, content)),
            ];
            match provider.complete(messages, config).await {
                Ok(text) if !text.trim().is_empty() => return text.trim().to_string(),
                Ok(_) => tracing::warn!("brief summary stage returned empty text, falling back to heuristic"),
                Err(e) => tracing::warn!("brief summary stage failed, falling back to heuristic: {e}"),
            }
        }
        offline::brief_summary(content)
    }

    /// Stage 2 — five-field structured summary. Empty fields reject and
    /// retry once; repeated failure fills a documented placeholder and
    /// marks the paper partial.
    async fn stage2_core_summary(&self, candidate: &PaperCandidate, content: &str) -> (Option<CoreSummary>, bool) {
        let Some((provider, config)) = self.provider else {
            return (None, false);
        };

        for attempt in 0..2 {
            let messages = vec![
                Message::system("You extract structured research summaries and return JSON only."),
                Message::user(Prompts::core_summary(&candidate.title, content)),
            ];
            match complete_json::<CoreSummaryResponse>(provider, messages, config).await {
                Ok(response) => {
                    let summary = response.into_core_summary();
                    if summary.is_complete() {
                        return (Some(summary), false);
                    }
                    tracing::warn!(
                        "core summary for {} had empty fields on attempt {}",
                        candidate.arxiv_id,
                        attempt + 1
                    );
                }
                Err(e) => {
                    tracing::warn!("core summary stage failed for {} on attempt {}: {e}", candidate.arxiv_id, attempt + 1);
                }
            }
        }

        (Some(placeholder_core_summary()), true)
    }

    /// Stage 3 — 3-5 interest-guided questions. Tops up from the default
    /// list when the LLM returns fewer than three; truncates to five.
    async fn stage3_questions(
        &self,
        candidate: &PaperCandidate,
        core_summary: Option<&CoreSummary>,
        topic: &Topic,
        summarization: &SummarizationConfig,
    ) -> Vec<TaskItem> {
        let desired = summarization.task_list_size.clamp(3, 5);

        if topic.interest_prompt.trim().is_empty() {
            return offline::default_task_list(desired);
        }

        if let Some((provider, config)) = self.provider {
            let excerpt = core_summary.map(|cs| truncate_core_summary(cs, 300));
            let messages = vec![
                Message::system("You generate specific, answerable reading questions and return JSON only."),
                Message::user(Prompts::generate_questions(
                    &candidate.title,
                    &candidate.abstract_text,
                    excerpt.as_deref(),
                    &topic.interest_prompt,
                )),
            ];
            match complete_json::<Vec<TaskItemResponse>>(provider, messages, config).await {
                Ok(items) => {
                    let mut tasks: Vec<TaskItem> = items
                        .into_iter()
                        .map(|t| TaskItem { question: t.question, reason: t.reason })
                        .collect();
                    if tasks.len() < 3 {
                        for fallback in offline::default_task_list(desired) {
                            if tasks.len() >= 3 {
                                break;
                            }
                            if !tasks.iter().any(|t| t.question == fallback.question) {
                                tasks.push(fallback);
                            }
                        }
                    }
                    tasks.truncate(5);
                    return tasks;
                }
                Err(e) => {
                    tracing::warn!("question generation failed for {}, using default list: {e}", candidate.arxiv_id);
                }
            }
        }

        offline::default_task_list(desired)
    }

    /// Stage 4 — one evidential answer per task, bounded by
    /// `max_question_retries` transient-error retries.
    async fn stage4_answers(&self, content: &str, tasks: &[TaskItem], max_retries: u32) -> Vec<TaskFinding> {
        let mut findings = Vec::with_capacity(tasks.len());
        for task in tasks {
            let finding = self.answer_one(content, task, max_retries).await;
            findings.push(finding);
        }
        findings
    }

    async fn answer_one(&self, content: &str, task: &TaskItem, max_retries: u32) -> TaskFinding {
        if let Some((provider, config)) = self.provider {
            let attempts = 1 + max_retries;
            for attempt in 0..attempts {
                let messages = vec![
                    Message::system("You answer research questions with quoted evidence and return JSON only."),
                    Message::user(Prompts::answer_question(content, &task.question, &task.reason)),
                ];
                match complete_json::<AnswerResponse>(provider, messages, config).await {
                    Ok(response) if !response.answer.trim().is_empty() => {
                        return TaskFinding {
                            task: task.clone(),
                            answer: response.answer,
                            confidence: response.confidence.clamp(0.0, 1.0),
                        };
                    }
                    Ok(_) => tracing::warn!("answer for '{}' was empty on attempt {}", task.question, attempt + 1),
                    Err(e) => tracing::warn!("answer stage failed for '{}' on attempt {}: {e}", task.question, attempt + 1),
                }
            }
        }
        offline::answer_heuristic(content, task)
    }
}

fn stage5_overview(findings: &[TaskFinding], abstract_text: &str) -> String {
    let joined = findings
        .iter()
        .map(|f| f.answer.trim())
        .filter(|a| !a.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    if joined.trim().is_empty() { abstract_text.to_string() } else { joined }
}

fn placeholder_core_summary() -> CoreSummary {
    const PLACEHOLDER: &str = "Not available: the reading engine could not extract this field.";
    CoreSummary {
        problem: PLACEHOLDER.to_string(),
        solution: PLACEHOLDER.to_string(),
        methodology: PLACEHOLDER.to_string(),
        experiments: PLACEHOLDER.to_string(),
        conclusion: PLACEHOLDER.to_string(),
    }
}

fn truncate_core_summary(summary: &CoreSummary, max_chars_per_field: usize) -> String {
    let clip = |s: &str| -> String { s.chars().take(max_chars_per_field).collect() };
    format!(
        "problem: {}\nsolution: {}\nmethodology: {}\nexperiments: {}\nconclusion: {}",
        clip(&summary.problem),
        clip(&summary.solution),
        clip(&summary.methodology),
        clip(&summary.experiments),
        clip(&summary.conclusion),
    )
}

/// Splits on a sentence-ending punctuation mark followed by whitespace.
/// Scans chars directly rather than via a lookbehind regex, since the
/// `regex` crate's finite-automaton engine does not support lookaround.
fn split_sentences(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut sentences = Vec::new();
    let mut start = 0;
    let chars: Vec<(usize, char)> = trimmed.char_indices().collect();
    let mut i = 0;
    while i < chars.len() {
        let (byte_idx, ch) = chars[i];
        if matches!(ch, '.' | '!' | '?') {
            let end = byte_idx + ch.len_utf8();
            if chars.get(i + 1).is_none_or(|(_, next)| next.is_whitespace()) {
                sentences.push(trimmed[start..end].to_string());
                i += 1;
                while chars.get(i).is_some_and(|(_, next)| next.is_whitespace()) {
                    i += 1;
                }
                start = chars.get(i).map(|(idx, _)| *idx).unwrap_or(trimmed.len());
                continue;
            }
        }
        i += 1;
    }
    if start < trimmed.len() {
        sentences.push(trimmed[start..].to_string());
    }

    let sentences: Vec<String> = sentences
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if sentences.is_empty() { vec![trimmed.to_string()] } else { sentences }
}

#[derive(Debug, Deserialize)]
struct CoreSummaryResponse {
    #[serde(default)]
    problem: String,
    #[serde(default)]
    solution: String,
    #[serde(default)]
    methodology: String,
    #[serde(default)]
    experiments: String,
    #[serde(default)]
    conclusion: String,
}

impl CoreSummaryResponse {
    fn into_core_summary(self) -> CoreSummary {
        CoreSummary {
            problem: self.problem,
            solution: self.solution,
            methodology: self.methodology,
            experiments: self.experiments,
            conclusion: self.conclusion,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TaskItemResponse {
    question: String,
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Deserialize)]
struct AnswerResponse {
    answer: String,
    #[serde(default)]
    confidence: f64,
}
