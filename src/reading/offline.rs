//! Deterministic offline fallbacks for reading-engine stages 1, 3, and 4.
//! Grounded in `task_planner.py::build_todo_list` (stage 3's dedup-then-pad
//! algorithm) and `task_reader.py::_best_sentence`/`answer_questions`
//! (stage 4's keyword-overlap heuristic), reconciled with this spec's own
//! paragraph-assembly rule for stage 1.

use crate::model::TaskFinding;
use crate::model::TaskItem;

use super::split_sentences;

const DEFAULT_QUESTIONS: &[(&str, &str)] = &[
    ("What are the main contributions?", "Establishes the paper's core claims."),
    ("How was the approach evaluated experimentally?", "Checks whether the claims are substantiated."),
    ("What is the proposed methodology?", "Clarifies how the approach actually works."),
    ("What are the key limitations or open problems?", "Surfaces what the paper does not solve."),
    ("How does this compare to prior work?", "Situates the contribution relative to the field."),
];

/// Stage 1 offline: first three sentences as the context paragraph, next
/// three as the key-insight paragraph.
pub fn brief_summary(content: &str) -> String {
    let sentences = split_sentences(content);
    if sentences.is_empty() {
        return String::new();
    }
    let first: Vec<&str> = sentences.iter().take(3).map(|s| s.as_str()).collect();
    let second: Vec<&str> = sentences.iter().skip(3).take(3).map(|s| s.as_str()).collect();

    let first_paragraph = first.join(" ");
    if second.is_empty() {
        first_paragraph
    } else {
        format!("{first_paragraph}\n\n{}", second.join(" "))
    }
}

/// Stage 3 offline: the fixed default question list, truncated/padded to
/// `desired_length` (clamped to [3, 5] by the caller).
pub fn default_task_list(desired_length: usize) -> Vec<TaskItem> {
    DEFAULT_QUESTIONS
        .iter()
        .take(desired_length.max(3))
        .map(|(question, reason)| TaskItem { question: question.to_string(), reason: reason.to_string() })
        .collect()
}

/// Stage 4 offline: score every sentence of `content` by keyword overlap
/// with `task.question` (tokens longer than 3 chars), take the top two
/// matches (or the first sentence if nothing scores above zero), join them,
/// and set `confidence = clip(0.4 + 0.3 * matches, 0, 1)`.
pub fn answer_heuristic(content: &str, task: &TaskItem) -> TaskFinding {
    let sentences = split_sentences(content);
    if sentences.is_empty() {
        return TaskFinding {
            task: task.clone(),
            answer: "The source text was unavailable; a full reading is needed to answer this.".to_string(),
            confidence: 0.4,
        };
    }

    let keywords: Vec<String> = task
        .question
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 3)
        .map(|w| w.to_string())
        .collect();

    let mut scored: Vec<(usize, &String)> = sentences
        .iter()
        .map(|sentence| {
            let lower = sentence.to_lowercase();
            let score = keywords.iter().filter(|kw| lower.contains(kw.as_str())).count();
            (score, sentence)
        })
        .collect();

    let best_score = scored.iter().map(|(s, _)| *s).max().unwrap_or(0);

    let answer = if best_score == 0 {
        sentences[0].clone()
    } else {
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().filter(|(s, _)| *s > 0).take(2).map(|(_, s)| s.as_str()).collect::<Vec<_>>().join(" ")
    };

    let matches = if best_score == 0 { 0 } else { best_score.min(2) };
    let confidence = (0.4 + 0.3 * matches as f64).clamp(0.0, 1.0);

    TaskFinding { task: task.clone(), answer, confidence }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brief_summary_splits_into_two_paragraphs() {
        let content = "One. Two. Three. Four. Five. Six.";
        let brief = brief_summary(content);
        assert!(brief.contains("\n\n"));
        let parts: Vec<&str> = brief.split("\n\n").collect();
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn brief_summary_single_paragraph_when_short() {
        let content = "One. Two.";
        let brief = brief_summary(content);
        assert!(!brief.contains("\n\n"));
    }

    #[test]
    fn default_task_list_has_minimum_three() {
        assert_eq!(default_task_list(1).len(), 3);
        assert_eq!(default_task_list(5).len(), 5);
    }

    #[test]
    fn answer_heuristic_picks_top_matches() {
        let task = TaskItem { question: "What methodology was used?".to_string(), reason: "r".to_string() };
        let content = "The sky is blue. Our methodology uses a transformer. We evaluate with a methodology benchmark.";
        let finding = answer_heuristic(content, &task);
        assert!(finding.answer.to_lowercase().contains("methodology"));
        assert!(finding.confidence > 0.4);
    }

    #[test]
    fn answer_heuristic_falls_back_to_first_sentence() {
        let task = TaskItem { question: "zzzzz".to_string(), reason: "r".to_string() };
        let content = "First sentence here. Second sentence here.";
        let finding = answer_heuristic(content, &task);
        assert_eq!(finding.answer, "First sentence here.");
        assert_eq!(finding.confidence, 0.4);
    }
}
