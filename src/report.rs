//! Report builder: assembles one paper's scoring + reading-engine output
//! into a `PaperSummary` with a canonical ten-section Markdown rendering.
//! Deterministic from its inputs except for the footer's clock read.

use chrono::Utc;

use crate::model::{CoreSummary, PaperSummary, ScoredPaper, TaskFinding, TaskItem, Topic};
use crate::reading::ReadingOutput;

pub struct ReportBuilder;

impl ReportBuilder {
    /// Builds the final `PaperSummary`, including its rendered Markdown.
    pub fn build(topic: Topic, score: ScoredPaper, reading: ReadingOutput) -> PaperSummary {
        let markdown = render_markdown(&topic, &score, &reading);
        PaperSummary {
            paper: score.candidate.clone(),
            topic,
            core_summary: reading.core_summary,
            task_list: reading.task_list,
            findings: reading.findings,
            overview: reading.overview,
            brief_summary: reading.brief_summary,
            score,
            markdown,
            partial: reading.partial,
        }
    }
}

fn render_markdown(topic: &Topic, score: &ScoredPaper, reading: &ReadingOutput) -> String {
    let paper = &score.candidate;
    let mut sections: Vec<String> = Vec::new();

    // 1. title
    sections.push(format!("# {}", paper.title));

    // 2. brief summary blockquote
    if !reading.brief_summary.trim().is_empty() {
        let quoted = reading.brief_summary.lines().map(|l| format!("> {l}")).collect::<Vec<_>>().join("\n");
        sections.push(quoted);
    }

    // 3. metadata line set
    let authors = paper.authors.join(", ");
    let published = paper.published.format("%Y-%m-%d").to_string();
    sections.push(
        [
            format!("- Topic: {}", topic.label),
            format!("- arXiv: {}", paper.arxiv_url),
            format!("- Authors: {authors}"),
            format!("- Published: {published}"),
            format!("- Relevance score: {:.1}", score.normalized_score),
        ]
        .join("\n"),
    );

    // 4. dimension breakdown
    let breakdown = score
        .scores
        .iter()
        .map(|d| format!("- {}: {:.0}/100 (weight: {:.2})", d.name, d.value * 100.0, d.weight))
        .collect::<Vec<_>>()
        .join("\n");
    sections.push(format!("## Relevance breakdown\n\n{breakdown}"));

    // 5. core-summary subsections (omitted when absent)
    if let Some(core) = &reading.core_summary {
        sections.push(render_core_summary(core));
    }

    // 6. numbered questions
    if !reading.task_list.is_empty() {
        sections.push(render_questions(&reading.task_list));
    }

    // 7. per-question findings
    if !reading.findings.is_empty() {
        sections.push(render_findings(&reading.findings));
    }

    // 8. overview
    sections.push(format!("## Overview\n\n{}", reading.overview));

    // 9. why recommended
    sections.push(render_why_recommended(score, &reading.findings));

    // 10. footer
    sections.push(format!("---\n\n_Generated {}_", Utc::now().to_rfc3339()));

    sections.join("\n\n")
}

fn render_core_summary(core: &CoreSummary) -> String {
    format!(
        "## Core summary\n\n### Problem\n\n{}\n\n### Solution\n\n{}\n\n### Methodology\n\n{}\n\n### Experiments\n\n{}\n\n### Conclusion\n\n{}",
        core.problem, core.solution, core.methodology, core.experiments, core.conclusion
    )
}

fn render_questions(tasks: &[TaskItem]) -> String {
    let numbered = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{}. {} ({})", i + 1, t.question, t.reason))
        .collect::<Vec<_>>()
        .join("\n");
    format!("## Questions\n\n{numbered}")
}

fn render_findings(findings: &[TaskFinding]) -> String {
    let rendered = findings
        .iter()
        .enumerate()
        .map(|(i, f)| format!("**{}. {}**\n\n{}\n\n_Confidence: {:.2}_", i + 1, f.task.question, f.answer, f.confidence))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("## Findings\n\n{rendered}")
}

fn render_why_recommended(score: &ScoredPaper, findings: &[TaskFinding]) -> String {
    let top_dim = score.top_dimension().map(|d| d.name.as_str()).unwrap_or("relevance");
    let confident_finding = findings.iter().find(|f| f.confidence > 0.6);

    let mut text = format!(
        "This paper was surfaced chiefly for its strength on **{top_dim}** (normalized score {:.1}).",
        score.normalized_score
    );
    if let Some(finding) = confident_finding {
        text.push_str(&format!(
            " Notably, \"{}\" was answered with high confidence ({:.2}): {}",
            finding.task.question,
            finding.confidence,
            truncate_words(&finding.answer, 40)
        ));
    }
    format!("## Why recommended\n\n{text}")
}

fn truncate_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        text.to_string()
    } else {
        format!("{}...", words[..max_words].join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DimensionScore, PaperCandidate, RankDecision, TopicQuery};
    use chrono::Utc;

    fn topic() -> Topic {
        Topic {
            name: "retrieval".to_string(),
            label: "Retrieval".to_string(),
            query: TopicQuery { categories: vec!["cs.IR".to_string()], include: vec![], exclude: vec![] },
            interest_prompt: "dense retrieval".to_string(),
        }
    }

    fn candidate() -> PaperCandidate {
        PaperCandidate::new(
            "2301.00001".to_string(),
            "Dense Retrieval Methods".to_string(),
            "We propose a new method for dense retrieval.".to_string(),
            vec!["Alice".to_string(), "Bob".to_string()],
            vec!["cs.IR".to_string()],
            Utc::now(),
            Utc::now(),
            "https://arxiv.org/abs/2301.00001".to_string(),
            "https://arxiv.org/pdf/2301.00001.pdf".to_string(),
        )
    }

    fn scored() -> ScoredPaper {
        let scores = vec![
            DimensionScore { name: "topic_alignment".to_string(), weight: 0.6, value: 0.9 },
            DimensionScore { name: "novelty".to_string(), weight: 0.4, value: 0.5 },
        ];
        ScoredPaper::new(candidate(), scores, 50.0)
    }

    fn reading_output(core_summary: Option<CoreSummary>) -> ReadingOutput {
        let task = TaskItem { question: "What is the main contribution?".to_string(), reason: "Core claim.".to_string() };
        let finding = TaskFinding { task: task.clone(), answer: "The paper introduces \"a new index\".".to_string(), confidence: 0.8 };
        ReadingOutput {
            brief_summary: "Context paragraph.\n\nKey insight paragraph.".to_string(),
            core_summary,
            task_list: vec![task],
            findings: vec![finding],
            overview: "Overview text.".to_string(),
            partial: false,
        }
    }

    #[test]
    fn markdown_contains_all_required_sections() {
        let summary = ReportBuilder::build(topic(), scored(), reading_output(None));
        assert!(summary.markdown.starts_with("# Dense Retrieval Methods"));
        assert!(summary.markdown.contains("> Context paragraph."));
        assert!(summary.markdown.contains("- Topic: Retrieval"));
        assert!(summary.markdown.contains("## Relevance breakdown"));
        assert!(!summary.markdown.contains("## Core summary"));
        assert!(summary.markdown.contains("## Questions"));
        assert!(summary.markdown.contains("## Findings"));
        assert!(summary.markdown.contains("## Overview"));
        assert!(summary.markdown.contains("## Why recommended"));
        assert!(summary.markdown.contains("_Generated"));
    }

    #[test]
    fn core_summary_section_present_when_available() {
        let core = CoreSummary {
            problem: "p".to_string(),
            solution: "s".to_string(),
            methodology: "m".to_string(),
            experiments: "e".to_string(),
            conclusion: "c".to_string(),
        };
        let summary = ReportBuilder::build(topic(), scored(), reading_output(Some(core)));
        assert!(summary.markdown.contains("## Core summary"));
        assert!(summary.markdown.contains("### Problem"));
    }

    #[test]
    fn why_recommended_cites_top_weighted_dimension() {
        let summary = ReportBuilder::build(topic(), scored(), reading_output(None));
        assert!(summary.markdown.contains("**topic_alignment**"));
    }

    #[test]
    fn metadata_score_rounds_to_one_decimal() {
        let summary = ReportBuilder::build(topic(), scored(), reading_output(None));
        assert!(summary.markdown.contains(&format!("Relevance score: {:.1}", summary.score.normalized_score)));
    }

    #[test]
    fn decision_is_preserved_on_the_scored_paper() {
        let summary = ReportBuilder::build(topic(), scored(), reading_output(None));
        assert_eq!(summary.score.decision, RankDecision::Include);
    }
}
