//! Prompt templates for the relevance ranker and the five reading-engine
//! stages. Each LLM-facing stage embeds its response schema directly in the
//! prompt, mirroring how every stage in this pipeline constrains a
//! non-deterministic model to a fixed structure.

pub struct Prompts;

impl Prompts {
    pub fn relevance_scoring(
        interest_prompt: &str,
        title: &str,
        abstract_text: &str,
        categories: &[String],
        dimensions: &[(String, f64, Option<String>)],
    ) -> String {
        let dims = dimensions
            .iter()
            .map(|(name, weight, description)| {
                format!(
                    "  - {name} (weight {weight:.2}): {}",
                    description.as_deref().unwrap_or(name)
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"You are a research assistant scoring how relevant a paper is to a reader's declared interest.

Reader's interest: {interest_prompt}

Paper:
  title: {title}
  abstract: {abstract_text}
  categories: {categories:?}

Score the paper on each of the following dimensions, 0-100:
{dims}

Respond with a single JSON object mapping each dimension name to an object
with "score" (0-100) and "reason" (one sentence). Output JSON only, no
markdown fences, no extra keys."#
        )
    }

    pub fn brief_summary(title: &str, content: &str) -> String {
        format!(
            r#"Write a brief summary of the following paper in 1-2 paragraphs (5-8 sentences
total). Cover, in order: why this research is needed, what is proposed, and
how it works or the headline outcome. Put a paragraph break between the
context and the key insight.

Title: {title}

Content:
{content}"#
        )
    }

    pub fn core_summary(title: &str, content: &str) -> String {
        format!(
            r#"Read the following paper and produce a structured summary as a single JSON
object with exactly these five keys, each a narrative of 3-8 sentences:
"problem", "solution", "methodology", "experiments", "conclusion".
Every field must be non-empty. Output JSON only, no markdown fences.

Title: {title}

Content:
{content}"#
        )
    }

    pub fn generate_questions(
        title: &str,
        abstract_text: &str,
        core_summary_excerpt: Option<&str>,
        interest_prompt: &str,
    ) -> String {
        let core_summary_block = core_summary_excerpt
            .map(|s| format!("\nCore summary (truncated):\n{s}\n"))
            .unwrap_or_default();

        format!(
            r#"A reader has this interest: {interest_prompt}

Given the paper below, generate 3-5 specific, answerable questions that a
careful reading of the paper would resolve, tailored to the reader's
interest. For each, give a one-sentence reason the question matters to this
reader.

Title: {title}
Abstract: {abstract_text}
{core_summary_block}
Respond with a JSON array of objects, each with "question" and "reason".
Output JSON only, no markdown fences."#
        )
    }

    pub fn answer_question(content: &str, question: &str, reason: &str) -> String {
        format!(
            r#"Using only the content below, answer the following question in 2-4
paragraphs. Inline direct quotations from the source for any verbatim span
(use quotation marks), and explain their significance. Do not answer with a
bare list of quotes.

Question: {question}
Why it matters: {reason}

Content:
{content}

Respond with a single JSON object: {{"answer": "...", "confidence": 0.0-1.0}}.
Output JSON only, no markdown fences."#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relevance_prompt_lists_all_dimensions() {
        let dims = vec![
            ("topic_alignment".to_string(), 0.5, None),
            ("novelty".to_string(), 0.5, Some("is it new".to_string())),
        ];
        let prompt = Prompts::relevance_scoring("dense retrieval", "t", "a", &["cs.IR".to_string()], &dims);
        assert!(prompt.contains("topic_alignment"));
        assert!(prompt.contains("is it new"));
    }

    #[test]
    fn question_prompt_includes_core_summary_when_present() {
        let with_core = Prompts::generate_questions("t", "a", Some("excerpt"), "interest");
        assert!(with_core.contains("excerpt"));
        let without_core = Prompts::generate_questions("t", "a", None, "interest");
        assert!(!without_core.contains("Core summary"));
    }
}
