//! Full-text content resolution for a paper: ar5iv HTML rendition first,
//! LLM-mediated PDF extraction second, plain abstract text as the last
//! resort. Every path is best-effort — the reading engine must be able to
//! proceed on an abstract alone.

use std::io::Write;
use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use tempfile::NamedTempFile;

use crate::llm::{LlmConfig, LlmProvider};
use crate::model::PaperCandidate;

const DEFAULT_AR5IV_BASE: &str = "https://ar5iv.org/html";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const TRUNCATION_MARKER: &str = "\n\n... (content truncated)";

/// Which path produced a paper's full-text content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSource {
    HtmlRendition,
    PdfExtraction,
    AbstractOnly,
}

/// The resolved text a paper will be read from, plus provenance.
#[derive(Debug, Clone)]
pub struct FetchedContent {
    pub source: ContentSource,
    pub text: String,
    pub truncated: bool,
}

pub struct ContentFetcher {
    client: Client,
    ar5iv_base_url: String,
}

impl ContentFetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, ar5iv_base_url: DEFAULT_AR5IV_BASE.to_string() }
    }

    pub fn with_ar5iv_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.ar5iv_base_url = base_url.into();
        self
    }

    /// Resolves the best available full text for `candidate`: ar5iv HTML
    /// rendition, then LLM-mediated PDF extraction when a provider is given,
    /// then the bare abstract. Never fails — every branch degrades instead
    /// of propagating an error, since the reading engine can always fall
    /// back to its own offline heuristics against whatever text comes back.
    pub async fn resolve(
        &self,
        candidate: &PaperCandidate,
        provider: Option<(&dyn LlmProvider, &LlmConfig)>,
        max_chars: usize,
    ) -> FetchedContent {
        if let Some(html) = self.fetch_html_rendition(&candidate.arxiv_id, max_chars).await {
            return html;
        }

        if let Some((provider, config)) = provider {
            match self.fetch_pdf_extraction(&candidate.pdf_url, provider, config, max_chars).await {
                Ok(content) => return content,
                Err(e) => {
                    tracing::warn!("PDF extraction failed for {}: {e}", candidate.arxiv_id);
                }
            }
        }

        let (text, truncated) = truncate(&candidate.abstract_text, max_chars);
        FetchedContent { source: ContentSource::AbstractOnly, text, truncated }
    }

    /// Fetches the ar5iv HTML rendition of a paper and converts it to plain
    /// text. Returns `None` on any network, status, or conversion failure.
    async fn fetch_html_rendition(&self, arxiv_id: &str, max_chars: usize) -> Option<FetchedContent> {
        let url = format!("{}/{}", self.ar5iv_base_url.trim_end_matches('/'), arxiv_id);

        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("failed to fetch ar5iv rendition for {arxiv_id}: {e}");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!("ar5iv returned {} for {arxiv_id}", response.status());
            return None;
        }

        let html = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("failed to read ar5iv body for {arxiv_id}: {e}");
                return None;
            }
        };

        let text = html2text::from_read(html.as_bytes(), 0);
        let cleaned = collapse_blank_lines(&text);
        let (text, truncated) = truncate(cleaned.trim(), max_chars);
        if text.is_empty() {
            return None;
        }
        Some(FetchedContent { source: ContentSource::HtmlRendition, text, truncated })
    }

    /// Downloads the PDF to a temp file and asks the LLM provider to extract
    /// its readable text. The temp file is removed on every exit path.
    async fn fetch_pdf_extraction(
        &self,
        pdf_url: &str,
        provider: &dyn LlmProvider,
        config: &LlmConfig,
        max_chars: usize,
    ) -> crate::error::AppResult<FetchedContent> {
        let response = self.client.get(pdf_url).send().await?;
        if !response.status().is_success() {
            return Err(crate::error::AppError::Fetch(format!("PDF download returned {}", response.status())));
        }
        let bytes = response.bytes().await?;

        let mut tmp = NamedTempFile::new().map_err(|e| crate::error::AppError::Fetch(format!("temp file creation failed: {e}")))?;
        tmp.write_all(&bytes).map_err(|e| crate::error::AppError::Fetch(format!("temp file write failed: {e}")))?;
        tmp.flush().map_err(|e| crate::error::AppError::Fetch(format!("temp file flush failed: {e}")))?;

        let file_name = pdf_url.rsplit('/').next().unwrap_or("paper.pdf").to_string();
        let result = provider.extract_file_text(&bytes, &file_name, config).await;

        // `tmp` is removed on drop regardless of the extraction outcome.
        drop(tmp);

        let text = result?;
        let (text, truncated) = truncate(&text, max_chars);
        Ok(FetchedContent { source: ContentSource::PdfExtraction, text, truncated })
    }
}

impl Default for ContentFetcher {
    fn default() -> Self {
        Self::new()
    }
}

fn collapse_blank_lines(text: &str) -> String {
    let re = blank_line_pattern();
    re.replace_all(text, "\n\n").into_owned()
}

fn blank_line_pattern() -> &'static Regex {
    static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\n{3,}").expect("static regex is valid"))
}

fn truncate(text: &str, max_chars: usize) -> (String, bool) {
    if max_chars == 0 || text.chars().count() <= max_chars {
        return (text.to_string(), false);
    }
    let truncated: String = text.chars().take(max_chars).collect();
    (format!("{truncated}{TRUNCATION_MARKER}"), true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_repeated_blank_lines() {
        let input = "a\n\n\n\n\nb";
        assert_eq!(collapse_blank_lines(input), "a\n\nb");
    }

    #[test]
    fn truncate_adds_marker_past_limit() {
        let (text, truncated) = truncate("abcdefgh", 4);
        assert!(truncated);
        assert!(text.starts_with("abcd"));
        assert!(text.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn truncate_leaves_short_text_untouched() {
        let (text, truncated) = truncate("short", 100);
        assert!(!truncated);
        assert_eq!(text, "short");
    }

    #[test]
    fn zero_max_chars_disables_truncation() {
        let (text, truncated) = truncate("anything at all", 0);
        assert!(!truncated);
        assert_eq!(text, "anything at all");
    }
}
