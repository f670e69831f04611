//! arXiv archive client: boolean query construction, Atom feed retrieval with
//! an HTTPS-to-HTTP fallback, and candidate extraction.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::config::FetchConfig;
use crate::model::{PaperCandidate, Topic};

const HTTPS_ENDPOINT: &str = "https://export.arxiv.org/api/query";
const HTTP_ENDPOINT: &str = "http://export.arxiv.org/api/query";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ArchiveClient {
    client: reqwest::Client,
    /// Timestamp of the last archive request, serializing calls to
    /// `export.arxiv.org` to at least `FetchConfig.request_delay` apart
    /// regardless of how many topics run concurrently.
    last_request: Mutex<Option<Instant>>,
}

impl ArchiveClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("research-digest/0.1 (+https://example.invalid)")
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, last_request: Mutex::new(None) }
    }

    /// Blocks until at least `request_delay` seconds have passed since the
    /// previous archive request, then records this call as the new baseline.
    async fn throttle(&self, request_delay: f64) {
        if request_delay <= 0.0 {
            return;
        }
        let delay = Duration::from_secs_f64(request_delay);
        let mut last_request = self.last_request.lock().await;
        if let Some(previous) = *last_request {
            let elapsed = previous.elapsed();
            if elapsed < delay {
                tokio::time::sleep(delay - elapsed).await;
            }
        }
        *last_request = Some(Instant::now());
    }

    /// Builds the arXiv boolean search-query string for a topic: include
    /// keywords OR-ed (phrase-quoted when multi-word), categories OR-ed,
    /// groups AND-ed, excludes negated. Empty topics fall back to `all:cs`.
    fn build_query(topic: &Topic) -> String {
        let mut parts = Vec::new();

        if !topic.query.include.is_empty() {
            let include_expr: Vec<String> = topic.query.include.iter().map(|k| Self::keyword_clause(k)).collect();
            parts.push(format!("({})", include_expr.join(" OR ")));
        }

        if !topic.query.categories.is_empty() {
            let cat_expr: Vec<String> = topic.query.categories.iter().map(|c| format!("cat:{c}")).collect();
            parts.push(format!("({})", cat_expr.join(" OR ")));
        }

        if !topic.query.exclude.is_empty() {
            let exclude_expr: Vec<String> = topic.query.exclude.iter().map(|k| Self::keyword_clause(k)).collect();
            parts.push(format!("NOT ({})", exclude_expr.join(" OR ")));
        }

        if parts.is_empty() {
            return "all:cs".to_string();
        }

        parts.join(" AND ")
    }

    fn keyword_clause(keyword: &str) -> String {
        let keyword = keyword.trim();
        if keyword.contains(' ') {
            format!(r#"ti:"{keyword}" OR abs:"{keyword}""#)
        } else {
            format!("ti:{keyword} OR abs:{keyword}")
        }
    }

    /// Fetches candidates for a topic within `[now - days_back, now]`, sorted
    /// by submission date descending, length-bounded by
    /// `max_papers_per_topic`. Never returns an error: transport or parse
    /// failures on both schemes degrade to an empty list with a logged
    /// warning, per the archive client's "never raises" contract.
    pub async fn fetch(&self, topic: &Topic, fetch: &FetchConfig) -> Vec<PaperCandidate> {
        let query = Self::build_query(topic);
        let window_start = Utc::now() - chrono::Duration::days(fetch.days_back);

        self.throttle(fetch.request_delay).await;
        match self.fetch_from(HTTPS_ENDPOINT, &query, fetch.max_papers_per_topic).await {
            Ok(body) => self.parse_and_filter(&body, topic, window_start, fetch.max_papers_per_topic),
            Err(e) => {
                tracing::warn!("arXiv HTTPS fetch failed for topic '{}': {e}; retrying over HTTP", topic.name);
                self.throttle(fetch.request_delay).await;
                match self.fetch_from(HTTP_ENDPOINT, &query, fetch.max_papers_per_topic).await {
                    Ok(body) => self.parse_and_filter(&body, topic, window_start, fetch.max_papers_per_topic),
                    Err(e) => {
                        tracing::warn!("arXiv fallback fetch failed for topic '{}': {e}", topic.name);
                        Vec::new()
                    }
                }
            }
        }
    }

    async fn fetch_from(&self, endpoint: &str, query: &str, max_results: usize) -> Result<String, String> {
        let response = self
            .client
            .get(endpoint)
            .query(&[
                ("search_query", query),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
                ("start", "0"),
                ("max_results", &max_results.to_string()),
            ])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }

        response.text().await.map_err(|e| e.to_string())
    }

    fn parse_and_filter(
        &self,
        body: &str,
        topic: &Topic,
        window_start: DateTime<Utc>,
        max_results: usize,
    ) -> Vec<PaperCandidate> {
        let feed: AtomFeed = match quick_xml::de::from_str(body) {
            Ok(feed) => feed,
            Err(e) => {
                tracing::warn!("failed to parse arXiv Atom response for topic '{}': {e}", topic.name);
                return Vec::new();
            }
        };

        let exclude: Vec<String> = topic.query.exclude.iter().map(|k| k.to_lowercase()).collect();
        let mut candidates = Vec::new();

        for entry in feed.entries {
            let arxiv_id = match entry.id.rsplit('/').next() {
                Some(segment) => strip_version_suffix(segment),
                None => continue,
            };

            let title = entry.title.split_whitespace().collect::<Vec<_>>().join(" ");
            let abstract_text = entry.summary.split_whitespace().collect::<Vec<_>>().join(" ");

            let published = parse_atom_datetime(&entry.published).unwrap_or_else(Utc::now);
            if published < window_start {
                continue;
            }

            let updated = parse_atom_datetime(&entry.updated).unwrap_or(published);

            let authors: Vec<String> = entry.authors.into_iter().map(|a| a.name).collect();
            let authors = if authors.is_empty() { vec!["Unknown".to_string()] } else { authors };
            let categories: Vec<String> = entry.categories.into_iter().map(|c| c.term).collect();

            let searchable = format!("{title} {abstract_text}").to_lowercase();
            if exclude.iter().any(|kw| searchable.contains(kw.as_str())) {
                continue;
            }

            candidates.push(PaperCandidate {
                arxiv_id: arxiv_id.clone(),
                title,
                abstract_text,
                authors,
                affiliations: None,
                categories,
                published,
                updated,
                arxiv_url: format!("https://arxiv.org/abs/{arxiv_id}"),
                pdf_url: format!("https://arxiv.org/pdf/{arxiv_id}.pdf"),
                comment: entry.comment,
            });

            if candidates.len() >= max_results {
                break;
            }
        }

        candidates
    }
}

impl Default for ArchiveClient {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_version_suffix(id: &str) -> String {
    match id.rfind('v') {
        Some(pos) if id[pos + 1..].chars().all(|c| c.is_ascii_digit()) && pos + 1 < id.len() => id[..pos].to_string(),
        _ => id.to_string(),
    }
}

fn parse_atom_datetime(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim()).ok().map(|dt| dt.with_timezone(&Utc))
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(default, rename = "entry")]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: String,
    title: String,
    summary: String,
    #[serde(default)]
    published: String,
    #[serde(default)]
    updated: String,
    #[serde(default, rename = "author")]
    authors: Vec<AtomAuthor>,
    #[serde(default, rename = "category")]
    categories: Vec<AtomCategory>,
    #[serde(default, rename = "arxiv:comment")]
    comment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AtomCategory {
    #[serde(rename = "@term")]
    term: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TopicQuery;

    fn topic(include: Vec<&str>, categories: Vec<&str>, exclude: Vec<&str>) -> Topic {
        Topic {
            name: "t".to_string(),
            label: "T".to_string(),
            query: TopicQuery {
                include: include.into_iter().map(String::from).collect(),
                categories: categories.into_iter().map(String::from).collect(),
                exclude: exclude.into_iter().map(String::from).collect(),
            },
            interest_prompt: String::new(),
        }
    }

    #[test]
    fn builds_include_and_category_query() {
        let t = topic(vec!["dense retrieval"], vec!["cs.IR"], vec![]);
        let q = ArchiveClient::build_query(&t);
        assert_eq!(q, r#"(ti:"dense retrieval" OR abs:"dense retrieval") AND (cat:cs.IR)"#);
    }

    #[test]
    fn single_word_keyword_is_unquoted() {
        let t = topic(vec!["retrieval"], vec![], vec![]);
        assert_eq!(ArchiveClient::build_query(&t), "(ti:retrieval OR abs:retrieval)");
    }

    #[test]
    fn exclude_becomes_not_group() {
        let t = topic(vec!["retrieval"], vec![], vec!["survey"]);
        let q = ArchiveClient::build_query(&t);
        assert!(q.contains("NOT (ti:survey OR abs:survey)"));
    }

    #[test]
    fn empty_topic_falls_back_to_all_cs() {
        let t = topic(vec![], vec![], vec![]);
        assert_eq!(ArchiveClient::build_query(&t), "all:cs");
    }

    #[test]
    fn strips_version_suffix() {
        assert_eq!(strip_version_suffix("2301.00001v2"), "2301.00001");
        assert_eq!(strip_version_suffix("cs.CL/0001001v1"), "cs.CL/0001001");
        assert_eq!(strip_version_suffix("2301.00001"), "2301.00001");
    }

    #[test]
    fn parses_atom_feed_and_applies_window_and_exclude() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/abs/2301.00001v1</id>
    <title>A Survey of Things</title>
    <summary>An old survey.</summary>
    <published>2000-01-01T00:00:00Z</published>
    <updated>2000-01-01T00:00:00Z</updated>
    <author><name>Alice</name></author>
    <category term="cs.AI" />
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2301.00002v3</id>
    <title>Dense Retrieval Methods</title>
    <summary>We propose a new approach.</summary>
    <published>2999-01-01T00:00:00Z</published>
    <updated>2999-01-01T00:00:00Z</updated>
    <author><name>Bob</name></author>
    <category term="cs.IR" />
  </entry>
</feed>"#;

        let client = ArchiveClient::new();
        let t = topic(vec!["retrieval"], vec![], vec!["survey"]);
        let window_start = Utc::now() - chrono::Duration::days(1);
        let candidates = client.parse_and_filter(body, &t, window_start, 10);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].arxiv_id, "2301.00002");
        assert_eq!(candidates[0].authors, vec!["Bob".to_string()]);
    }

    #[tokio::test]
    async fn throttle_enforces_minimum_spacing_between_calls() {
        let client = ArchiveClient::new();
        client.throttle(0.2).await;
        let start = std::time::Instant::now();
        client.throttle(0.2).await;
        assert!(start.elapsed() >= Duration::from_secs_f64(0.2));
    }

    #[tokio::test]
    async fn throttle_is_a_noop_for_non_positive_delay() {
        let client = ArchiveClient::new();
        client.throttle(0.0).await;
        let start = std::time::Instant::now();
        client.throttle(0.0).await;
        assert!(start.elapsed() < Duration::from_secs_f64(0.2));
    }
}
