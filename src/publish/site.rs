//! Static-site builder: writes `index.html`, one page per published paper,
//! and a `manifest.json`. Grounded in `original_source/src/publisher/
//! static_site.py`'s structure; regenerates `output_dir` from scratch on
//! every run, matching the Python's no-incremental-merge behavior.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::config::SiteConfig;
use crate::model::{PaperSummary, Topic};

#[derive(Serialize)]
struct Manifest {
    base_url: String,
    generated: String,
    topics: BTreeMap<String, Vec<String>>,
}

/// Writes the full static site for `summaries` into `site.output_dir`,
/// wiping and recreating the directory first. Fails only if the top-level
/// index cannot be written; individual paper pages that fail to write are
/// logged and skipped. `topics` is the full configured topic list, so a
/// topic that selected zero papers still appears in the manifest.
pub fn build_site(site: &SiteConfig, topics: &[Topic], summaries: &[PaperSummary]) -> AppResult<()> {
    let output_dir = Path::new(&site.output_dir);
    if output_dir.exists() {
        fs::remove_dir_all(output_dir).map_err(|e| AppError::Site(format!("failed to clear {}: {e}", output_dir.display())))?;
    }
    fs::create_dir_all(output_dir).map_err(|e| AppError::Site(format!("failed to create {}: {e}", output_dir.display())))?;

    let mut by_topic: BTreeMap<String, Vec<&PaperSummary>> = BTreeMap::new();
    for summary in summaries {
        by_topic.entry(summary.topic.name.clone()).or_default().push(summary);
    }

    let mut manifest_topics: BTreeMap<String, Vec<String>> = BTreeMap::new();
    // Every configured topic appears, even those that selected zero papers.
    for topic in topics {
        manifest_topics.insert(topic.name.clone(), Vec::new());
    }
    for (name, papers) in &by_topic {
        manifest_topics.insert(name.clone(), papers.iter().map(|p| p.paper.arxiv_id.clone()).collect());
    }

    for (topic_name, papers) in &by_topic {
        let topic_dir = output_dir.join("topics").join(topic_name);
        if let Err(e) = fs::create_dir_all(&topic_dir) {
            tracing::warn!("failed to create topic directory for '{topic_name}': {e}");
            continue;
        }
        for paper in papers {
            let page_path = topic_dir.join(format!("{}.html", paper.paper.arxiv_id));
            let html = render_paper_page(paper);
            if let Err(e) = fs::write(&page_path, html) {
                tracing::warn!("failed to write paper page {}: {e}", page_path.display());
            }
        }
    }

    let index_html = render_index(site, &by_topic);
    fs::write(output_dir.join("index.html"), index_html)
        .map_err(|e| AppError::Site(format!("failed to write index.html: {e}")))?;

    let manifest = Manifest { base_url: site.base_url.clone(), generated: Utc::now().to_rfc3339(), topics: manifest_topics };
    let manifest_json = serde_json::to_string_pretty(&manifest)?;
    fs::write(output_dir.join("manifest.json"), manifest_json)
        .map_err(|e| AppError::Site(format!("failed to write manifest.json: {e}")))?;

    Ok(())
}

fn render_index(site: &SiteConfig, by_topic: &BTreeMap<String, Vec<&PaperSummary>>) -> String {
    let total: usize = by_topic.values().map(|v| v.len()).sum();

    let body = if total == 0 {
        "<p class=\"empty\">No papers matched any configured topic in this run.</p>".to_string()
    } else {
        by_topic
            .iter()
            .map(|(name, papers)| {
                let items = papers
                    .iter()
                    .map(|p| {
                        format!(
                            "<li><a href=\"topics/{name}/{}.html\">{}</a> &mdash; {:.1}</li>",
                            p.paper.arxiv_id,
                            escape(&p.paper.title),
                            p.score.normalized_score
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("<section><h2>{}</h2><ul>{items}</ul></section>", escape(name))
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"<!doctype html>
<html lang="{lang}">
<head><meta charset="utf-8"><title>Research digest</title></head>
<body>
<h1>Research digest</h1>
<p>{total} paper(s) across {topics} topic(s).</p>
{body}
</body>
</html>"#,
        lang = site.locale.clone().unwrap_or_else(|| "en".to_string()),
        topics = by_topic.len(),
    )
}

fn render_paper_page(summary: &PaperSummary) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>{title}</title></head>
<body>
<article>
<pre>{markdown}</pre>
</article>
</body>
</html>"#,
        title = escape(&summary.paper.title),
        markdown = escape(&summary.markdown),
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DimensionScore, PaperCandidate, ScoredPaper, Topic, TopicQuery};
    use chrono::Utc;
    use tempfile::tempdir;

    fn topic(name: &str) -> Topic {
        Topic {
            name: name.to_string(),
            label: name.to_string(),
            query: TopicQuery { categories: vec!["cs.AI".to_string()], include: vec![], exclude: vec![] },
            interest_prompt: String::new(),
        }
    }

    fn summary(topic_name: &str, arxiv_id: &str) -> PaperSummary {
        let candidate = PaperCandidate::new(
            arxiv_id.to_string(),
            "A Paper".to_string(),
            "An abstract.".to_string(),
            vec!["Author".to_string()],
            vec!["cs.AI".to_string()],
            Utc::now(),
            Utc::now(),
            format!("https://arxiv.org/abs/{arxiv_id}"),
            format!("https://arxiv.org/pdf/{arxiv_id}.pdf"),
        );
        let scores = vec![DimensionScore { name: "topic_alignment".to_string(), weight: 1.0, value: 0.9 }];
        let score = ScoredPaper::new(candidate.clone(), scores, 50.0);
        PaperSummary {
            paper: candidate,
            topic: topic(topic_name),
            core_summary: None,
            task_list: vec![],
            findings: vec![],
            overview: "overview".to_string(),
            brief_summary: "brief".to_string(),
            score,
            markdown: "# A Paper".to_string(),
            partial: false,
        }
    }

    #[test]
    fn writes_index_pages_and_manifest() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("site");
        let site_config = SiteConfig { output_dir: output_dir.to_string_lossy().into_owned(), base_url: "https://example.invalid".to_string(), locale: None };
        let topics = vec![topic("retrieval")];
        let summaries = vec![summary("retrieval", "2301.00001")];

        build_site(&site_config, &topics, &summaries).unwrap();

        assert!(output_dir.join("index.html").exists());
        assert!(output_dir.join("manifest.json").exists());
        assert!(output_dir.join("topics/retrieval/2301.00001.html").exists());

        let manifest_text = fs::read_to_string(output_dir.join("manifest.json")).unwrap();
        let manifest: serde_json::Value = serde_json::from_str(&manifest_text).unwrap();
        assert_eq!(manifest["topics"]["retrieval"][0], "2301.00001");
    }

    #[test]
    fn empty_summaries_still_write_index_with_empty_state() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("site");
        let site_config = SiteConfig { output_dir: output_dir.to_string_lossy().into_owned(), base_url: String::new(), locale: None };

        build_site(&site_config, &[], &[]).unwrap();

        let index = fs::read_to_string(output_dir.join("index.html")).unwrap();
        assert!(index.contains("No papers matched"));
    }

    #[test]
    fn rebuilds_directory_from_scratch() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("site");
        fs::create_dir_all(&output_dir).unwrap();
        fs::write(output_dir.join("stale.txt"), "leftover").unwrap();

        let site_config = SiteConfig { output_dir: output_dir.to_string_lossy().into_owned(), base_url: String::new(), locale: None };
        build_site(&site_config, &[], &[]).unwrap();

        assert!(!output_dir.join("stale.txt").exists());
    }

    #[test]
    fn topic_with_zero_selected_papers_still_appears_in_manifest() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("site");
        let site_config = SiteConfig { output_dir: output_dir.to_string_lossy().into_owned(), base_url: String::new(), locale: None };
        let topics = vec![topic("empty-topic")];

        build_site(&site_config, &topics, &[]).unwrap();

        let manifest_text = fs::read_to_string(output_dir.join("manifest.json")).unwrap();
        let manifest: serde_json::Value = serde_json::from_str(&manifest_text).unwrap();
        assert_eq!(manifest["topics"]["empty-topic"], serde_json::json!([]));
    }
}
