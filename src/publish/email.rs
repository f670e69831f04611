//! SMTP email digest. Grounded in `original_source/src/publisher/
//! email_digest.py`; composes an HTML body grouped by topic and sends via
//! `lettre`, choosing STARTTLS or implicit TLS per `EmailConfig`. No-ops
//! (logged at `debug`) when disabled or missing required fields, matching
//! the "logged and swallowed" error policy for this publisher.

use std::collections::BTreeMap;
use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Message, SmtpTransport, Transport};

use crate::config::EmailConfig;
use crate::model::PaperSummary;

/// Sends the digest email for one run. Never returns an error to the
/// caller: failures are logged and swallowed per the publisher's error
/// policy (§7), so a broken SMTP configuration never fails the run.
pub fn send_digest(email: &EmailConfig, summaries: &[PaperSummary], run_date: &str) {
    if !email.enabled {
        tracing::debug!("email digest disabled; skipping");
        return;
    }
    if email.sender.trim().is_empty() || email.recipients.is_empty() || email.smtp_host.trim().is_empty() {
        tracing::debug!("email digest missing sender, recipients, or smtp_host; skipping");
        return;
    }

    let subject = email
        .subject_template
        .replace("{run_date}", run_date)
        .replace("{paper_count}", &summaries.len().to_string());
    let body = build_body(summaries);

    let message = match build_message(email, &subject, &body) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!("failed to build digest email: {e}");
            return;
        }
    };

    let mailer = match build_transport(email) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!("failed to build SMTP transport: {e}");
            return;
        }
    };

    if let Err(e) = mailer.send(&message) {
        tracing::warn!("failed to send digest email: {e}");
    }
}

fn build_message(email: &EmailConfig, subject: &str, body: &str) -> Result<Message, Box<dyn std::error::Error>> {
    let mut builder = Message::builder().from(email.sender.parse()?).subject(subject.to_string()).header(ContentType::TEXT_HTML);
    for recipient in &email.recipients {
        builder = builder.to(recipient.parse()?);
    }
    Ok(builder.body(body.to_string())?)
}

fn build_transport(email: &EmailConfig) -> Result<SmtpTransport, Box<dyn std::error::Error>> {
    let tls_parameters = TlsParameters::new(email.smtp_host.clone())?;
    let tls = if email.use_ssl {
        Tls::Wrapper(tls_parameters)
    } else if email.use_tls {
        Tls::Required(tls_parameters)
    } else {
        Tls::None
    };

    let mut builder = SmtpTransport::builder_dangerous(&email.smtp_host).port(email.smtp_port).tls(tls).timeout(Some(Duration::from_secs(email.timeout)));

    if !email.username.is_empty() {
        builder = builder.credentials(Credentials::new(email.username.clone(), email.password.clone()));
    }

    Ok(builder.build())
}

fn build_body(summaries: &[PaperSummary]) -> String {
    if summaries.is_empty() {
        return "<p>0 papers matched any configured topic in this run.</p>".to_string();
    }

    let mut by_topic: BTreeMap<&str, Vec<&PaperSummary>> = BTreeMap::new();
    for summary in summaries {
        by_topic.entry(&summary.topic.label).or_default().push(summary);
    }

    let sections = by_topic
        .iter()
        .map(|(label, papers)| {
            let items = papers
                .iter()
                .map(|p| format!("<li><strong>{}</strong> &mdash; score {:.1}<br>{}</li>", escape(&p.paper.title), p.score.normalized_score, escape(&p.brief_summary)))
                .collect::<Vec<_>>()
                .join("\n");
            format!("<h2>{}</h2><ul>{items}</ul>", escape(label))
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("<h1>Research digest ({} papers)</h1>\n{sections}", summaries.len())
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
