//! Error types for the library.

use thiserror::Error;

/// Main error type for the pipeline.
#[derive(Error, Debug)]
pub enum AppError {
    /// Generic internal error.
    #[error("{0}")]
    Internal(String),

    /// Configuration error (missing env var, malformed topic, bad YAML).
    #[error("configuration error: {0}")]
    Config(String),

    /// arXiv archive client error.
    #[error("arXiv API error: {0}")]
    Archive(String),

    /// Content-fetch error (HTML rendition or PDF extraction).
    #[error("content fetch error: {0}")]
    Fetch(String),

    /// Relevance-ranking error.
    #[error("relevance ranking error: {0}")]
    Ranker(String),

    /// Reading-engine stage error, scoped to one paper/stage.
    #[error("reading engine error ({arxiv_id}, stage {stage}): {message}")]
    Reading {
        arxiv_id: String,
        stage: &'static str,
        message: String,
    },

    /// LLM provider error.
    #[error("LLM error: {0}")]
    Llm(String),

    /// LLM capability not supported by the configured provider.
    #[error("LLM provider {provider} does not support {capability}")]
    LlmUnsupported {
        provider: &'static str,
        capability: &'static str,
    },

    /// Report-builder error.
    #[error("report builder error: {0}")]
    Report(String),

    /// Static-site publisher error.
    #[error("static site error: {0}")]
    Site(String),

    /// Email publisher error.
    #[error("email digest error: {0}")]
    Email(String),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Anyhow error (for compatibility at the CLI boundary).
    #[error("error: {0}")]
    Anyhow(#[from] anyhow::Error),

    /// Tracing initialization error.
    #[error("tracing error: {0}")]
    Logger(#[from] shared::logger::LoggerError),
}

impl From<&str> for AppError {
    fn from(s: &str) -> Self {
        AppError::Internal(s.to_string())
    }
}

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::Internal(s)
    }
}

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;
