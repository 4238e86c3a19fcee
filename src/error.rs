use thiserror::Error;

#[derive(Error, Debug)]
pub enum TriggerError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("GitLab API returned status code {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive extraction error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("No artifacts or logs were downloaded: {0}")]
    NothingDownloaded(&'static str),

    #[error("Pipeline failed")]
    PipelineFailed,
}

impl TriggerError {
    /// Short classification used for the non-verbose failure message.
    pub fn summary(&self) -> &'static str {
        match self {
            Self::Config(_) => "invalid configuration",
            Self::Api { .. } => "the GitLab API rejected a request",
            Self::Network(_) => "a network request could not be completed",
            Self::Json(_) => "an API response could not be parsed",
            Self::Io(_) => "a file could not be written",
            Self::Archive(_) => "an artifact archive could not be extracted",
            Self::NothingDownloaded(_) => "no artifacts or logs were downloaded",
            Self::PipelineFailed => "the pipeline finished with status failed",
        }
    }
}

pub type Result<T> = std::result::Result<T, TriggerError>;
