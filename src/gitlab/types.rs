use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline status values reported by GitLab
/// (see <https://docs.gitlab.com/ee/api/pipelines.html>).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Created but not yet processed
    Created,
    /// Being prepared to run
    Preparing,
    /// Queued and waiting to start
    Pending,
    /// Queued, but not enough resources are available
    WaitingForResource,
    /// Currently running
    Running,
    /// Scheduled to run at a later time
    Scheduled,
    /// Completed with at least one failed job
    Failed,
    /// Completed with all jobs succeeded
    Success,
    /// Canceled by a user or the system
    Canceled,
    /// Skipped due to a configuration option or pipeline rule
    Skipped,
    /// Waiting for a user to trigger it manually
    Manual,
}

impl Status {
    /// Whether the remote service reports no further changes after this
    /// status. Polling stops on the first terminal status, whichever it is.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Failed | Self::Success | Self::Canceled | Self::Skipped
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Preparing => "preparing",
            Self::Pending => "pending",
            Self::WaitingForResource => "waiting_for_resource",
            Self::Running => "running",
            Self::Scheduled => "scheduled",
            Self::Failed => "failed",
            Self::Success => "success",
            Self::Canceled => "canceled",
            Self::Skipped => "skipped",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pipeline as returned by the trigger and status endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Pipeline {
    pub id: u64,
    pub status: Status,
    pub web_url: String,
}

/// A job within a pipeline, as returned by the jobs listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub id: u64,
    pub name: String,
    /// Present iff the job produced a downloadable artifact bundle
    #[serde(default)]
    pub artifacts_file: Option<ArtifactsFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsFile {
    pub filename: String,
}

impl Job {
    pub fn has_artifacts(&self) -> bool {
        self.artifacts_file
            .as_ref()
            .is_some_and(|file| !file.filename.is_empty())
    }
}
