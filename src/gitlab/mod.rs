mod client;
mod poller;
mod types;

pub use client::GitLabClient;
pub use poller::{PollError, Poller, POLL_INTERVAL};
pub use types::{ArtifactsFile, Job, Pipeline, Status};
