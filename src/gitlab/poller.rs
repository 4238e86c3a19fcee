use log::{debug, info, warn};
use std::time::Duration;
use thiserror::Error;

use crate::error::TriggerError;

use super::client::GitLabClient;
use super::types::Status;

/// How long to wait between two status reads.
pub const POLL_INTERVAL: Duration = Duration::from_secs(15);

/// A poll loop that ended on a request failure instead of a terminal status.
#[derive(Debug, Error)]
#[error("Polling aborted while pipeline status was {last_status}: {source}")]
pub struct PollError {
    /// The most recent status observed before the failing request
    pub last_status: Status,
    #[source]
    pub source: TriggerError,
}

/// Drives a pipeline from its initial status to a terminal one.
///
/// There is no iteration cap or overall timeout: the loop runs until the
/// remote reports a terminal status or a single status read fails. Callers
/// needing an upper bound must impose it externally.
pub struct Poller<'a> {
    client: &'a GitLabClient,
    interval: Duration,
}

impl<'a> Poller<'a> {
    /// `interval` is [`POLL_INTERVAL`] in production; tests inject a near-zero
    /// one to simulate time.
    pub fn new(client: &'a GitLabClient, interval: Duration) -> Self {
        Self { client, interval }
    }

    /// Wait-then-check until a terminal status appears.
    ///
    /// A single failed status read ends the loop immediately, no retries; the
    /// error carries the last status seen so the caller can still report it.
    pub async fn poll(
        &self,
        project_id: &str,
        pipeline_id: u64,
        web_url: &str,
    ) -> Result<Status, PollError> {
        info!("Polling pipeline {pipeline_id}");

        let mut status = Status::Pending;

        loop {
            tokio::time::sleep(self.interval).await;

            let pipeline = match self.client.pipeline(project_id, pipeline_id).await {
                Ok(pipeline) => pipeline,
                Err(source) => {
                    return Err(PollError {
                        last_status: status,
                        source,
                    })
                }
            };

            status = pipeline.status;
            info!("Pipeline status: {status} ({web_url})");

            if status == Status::Failed {
                warn!("Pipeline {pipeline_id} failed");
            }

            if status.is_terminal() {
                debug!("Terminal status {status} detected, stopping");
                return Ok(status);
            }
        }
    }
}
