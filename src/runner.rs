use log::{info, warn};
use serde::Serialize;

use crate::config::RunConfig;
use crate::download::{self, DownloadReport};
use crate::error::TriggerError;
use crate::gitlab::{GitLabClient, Poller, Status};

/// Outputs of a run, plus the failure that ended it, if any.
///
/// Outputs are filled in as stages complete so that a failure in a late stage
/// still reports everything learned before it; only the CLI layer turns them
/// into side effects.
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub id: Option<u64>,
    pub status: Option<Status>,
    pub web_url: Option<String>,
    pub artifacts_downloaded: bool,
    #[serde(skip)]
    pub failure: Option<TriggerError>,
}

impl RunReport {
    fn fail(mut self, failure: TriggerError) -> Self {
        self.failure = Some(failure);
        self
    }
}

/// Run the whole orchestration: trigger, poll to a terminal status, then
/// download artifacts and logs as configured.
pub async fn execute(config: &RunConfig) -> RunReport {
    let report = RunReport::default();

    if let Err(e) = config.validate() {
        return report.fail(e);
    }

    let client = match GitLabClient::new(&config.host, config.access_token.clone()) {
        Ok(client) => client,
        Err(e) => return report.fail(e),
    };

    run_pipeline(config, &client, report).await
}

async fn run_pipeline(config: &RunConfig, client: &GitLabClient, mut report: RunReport) -> RunReport {
    info!(
        "Triggering pipeline for project {} with ref {} on {}",
        config.project_id, config.ref_, config.host
    );

    let pipeline = match client
        .trigger_pipeline(
            &config.project_id,
            &config.trigger_token,
            &config.ref_,
            &config.variables,
        )
        .await
    {
        Ok(pipeline) => pipeline,
        Err(e) => return report.fail(e),
    };

    report.id = Some(pipeline.id);
    report.status = Some(pipeline.status);
    report.web_url = Some(pipeline.web_url.clone());
    info!(
        "Pipeline {} triggered, see {} for details",
        pipeline.id, pipeline.web_url
    );

    let poller = Poller::new(client, config.poll_interval);
    let final_status = match poller
        .poll(&config.project_id, pipeline.id, &pipeline.web_url)
        .await
    {
        Ok(status) => status,
        Err(e) => {
            report.status = Some(e.last_status);
            return report.fail(e.source);
        }
    };
    report.status = Some(final_status);

    if config.download_artifacts || config.download_job_logs {
        // One listing, shared by both fetch stages. A failed listing degrades
        // to an empty job set instead of aborting the run.
        let jobs = match client.pipeline_jobs(&config.project_id, pipeline.id).await {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!("Failed to list jobs for pipeline {}: {e}", pipeline.id);
                Vec::new()
            }
        };

        if config.download_artifacts && should_download_artifacts(final_status, config) {
            let downloads = download::download_artifacts(
                client,
                &config.project_id,
                &jobs,
                &config.download_path,
                config.download_job_logs,
            )
            .await;

            report.artifacts_downloaded = downloads.artifact_count() > 0;
            info!(
                "Downloaded artifacts for {} of {} jobs and logs for {} jobs",
                downloads.artifact_count(),
                downloads.candidates,
                downloads.log_count()
            );

            if !downloads.downloaded_any() && config.fail_if_no_artifacts {
                let reason = if downloads.candidates == 0 {
                    "no jobs produced artifacts"
                } else {
                    "every download failed"
                };
                return report.fail(TriggerError::NothingDownloaded(reason));
            }
        } else if config.download_job_logs {
            // Log download is not gated by the pipeline outcome.
            let mut downloads = DownloadReport::default();
            download::download_logs(
                client,
                &config.project_id,
                &jobs,
                &config.download_path,
                &mut downloads,
            )
            .await;
            info!(
                "Downloaded logs for {} of {} jobs",
                downloads.log_count(),
                jobs.len()
            );
        }
    }

    if final_status == Status::Failed {
        return report.fail(TriggerError::PipelineFailed);
    }

    report
}

fn should_download_artifacts(final_status: Status, config: &RunConfig) -> bool {
    match final_status {
        Status::Success => true,
        Status::Failed if config.download_on_failure => true,
        Status::Failed => {
            info!("Pipeline failed and download-on-failure is not set, skipping artifact download");
            false
        }
        other => {
            info!("Pipeline finished as {other}, skipping artifact download");
            false
        }
    }
}
