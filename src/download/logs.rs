use futures::future::join_all;
use log::{info, warn};
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::gitlab::{GitLabClient, Job};

use super::{job_dir, DownloadReport};

const LOG_FILE_NAME: &str = "job.log";

/// Download every job's trace into `{download path}/{job dir}/job.log`.
///
/// Logs are fetched for all jobs, not just artifact-bearing ones. Individual
/// failures are logged and recorded in the report; they never abort the rest
/// of the batch.
pub async fn download_logs(
    client: &GitLabClient,
    project_id: &str,
    jobs: &[Job],
    download_path: &Path,
    report: &mut DownloadReport,
) {
    let fetches = jobs
        .iter()
        .map(|job| fetch_job_log(client, project_id, job, download_path));
    let results = join_all(fetches).await;

    for (job, result) in jobs.iter().zip(results) {
        match result {
            Ok(()) => {
                info!("Downloaded log for job {} ({})", job.id, job.name);
                report.record_log(job, true);
            }
            Err(e) => {
                warn!("Failed to download log for job {} ({}): {e}", job.id, job.name);
                report.record_log(job, false);
            }
        }
    }
}

async fn fetch_job_log(
    client: &GitLabClient,
    project_id: &str,
    job: &Job,
    download_path: &Path,
) -> Result<()> {
    let trace = client.job_trace(project_id, job.id).await?;

    let dir = job_dir(download_path, job);
    fs::create_dir_all(&dir)?;
    fs::write(dir.join(LOG_FILE_NAME), trace)?;

    Ok(())
}
