use futures::future::join_all;
use log::{info, warn};
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::gitlab::{GitLabClient, Job};

use super::{job_dir, logs, DownloadReport};

const DEFAULT_ARCHIVE_NAME: &str = "artifacts.zip";

/// Download and extract the artifact bundle of every artifact-bearing job,
/// plus the logs of all jobs when `include_logs` is set.
///
/// Only jobs with a non-empty artifact descriptor are candidates. When there
/// are no candidates and logs were not requested, nothing is written at all,
/// not even the download directory. Per-job failures are recorded and never
/// abort the remaining jobs; the caller decides from the report whether an
/// empty result fails the run.
pub async fn download_artifacts(
    client: &GitLabClient,
    project_id: &str,
    jobs: &[Job],
    download_path: &Path,
    include_logs: bool,
) -> DownloadReport {
    let candidates: Vec<&Job> = jobs.iter().filter(|job| job.has_artifacts()).collect();

    let mut report = DownloadReport {
        candidates: candidates.len(),
        ..DownloadReport::default()
    };

    if candidates.is_empty() && !include_logs {
        warn!(
            "None of the {} jobs produced artifacts, nothing to download",
            jobs.len()
        );
        return report;
    }

    let fetches = candidates
        .iter()
        .map(|job| fetch_job_artifacts(client, project_id, job, download_path));
    let results = join_all(fetches).await;

    for (job, result) in candidates.iter().zip(results) {
        match result {
            Ok(()) => {
                info!(
                    "Downloaded and extracted artifacts for job {} ({})",
                    job.id, job.name
                );
                report.record_artifacts(job, true);
            }
            Err(e) => {
                warn!(
                    "Failed to download artifacts for job {} ({}): {e}",
                    job.id, job.name
                );
                report.record_artifacts(job, false);
            }
        }
    }

    if include_logs {
        logs::download_logs(client, project_id, jobs, download_path, &mut report).await;
    }

    report
}

/// Download the bundle, extract it in place, drop the intermediate archive.
async fn fetch_job_artifacts(
    client: &GitLabClient,
    project_id: &str,
    job: &Job,
    download_path: &Path,
) -> Result<()> {
    let bytes = client.job_artifacts(project_id, job.id).await?;

    let dir = job_dir(download_path, job);
    fs::create_dir_all(&dir)?;

    let archive_name = job
        .artifacts_file
        .as_ref()
        .filter(|file| !file.filename.is_empty())
        .map_or(DEFAULT_ARCHIVE_NAME, |file| file.filename.as_str());
    let archive_path = dir.join(archive_name);

    fs::write(&archive_path, &bytes)?;
    extract_archive(&archive_path, &dir)?;
    fs::remove_file(&archive_path)?;

    Ok(())
}

/// Extract the full archive into `dir`, overwriting pre-existing files.
fn extract_archive(archive_path: &Path, dir: &Path) -> Result<()> {
    let file = fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    archive.extract(dir)?;

    Ok(())
}
