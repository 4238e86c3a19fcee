mod artifacts;
mod logs;

pub use artifacts::download_artifacts;
pub use logs::download_logs;

use std::path::{Path, PathBuf};

use crate::gitlab::Job;

/// Per-job download bookkeeping.
///
/// Artifact and log results are tracked independently: a job's log can
/// succeed while its artifact download fails. `None` means the download was
/// never attempted for that job.
#[derive(Debug)]
pub struct JobOutcome {
    pub job_id: u64,
    pub job_name: String,
    pub artifacts: Option<bool>,
    pub log: Option<bool>,
}

/// Aggregated outcomes of a batch download.
#[derive(Debug, Default)]
pub struct DownloadReport {
    /// Number of jobs that carried an artifact descriptor
    pub candidates: usize,
    pub outcomes: Vec<JobOutcome>,
}

impl DownloadReport {
    fn outcome_mut(&mut self, job: &Job) -> &mut JobOutcome {
        let position = match self.outcomes.iter().position(|o| o.job_id == job.id) {
            Some(position) => position,
            None => {
                self.outcomes.push(JobOutcome {
                    job_id: job.id,
                    job_name: job.name.clone(),
                    artifacts: None,
                    log: None,
                });
                self.outcomes.len() - 1
            }
        };

        &mut self.outcomes[position]
    }

    pub(crate) fn record_artifacts(&mut self, job: &Job, downloaded: bool) {
        self.outcome_mut(job).artifacts = Some(downloaded);
    }

    pub(crate) fn record_log(&mut self, job: &Job, downloaded: bool) {
        self.outcome_mut(job).log = Some(downloaded);
    }

    pub fn artifact_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.artifacts == Some(true))
            .count()
    }

    pub fn log_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.log == Some(true)).count()
    }

    /// True iff at least one artifact bundle or one log was retrieved.
    pub fn downloaded_any(&self) -> bool {
        self.artifact_count() > 0 || self.log_count() > 0
    }
}

/// Directory a job's downloads go into, named deterministically from the job
/// id and a sanitized job name so concurrent per-job writes never collide.
pub fn job_dir(download_path: &Path, job: &Job) -> PathBuf {
    download_path.join(format!("{}-{}", job.id, sanitize_name(&job.name)))
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
