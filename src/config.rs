use indexmap::IndexMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::Token;
use crate::error::{Result, TriggerError};

/// Configuration for a single run.
///
/// Built once from the CLI arguments and passed by reference to every
/// component; nothing re-reads raw inputs further down the call tree.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// GitLab host, with or without a scheme (defaults to https)
    pub host: String,

    /// Numeric project id or project path (URL-encoded before use)
    pub project_id: String,

    /// Token authorizing the trigger call
    pub trigger_token: String,

    /// Token authorizing status reads and downloads; optional because some
    /// projects permit unauthenticated status reads
    pub access_token: Option<Token>,

    /// Git ref to run the pipeline for
    pub ref_: String,

    /// Pipeline variables, in the order they were supplied
    pub variables: IndexMap<String, String>,

    /// Download job artifacts once the pipeline finishes
    pub download_artifacts: bool,

    /// Also download artifacts when the pipeline failed
    pub download_on_failure: bool,

    /// Download every job's log
    pub download_job_logs: bool,

    /// Fail the run when downloading was attempted but yielded nothing
    pub fail_if_no_artifacts: bool,

    /// Directory artifacts and logs are written to
    pub download_path: PathBuf,

    /// Wait between two status reads while polling
    pub poll_interval: Duration,

    /// Include full error detail in the failure message
    pub verbose: bool,
}

impl RunConfig {
    /// Rejects configurations that could only fail mid-run, before any
    /// network call is made.
    pub fn validate(&self) -> Result<()> {
        if self.trigger_token.is_empty() {
            return Err(TriggerError::Config(
                "trigger token must not be empty".to_owned(),
            ));
        }

        if (self.download_artifacts || self.download_job_logs) && self.access_token.is_none() {
            return Err(TriggerError::Config(
                "an access token is required when artifact or job log download is requested"
                    .to_owned(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> RunConfig {
        RunConfig {
            host: "gitlab.com".to_owned(),
            project_id: "123".to_owned(),
            trigger_token: "trigger-token".to_owned(),
            access_token: None,
            ref_: "main".to_owned(),
            variables: IndexMap::new(),
            download_artifacts: false,
            download_on_failure: false,
            download_job_logs: false,
            fail_if_no_artifacts: false,
            download_path: PathBuf::from("artifacts"),
            poll_interval: Duration::from_secs(15),
            verbose: false,
        }
    }

    #[test]
    fn accepts_a_plain_trigger_run_without_access_token() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn rejects_an_empty_trigger_token() {
        let config = RunConfig {
            trigger_token: String::new(),
            ..base_config()
        };

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("trigger token"));
    }

    #[test]
    fn rejects_artifact_download_without_access_token() {
        let config = RunConfig {
            download_artifacts: true,
            ..base_config()
        };

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("access token"));
    }

    #[test]
    fn rejects_log_download_without_access_token() {
        let config = RunConfig {
            download_job_logs: true,
            ..base_config()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn accepts_downloads_with_access_token() {
        let config = RunConfig {
            download_artifacts: true,
            download_job_logs: true,
            access_token: Some(Token::from("glpat-token")),
            ..base_config()
        };

        assert!(config.validate().is_ok());
    }
}
