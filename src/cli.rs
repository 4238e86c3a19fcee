use anyhow::{anyhow, Result};
use clap::Parser;
use log::{info, LevelFilter};
use std::path::PathBuf;

use crate::auth::Token;
use crate::config::RunConfig;
use crate::gitlab::POLL_INTERVAL;
use crate::runner;

#[derive(Parser)]
#[command(name = "gitlab-pipeline-trigger")]
#[command(author, version, about = "Trigger a GitLab pipeline, wait for it to finish, and collect artifacts and job logs", long_about = None)]
pub struct Cli {
    /// GitLab host, with or without a scheme
    #[arg(long, default_value = "gitlab.com")]
    host: String,

    /// Numeric project id or project path (e.g. 'group/project')
    #[arg(short = 'P', long)]
    project: String,

    /// Pipeline trigger token
    #[arg(long, env = "GITLAB_TRIGGER_TOKEN", hide_env_values = true)]
    trigger_token: String,

    /// Access token for status reads and downloads
    #[arg(long, env = "GITLAB_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Git ref to run the pipeline for
    #[arg(short, long, default_value = "main")]
    r#ref: String,

    /// Pipeline variable, repeatable
    #[arg(short, long = "variable", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    variables: Vec<(String, String)>,

    /// Download job artifacts once the pipeline finishes
    #[arg(long, default_value_t = false)]
    download_artifacts: bool,

    /// Also download artifacts when the pipeline failed
    #[arg(long, default_value_t = false)]
    download_on_failure: bool,

    /// Download every job's log
    #[arg(long, default_value_t = false)]
    download_job_logs: bool,

    /// Fail the run when downloading was attempted but yielded nothing
    #[arg(long, default_value_t = false)]
    fail_if_no_artifacts: bool,

    /// Directory artifacts and logs are written to
    #[arg(long, default_value = "artifacts")]
    download_path: PathBuf,

    /// Write the run outputs to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print the run outputs
    #[arg(short, long, default_value_t = false)]
    pretty: bool,

    /// Log at debug level and include full error detail on failure
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

impl Cli {
    pub fn init_logging(&self) {
        let default_level = if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };

        env_logger::Builder::new()
            .filter_level(default_level)
            .parse_default_env()
            .init();
    }

    fn to_config(&self) -> RunConfig {
        RunConfig {
            host: self.host.clone(),
            project_id: self.project.clone(),
            trigger_token: self.trigger_token.clone(),
            access_token: self.access_token.as_deref().map(Token::from),
            ref_: self.r#ref.clone(),
            variables: self.variables.iter().cloned().collect(),
            download_artifacts: self.download_artifacts,
            download_on_failure: self.download_on_failure,
            download_job_logs: self.download_job_logs,
            fail_if_no_artifacts: self.fail_if_no_artifacts,
            download_path: self.download_path.clone(),
            poll_interval: POLL_INTERVAL,
            verbose: self.verbose,
        }
    }

    pub async fn execute(&self) -> Result<()> {
        let config = self.to_config();

        let mut report = runner::execute(&config).await;

        let json_output = if self.pretty {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, json_output)?;
            info!("Run outputs written to: {}", output_path.display());
        } else {
            println!("{}", json_output);
        }

        // Outputs are emitted above regardless; only the exit status is
        // decided here. Verbosity changes the message, never the control flow.
        match report.failure.take() {
            None => Ok(()),
            Some(failure) if self.verbose => {
                Err(anyhow::Error::new(failure).context("pipeline run failed"))
            }
            Some(failure) => Err(anyhow!("pipeline run failed: {}", failure.summary())),
        }
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_pairs() {
        assert_eq!(
            parse_key_val("DEPLOY=yes").unwrap(),
            ("DEPLOY".to_owned(), "yes".to_owned())
        );
        assert_eq!(
            parse_key_val("URL=https://x?a=b").unwrap(),
            ("URL".to_owned(), "https://x?a=b".to_owned())
        );
        assert!(parse_key_val("no-equals-sign").is_err());
    }

    #[test]
    fn builds_a_config_from_arguments() {
        let cli = Cli::try_parse_from([
            "gitlab-pipeline-trigger",
            "--host",
            "gitlab.example.com",
            "--project",
            "group/app",
            "--trigger-token",
            "trigger-token",
            "--access-token",
            "glpat-token",
            "--ref",
            "release",
            "-v",
            "DEPLOY=yes",
            "-v",
            "ENV=prod",
            "--download-artifacts",
        ])
        .unwrap();

        let config = cli.to_config();

        assert_eq!(config.host, "gitlab.example.com");
        assert_eq!(config.project_id, "group/app");
        assert_eq!(config.ref_, "release");
        assert_eq!(config.variables.len(), 2);
        assert_eq!(config.variables["DEPLOY"], "yes");
        assert!(config.download_artifacts);
        assert!(!config.download_on_failure);
        assert_eq!(config.download_path, PathBuf::from("artifacts"));
        assert_eq!(config.poll_interval, POLL_INTERVAL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_malformed_variables() {
        let result = Cli::try_parse_from([
            "gitlab-pipeline-trigger",
            "--project",
            "123",
            "--trigger-token",
            "trigger-token",
            "-v",
            "missing-equals",
        ]);

        assert!(result.is_err());
    }
}
