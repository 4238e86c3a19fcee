use indexmap::IndexMap;
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::Token;
use crate::error::{Result, TriggerError};

use super::types::{Job, Pipeline};

/// Client for the GitLab REST API (`/api/v4`).
///
/// Responses are successful iff the HTTP status is 2xx; non-2xx responses are
/// never retried and are mapped to [`TriggerError::Api`] with a human reason
/// for the common codes. Transport failures surface as
/// [`TriggerError::Network`].
pub struct GitLabClient {
    client: Client,
    api_url: Url,
    token: Option<Token>,
}

impl GitLabClient {
    pub fn new(host: &str, token: Option<Token>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(
                "gitlab-pipeline-trigger/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| TriggerError::Config(format!("Failed to create HTTP client: {e}")))?;

        let base_url = if host.contains("://") {
            host.to_owned()
        } else {
            format!("https://{host}")
        };

        let api_url = Url::parse(&base_url)
            .map_err(|e| TriggerError::Config(format!("Invalid host '{host}': {e}")))?
            .join("api/v4/")
            .map_err(|e| TriggerError::Config(format!("Invalid API base URL: {e}")))?;

        Ok(Self {
            client,
            api_url,
            token,
        })
    }

    /// Helper to build authenticated requests. An absent token still yields a
    /// well-formed request, the header is simply omitted.
    fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        if let Some(token) = &self.token {
            request.header("PRIVATE-TOKEN", token.as_str())
        } else {
            request
        }
    }

    /// Construct a project-scoped endpoint URL
    fn endpoint(&self, project_id: &str, path: &str) -> Result<Url> {
        self.api_url
            .join(&format!("projects/{}/", urlencoding::encode(project_id)))
            .and_then(|url| url.join(path))
            .map_err(|e| TriggerError::Config(format!("Invalid request URL: {e}")))
    }

    /// `POST projects/{id}/trigger/pipeline` — authenticated by the trigger
    /// token in the body, not the access token header
    /// (see <https://docs.gitlab.com/ee/api/pipeline_triggers.html>).
    pub async fn trigger_pipeline(
        &self,
        project_id: &str,
        trigger_token: &str,
        ref_: &str,
        variables: &IndexMap<String, String>,
    ) -> Result<Pipeline> {
        let url = self.endpoint(project_id, "trigger/pipeline")?;

        let body = serde_json::json!({
            "token": trigger_token,
            "ref": ref_,
            "variables": variables,
        });

        let response = self.client.post(url).json(&body).send().await?;
        Self::parse_json(response).await
    }

    /// `GET projects/{id}/pipelines/{pipeline_id}`
    pub async fn pipeline(&self, project_id: &str, pipeline_id: u64) -> Result<Pipeline> {
        let url = self.endpoint(project_id, &format!("pipelines/{pipeline_id}"))?;

        let response = self.auth_request(self.client.get(url)).send().await?;
        Self::parse_json(response).await
    }

    /// `GET projects/{id}/pipelines/{pipeline_id}/jobs`
    pub async fn pipeline_jobs(&self, project_id: &str, pipeline_id: u64) -> Result<Vec<Job>> {
        let url = self.endpoint(project_id, &format!("pipelines/{pipeline_id}/jobs"))?;

        let response = self.auth_request(self.client.get(url)).send().await?;
        Self::parse_json(response).await
    }

    /// `GET projects/{id}/jobs/{job_id}/trace` — raw log text
    pub async fn job_trace(&self, project_id: &str, job_id: u64) -> Result<String> {
        let url = self.endpoint(project_id, &format!("jobs/{job_id}/trace"))?;

        let response = self
            .auth_request(self.client.get(url).header(ACCEPT, "text/plain"))
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        Ok(response.text().await?)
    }

    /// `GET projects/{id}/jobs/{job_id}/artifacts` — the compressed bundle
    pub async fn job_artifacts(&self, project_id: &str, job_id: u64) -> Result<Vec<u8>> {
        let url = self.endpoint(project_id, &format!("jobs/{job_id}/artifacts"))?;

        let response = self
            .auth_request(
                self.client
                    .get(url)
                    .header(ACCEPT, "application/octet-stream"),
            )
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        Ok(response.bytes().await?.to_vec())
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match status.as_u16() {
            401 => "Unauthorized: an invalid or expired access token was used".to_owned(),
            404 => "The specified resource does not exist, or an invalid/expired trigger token \
                    was used"
                .to_owned(),
            _ => response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_owned()),
        };

        Err(TriggerError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let response = Self::check_status(response).await?;
        let text = response.text().await?;

        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gitlab::types::Status;
    use mockito::Matcher;

    #[tokio::test]
    async fn trigger_posts_token_ref_and_variables() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v4/projects/123/trigger/pipeline")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "token": "trigger-token",
                "ref": "main",
                "variables": {"DEPLOY": "yes"},
            })))
            .with_status(201)
            .with_body(r#"{"id": 42, "status": "pending", "web_url": "https://x/42"}"#)
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None).unwrap();
        let mut variables = IndexMap::new();
        variables.insert("DEPLOY".to_owned(), "yes".to_owned());

        let pipeline = client
            .trigger_pipeline("123", "trigger-token", "main", &variables)
            .await
            .unwrap();

        assert_eq!(pipeline.id, 42);
        assert_eq!(pipeline.status, Status::Pending);
        assert_eq!(pipeline.web_url, "https://x/42");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn trigger_404_reports_an_invalid_resource_or_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v4/projects/123/trigger/pipeline")
            .with_status(404)
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None).unwrap();

        let err = client
            .trigger_pipeline("123", "bad-token", "main", &IndexMap::new())
            .await
            .unwrap_err();

        match err {
            TriggerError::Api { status, message } => {
                assert_eq!(status, 404);
                assert!(message.contains("trigger token"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn status_read_401_reports_an_authorization_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects/123/pipelines/42")
            .with_status(401)
            .create_async()
            .await;

        let client =
            GitLabClient::new(&server.url(), Some(Token::from("expired-token"))).unwrap();

        let err = client.pipeline("123", 42).await.unwrap_err();

        match err {
            TriggerError::Api { status, message } => {
                assert_eq!(status, 401);
                assert!(message.contains("Unauthorized"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn status_read_sends_the_private_token_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v4/projects/123/pipelines/42")
            .match_header("PRIVATE-TOKEN", "glpat-token")
            .with_status(200)
            .with_body(r#"{"id": 42, "status": "running", "web_url": "https://x/42"}"#)
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), Some(Token::from("glpat-token"))).unwrap();
        let pipeline = client.pipeline("123", 42).await.unwrap();

        assert_eq!(pipeline.status, Status::Running);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn status_read_without_token_omits_the_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v4/projects/123/pipelines/42")
            .match_header("PRIVATE-TOKEN", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"id": 42, "status": "pending", "web_url": "https://x/42"}"#)
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None).unwrap();
        client.pipeline("123", 42).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn project_paths_are_url_encoded() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v4/projects/group%2Fapp/pipelines/42")
            .with_status(200)
            .with_body(r#"{"id": 42, "status": "success", "web_url": "https://x/42"}"#)
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None).unwrap();
        client.pipeline("group/app", 42).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn job_trace_returns_the_raw_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects/123/jobs/7/trace")
            .match_header("accept", "text/plain")
            .with_status(200)
            .with_body("$ cargo test\nok\n")
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), Some(Token::from("glpat-token"))).unwrap();
        let trace = client.job_trace("123", 7).await.unwrap();

        assert_eq!(trace, "$ cargo test\nok\n");
    }

    #[tokio::test]
    async fn jobs_listing_parses_artifact_descriptors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects/123/pipelines/42/jobs")
            .with_status(200)
            .with_body(
                r#"[
                    {"id": 7, "name": "build", "artifacts_file": {"filename": "artifacts.zip", "size": 512}},
                    {"id": 8, "name": "lint"}
                ]"#,
            )
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), Some(Token::from("glpat-token"))).unwrap();
        let jobs = client.pipeline_jobs("123", 42).await.unwrap();

        assert_eq!(jobs.len(), 2);
        assert!(jobs[0].has_artifacts());
        assert!(!jobs[1].has_artifacts());
    }

    #[test]
    fn bare_hosts_default_to_https() {
        let client = GitLabClient::new("gitlab.example.com", None).unwrap();
        assert_eq!(
            client.api_url.as_str(),
            "https://gitlab.example.com/api/v4/"
        );
    }
}
