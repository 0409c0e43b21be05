pub mod diff;
pub mod types;

pub use types::PullRequest;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::{require, BitbucketConfig, ConfigError};
use types::PullRequestPage;

#[derive(Debug, Error)]
pub enum PrError {
    #[error("Bitbucket API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("Bitbucket returned HTTP {status} for {what}")]
    Status {
        status: reqwest::StatusCode,
        what: String,
    },

    #[error("Failed to parse diff: {0}")]
    DiffParse(String),
}

/// Source-control host holding the pull requests to explain.
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// List the pull requests to process (first page only).
    async fn list_pull_requests(&self) -> Result<Vec<PullRequest>, PrError>;

    /// Fetch the unified diff of one pull request as raw text.
    async fn fetch_diff(&self, pr_id: u64) -> Result<String, PrError>;
}

/// Bitbucket Cloud REST 2.0 client using basic auth with an app password.
#[derive(Debug, Clone)]
pub struct BitbucketClient {
    http: reqwest::Client,
    repo_url: String,
    username: String,
    app_password: String,
    state: String,
}

impl BitbucketClient {
    pub fn from_config(config: &BitbucketConfig, http: reqwest::Client) -> Result<Self, ConfigError> {
        let base_url = require(&config.base_url, "BITBUCKET_BASE_URL")?;
        let workspace = require(&config.workspace, "WORKSPACE")?;
        let repo_slug = require(&config.repo_slug, "REPO_SLUG")?;
        let username = require(&config.username, "BITBUCKET_USERNAME")?;
        let app_password = require(&config.app_password, "BITBUCKET_APP_PASSWORD")?;

        Ok(Self {
            http,
            repo_url: format!(
                "{}/repositories/{}/{}",
                base_url.trim_end_matches('/'),
                workspace,
                repo_slug
            ),
            username: username.to_string(),
            app_password: app_password.to_string(),
            state: config.state.clone(),
        })
    }

    async fn get(&self, url: &str, what: String) -> Result<reqwest::Response, PrError> {
        let response = self
            .http
            .get(url)
            .basic_auth(&self.username, Some(&self.app_password))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PrError::Status { status, what });
        }
        Ok(response)
    }
}

#[async_trait]
impl SourceControl for BitbucketClient {
    #[instrument(skip(self), fields(state = %self.state))]
    async fn list_pull_requests(&self) -> Result<Vec<PullRequest>, PrError> {
        let url = format!("{}/pullrequests?state={}", self.repo_url, self.state);
        debug!(%url, "listing pull requests");

        let page = self
            .get(&url, "pull request listing".to_string())
            .await?
            .json::<PullRequestPage>()
            .await?;

        let prs: Vec<PullRequest> = page.values.into_iter().map(PullRequest::from).collect();
        debug!(count = prs.len(), "received pull requests");
        Ok(prs)
    }

    #[instrument(skip(self))]
    async fn fetch_diff(&self, pr_id: u64) -> Result<String, PrError> {
        let url = format!("{}/pullrequests/{}/diff", self.repo_url, pr_id);
        let diff_text = self
            .get(&url, format!("diff of PR {}", pr_id))
            .await?
            .text()
            .await?;
        debug!(diff_bytes = diff_text.len(), "received PR diff");
        Ok(diff_text)
    }
}
