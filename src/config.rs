use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = ".pr-explainer.toml";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid ticket pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Top-level configuration loaded from .pr-explainer.toml.
///
/// All fields are optional in the file. Credentials and endpoints are
/// normally supplied through the environment and only checked when the
/// client that needs them is built.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bitbucket: BitbucketConfig,

    #[serde(default)]
    pub jira: JiraConfig,

    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub ticket: TicketConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub summary: SummaryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketConfig {
    /// API root, e.g. https://api.bitbucket.org/2.0 (BITBUCKET_BASE_URL)
    pub base_url: Option<String>,
    /// BITBUCKET_USERNAME
    pub username: Option<String>,
    /// BITBUCKET_APP_PASSWORD
    pub app_password: Option<String>,
    /// WORKSPACE
    pub workspace: Option<String>,
    /// REPO_SLUG
    pub repo_slug: Option<String>,
    /// Pull request state filter passed to the listing endpoint
    #[serde(default = "default_pr_state")]
    pub state: String,
}

impl Default for BitbucketConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            username: None,
            app_password: None,
            workspace: None,
            repo_slug: None,
            state: default_pr_state(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JiraConfig {
    /// Jira site root, e.g. https://company.atlassian.net (JIRA_URL)
    pub url: Option<String>,
    /// JIRA_USERNAME
    pub username: Option<String>,
    /// JIRA_API_TOKEN
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiConfig {
    /// OPEN_AI_KEY
    pub api_key: Option<String>,
    /// OPENAI_BASE_URL
    pub base_url: Option<String>,
    /// OPENAI_MODEL
    pub model: Option<String>,
}

impl OpenAiConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_OPENAI_BASE_URL)
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TicketConfig {
    /// Regex used to pull the ticket identifier out of a PR title
    #[serde(default = "default_ticket_pattern")]
    pub pattern: String,
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            pattern: default_ticket_pattern(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout applied to every outbound call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build the reqwest client shared by every API collaborator.
    pub fn build_client(&self) -> Result<reqwest::Client, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout())
            .user_agent(concat!("pr-explainer/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(client)
    }
}

/// Which items the closing summary lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryMode {
    /// Every item whose title carried a ticket identifier.
    #[default]
    AllTagged,
    /// Only items that produced output in this run.
    Processed,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryConfig {
    #[serde(default)]
    pub mode: SummaryMode,
}

fn default_pr_state() -> String {
    "MERGED".to_string()
}

fn default_ticket_pattern() -> String {
    r"[A-Z]{2}-\d+".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load configuration from `path` (or .pr-explainer.toml in the current
    /// directory) and fill unset values from the process environment.
    /// Returns the defaults when the file doesn't exist.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        let mut config = if path.exists() {
            Self::load_from(path)?
        } else {
            Config::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from a specific path without consulting the environment.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Fill every value the file left unset from `lookup`.
    /// File values take precedence over the environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let fill = |slot: &mut Option<String>, key: &str| {
            if slot.is_none() {
                *slot = lookup(key);
            }
        };

        fill(&mut self.bitbucket.base_url, "BITBUCKET_BASE_URL");
        fill(&mut self.bitbucket.username, "BITBUCKET_USERNAME");
        fill(&mut self.bitbucket.app_password, "BITBUCKET_APP_PASSWORD");
        fill(&mut self.bitbucket.workspace, "WORKSPACE");
        fill(&mut self.bitbucket.repo_slug, "REPO_SLUG");

        fill(&mut self.jira.url, "JIRA_URL");
        fill(&mut self.jira.username, "JIRA_USERNAME");
        fill(&mut self.jira.api_token, "JIRA_API_TOKEN");

        fill(&mut self.openai.api_key, "OPEN_AI_KEY");
        fill(&mut self.openai.base_url, "OPENAI_BASE_URL");
        fill(&mut self.openai.model, "OPENAI_MODEL");
    }
}

/// Borrow a required setting or report which one is missing.
pub fn require<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ConfigError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}
