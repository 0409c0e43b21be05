pub mod tracker;

pub use tracker::JiraClient;

use async_trait::async_trait;
use regex::Regex;
use std::fmt;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum TicketError {
    #[error("Jira API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("Jira returned HTTP {status} for ticket {key}")]
    Status {
        status: reqwest::StatusCode,
        key: String,
    },
}

/// A ticket identifier found in a PR title, e.g. `TT-4821`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TicketId(String);

impl TicketId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A Jira issue, reduced to what the explanation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub key: String,
    pub summary: String,
}

impl Ticket {
    /// `"{key} - {summary}"`, the label used in prompts and banners.
    pub fn label(&self) -> String {
        format!("{} - {}", self.key, self.summary)
    }
}

/// Compiled ticket-identifier pattern.
#[derive(Debug, Clone)]
pub struct TicketPattern {
    regex: Regex,
}

impl TicketPattern {
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    /// Return the first identifier in `title`, if any.
    pub fn extract(&self, title: &str) -> Option<TicketId> {
        self.regex
            .find(title)
            .map(|m| TicketId(m.as_str().to_string()))
    }
}

/// Issue tracker the ticket identifiers refer to.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn fetch_ticket(&self, id: &TicketId) -> Result<Ticket, TicketError>;

    /// Human-facing link to a ticket, used in the closing summary.
    fn browse_url(&self, id: &TicketId) -> String;
}
