pub mod openai;

pub use openai::OpenAiClient;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ExplainError {
    #[error("Text-generation request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Text-generation service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Text-generation request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Text-generation service returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("Text-generation service returned no completion")]
    EmptyResponse,
}

/// A chat-completion style text-generation service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send one system instruction and one user prompt, return the completion text.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ExplainError>;
}

pub const SYSTEM_PROMPT: &str = "You are a senior software engineer explaining merged code changes \
to a junior developer who is new to the codebase. Be concrete, reference the code you are \
describing, and keep explanations practical.";

/// Build the user prompt for one ticket label and diff body.
pub fn build_prompt(ticket_label: &str, diff: &str) -> String {
    format!(
        r#"The following are code changes related to the ticket: {ticket_label}.
Please explain these changes, and describe why they might have been necessary or how they might fix a bug. Please format your response into these sections:
'Code Changes Explained:' (what the changes are and, if necessary, code snippets showing how they work)
'Why These Changes Might Have Been Necessary:' (why these changes were made)
'Key Concepts:' (the frameworks, patterns, or language features a reader needs to follow the change)
'Possible Improvements:' (specific to the code, best practices, and how it was written, with improved code snippet examples)
'Relevant Documentation, Links, and References:'
'Conclusion:'

Code Diff:
{diff}
"#
    )
}

/// Requests explanations of PR diffs from a [`TextGenerator`].
pub struct Explainer<'a> {
    generator: &'a dyn TextGenerator,
}

impl<'a> Explainer<'a> {
    pub fn new(generator: &'a dyn TextGenerator) -> Self {
        Self { generator }
    }

    /// Ask for a sectioned explanation of `diff` in the context of `ticket_label`.
    /// Errors are returned as-is; there is no retry.
    #[instrument(skip(self, diff), fields(diff_bytes = diff.len()))]
    pub async fn explain(&self, ticket_label: &str, diff: &str) -> Result<String, ExplainError> {
        let prompt = build_prompt(ticket_label, diff);
        let text = self.generator.complete(SYSTEM_PROMPT, &prompt).await?;
        debug!(chars = text.len(), "received explanation");
        Ok(text.trim().to_string())
    }
}
