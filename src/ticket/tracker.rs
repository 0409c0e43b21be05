use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{IssueTracker, Ticket, TicketError, TicketId};
use crate::config::{require, ConfigError, JiraConfig};

/// Jira REST v2 client using basic auth with an API token.
#[derive(Debug, Clone)]
pub struct JiraClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    api_token: String,
}

#[derive(Deserialize)]
struct IssueResponse {
    key: String,
    fields: IssueFields,
}

#[derive(Deserialize)]
struct IssueFields {
    #[serde(default)]
    summary: String,
}

impl JiraClient {
    pub fn from_config(config: &JiraConfig, http: reqwest::Client) -> Result<Self, ConfigError> {
        let base_url = require(&config.url, "JIRA_URL")?;
        let username = require(&config.username, "JIRA_USERNAME")?;
        let api_token = require(&config.api_token, "JIRA_API_TOKEN")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            api_token: api_token.to_string(),
        })
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    #[instrument(skip(self), fields(ticket = %id))]
    async fn fetch_ticket(&self, id: &TicketId) -> Result<Ticket, TicketError> {
        let url = format!("{}/rest/api/2/issue/{}", self.base_url, id);
        let response = self
            .http
            .get(&url)
            .query(&[("fields", "summary")])
            .basic_auth(&self.username, Some(&self.api_token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TicketError::Status {
                status,
                key: id.to_string(),
            });
        }

        let issue = response.json::<IssueResponse>().await?;
        debug!(summary = %issue.fields.summary, "received ticket");
        Ok(Ticket {
            key: issue.key,
            summary: issue.fields.summary,
        })
    }

    fn browse_url(&self, id: &TicketId) -> String {
        format!("{}/browse/{}", self.base_url, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::TicketPattern;
    use wiremock::matchers::{header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(url: String) -> JiraClient {
        let config = JiraConfig {
            url: Some(url),
            username: Some("dev@example.com".to_string()),
            api_token: Some("token".to_string()),
        };
        JiraClient::from_config(&config, reqwest::Client::new()).unwrap()
    }

    fn ticket_id(key: &str) -> TicketId {
        TicketPattern::new(r"[A-Z]{2}-\d+").unwrap().extract(key).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_ticket() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/2/issue/TT-4821"))
            .and(query_param("fields", "summary"))
            .and(header_exists("Authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"id": "10001", "key": "TT-4821", "fields": {"summary": "Login fails for SSO users"}}"#,
            ))
            .mount(&server)
            .await;

        let ticket = client_for(server.uri())
            .fetch_ticket(&ticket_id("TT-4821"))
            .await
            .unwrap();
        assert_eq!(ticket.key, "TT-4821");
        assert_eq!(ticket.summary, "Login fails for SSO users");
    }

    #[tokio::test]
    async fn test_fetch_missing_ticket() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client_for(server.uri())
            .fetch_ticket(&ticket_id("TT-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, TicketError::Status { ref key, .. } if key == "TT-1"));
    }

    #[test]
    fn test_browse_url_trims_trailing_slash() {
        let client = client_for("https://acme.atlassian.net/".to_string());
        assert_eq!(
            client.browse_url(&ticket_id("TT-7")),
            "https://acme.atlassian.net/browse/TT-7"
        );
    }

    #[test]
    fn test_from_config_requires_token() {
        let config = JiraConfig {
            url: Some("https://acme.atlassian.net".to_string()),
            username: Some("dev".to_string()),
            api_token: None,
        };
        let err = JiraClient::from_config(&config, reqwest::Client::new()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JIRA_API_TOKEN")));
    }
}
