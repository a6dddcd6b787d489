//! Optional outbound integrations: calendar events and issue creation
//!
//! These clients are self-contained and not wired into the recording
//! session; callers invoke them directly with text produced by the rewrite
//! actions.

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error};

use crate::error::{Error, Result};

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const ISSUE_API_BASE: &str = "https://api.linear.app/graphql";

/// Placeholder until a real team id is configured via `with_team`
const PLACEHOLDER_TEAM_ID: &str = "YOUR_TEAM_ID";

const ISSUE_CREATE_MUTATION: &str = "mutation IssueCreate($title: String!, $description: String, $teamId: String!) { issueCreate(input: { title: $title, description: $description, teamId: $teamId }) { success } }";

/// Creates one-hour events on the user's primary calendar
pub struct CalendarClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct CalendarEvent {
    summary: String,
    start: EventTime,
    end: EventTime,
}

#[derive(Debug, Serialize)]
struct EventTime {
    #[serde(rename = "dateTime")]
    date_time: String,
}

impl CalendarClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: CALENDAR_API_BASE.to_string(),
        }
    }

    /// Override the API base URL (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::MissingCredential("Calendar API key not set".to_string()))
    }

    /// Create a one-hour event starting at the given time
    pub async fn create_event(&self, title: &str, start: DateTime<Utc>) -> Result<()> {
        let api_key = self.api_key()?;

        let event = CalendarEvent {
            summary: title.to_string(),
            start: EventTime {
                date_time: start.to_rfc3339(),
            },
            end: EventTime {
                date_time: (start + Duration::hours(1)).to_rfc3339(),
            },
        };

        debug!("Creating calendar event: {}", title);

        let response = self
            .client
            .post(format!("{}/calendars/primary/events", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&event)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Calendar API error: {} - {}", status, error_text);
            return Err(Error::RemoteService(format!(
                "Calendar API error: {} - {}",
                status, error_text
            )));
        }

        Ok(())
    }
}

/// Creates issues in the configured tracker team via GraphQL
pub struct IssueClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    team_id: String,
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'static str,
    variables: IssueVariables<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IssueVariables<'a> {
    title: &'a str,
    description: &'a str,
    team_id: &'a str,
}

impl IssueClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: ISSUE_API_BASE.to_string(),
            team_id: PLACEHOLDER_TEAM_ID.to_string(),
        }
    }

    /// Override the API base URL (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the target team id
    pub fn with_team(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = team_id.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::MissingCredential("Issue tracker API key not set".to_string()))
    }

    /// Create an issue with the given title and description
    pub async fn create_issue(&self, title: &str, description: &str) -> Result<()> {
        let api_key = self.api_key()?;

        let request = GraphQlRequest {
            query: ISSUE_CREATE_MUTATION,
            variables: IssueVariables {
                title,
                description,
                team_id: &self.team_id,
            },
        };

        debug!("Creating issue: {}", title);

        // this API takes the raw key, no bearer prefix
        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Issue API error: {} - {}", status, error_text);
            return Err(Error::RemoteService(format!(
                "Issue API error: {} - {}",
                status, error_text
            )));
        }

        Ok(())
    }
}
