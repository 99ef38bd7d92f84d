use super::{
    Component, NewTicket, Project, ProjectDetails, Resolution, Ticket, Tracker, Transition,
};
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, trace};

/// Upper bound on tickets returned by one identity search
const SEARCH_MAX_RESULTS: &str = "100";
const SEARCH_FIELDS: &str = "summary,status,resolution,description";

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<IssueResponse>,
}

#[derive(Deserialize)]
struct IssueResponse {
    id: String,
    key: String,
    #[serde(default)]
    fields: IssueFields,
}

#[derive(Deserialize, Default)]
struct IssueFields {
    #[serde(default)]
    status: Option<Named>,
    #[serde(default)]
    resolution: Option<Named>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    components: Vec<Component>,
}

#[derive(Deserialize)]
struct Named {
    name: String,
}

#[derive(Deserialize)]
struct ProjectResponse {
    id: String,
    key: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    components: Vec<Component>,
}

#[derive(Deserialize)]
struct CreatedResponse {
    id: String,
    key: String,
}

#[derive(Deserialize)]
struct TransitionsResponse {
    #[serde(default)]
    transitions: Vec<Transition>,
}

/// Jira REST v2 client authenticating with username and API token
pub struct JiraClient {
    base_url: String,
    username: String,
    token: String,
    http: Client,
}

impl JiraClient {
    pub fn new(
        base_url: &str,
        username: &str,
        token: &str,
        timeout: Duration,
    ) -> Result<Self, TrackerError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TrackerError::Other(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            token: token.to_string(),
            http,
        })
    }

    pub fn from_config(config: &TrackerConfig, token: &str) -> Result<Self, TrackerError> {
        Self::new(
            &config.base_url,
            &config.username,
            token,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/rest/api/2/{}", self.base_url, path)
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<String, TrackerError> {
        trace!("{} {}", method, url);
        let mut request = self
            .http
            .request(method.clone(), url)
            .basic_auth(&self.username, Some(&self.token))
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|source| TrackerError::Transport {
            url: url.to_string(),
            source,
        })?;
        let status = response.status();
        let text = response.text().await.map_err(|source| TrackerError::Transport {
            url: url.to_string(),
            source,
        })?;

        if !status.is_success() {
            return Err(TrackerError::Status {
                method: method.to_string(),
                url: url.to_string(),
                status: status.to_string(),
                body: text,
            });
        }
        debug!("{} {} -> {}", method, url, status);
        Ok(text)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, TrackerError> {
        let text = self.send(Method::GET, url, None).await?;
        serde_json::from_str(&text).map_err(|e| TrackerError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

impl IssueResponse {
    fn into_ticket(self) -> Ticket {
        Ticket {
            id: self.id,
            key: self.key,
            status: self.fields.status.map(|s| s.name).unwrap_or_default(),
            resolution: self.fields.resolution.map(|r| r.name),
        }
    }
}

/// JQL selecting tickets of `project_key` whose description contains `text`
fn search_jql(project_key: &str, text: &str) -> String {
    let escape = |s: &str| s.replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        "project = \"{}\" AND description ~ \"\\\"{}\\\"\"",
        escape(project_key),
        escape(text)
    )
}

#[async_trait]
impl Tracker for JiraClient {
    async fn search_by_text(
        &self,
        project_key: &str,
        text: &str,
    ) -> Result<Vec<Ticket>, TrackerError> {
        let jql = search_jql(project_key, text);
        let url = Url::parse_with_params(
            &self.url("search"),
            &[
                ("jql", jql.as_str()),
                ("fields", SEARCH_FIELDS),
                ("maxResults", SEARCH_MAX_RESULTS),
            ],
        )
        .map_err(|e| TrackerError::Other(format!("invalid search URL: {}", e)))?;
        let response: SearchResponse = self.get_json(url.as_str()).await?;
        let total = response.issues.len();
        // JQL `~` is a fuzzy text match; keep exact containment only
        let tickets: Vec<Ticket> = response
            .issues
            .into_iter()
            .filter(|issue| {
                issue
                    .fields
                    .description
                    .as_deref()
                    .is_some_and(|d| d.contains(text))
            })
            .map(IssueResponse::into_ticket)
            .collect();
        if tickets.len() < total {
            debug!(
                "Dropped {} search hits without '{}' in the description",
                total - tickets.len(),
                text
            );
        }
        Ok(tickets)
    }

    async fn list_projects(&self) -> Result<Vec<Project>, TrackerError> {
        let projects: Vec<ProjectResponse> = self.get_json(&self.url("project")).await?;
        Ok(projects
            .into_iter()
            .map(|p| Project {
                id: p.id,
                key: p.key,
                name: p.name,
            })
            .collect())
    }

    async fn get_project(&self, key: &str) -> Result<ProjectDetails, TrackerError> {
        let project: ProjectResponse = self.get_json(&self.url(&format!("project/{}", key))).await?;
        Ok(ProjectDetails {
            key: project.key,
            components: project.components,
        })
    }

    async fn create_ticket(&self, fields: &NewTicket) -> Result<Ticket, TrackerError> {
        let mut payload = serde_json::Map::new();
        payload.insert("project".into(), json!({ "key": fields.project_key }));
        payload.insert("issuetype".into(), json!({ "name": fields.issue_type }));
        payload.insert("summary".into(), json!(fields.summary));
        payload.insert("description".into(), json!(fields.description));
        if let Some(priority) = &fields.priority {
            payload.insert("priority".into(), json!({ "name": priority }));
        }
        if let Some(reporter) = &fields.reporter {
            payload.insert("reporter".into(), json!({ "name": reporter }));
        }
        if !fields.components.is_empty() {
            let ids: Vec<Value> = fields
                .components
                .iter()
                .map(|c| json!({ "id": c.id }))
                .collect();
            payload.insert("components".into(), Value::Array(ids));
        }
        for (key, value) in &fields.custom_fields {
            payload.insert(key.clone(), value.clone());
        }

        let url = self.url("issue");
        let text = self
            .send(Method::POST, &url, Some(&json!({ "fields": payload })))
            .await?;
        let created: CreatedResponse =
            serde_json::from_str(&text).map_err(|e| TrackerError::Decode {
                url,
                message: e.to_string(),
            })?;
        Ok(Ticket {
            id: created.id,
            key: created.key,
            status: String::new(),
            resolution: None,
        })
    }

    async fn add_comment(&self, ticket: &Ticket, text: &str) -> Result<(), TrackerError> {
        let url = self.url(&format!("issue/{}/comment", ticket.key));
        self.send(Method::POST, &url, Some(&json!({ "body": text })))
            .await?;
        Ok(())
    }

    async fn get_components(&self, ticket: &Ticket) -> Result<Vec<Component>, TrackerError> {
        let url = self.url(&format!("issue/{}?fields=components", ticket.key));
        let issue: IssueResponse = self.get_json(&url).await?;
        Ok(issue.fields.components)
    }

    async fn set_components(
        &self,
        ticket: &Ticket,
        components: &[Component],
    ) -> Result<(), TrackerError> {
        let url = self.url(&format!("issue/{}", ticket.key));
        let ids: Vec<Value> = components.iter().map(|c| json!({ "id": c.id })).collect();
        self.send(
            Method::PUT,
            &url,
            Some(&json!({ "fields": { "components": ids } })),
        )
        .await?;
        Ok(())
    }

    async fn get_transitions(&self, ticket: &Ticket) -> Result<Vec<Transition>, TrackerError> {
        let url = self.url(&format!("issue/{}/transitions", ticket.key));
        let response: TransitionsResponse = self.get_json(&url).await?;
        Ok(response.transitions)
    }

    async fn execute_transition(
        &self,
        ticket: &Ticket,
        transition_id: &str,
        fields: Option<&Value>,
    ) -> Result<(), TrackerError> {
        let url = self.url(&format!("issue/{}/transitions", ticket.key));
        let mut body = json!({ "transition": { "id": transition_id } });
        if let Some(fields) = fields {
            body["fields"] = fields.clone();
        }
        self.send(Method::POST, &url, Some(&body)).await?;
        Ok(())
    }

    async fn list_resolutions(&self) -> Result<Vec<Resolution>, TrackerError> {
        self.get_json(&self.url("resolution")).await
    }
}
