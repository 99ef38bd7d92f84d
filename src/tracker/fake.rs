use super::{
    Component, NewTicket, Project, ProjectDetails, Resolution, Ticket, Tracker, Transition,
};
use crate::error::TrackerError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Operations that change tracker state
const MUTATIONS: [&str; 4] = [
    "create_ticket",
    "add_comment",
    "set_components",
    "execute_transition",
];

/// A ticket held by the fake, with everything reconciliation can observe
#[derive(Debug, Clone)]
pub struct FakeTicket {
    pub ticket: Ticket,
    pub project_key: String,
    pub description: String,
    pub components: Vec<Component>,
    pub comments: Vec<String>,
    pub transitions: Vec<Transition>,
}

#[derive(Default)]
struct State {
    tickets: Vec<FakeTicket>,
    calls: Vec<String>,
    next_id: u32,
}

/// In-memory tracker that records every call.
///
/// Transitions move a ticket to the status registered for their id; resolutions set
/// through transition fields are applied as well.
pub struct FakeTracker {
    state: Mutex<State>,
    projects: Vec<ProjectDetails>,
    resolutions: Vec<Resolution>,
    default_transitions: Vec<Transition>,
    transition_targets: HashMap<String, String>,
    failures: HashMap<String, String>,
}

impl FakeTracker {
    pub fn new(project_key: &str, components: &[(&str, &str)]) -> Self {
        Self {
            state: Mutex::new(State::default()),
            projects: vec![ProjectDetails {
                key: project_key.to_string(),
                components: components
                    .iter()
                    .map(|(id, name)| Component {
                        id: id.to_string(),
                        name: name.to_string(),
                    })
                    .collect(),
            }],
            resolutions: Vec::new(),
            default_transitions: Vec::new(),
            transition_targets: HashMap::new(),
            failures: HashMap::new(),
        }
    }

    pub fn with_resolutions(mut self, resolutions: &[(&str, &str)]) -> Self {
        self.resolutions = resolutions
            .iter()
            .map(|(id, name)| Resolution {
                id: id.to_string(),
                name: name.to_string(),
            })
            .collect();
        self
    }

    /// Transitions offered on created tickets, each with the status it leads to
    pub fn with_workflow(mut self, transitions: &[(&str, &str, &str)]) -> Self {
        for (id, name, target) in transitions {
            self.default_transitions.push(Transition {
                id: id.to_string(),
                name: name.to_string(),
            });
            self.transition_targets
                .insert(id.to_string(), target.to_string());
        }
        self
    }

    /// Make `operation` fail with `message` on every call
    pub fn failing(mut self, operation: &str, message: &str) -> Self {
        self.failures
            .insert(operation.to_string(), message.to_string());
        self
    }

    /// Seed an existing ticket; returns its key
    pub fn seed(
        &self,
        status: &str,
        resolution: Option<&str>,
        description: &str,
        components: &[(&str, &str)],
    ) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let project_key = self.projects[0].key.clone();
        let key = format!("{}-{}", project_key, state.next_id);
        let id = (10000 + state.next_id).to_string();
        state.tickets.push(FakeTicket {
            ticket: Ticket {
                id,
                key: key.clone(),
                status: status.to_string(),
                resolution: resolution.map(str::to_string),
            },
            project_key,
            description: description.to_string(),
            components: components
                .iter()
                .map(|(id, name)| Component {
                    id: id.to_string(),
                    name: name.to_string(),
                })
                .collect(),
            comments: Vec::new(),
            transitions: self.default_transitions.clone(),
        });
        key
    }

    pub fn ticket(&self, key: &str) -> FakeTicket {
        let state = self.state.lock().unwrap();
        state
            .tickets
            .iter()
            .find(|t| t.ticket.key == key)
            .cloned()
            .unwrap()
    }

    pub fn tickets(&self) -> Vec<FakeTicket> {
        self.state.lock().unwrap().tickets.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| MUTATIONS.contains(&c.as_str()))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn record(&self, operation: &str) -> Result<(), TrackerError> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(operation.to_string());
        match self.failures.get(operation) {
            Some(message) => Err(TrackerError::Other(message.clone())),
            None => Ok(()),
        }
    }

    fn with_ticket<R>(
        &self,
        key: &str,
        f: impl FnOnce(&mut FakeTicket) -> R,
    ) -> Result<R, TrackerError> {
        let mut state = self.state.lock().unwrap();
        let ticket = state
            .tickets
            .iter_mut()
            .find(|t| t.ticket.key == key)
            .ok_or_else(|| TrackerError::NotFound(format!("issue {}", key)))?;
        Ok(f(ticket))
    }
}

#[async_trait]
impl Tracker for FakeTracker {
    async fn search_by_text(
        &self,
        project_key: &str,
        text: &str,
    ) -> Result<Vec<Ticket>, TrackerError> {
        self.record("search_by_text")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .tickets
            .iter()
            .filter(|t| t.project_key == project_key && t.description.contains(text))
            .map(|t| t.ticket.clone())
            .collect())
    }

    async fn list_projects(&self) -> Result<Vec<Project>, TrackerError> {
        self.record("list_projects")?;
        Ok(self
            .projects
            .iter()
            .enumerate()
            .map(|(i, p)| Project {
                id: i.to_string(),
                key: p.key.clone(),
                name: p.key.clone(),
            })
            .collect())
    }

    async fn get_project(&self, key: &str) -> Result<ProjectDetails, TrackerError> {
        self.record("get_project")?;
        self.projects
            .iter()
            .find(|p| p.key == key)
            .cloned()
            .ok_or_else(|| TrackerError::NotFound(format!("project {}", key)))
    }

    async fn create_ticket(&self, fields: &NewTicket) -> Result<Ticket, TrackerError> {
        self.record("create_ticket")?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let ticket = Ticket {
            id: (10000 + state.next_id).to_string(),
            key: format!("{}-{}", fields.project_key, state.next_id),
            status: "Open".to_string(),
            resolution: None,
        };
        state.tickets.push(FakeTicket {
            ticket: ticket.clone(),
            project_key: fields.project_key.clone(),
            description: fields.description.clone(),
            components: fields.components.clone(),
            comments: Vec::new(),
            transitions: self.default_transitions.clone(),
        });
        Ok(ticket)
    }

    async fn add_comment(&self, ticket: &Ticket, text: &str) -> Result<(), TrackerError> {
        self.record("add_comment")?;
        self.with_ticket(&ticket.key, |t| t.comments.push(text.to_string()))
    }

    async fn get_components(&self, ticket: &Ticket) -> Result<Vec<Component>, TrackerError> {
        self.record("get_components")?;
        self.with_ticket(&ticket.key, |t| t.components.clone())
    }

    async fn set_components(
        &self,
        ticket: &Ticket,
        components: &[Component],
    ) -> Result<(), TrackerError> {
        self.record("set_components")?;
        self.with_ticket(&ticket.key, |t| t.components = components.to_vec())
    }

    async fn get_transitions(&self, ticket: &Ticket) -> Result<Vec<Transition>, TrackerError> {
        self.record("get_transitions")?;
        self.with_ticket(&ticket.key, |t| t.transitions.clone())
    }

    async fn execute_transition(
        &self,
        ticket: &Ticket,
        transition_id: &str,
        fields: Option<&Value>,
    ) -> Result<(), TrackerError> {
        self.record("execute_transition")?;
        let target = self
            .transition_targets
            .get(transition_id)
            .cloned()
            .ok_or_else(|| TrackerError::Status {
                method: "POST".into(),
                url: format!("/issue/{}/transitions", ticket.key),
                status: "400 Bad Request".into(),
                body: format!("Transition id '{}' is not valid for this issue", transition_id),
            })?;
        let resolution = fields
            .and_then(|f| f["resolution"]["id"].as_str())
            .and_then(|id| self.resolutions.iter().find(|r| r.id == id))
            .map(|r| r.name.clone());
        self.with_ticket(&ticket.key, |t| {
            t.ticket.status = target;
            if resolution.is_some() {
                t.ticket.resolution = resolution;
            }
        })
    }

    async fn list_resolutions(&self) -> Result<Vec<Resolution>, TrackerError> {
        self.record("list_resolutions")?;
        Ok(self.resolutions.clone())
    }
}
