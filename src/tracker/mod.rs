//! Issue tracker collaborator: the operations reconciliation needs, and the
//! types exchanged with the tracker.

#[cfg(test)]
pub mod fake;
pub mod jira;

use crate::error::TrackerError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// A workflow transition available on a ticket
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Transition {
    pub id: String,
    pub name: String,
}

/// A resolution value known to the tracker
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Resolution {
    pub id: String,
    pub name: String,
}

/// A project component
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Component {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDetails {
    pub key: String,
    pub components: Vec<Component>,
}

/// A ticket as seen by reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub id: String,
    pub key: String,
    /// Workflow status name (e.g. "Open", "Done")
    pub status: String,
    pub resolution: Option<String>,
}

/// Fields of a ticket to create
#[derive(Debug, Clone, PartialEq)]
pub struct NewTicket {
    pub project_key: String,
    pub issue_type: String,
    pub priority: Option<String>,
    pub summary: String,
    pub description: String,
    pub reporter: Option<String>,
    pub components: Vec<Component>,
    /// Custom field values keyed by tracker field key
    pub custom_fields: serde_json::Map<String, Value>,
}

/// Operations reconciliation performs against the issue tracker.
///
/// Every call is a blocking round-trip from the caller's point of view; the driver
/// awaits each one before issuing the next.
#[async_trait]
pub trait Tracker: Send + Sync {
    /// Tickets in `project_key` whose description contains `text`
    async fn search_by_text(&self, project_key: &str, text: &str)
    -> Result<Vec<Ticket>, TrackerError>;

    async fn list_projects(&self) -> Result<Vec<Project>, TrackerError>;

    async fn get_project(&self, key: &str) -> Result<ProjectDetails, TrackerError>;

    async fn create_ticket(&self, fields: &NewTicket) -> Result<Ticket, TrackerError>;

    async fn add_comment(&self, ticket: &Ticket, text: &str) -> Result<(), TrackerError>;

    async fn get_components(&self, ticket: &Ticket) -> Result<Vec<Component>, TrackerError>;

    /// Replace the ticket's components with `components`
    async fn set_components(
        &self,
        ticket: &Ticket,
        components: &[Component],
    ) -> Result<(), TrackerError>;

    async fn get_transitions(&self, ticket: &Ticket) -> Result<Vec<Transition>, TrackerError>;

    /// Move the ticket through `transition_id`, optionally setting `fields` on the way
    async fn execute_transition(
        &self,
        ticket: &Ticket,
        transition_id: &str,
        fields: Option<&Value>,
    ) -> Result<(), TrackerError>;

    async fn list_resolutions(&self) -> Result<Vec<Resolution>, TrackerError>;
}
