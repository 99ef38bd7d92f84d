use super::outcome::SyncOutcome;
use crate::config::Config;
use crate::error::{ConfigError, SyncError, TrackerError};
use crate::fingerprint::identity_token;
use crate::mapping::FieldMapping;
use crate::status::{Action, Lifecycle};
use crate::tracker::{Component, NewTicket, Resolution, Ticket, Tracker};
use crate::violation::{ViolationRecord, ViolationSet};
use serde_json::json;
use std::ops::RangeInclusive;
use tracing::{debug, error, info, trace, warn};

/// Priorities that get a ticket; everything else is unprioritized
const ELIGIBLE_PRIORITIES: RangeInclusive<i32> = 1..=3;

pub const CREATED_COMMENT: &str = "Created by CAST";
pub const RESOLVED_COMMENT: &str = "Resolution Identified by CAST";
pub const REOPENED_COMMENT: &str = "Reopened by CAST";

/// Everything the driver needs from the configuration, validated once
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub project_key: String,
    pub component: Option<String>,
    pub issue_type: String,
    pub reporter: Option<String>,
    pub mapping: FieldMapping,
    pub lifecycle: Lifecycle,
}

impl SyncSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let project_key = config.tracker.project_key.trim();
        if project_key.is_empty() {
            return Err(ConfigError::Invalid("tracker.project_key must be set".into()));
        }
        Ok(Self {
            project_key: project_key.to_string(),
            component: config
                .tracker
                .component
                .as_ref()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            issue_type: config.tracker.issue_type.clone(),
            reporter: config.tracker.reporter.clone(),
            mapping: FieldMapping::from_config(&config.mapping)?,
            lifecycle: Lifecycle::from_config(&config.lifecycle)?,
        })
    }
}

pub fn is_prioritized(priority: i32) -> bool {
    ELIGIBLE_PRIORITIES.contains(&priority)
}

/// Reconcile every violation with the tracker, one at a time.
///
/// Per-record tracker failures are counted and skipped; an authorization failure
/// aborts the run.
pub async fn run<T: Tracker + ?Sized>(
    tracker: &T,
    violations: &ViolationSet,
    settings: &SyncSettings,
) -> Result<SyncOutcome, SyncError> {
    info!(
        "Reconciling {} violations with project {}",
        violations.len(),
        settings.project_key
    );
    let mut driver = Driver {
        tracker,
        settings,
        outcome: SyncOutcome::default(),
        resolutions: None,
        component: None,
    };

    for (fingerprint, record) in violations.iter() {
        driver.outcome.total_processed += 1;

        if !is_prioritized(record.priority()) {
            debug!(
                "Violation {} has priority {}, not synchronized",
                fingerprint,
                record.priority()
            );
            driver.outcome.unprioritized += 1;
            continue;
        }

        match driver.process(*fingerprint, record).await {
            Ok(()) => {}
            Err(e) if e.is_authorization() => {
                error!("Tracker refused access while handling violation {}", fingerprint);
                return Err(SyncError::Unauthorized(e));
            }
            Err(e) => {
                error!("Failed to synchronize violation {}: {}", fingerprint, e);
                driver.outcome.not_added_by_error += 1;
            }
        }
    }

    info!(
        "Reconciliation complete: {} added, {} closed, {} existing, {} failed",
        driver.outcome.added,
        driver.outcome.closed,
        driver.outcome.not_added_by_exist,
        driver.outcome.not_added_by_error
    );
    Ok(driver.outcome)
}

/// Walk the violations without touching the tracker, logging what would be sent
pub fn dry_run(violations: &ViolationSet, settings: &SyncSettings) -> SyncOutcome {
    let mut outcome = SyncOutcome::default();
    for (fingerprint, record) in violations.iter() {
        outcome.total_processed += 1;
        if !is_prioritized(record.priority()) {
            outcome.unprioritized += 1;
            continue;
        }
        let token = identity_token(*fingerprint, &settings.project_key);
        let summary = settings.mapping.summary(record);
        let description = settings.mapping.description(record, &token);
        info!(
            "Would reconcile {} (priority {}, {:?}): '{}' ({} description chars, {} custom fields)",
            token,
            record.priority(),
            record.status(),
            summary,
            description.chars().count(),
            settings.mapping.custom_fields().len()
        );
    }
    outcome
}

struct Driver<'a, T: Tracker + ?Sized> {
    tracker: &'a T,
    settings: &'a SyncSettings,
    outcome: SyncOutcome,
    /// Fetched on first use and kept for the rest of the run
    resolutions: Option<Vec<Resolution>>,
    /// Configured component as resolved against the project, once per run
    component: Option<Option<Component>>,
}

impl<T: Tracker + ?Sized> Driver<'_, T> {
    async fn process(&mut self, fingerprint: u32, record: &ViolationRecord) -> Result<(), TrackerError> {
        let token = identity_token(fingerprint, &self.settings.project_key);
        let matches = self
            .tracker
            .search_by_text(&self.settings.project_key, &token)
            .await?;
        trace!("Search for {} returned {} tickets", token, matches.len());

        if matches.is_empty() {
            return self.create(record, &token).await;
        }

        if matches.len() > 1 {
            warn!(
                "{} tickets carry identity {}, reconciling all of them",
                matches.len(),
                token
            );
        }
        // Every match is reconciled even when an earlier one fails
        let mut first_error = None;
        for ticket in &matches {
            match self.reconcile(ticket, record).await {
                Ok(()) => {}
                Err(e) if e.is_authorization() => return Err(e),
                Err(e) => {
                    warn!("Failed to reconcile {}: {}", ticket.key, e);
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => {
                self.outcome.not_added_by_exist += 1;
                Ok(())
            }
        }
    }

    async fn create(&mut self, record: &ViolationRecord, token: &str) -> Result<(), TrackerError> {
        let projects = self.tracker.list_projects().await?;
        let project = projects
            .iter()
            .find(|p| p.key.eq_ignore_ascii_case(&self.settings.project_key))
            .ok_or_else(|| TrackerError::NotFound(format!("project {}", self.settings.project_key)))?;
        debug!(
            "Creating ticket in project {} ({}, id {})",
            project.key, project.name, project.id
        );

        let component = self.configured_component().await?;
        let mapping = &self.settings.mapping;
        let fields = NewTicket {
            project_key: project.key.clone(),
            issue_type: self.settings.issue_type.clone(),
            priority: mapping.priority_name(record.priority()).map(str::to_string),
            summary: mapping.summary(record),
            description: mapping.description(record, token),
            reporter: self.settings.reporter.clone(),
            components: component.into_iter().collect(),
            custom_fields: mapping.custom_field_values(record),
        };

        let ticket = self.tracker.create_ticket(&fields).await?;
        self.tracker.add_comment(&ticket, CREATED_COMMENT).await?;
        info!("Created {} (id {}) for {}", ticket.key, ticket.id, token);
        self.outcome.added += 1;
        Ok(())
    }

    async fn reconcile(&mut self, ticket: &Ticket, record: &ViolationRecord) -> Result<(), TrackerError> {
        debug!(
            "Reconciling {} (status '{}', resolution {:?}) with CAST status {:?}",
            ticket.key,
            ticket.status,
            ticket.resolution,
            record.status()
        );
        self.sync_component(ticket).await?;

        let lifecycle = &self.settings.lifecycle;
        let cast = record.status();
        let resolution = ticket.resolution.as_deref();

        let transitions = if lifecycle.needs_transitions(cast, &ticket.status) {
            self.tracker.get_transitions(ticket).await?
        } else {
            Vec::new()
        };
        if lifecycle.needs_resolutions(cast, &ticket.status, resolution) && self.resolutions.is_none() {
            let resolutions = self.tracker.list_resolutions().await?;
            debug!("Tracker offers {} resolutions", resolutions.len());
            self.resolutions = Some(resolutions);
        }

        let action = lifecycle.decide(
            cast,
            &ticket.status,
            resolution,
            &transitions,
            self.resolutions.as_deref().unwrap_or(&[]),
        );
        self.execute(ticket, action).await
    }

    async fn execute(&mut self, ticket: &Ticket, action: Action) -> Result<(), TrackerError> {
        match action {
            Action::NoOp => {
                debug!("{} is up to date", ticket.key);
            }
            Action::Resolve {
                transition,
                resolution_id,
            } => {
                let fields = json!({ "resolution": { "id": resolution_id } });
                self.tracker
                    .execute_transition(ticket, &transition.id, Some(&fields))
                    .await?;
                self.tracker.add_comment(ticket, RESOLVED_COMMENT).await?;
                info!("Resolved {} via '{}'", ticket.key, transition.name);
                self.outcome.closed += 1;
            }
            Action::CloseVia(transition) => {
                self.tracker
                    .execute_transition(ticket, &transition.id, None)
                    .await?;
                self.tracker.add_comment(ticket, RESOLVED_COMMENT).await?;
                info!("Closed {} via '{}'", ticket.key, transition.name);
                self.outcome.closed += 1;
            }
            Action::Reopen(transition) => {
                self.tracker
                    .execute_transition(ticket, &transition.id, None)
                    .await?;
                self.tracker.add_comment(ticket, REOPENED_COMMENT).await?;
                info!("Reopened {} via '{}'", ticket.key, transition.name);
            }
        }
        Ok(())
    }

    /// Add the configured component to the ticket unless it is already there
    async fn sync_component(&mut self, ticket: &Ticket) -> Result<(), TrackerError> {
        let Some(component) = self.configured_component().await? else {
            return Ok(());
        };
        let mut current = self.tracker.get_components(ticket).await?;
        if current.iter().any(|c| c.id == component.id) {
            trace!("{} already has component {}", ticket.key, component.name);
            return Ok(());
        }
        current.push(component);
        self.tracker.set_components(ticket, &current).await?;
        debug!("Added component to {}", ticket.key);
        Ok(())
    }

    /// The configured component as known to the project, looked up on first use
    async fn configured_component(&mut self) -> Result<Option<Component>, TrackerError> {
        if let Some(cached) = &self.component {
            return Ok(cached.clone());
        }
        let Some(name) = &self.settings.component else {
            return Ok(None);
        };
        let project = self.tracker.get_project(&self.settings.project_key).await?;
        let found = project
            .components
            .into_iter()
            .find(|c| c.name.eq_ignore_ascii_case(name));
        if found.is_none() {
            warn!("Component '{}' does not exist in project {}", name, project.key);
        }
        self.component = Some(found.clone());
        Ok(found)
    }
}
