use crate::config::{LifecycleConfig, OnFixed};
use crate::error::{ConfigError, LookupError};
use crate::tracker::{Resolution, Transition};
use crate::violation::ViolationStatus;
use tracing::{debug, warn};

/// Transition name used when no reopen transition is available; the tracker rejects it
pub const REOPEN_SENTINEL: &str = "Reopen";

/// Ticket status reduced to what reconciliation cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    Open,
    Closed,
}

/// Policy applied to an open ticket whose violation is fixed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Policy {
    MarkResolved { resolution: String },
    Close,
}

/// What to do with a matched ticket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    NoOp,
    Resolve {
        transition: Transition,
        resolution_id: String,
    },
    CloseVia(Transition),
    Reopen(Transition),
}

/// Ticket lifecycle rules, validated from the `[lifecycle]` section
#[derive(Debug, Clone)]
pub struct Lifecycle {
    policy: Policy,
    closed_statuses: Vec<String>,
    resolve_transition: String,
    close_transition: Option<String>,
    reopen_transitions: Vec<String>,
}

impl Lifecycle {
    pub fn from_config(config: &LifecycleConfig) -> Result<Self, ConfigError> {
        let policy = match config.on_fixed {
            OnFixed::Resolve => {
                let resolution = config.resolution.trim();
                if resolution.is_empty() {
                    return Err(ConfigError::Invalid(
                        "lifecycle.resolution must be set when on_fixed = \"resolve\"".into(),
                    ));
                }
                Policy::MarkResolved {
                    resolution: resolution.to_string(),
                }
            }
            OnFixed::Close => Policy::Close,
        };
        if config.resolve_transition.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "lifecycle.resolve_transition must not be empty".into(),
            ));
        }

        Ok(Self {
            policy,
            closed_statuses: config
                .closed_statuses
                .iter()
                .map(|s| s.trim().to_lowercase())
                .collect(),
            resolve_transition: config.resolve_transition.trim().to_lowercase(),
            close_transition: config
                .close_transition
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            reopen_transitions: config.reopen_transitions.clone(),
        })
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn classify(&self, ticket_status: &str) -> StatusCategory {
        let status = ticket_status.trim().to_lowercase();
        if self.closed_statuses.contains(&status) {
            StatusCategory::Closed
        } else {
            StatusCategory::Open
        }
    }

    /// Whether `decide` will look at transitions for this combination
    pub fn needs_transitions(&self, cast: ViolationStatus, ticket_status: &str) -> bool {
        matches!(
            (cast, self.classify(ticket_status)),
            (ViolationStatus::Fixed, StatusCategory::Open)
                | (ViolationStatus::StillOpen, StatusCategory::Closed)
        )
    }

    /// Whether `decide` will look at resolutions for this combination
    pub fn needs_resolutions(
        &self,
        cast: ViolationStatus,
        ticket_status: &str,
        ticket_resolution: Option<&str>,
    ) -> bool {
        match &self.policy {
            Policy::MarkResolved { resolution } => {
                cast == ViolationStatus::Fixed
                    && self.classify(ticket_status) == StatusCategory::Open
                    && resolution_differs(ticket_resolution, resolution)
            }
            Policy::Close => false,
        }
    }

    /// Decide how a ticket follows the CAST status of its violation.
    ///
    /// Lookup failures are logged and yield `NoOp`.
    pub fn decide(
        &self,
        cast: ViolationStatus,
        ticket_status: &str,
        ticket_resolution: Option<&str>,
        transitions: &[Transition],
        resolutions: &[Resolution],
    ) -> Action {
        let category = self.classify(ticket_status);
        debug!(
            "Deciding for CAST status {:?}, ticket status '{}' ({:?})",
            cast, ticket_status, category
        );

        let result = match (cast, category) {
            (ViolationStatus::Fixed, StatusCategory::Closed) => Ok(Action::NoOp),
            (ViolationStatus::Fixed, StatusCategory::Open) => match &self.policy {
                Policy::MarkResolved { resolution } => {
                    if resolution_differs(ticket_resolution, resolution) {
                        self.resolve(resolution, transitions, resolutions)
                    } else {
                        Ok(Action::NoOp)
                    }
                }
                Policy::Close => self.close(transitions),
            },
            (ViolationStatus::StillOpen, StatusCategory::Closed) => Ok(self.reopen(transitions)),
            (ViolationStatus::StillOpen, StatusCategory::Open) => Ok(Action::NoOp),
            (ViolationStatus::Unchanged, _) => Ok(Action::NoOp),
        };

        result.unwrap_or_else(|e| {
            warn!("Lookup failed, leaving ticket as is: {}", e);
            Action::NoOp
        })
    }

    fn resolve(
        &self,
        resolution: &str,
        transitions: &[Transition],
        resolutions: &[Resolution],
    ) -> Result<Action, LookupError> {
        let transition = transitions
            .iter()
            .find(|t| t.name.to_lowercase().contains(&self.resolve_transition))
            .ok_or_else(|| LookupError::Transition(self.resolve_transition.clone()))?;
        let resolution_id = resolutions
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(resolution))
            .map(|r| r.id.clone())
            .ok_or_else(|| LookupError::Resolution(resolution.to_string()))?;
        Ok(Action::Resolve {
            transition: transition.clone(),
            resolution_id,
        })
    }

    fn close(&self, transitions: &[Transition]) -> Result<Action, LookupError> {
        let transition = match &self.close_transition {
            Some(name) => transitions
                .iter()
                .find(|t| t.name.eq_ignore_ascii_case(name))
                .ok_or_else(|| LookupError::Transition(name.clone()))?,
            // Jira lists the closing transition last in default workflows
            None => transitions
                .last()
                .ok_or_else(|| LookupError::Transition("<last>".into()))?,
        };
        Ok(Action::CloseVia(transition.clone()))
    }

    fn reopen(&self, transitions: &[Transition]) -> Action {
        let found = self.reopen_transitions.iter().find_map(|wanted| {
            transitions
                .iter()
                .find(|t| t.name.eq_ignore_ascii_case(wanted))
        });
        match found {
            Some(t) => Action::Reopen(t.clone()),
            None => {
                warn!(
                    "No reopen transition among {:?}, trying '{}'",
                    self.reopen_transitions, REOPEN_SENTINEL
                );
                Action::Reopen(Transition {
                    id: REOPEN_SENTINEL.to_string(),
                    name: REOPEN_SENTINEL.to_string(),
                })
            }
        }
    }
}

fn resolution_differs(current: Option<&str>, wanted: &str) -> bool {
    match current {
        Some(r) => !r.trim().eq_ignore_ascii_case(wanted),
        None => true,
    }
}
