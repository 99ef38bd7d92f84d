use crate::error::ConfigError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use tracing::debug;

#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct Config {
    /// Issue tracker connection and ticket defaults
    pub tracker: TrackerConfig,
    /// How violation attributes are rendered into ticket fields
    #[serde(default)]
    pub mapping: MappingConfig,
    /// How ticket state follows the CAST status of a violation
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct TrackerConfig {
    /// Base URL of the Jira instance (e.g. https://jira.example.com)
    pub base_url: String,
    /// Account used for basic authentication; the token comes from the CLI/env
    pub username: String,
    /// Key of the project tickets are created in
    pub project_key: String,
    /// Component attached to created tickets and added to existing ones (optional)
    #[serde(default)]
    pub component: Option<String>,
    /// Issue type of created tickets
    #[serde(default = "default_issue_type")]
    pub issue_type: String,
    /// Reporter of created tickets (optional, defaults to the authenticated account)
    #[serde(default)]
    pub reporter: Option<String>,
    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct MappingConfig {
    /// Application name quoted in the note at the top of every description
    #[serde(default = "default_application")]
    pub application: String,
    /// Semicolon-separated field codes rendered into the summary (e.g. "METRIC;OBJECT_NAME")
    #[serde(default)]
    pub summary: String,
    /// Semicolon-separated field codes rendered into the description
    #[serde(default)]
    pub description: String,
    /// Label preceding the identity token at the end of every description
    #[serde(default = "default_marker_label")]
    pub marker_label: String,
    /// CAST priority (1-5) to tracker priority name; all five entries are required
    #[serde(default)]
    pub priorities: BTreeMap<String, String>,
    /// Field code to label overrides
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Extra tracker fields populated from violation attributes
    #[serde(default)]
    pub custom_fields: Vec<CustomFieldConfig>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            application: default_application(),
            summary: String::new(),
            description: String::new(),
            marker_label: default_marker_label(),
            priorities: BTreeMap::new(),
            labels: BTreeMap::new(),
            custom_fields: Vec::new(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct CustomFieldConfig {
    /// Tracker field key (e.g. customfield_10100)
    pub name: String,
    /// Field type: "text" or "select"
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Field code whose value fills the field
    pub field: String,
    /// Text prepended to the value of text fields (optional)
    #[serde(default)]
    pub label: Option<String>,
}

/// What to do with an open ticket once CAST reports the violation fixed
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OnFixed {
    /// Transition through the resolve transition and set the configured resolution
    #[default]
    Resolve,
    /// Transition through the close transition
    Close,
}

#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct LifecycleConfig {
    /// Policy applied when a violation is fixed: "resolve" or "close"
    #[serde(default)]
    pub on_fixed: OnFixed,
    /// Resolution name set by the resolve policy
    #[serde(default = "default_resolution")]
    pub resolution: String,
    /// Case-insensitive substring identifying the resolve transition
    #[serde(default = "default_resolve_transition")]
    pub resolve_transition: String,
    /// Exact name of the close transition (optional, defaults to the last listed transition)
    #[serde(default)]
    pub close_transition: Option<String>,
    /// Transition names tried in order to reopen a ticket
    #[serde(default = "default_reopen_transitions")]
    pub reopen_transitions: Vec<String>,
    /// Ticket status names treated as closed; every other status is open
    #[serde(default = "default_closed_statuses")]
    pub closed_statuses: Vec<String>,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            on_fixed: OnFixed::default(),
            resolution: default_resolution(),
            resolve_transition: default_resolve_transition(),
            close_transition: None,
            reopen_transitions: default_reopen_transitions(),
            closed_statuses: default_closed_statuses(),
        }
    }
}

fn default_issue_type() -> String {
    "Bug".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_application() -> String {
    "CAST".to_string()
}

fn default_marker_label() -> String {
    "CAST Identifier:".to_string()
}

fn default_resolution() -> String {
    "Fixed".to_string()
}

fn default_resolve_transition() -> String {
    "resolve".to_string()
}

fn default_reopen_transitions() -> Vec<String> {
    vec!["Reopen Issue".to_string(), "To Do".to_string()]
}

fn default_closed_statuses() -> Vec<String> {
    vec!["done".to_string(), "closed".to_string(), "resolved".to_string()]
}

impl Config {
    /// Load the config file and apply `key.path=value` overrides on top of it
    pub fn load(path: &str, overrides: &[String]) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::parse(&content, overrides)
    }

    pub fn parse(content: &str, overrides: &[String]) -> Result<Self, ConfigError> {
        let mut value = toml::Value::Table(toml::from_str::<toml::Table>(content)?);
        for entry in overrides {
            apply_override(&mut value, entry)?;
        }
        let config: Config = value.try_into()?;
        debug!(
            "Loaded config for project {} at {}",
            config.tracker.project_key, config.tracker.base_url
        );
        Ok(config)
    }

    /// Starting point written by `castsync init`
    pub fn example() -> Self {
        let mut labels = BTreeMap::new();
        labels.insert("METRIC".to_string(), "Rule:".to_string());
        let priorities = [(1, "Highest"), (2, "High"), (3, "Medium"), (4, "Low"), (5, "Lowest")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Self {
            tracker: TrackerConfig {
                base_url: "https://jira.example.com".to_string(),
                username: "cast-bot".to_string(),
                project_key: "APP".to_string(),
                component: Some("CAST".to_string()),
                issue_type: default_issue_type(),
                reporter: None,
                timeout_secs: default_timeout_secs(),
            },
            mapping: MappingConfig {
                summary: "METRIC;OBJECT_NAME".to_string(),
                description: "OBJECT_NAME;METRIC;METRIC_DESCRIPTION;REASON;REMEDIATION;SOURCE_PATH;SOURCE_CODE"
                    .to_string(),
                priorities,
                labels,
                ..MappingConfig::default()
            },
            lifecycle: LifecycleConfig::default(),
        }
    }
}

/// Apply one `key.path=value` override; the value is parsed as TOML, falling back to a string
fn apply_override(root: &mut toml::Value, entry: &str) -> Result<(), ConfigError> {
    let (key, raw) = entry
        .split_once('=')
        .ok_or_else(|| ConfigError::InvalidOverride(entry.to_string()))?;
    let segments: Vec<&str> = key.trim().split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(ConfigError::InvalidOverride(entry.to_string()));
    }

    let parsed = toml::from_str::<toml::Table>(&format!("v = {}", raw.trim()))
        .ok()
        .and_then(|mut t| t.remove("v"))
        .unwrap_or_else(|| toml::Value::String(raw.trim().to_string()));

    let mut current = root;
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| ConfigError::InvalidOverride(entry.to_string()))?;
    for segment in parents {
        let table = current
            .as_table_mut()
            .ok_or_else(|| ConfigError::InvalidOverride(entry.to_string()))?;
        current = table
            .entry(segment.to_string())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
    }
    let table = current
        .as_table_mut()
        .ok_or_else(|| ConfigError::InvalidOverride(entry.to_string()))?;
    debug!("Config override {} = {}", key.trim(), parsed);
    table.insert(last.to_string(), parsed);
    Ok(())
}
