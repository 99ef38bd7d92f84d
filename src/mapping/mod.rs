mod compose;
mod field;

pub use field::FieldCode;

use crate::config::{CustomFieldConfig, MappingConfig};
use crate::error::ConfigError;
use crate::violation::ViolationRecord;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Tracker priority names used when the configured table is incomplete
const FALLBACK_PRIORITIES: [(i32, &str); 5] = [
    (1, "Highest"),
    (2, "High"),
    (3, "Medium"),
    (4, "Low"),
    (5, "Lowest"),
];

/// Kind of a custom tracker field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomFieldKind {
    Text,
    Select,
}

/// A validated custom field binding
#[derive(Debug, Clone, PartialEq)]
pub struct CustomField {
    pub key: String,
    pub kind: CustomFieldKind,
    pub source: FieldCode,
    pub label: Option<String>,
}

impl CustomField {
    fn from_config(config: &CustomFieldConfig) -> Result<Self, ConfigError> {
        let kind = match config.kind.as_deref().map(str::trim) {
            None | Some("") => {
                return Err(ConfigError::MissingFieldType {
                    name: config.name.clone(),
                });
            }
            Some(k) if k.eq_ignore_ascii_case("text") => CustomFieldKind::Text,
            Some(k) if k.eq_ignore_ascii_case("select") => CustomFieldKind::Select,
            Some(other) => {
                return Err(ConfigError::UnsupportedFieldType {
                    name: config.name.clone(),
                    kind: other.to_string(),
                });
            }
        };
        let source = FieldCode::parse(&config.field).ok_or_else(|| ConfigError::UnknownFieldCode {
            name: config.name.clone(),
            code: config.field.clone(),
        })?;
        Ok(Self {
            key: config.name.clone(),
            kind,
            source,
            label: config.label.clone().filter(|l| !l.trim().is_empty()),
        })
    }

    /// Tracker payload value for this field
    pub fn render(&self, record: &ViolationRecord) -> Value {
        let value = self.source.value(record);
        match self.kind {
            CustomFieldKind::Text => match &self.label {
                Some(label) => json!(format!("{} {}", label, value)),
                None => json!(value),
            },
            CustomFieldKind::Select => json!({ "value": value }),
        }
    }
}

/// Immutable rendering configuration, built once at startup
#[derive(Debug, Clone)]
pub struct FieldMapping {
    application: String,
    marker_label: String,
    summary_codes: Vec<FieldCode>,
    description_codes: Vec<FieldCode>,
    labels: BTreeMap<FieldCode, String>,
    priorities: BTreeMap<i32, String>,
    custom_fields: Vec<CustomField>,
}

impl FieldMapping {
    /// Validate the mapping section.
    ///
    /// Unknown or unlabeled field codes are dropped with a warning; an invalid
    /// custom field declaration is an error.
    pub fn from_config(config: &MappingConfig) -> Result<Self, ConfigError> {
        let mut labels: BTreeMap<FieldCode, String> = FieldCode::ALL
            .iter()
            .map(|c| (*c, c.default_label().to_string()))
            .collect();
        for (code, label) in &config.labels {
            match FieldCode::parse(code) {
                Some(field) if label.trim().is_empty() => {
                    warn!("Empty label for field code {}, field will not be rendered", code);
                    labels.remove(&field);
                }
                Some(field) => {
                    labels.insert(field, label.trim().to_string());
                }
                None => warn!("Ignoring label for unknown field code '{}'", code),
            }
        }

        let summary_codes = parse_code_list(&config.summary, &labels, "summary");
        let description_codes = parse_code_list(&config.description, &labels, "description");
        let priorities = parse_priorities(&config.priorities);

        let custom_fields = config
            .custom_fields
            .iter()
            .map(CustomField::from_config)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "Field mapping: {} summary codes, {} description codes, {} custom fields",
            summary_codes.len(),
            description_codes.len(),
            custom_fields.len()
        );

        Ok(Self {
            application: config.application.clone(),
            marker_label: config.marker_label.clone(),
            summary_codes,
            description_codes,
            labels,
            priorities,
            custom_fields,
        })
    }

    /// Tracker priority name for a CAST priority
    pub fn priority_name(&self, priority: i32) -> Option<&str> {
        self.priorities.get(&priority).map(String::as_str)
    }

    pub fn label(&self, code: FieldCode) -> Option<&str> {
        self.labels.get(&code).map(String::as_str)
    }

    pub fn custom_fields(&self) -> &[CustomField] {
        &self.custom_fields
    }

    /// Custom field payload entries keyed by tracker field key
    pub fn custom_field_values(&self, record: &ViolationRecord) -> serde_json::Map<String, Value> {
        self.custom_fields
            .iter()
            .map(|f| (f.key.clone(), f.render(record)))
            .collect()
    }
}

fn parse_code_list(
    list: &str,
    labels: &BTreeMap<FieldCode, String>,
    kind: &str,
) -> Vec<FieldCode> {
    list.split(';')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .filter_map(|c| match FieldCode::parse(c) {
            Some(code) if labels.contains_key(&code) => Some(code),
            Some(_) => {
                warn!("Field code {} in {} list has no label, skipping", c, kind);
                None
            }
            None => {
                warn!("Unknown field code '{}' in {} list, skipping", c, kind);
                None
            }
        })
        .collect()
}

fn parse_priorities(configured: &BTreeMap<String, String>) -> BTreeMap<i32, String> {
    let parsed: BTreeMap<i32, String> = configured
        .iter()
        .filter_map(|(k, v)| {
            let name = v.trim();
            match k.trim().parse::<i32>() {
                Ok(p) if !name.is_empty() => Some((p, name.to_string())),
                _ => None,
            }
        })
        .collect();

    let complete = FALLBACK_PRIORITIES
        .iter()
        .all(|(p, _)| parsed.contains_key(p));
    if complete {
        parsed
    } else {
        if !configured.is_empty() {
            warn!("Priority table must map priorities 1-5, using built-in priority names");
        }
        FALLBACK_PRIORITIES
            .iter()
            .map(|(p, n)| (*p, n.to_string()))
            .collect()
    }
}
