use crate::fingerprint;
use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::collections::btree_map;
use tracing::{debug, trace, warn};

/// Returned by every text accessor in place of an empty or absent value
pub const NOT_AVAILABLE: &str = "N/A";

/// Priority sentinel for "keep as is / skip"
pub const PRIORITY_UNSET: i32 = -1;

/// Upper bound for the stored source snippet (28 KiB)
const MAX_SNIPPET_BYTES: usize = 28 * 1024;
const SNIPPET_ELLIPSIS: &str = "...";
const QUOTE_CHARS: [char; 3] = ['"', '\'', '`'];

/// Current state of a violation as reported by CAST
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViolationStatus {
    Fixed,
    StillOpen,
    #[default]
    Unchanged,
}

impl ViolationStatus {
    /// Parse the status text from an extracted row, defaulting to `Unchanged`
    pub fn parse(text: &str) -> Self {
        let normalized: String = text
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_')
            .collect();
        match normalized.as_str() {
            "fixed" => Self::Fixed,
            "stillopen" | "open" => Self::StillOpen,
            _ => Self::Unchanged,
        }
    }
}

/// Map a textual severity tag onto a priority when the row has none
pub fn priority_from_severity(tag: &str) -> i32 {
    match tag.trim().to_lowercase().as_str() {
        "extreme" | "critical" => 1,
        "high" => 2,
        "moderate" | "medium" => 3,
        "low" => 4,
        _ => PRIORITY_UNSET,
    }
}

/// One violation row as delivered by the extraction layer
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViolationRow {
    pub object_id: i64,
    pub priority: Option<i32>,
    /// Textual severity, used when `priority` is absent
    pub severity: Option<String>,
    pub action_date: Option<String>,
    pub first_snapshot_date: Option<String>,
    pub action_defined_by_user: Option<String>,
    pub object_full_name: Option<String>,
    pub metric_id: i64,
    pub metric_short_description: Option<String>,
    pub metric_long_description: Option<String>,
    pub reason: Option<String>,
    pub remediation: Option<String>,
    pub reference: Option<String>,
    pub violation_example: Option<String>,
    pub remediation_example: Option<String>,
    pub output: Option<String>,
    pub totals: Option<String>,
    pub source_path: Option<String>,
    pub line_start: Option<u32>,
    pub line_end: Option<u32>,
    /// Full text of the source file; only `[line_start, line_end]` is kept
    pub source_code: Option<String>,
    pub tech_criteria: Option<String>,
    pub business_criteria: Option<String>,
    pub status: Option<String>,
}

/// Read the extracted rows from a JSON array file
pub fn load_rows(path: &str) -> anyhow::Result<Vec<ViolationRow>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read violations file {}", path))?;
    let rows: Vec<ViolationRow> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse violations file {}", path))?;
    debug!("Loaded {} violation rows from {}", rows.len(), path);
    Ok(rows)
}

/// A single CAST violation, immutable once built
#[derive(Debug, Clone, PartialEq)]
pub struct ViolationRecord {
    object_id: i64,
    priority: i32,
    action_date: String,
    first_snapshot_date: String,
    action_defined_by_user: String,
    object_full_name: String,
    metric_id: i64,
    metric_short_description: String,
    metric_long_description: String,
    reason: String,
    remediation: String,
    reference: String,
    violation_example: String,
    remediation_example: String,
    output: String,
    totals: String,
    source_path: String,
    line_start: Option<u32>,
    line_end: Option<u32>,
    source_code_snippet: String,
    tech_criteria: String,
    business_criteria: String,
    status: ViolationStatus,
}

impl ViolationRecord {
    pub fn from_row(row: ViolationRow) -> Self {
        let priority = match row.priority {
            Some(p) => p,
            None => row
                .severity
                .as_deref()
                .map(priority_from_severity)
                .unwrap_or(PRIORITY_UNSET),
        };
        let snippet = row
            .source_code
            .as_deref()
            .map(|src| extract_snippet(src, row.line_start, row.line_end))
            .unwrap_or_default();

        Self {
            object_id: row.object_id,
            priority,
            action_date: clean_text(row.action_date),
            first_snapshot_date: clean_text(row.first_snapshot_date),
            action_defined_by_user: clean_text(row.action_defined_by_user),
            object_full_name: clean_text(row.object_full_name),
            metric_id: row.metric_id,
            metric_short_description: clean_text(row.metric_short_description),
            metric_long_description: clean_text(row.metric_long_description),
            reason: clean_text(row.reason),
            remediation: clean_text(row.remediation),
            reference: clean_text(row.reference),
            violation_example: clean_text(row.violation_example),
            remediation_example: clean_text(row.remediation_example),
            output: clean_text(row.output),
            totals: clean_text(row.totals),
            source_path: clean_text(row.source_path),
            line_start: row.line_start,
            line_end: row.line_end,
            source_code_snippet: if snippet.is_empty() {
                NOT_AVAILABLE.to_string()
            } else {
                snippet
            },
            tech_criteria: clean_text(row.tech_criteria),
            business_criteria: clean_text(row.business_criteria),
            status: row
                .status
                .as_deref()
                .map(ViolationStatus::parse)
                .unwrap_or_default(),
        }
    }

    pub fn object_id(&self) -> i64 {
        self.object_id
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn action_date(&self) -> &str {
        &self.action_date
    }

    pub fn first_snapshot_date(&self) -> &str {
        &self.first_snapshot_date
    }

    pub fn action_defined_by_user(&self) -> &str {
        &self.action_defined_by_user
    }

    pub fn object_full_name(&self) -> &str {
        &self.object_full_name
    }

    pub fn metric_id(&self) -> i64 {
        self.metric_id
    }

    pub fn metric_short_description(&self) -> &str {
        &self.metric_short_description
    }

    pub fn metric_long_description(&self) -> &str {
        &self.metric_long_description
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn remediation(&self) -> &str {
        &self.remediation
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn violation_example(&self) -> &str {
        &self.violation_example
    }

    pub fn remediation_example(&self) -> &str {
        &self.remediation_example
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn totals(&self) -> &str {
        &self.totals
    }

    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    pub fn line_start(&self) -> Option<u32> {
        self.line_start
    }

    pub fn line_end(&self) -> Option<u32> {
        self.line_end
    }

    pub fn source_code_snippet(&self) -> &str {
        &self.source_code_snippet
    }

    pub fn tech_criteria(&self) -> &str {
        &self.tech_criteria
    }

    pub fn business_criteria(&self) -> &str {
        &self.business_criteria
    }

    pub fn status(&self) -> ViolationStatus {
        self.status
    }
}

/// Strip quotes and substitute the N/A sentinel for empty values
fn clean_text(value: Option<String>) -> String {
    let stripped: String = value
        .unwrap_or_default()
        .chars()
        .filter(|c| !QUOTE_CHARS.contains(c))
        .collect();
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Keep only lines `[start, end]` (1-based, inclusive) of `source`, drop control
/// characters other than newline and tab, and bound the result to 28 KiB.
fn extract_snippet(source: &str, start: Option<u32>, end: Option<u32>) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let selected = match (start, end) {
        (Some(s), Some(e)) if s >= 1 && s <= e => {
            let from = (s as usize - 1).min(lines.len());
            let to = (e as usize).min(lines.len());
            &lines[from..to]
        }
        _ => &lines[..],
    };

    let cleaned: String = selected
        .join("\n")
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();

    crate::util::truncate_bytes_with_marker(cleaned, MAX_SNIPPET_BYTES, SNIPPET_ELLIPSIS)
}

/// Fingerprint-keyed, ordered collection of violations.
///
/// Inserting a fingerprint that is already present replaces the earlier record;
/// every replacement is logged and counted.
#[derive(Debug, Default)]
pub struct ViolationSet {
    entries: BTreeMap<u32, ViolationRecord>,
    collisions: usize,
    skipped: usize,
}

impl ViolationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fingerprint each record and insert it, skipping records whose identity cannot be computed
    pub fn from_records(records: impl IntoIterator<Item = ViolationRecord>) -> Self {
        let mut set = Self::new();
        for record in records {
            match fingerprint::fingerprint(&record) {
                Ok(fp) => {
                    set.insert(fp, record);
                }
                Err(e) => {
                    warn!(
                        "Skipping violation on object {} (metric {}): {}",
                        record.object_id(),
                        record.metric_id(),
                        e
                    );
                    set.skipped += 1;
                }
            }
        }
        debug!(
            "Built violation set: {} entries, {} collisions, {} skipped",
            set.len(),
            set.collisions,
            set.skipped
        );
        set
    }

    /// Insert or replace; returns the record previously stored under `fingerprint`
    pub fn insert(&mut self, fingerprint: u32, record: ViolationRecord) -> Option<ViolationRecord> {
        trace!("Inserting violation with fingerprint {}", fingerprint);
        let previous = self.entries.insert(fingerprint, record);
        if let Some(prev) = &previous {
            self.collisions += 1;
            warn!(
                "Fingerprint {} collision: record for object {} replaced",
                fingerprint,
                prev.object_id()
            );
        }
        previous
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of inserts that replaced an existing fingerprint
    pub fn collisions(&self) -> usize {
        self.collisions
    }

    /// Number of records dropped because their fingerprint could not be computed
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn iter(&self) -> btree_map::Iter<'_, u32, ViolationRecord> {
        self.entries.iter()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_row() -> ViolationRow {
        ViolationRow {
            object_id: 4711,
            priority: Some(1),
            action_date: Some("2021-03-04 10:11:12".into()),
            first_snapshot_date: Some("2020-11-30 08:00:00".into()),
            action_defined_by_user: Some("alice".into()),
            object_full_name: Some("com.acme.billing.Invoice.total".into()),
            metric_id: 7424,
            metric_short_description: Some("Avoid empty catch blocks".into()),
            metric_long_description: Some("Empty catch blocks hide failures".into()),
            reason: Some("Swallowed exceptions make diagnosis impossible".into()),
            remediation: Some("Log or rethrow".into()),
            status: Some("Still Open".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_text_is_not_available() {
        let record = ViolationRecord::from_row(ViolationRow::default());
        assert_eq!(record.reason(), NOT_AVAILABLE);
        assert_eq!(record.object_full_name(), NOT_AVAILABLE);
        assert_eq!(record.source_code_snippet(), NOT_AVAILABLE);
    }

    #[test]
    fn test_whitespace_only_text_is_not_available() {
        let record = ViolationRecord::from_row(ViolationRow {
            reference: Some("   ".into()),
            ..Default::default()
        });
        assert_eq!(record.reference(), NOT_AVAILABLE);
    }

    #[test]
    fn test_quotes_stripped() {
        let record = ViolationRecord::from_row(ViolationRow {
            reason: Some(r#"Use "final" and 'const' `here`"#.into()),
            ..Default::default()
        });
        assert_eq!(record.reason(), "Use final and const here");
    }

    #[test]
    fn test_quotes_only_becomes_not_available() {
        let record = ViolationRecord::from_row(ViolationRow {
            output: Some("\"\"".into()),
            ..Default::default()
        });
        assert_eq!(record.output(), NOT_AVAILABLE);
    }

    #[test]
    fn test_priority_from_severity_when_unset() {
        let record = ViolationRecord::from_row(ViolationRow {
            priority: None,
            severity: Some("High".into()),
            ..Default::default()
        });
        assert_eq!(record.priority(), 2);
    }

    #[test]
    fn test_explicit_priority_wins_over_severity() {
        let record = ViolationRecord::from_row(ViolationRow {
            priority: Some(3),
            severity: Some("Extreme".into()),
            ..Default::default()
        });
        assert_eq!(record.priority(), 3);
    }

    #[test]
    fn test_unknown_severity_is_unset() {
        assert_eq!(priority_from_severity("whatever"), PRIORITY_UNSET);
        let record = ViolationRecord::from_row(ViolationRow::default());
        assert_eq!(record.priority(), PRIORITY_UNSET);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(ViolationStatus::parse("Fixed"), ViolationStatus::Fixed);
        assert_eq!(ViolationStatus::parse(" still open "), ViolationStatus::StillOpen);
        assert_eq!(ViolationStatus::parse("STILL_OPEN"), ViolationStatus::StillOpen);
        assert_eq!(ViolationStatus::parse("added"), ViolationStatus::Unchanged);
        assert_eq!(ViolationStatus::parse(""), ViolationStatus::Unchanged);
    }

    #[test]
    fn test_snippet_extracts_line_range() {
        let record = ViolationRecord::from_row(ViolationRow {
            source_code: Some("one\ntwo\nthree\nfour\nfive".into()),
            line_start: Some(2),
            line_end: Some(4),
            ..Default::default()
        });
        assert_eq!(record.source_code_snippet(), "two\nthree\nfour");
    }

    #[test]
    fn test_snippet_range_clamped_to_source() {
        let record = ViolationRecord::from_row(ViolationRow {
            source_code: Some("one\ntwo".into()),
            line_start: Some(2),
            line_end: Some(40),
            ..Default::default()
        });
        assert_eq!(record.source_code_snippet(), "two");
    }

    #[test]
    fn test_snippet_without_range_keeps_whole_source() {
        let record = ViolationRecord::from_row(ViolationRow {
            source_code: Some("one\ntwo".into()),
            ..Default::default()
        });
        assert_eq!(record.source_code_snippet(), "one\ntwo");
    }

    #[test]
    fn test_snippet_control_characters_removed() {
        let record = ViolationRecord::from_row(ViolationRow {
            source_code: Some("a\u{0007}b\r\n\tc\u{0000}".into()),
            ..Default::default()
        });
        assert_eq!(record.source_code_snippet(), "ab\n\tc");
    }

    #[test]
    fn test_snippet_bounded_with_ellipsis() {
        let record = ViolationRecord::from_row(ViolationRow {
            source_code: Some("x".repeat(40 * 1024)),
            ..Default::default()
        });
        let snippet = record.source_code_snippet();
        assert_eq!(snippet.len(), MAX_SNIPPET_BYTES);
        assert!(snippet.ends_with(SNIPPET_ELLIPSIS));
    }

    #[test]
    fn test_violation_set_counts_collisions() {
        let record = ViolationRecord::from_row(sample_row());
        let mut set = ViolationSet::new();
        assert!(set.insert(1, record.clone()).is_none());
        assert!(set.insert(2, record.clone()).is_none());
        assert!(set.insert(1, record).is_some());
        assert_eq!(set.len(), 2);
        assert_eq!(set.collisions(), 1);
    }

    #[test]
    fn test_violation_set_skips_unparseable_dates() {
        let good = ViolationRecord::from_row(sample_row());
        let bad = ViolationRecord::from_row(ViolationRow {
            action_date: Some("yesterday".into()),
            ..sample_row()
        });
        let set = ViolationSet::from_records(vec![good, bad]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.skipped(), 1);
        assert_eq!(set.collisions(), 0);
    }

    #[test]
    fn test_violation_set_duplicate_records_collapse() {
        let record = ViolationRecord::from_row(sample_row());
        let set = ViolationSet::from_records(vec![record.clone(), record]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.collisions(), 1);
    }

    #[test]
    fn test_load_rows_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("violations.json");
        std::fs::write(
            &path,
            r#"[{"objectId": 12, "priority": 2, "metricId": 99, "actionDate": "2019-01-01 00:00:00", "status": "Fixed"}]"#,
        )
        .unwrap();

        let rows = load_rows(path.to_str().unwrap()).unwrap();
        assert_eq!(rows.len(), 1);
        let record = ViolationRecord::from_row(rows[0].clone());
        assert_eq!(record.object_id(), 12);
        assert_eq!(record.metric_id(), 99);
        assert_eq!(record.status(), ViolationStatus::Fixed);
    }
}
