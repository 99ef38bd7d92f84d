use super::{FieldCode, FieldMapping};
use crate::util::truncate_chars;
use crate::violation::ViolationRecord;

/// Tracker limit on the summary field
pub const MAX_SUMMARY_CHARS: usize = 250;

/// Tracker limit on the description field (30 KiB of characters)
pub const MAX_DESCRIPTION_CHARS: usize = 30 * 1024;

/// Description layout used when no configured code produced any text
const DEFAULT_DESCRIPTION_CODES: [FieldCode; 11] = [
    FieldCode::ObjectName,
    FieldCode::ActionDate,
    FieldCode::ActionUser,
    FieldCode::MetricDescription,
    FieldCode::Reason,
    FieldCode::Reference,
    FieldCode::Remediation,
    FieldCode::ViolationExample,
    FieldCode::RemediationExample,
    FieldCode::Total,
    FieldCode::Output,
];

/// Ticket text field being composed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Summary,
    Description,
}

impl FieldMapping {
    /// Compose the raw text for `kind` from the configured field codes.
    ///
    /// Falls back to the built-in layout when the configured codes render nothing.
    /// No identity marker and no length limit are applied here.
    pub fn compose(&self, record: &ViolationRecord, kind: OutputKind) -> String {
        match kind {
            OutputKind::Summary => {
                let mut text = String::new();
                for code in &self.summary_codes {
                    text.push_str(&code.value(record));
                    text.push(' ');
                }
                let text = text.trim_end();
                if text.is_empty() {
                    record.metric_short_description().to_string()
                } else {
                    text.to_string()
                }
            }
            OutputKind::Description => {
                let mut body = self.render_lines(record, &self.description_codes);
                if body.is_empty() {
                    body = self.render_lines(record, &DEFAULT_DESCRIPTION_CODES);
                }
                format!("{}\n\n{}", self.note(), body)
            }
        }
    }

    /// Summary ready to submit: composed and cut to the tracker limit
    pub fn summary(&self, record: &ViolationRecord) -> String {
        truncate_chars(&self.compose(record, OutputKind::Summary), MAX_SUMMARY_CHARS)
    }

    /// Description ready to submit, ending with the identity marker.
    ///
    /// The result never exceeds the tracker limit and the marker is never cut.
    pub fn description(&self, record: &ViolationRecord, identity_token: &str) -> String {
        let marker = self.marker(identity_token);
        let budget = MAX_DESCRIPTION_CHARS.saturating_sub(marker.chars().count());
        let body = truncate_chars(&self.compose(record, OutputKind::Description), budget);
        format!("{}{}", body, marker)
    }

    /// Identity marker appended to every description
    pub fn marker(&self, identity_token: &str) -> String {
        format!("\n{} {}", self.marker_label, identity_token)
    }

    fn note(&self) -> String {
        format!(
            "This issue was generated by CAST for application {}.",
            self.application
        )
    }

    fn render_lines(&self, record: &ViolationRecord, codes: &[FieldCode]) -> String {
        let mut text = String::new();
        for code in codes {
            let Some(label) = self.label(*code) else {
                continue;
            };
            text.push_str(label);
            text.push(' ');
            text.push_str(&code.value(record));
            text.push('\n');
        }
        text
    }
}
