use crate::violation::{NOT_AVAILABLE, ViolationRecord, ViolationStatus};

/// Violation attributes that can be rendered into ticket fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldCode {
    ObjectId,
    ObjectName,
    Priority,
    ActionDate,
    ActionUser,
    FirstSnapshotDate,
    MetricId,
    Metric,
    MetricDescription,
    Reason,
    Remediation,
    Reference,
    ViolationExample,
    RemediationExample,
    Output,
    Total,
    SourcePath,
    LineStart,
    LineEnd,
    SourceCode,
    TechCriteria,
    BusinessCriteria,
    Status,
}

impl FieldCode {
    pub const ALL: [FieldCode; 23] = [
        Self::ObjectId,
        Self::ObjectName,
        Self::Priority,
        Self::ActionDate,
        Self::ActionUser,
        Self::FirstSnapshotDate,
        Self::MetricId,
        Self::Metric,
        Self::MetricDescription,
        Self::Reason,
        Self::Remediation,
        Self::Reference,
        Self::ViolationExample,
        Self::RemediationExample,
        Self::Output,
        Self::Total,
        Self::SourcePath,
        Self::LineStart,
        Self::LineEnd,
        Self::SourceCode,
        Self::TechCriteria,
        Self::BusinessCriteria,
        Self::Status,
    ];

    /// Code as written in the configuration
    pub fn code(self) -> &'static str {
        match self {
            Self::ObjectId => "OBJECT_ID",
            Self::ObjectName => "OBJECT_NAME",
            Self::Priority => "PRIORITY",
            Self::ActionDate => "ACTION_DATE",
            Self::ActionUser => "ACTION_USER",
            Self::FirstSnapshotDate => "FIRST_SNAPSHOT_DATE",
            Self::MetricId => "METRIC_ID",
            Self::Metric => "METRIC",
            Self::MetricDescription => "METRIC_DESCRIPTION",
            Self::Reason => "REASON",
            Self::Remediation => "REMEDIATION",
            Self::Reference => "REFERENCE",
            Self::ViolationExample => "VIOLATION_EXAMPLE",
            Self::RemediationExample => "REMEDIATION_EXAMPLE",
            Self::Output => "OUTPUT",
            Self::Total => "TOTAL",
            Self::SourcePath => "SOURCE_PATH",
            Self::LineStart => "LINE_START",
            Self::LineEnd => "LINE_END",
            Self::SourceCode => "SOURCE_CODE",
            Self::TechCriteria => "TECH_CRITERIA",
            Self::BusinessCriteria => "BUSINESS_CRITERIA",
            Self::Status => "STATUS",
        }
    }

    /// Case-insensitive lookup of a configured code
    pub fn parse(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.code().eq_ignore_ascii_case(code))
    }

    pub fn default_label(self) -> &'static str {
        match self {
            Self::ObjectId => "Object ID:",
            Self::ObjectName => "Object Name:",
            Self::Priority => "Priority:",
            Self::ActionDate => "Action Plan Date:",
            Self::ActionUser => "Added by:",
            Self::FirstSnapshotDate => "First Detected:",
            Self::MetricId => "Rule ID:",
            Self::Metric => "Rule:",
            Self::MetricDescription => "Rule Description:",
            Self::Reason => "Rationale:",
            Self::Remediation => "Remediation:",
            Self::Reference => "Reference:",
            Self::ViolationExample => "Violation Example:",
            Self::RemediationExample => "Fixed Example:",
            Self::Output => "Output:",
            Self::Total => "Total:",
            Self::SourcePath => "Source File:",
            Self::LineStart => "Start Line:",
            Self::LineEnd => "End Line:",
            Self::SourceCode => "Source Code:",
            Self::TechCriteria => "Technical Criteria:",
            Self::BusinessCriteria => "Business Criteria:",
            Self::Status => "Status:",
        }
    }

    /// Render this attribute of `record` as text
    pub fn value(self, record: &ViolationRecord) -> String {
        match self {
            Self::ObjectId => record.object_id().to_string(),
            Self::ObjectName => record.object_full_name().to_string(),
            Self::Priority => record.priority().to_string(),
            Self::ActionDate => record.action_date().to_string(),
            Self::ActionUser => record.action_defined_by_user().to_string(),
            Self::FirstSnapshotDate => record.first_snapshot_date().to_string(),
            Self::MetricId => record.metric_id().to_string(),
            Self::Metric => record.metric_short_description().to_string(),
            Self::MetricDescription => record.metric_long_description().to_string(),
            Self::Reason => record.reason().to_string(),
            Self::Remediation => record.remediation().to_string(),
            Self::Reference => record.reference().to_string(),
            Self::ViolationExample => record.violation_example().to_string(),
            Self::RemediationExample => record.remediation_example().to_string(),
            Self::Output => record.output().to_string(),
            Self::Total => record.totals().to_string(),
            Self::SourcePath => record.source_path().to_string(),
            Self::LineStart => line_text(record.line_start()),
            Self::LineEnd => line_text(record.line_end()),
            Self::SourceCode => record.source_code_snippet().to_string(),
            Self::TechCriteria => record.tech_criteria().to_string(),
            Self::BusinessCriteria => record.business_criteria().to_string(),
            Self::Status => match record.status() {
                ViolationStatus::Fixed => "Fixed".to_string(),
                ViolationStatus::StillOpen => "Still Open".to_string(),
                ViolationStatus::Unchanged => "Unchanged".to_string(),
            },
        }
    }
}

fn line_text(line: Option<u32>) -> String {
    line.map(|l| l.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
