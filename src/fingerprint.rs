use crate::error::FingerprintError;
use crate::violation::ViolationRecord;
use chrono::NaiveDateTime;
use tracing::trace;

/// Timestamp format used by the extraction layer for action and snapshot dates
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Action plan entries dated before this use the legacy identity composition
pub const CUTOVER: &str = "2020-01-01 00:00:00";

/// Compute the CRC-32 identity of a violation.
///
/// Entries whose action date is before [`CUTOVER`] hash
/// priority, action date, user, object name and rule description; later ones hash
/// first snapshot date, object id and metric id.
pub fn fingerprint(record: &ViolationRecord) -> Result<u32, FingerprintError> {
    let canonical = canonical_string(record)?;
    let checksum = crc32fast::hash(canonical.as_bytes());
    trace!("Fingerprint {} for '{}'", checksum, canonical);
    Ok(checksum)
}

fn canonical_string(record: &ViolationRecord) -> Result<String, FingerprintError> {
    let action_date = parse_date(record.action_date())?;
    let cutover = parse_date(CUTOVER)?;

    if action_date < cutover {
        Ok(format!(
            "{}{}{}{}{}",
            record.priority(),
            record.action_date(),
            record.action_defined_by_user(),
            record.object_full_name(),
            record.metric_short_description()
        ))
    } else {
        Ok(format!(
            "{}{}{}",
            record.first_snapshot_date(),
            record.object_id(),
            record.metric_id()
        ))
    }
}

fn parse_date(value: &str) -> Result<NaiveDateTime, FingerprintError> {
    NaiveDateTime::parse_from_str(value, DATE_FORMAT).map_err(|source| {
        FingerprintError::Timestamp {
            value: value.to_string(),
            source,
        }
    })
}

/// Text written into a ticket description and searched for to find it again
pub fn identity_token(fingerprint: u32, project_key: &str) -> String {
    format!("CAST-{}-{}", fingerprint, project_key)
}
