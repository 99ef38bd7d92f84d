use serde::Serialize;

/// Largest exit code reported for per-record failures
const MAX_EXIT_CODE: u64 = 100;

/// Counters accumulated over one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    /// Violations visited by the driver
    pub total_processed: u64,
    /// Tickets created
    pub added: u64,
    /// Tickets resolved or closed because CAST reports the violation fixed
    pub closed: u64,
    /// Violations whose tracker round-trip failed
    pub not_added_by_error: u64,
    /// Violations that already had a ticket
    pub not_added_by_exist: u64,
    /// Violations skipped by the priority gate
    pub unprioritized: u64,
}

impl SyncOutcome {
    /// Process exit code: 0 on success, otherwise the failure count (capped)
    pub fn exit_code(&self) -> i32 {
        self.not_added_by_error.min(MAX_EXIT_CODE) as i32
    }

    /// Counter names and values in report order
    pub fn rows(&self) -> [(&'static str, u64); 6] {
        [
            ("Total processed", self.total_processed),
            ("Added", self.added),
            ("Closed", self.closed),
            ("Not added (error)", self.not_added_by_error),
            ("Not added (already exists)", self.not_added_by_exist),
            ("Unprioritized", self.unprioritized),
        ]
    }
}
