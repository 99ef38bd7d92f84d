use super::outcome::SyncOutcome;
use serde::Serialize;
use tracing::info;

/// End-of-run report: the six counters plus what happened before the driver ran
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    #[serde(flatten)]
    pub outcome: SyncOutcome,
    /// Violations replaced by a later one with the same fingerprint
    pub fingerprint_collisions: usize,
    /// Violations dropped because their fingerprint could not be computed
    pub fingerprint_failures: usize,
    pub dry_run: bool,
}

/// Format the summary as a Markdown table
pub fn format_summary_markdown(summary: &Summary) -> String {
    let mut output = String::from("# CAST synchronization summary\n\n");
    if summary.dry_run {
        output.push_str("_Dry run: no tracker calls were made._\n\n");
    }
    output.push_str("| Counter | Value |\n|---|---|\n");
    for (name, value) in summary.outcome.rows() {
        output.push_str(&format!("| {} | {} |\n", name, value));
    }
    output.push_str(&format!(
        "| Fingerprint collisions | {} |\n",
        summary.fingerprint_collisions
    ));
    output.push_str(&format!(
        "| Fingerprint failures | {} |\n",
        summary.fingerprint_failures
    ));
    output
}

pub fn log_summary(summary: &Summary) {
    info!("Synchronization summary:");
    for (name, value) in summary.outcome.rows() {
        info!("  {}: {}", name, value);
    }
    if summary.fingerprint_collisions > 0 || summary.fingerprint_failures > 0 {
        info!(
            "  Fingerprint collisions: {}, failures: {}",
            summary.fingerprint_collisions, summary.fingerprint_failures
        );
    }
}

/// Write the summary to a `.json` or `.md` file
pub fn write_output(path: &str, summary: &Summary) -> anyhow::Result<()> {
    let content = if path.ends_with(".json") {
        serde_json::to_string_pretty(summary)?
    } else if path.ends_with(".md") {
        format_summary_markdown(summary)
    } else {
        anyhow::bail!("Output file must end with .md or .json");
    };

    std::fs::write(path, content)?;
    info!("Summary written to {}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> Summary {
        Summary {
            outcome: SyncOutcome {
                total_processed: 4,
                added: 1,
                closed: 1,
                not_added_by_error: 0,
                not_added_by_exist: 2,
                unprioritized: 1,
            },
            fingerprint_collisions: 1,
            fingerprint_failures: 0,
            dry_run: false,
        }
    }

    #[test]
    fn test_markdown_lists_all_counters() {
        let md = format_summary_markdown(&summary());
        assert!(md.contains("| Total processed | 4 |"));
        assert!(md.contains("| Not added (already exists) | 2 |"));
        assert!(md.contains("| Fingerprint collisions | 1 |"));
        assert!(!md.contains("Dry run"));
    }

    #[test]
    fn test_write_json_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        write_output(path.to_str().unwrap(), &summary()).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["added"], 1);
        assert_eq!(json["fingerprintCollisions"], 1);
        assert_eq!(json["dryRun"], false);
    }

    #[test]
    fn test_write_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.txt");
        assert!(write_output(path.to_str().unwrap(), &summary()).is_err());
    }
}
