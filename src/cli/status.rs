use super::load_context;
use super::report::short_sha;
use crate::state::{LoadOutcome, TrackingStore};
use crate::Result;
use colored::Colorize;
use serde_json::{json, Value};

/// Print the PR and branch tracking records
///
/// Read-only: a corrupt primary is shown from its backup but not restored.
pub async fn run(json: bool) -> Result<()> {
    let (_git, ctx) = load_context(None)?;
    let stores = [ctx.pr_tracking_store(), ctx.branch_tracking_store()];

    if json {
        let documents: Vec<Value> = stores.iter().map(status_json).collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "pr_tracking": documents[0],
                "branch_tracking": documents[1],
            }))?
        );
        return Ok(());
    }

    for store in &stores {
        print_store(store);
        println!();
    }
    Ok(())
}

fn outcome_label(outcome: &LoadOutcome) -> &'static str {
    match outcome {
        LoadOutcome::Fresh => "fresh",
        LoadOutcome::Loaded => "loaded",
        LoadOutcome::RecoveredFromBackup { .. } => "recovered_from_backup",
        LoadOutcome::Reset { .. } => "reset",
    }
}

fn status_json(store: &TrackingStore) -> Value {
    let report = store.read();
    json!({
        "path": store.path().display().to_string(),
        "load": outcome_label(&report.outcome),
        "record": report.record.encode(store.domain()),
    })
}

fn print_store(store: &TrackingStore) {
    let domain = store.domain();
    let report = store.read();
    let record = &report.record;

    println!(
        "{}",
        format!("{} tracking: {}", domain.label(), store.path().display())
            .cyan()
            .bold()
    );

    match &report.outcome {
        LoadOutcome::Fresh => {
            println!("{}", "   No tracking data yet".yellow());
            return;
        }
        LoadOutcome::RecoveredFromBackup { primary, .. } => println!(
            "{}",
            format!("   ⚠ Tracking file {}, showing backup", primary.kind()).yellow()
        ),
        LoadOutcome::Reset { primary, backup } => println!(
            "{}",
            format!(
                "   ⚠ Tracking file {} and backup {}, nothing usable",
                primary.kind(),
                backup.kind()
            )
            .red()
        ),
        LoadOutcome::Loaded => {}
    }

    println!(
        "   Last run: {}",
        record.last_run.as_deref().unwrap_or("never")
    );
    println!("   Entries:  {}", record.len());

    for (key, state) in &record.entries {
        let detail = state
            .aux_str("title")
            .or_else(|| state.aux_str("my_branch"))
            .unwrap_or("");
        println!(
            "   • {:<24} {}  {}  {}",
            key,
            short_sha(&state.identity).bright_black(),
            if state.last_checked.is_empty() {
                "-"
            } else {
                state.last_checked.as_str()
            },
            detail
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{EntityKey, EntityState, TrackingDomain, TrackingRecord};
    use tempfile::TempDir;

    #[test]
    fn test_status_json_reports_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = TrackingStore::new(
            temp_dir.path().join("branch-tracking.json"),
            TrackingDomain::Branches,
        );
        let mut record = TrackingRecord::empty();
        record.upsert(
            &EntityKey::branch("develop", "api"),
            EntityState::new("abc123", "2024-04-01").with_aux("my_branch", "feature"),
        );
        store.save(&mut record).unwrap();

        let value = status_json(&store);

        assert_eq!(value["load"], "loaded");
        assert_eq!(value["record"]["branches"]["develop:api"]["target_sha"], "abc123");
        assert!(value["record"]["last_run"].is_string());
    }

    #[test]
    fn test_status_json_without_file_is_fresh() {
        let temp_dir = TempDir::new().unwrap();
        let store = TrackingStore::new(
            temp_dir.path().join("pr-tracking.json"),
            TrackingDomain::PullRequests,
        );

        let value = status_json(&store);

        assert_eq!(value["load"], "fresh");
        assert_eq!(value["record"]["prs"], json!({}));
    }

    #[test]
    fn test_status_json_leaves_corrupt_primary_alone() {
        let temp_dir = TempDir::new().unwrap();
        let store = TrackingStore::new(
            temp_dir.path().join("pr-tracking.json"),
            TrackingDomain::PullRequests,
        );
        let mut record = TrackingRecord::empty();
        record.upsert(&EntityKey::pull_request(5), EntityState::new("aaa", "2024-04-01"));
        store.save(&mut record).unwrap();
        store.save(&mut record).unwrap();
        std::fs::write(store.path(), "not json").unwrap();

        let value = status_json(&store);

        assert_eq!(value["load"], "recovered_from_backup");
        assert_eq!(value["record"]["prs"]["5"]["sha"], "aaa");
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "not json");
    }
}
