//! Append-only JSONL run event log.
//!
//! One log per network next to the journal. Best-effort: appending never
//! affects control flow, the journal alone decides resume behavior.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Run event for the JSONL log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DeployEvent {
    RunStarted {
        network: String,
        run_id: String,
        version: String,
    },
    ContractDeployed {
        contract: String,
        address: String,
    },
    ActionExecuted {
        contract: String,
        command: String,
        block: u64,
    },
    VerificationCompleted {
        contract: String,
        address: String,
    },
    VerificationFailed {
        contract: String,
        error: String,
    },
    RunCompleted {
        network: String,
        run_id: String,
        deployed: u32,
        actions_run: u32,
        total_seconds: f64,
    },
}

/// Timestamped event wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedEvent {
    pub ts: String,
    #[serde(flatten)]
    pub event: DeployEvent,
}

/// Generate an ISO 8601 timestamp.
pub fn now_iso8601() -> String {
    // Manual implementation — no chrono dependency
    use std::time::{SystemTime, UNIX_EPOCH};
    let dur = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let secs = dur.as_secs();
    let days = secs / 86400;
    let time_secs = secs % 86400;
    let hours = time_secs / 3600;
    let minutes = (time_secs % 3600) / 60;
    let seconds = time_secs % 60;

    // Days since epoch to Y-M-D (simplified Gregorian)
    let mut y = 1970i64;
    let mut remaining = days as i64;
    loop {
        let year_days = if is_leap(y) { 366 } else { 365 };
        if remaining < year_days {
            break;
        }
        remaining -= year_days;
        y += 1;
    }
    let leap = is_leap(y);
    let month_days = [
        31,
        if leap { 29 } else { 28 },
        31,
        30,
        31,
        30,
        31,
        31,
        30,
        31,
        30,
        31,
    ];
    let mut m = 0;
    for (i, &md) in month_days.iter().enumerate() {
        if remaining < md as i64 {
            m = i + 1;
            break;
        }
        remaining -= md as i64;
    }
    let d = remaining + 1;

    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        y, m, d, hours, minutes, seconds
    )
}

fn is_leap(y: i64) -> bool {
    (y % 4 == 0 && y % 100 != 0) || y % 400 == 0
}

/// Generate a run ID.
pub fn generate_run_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("r-{:012x}", nanos & 0xFFFF_FFFF_FFFF)
}

/// Derive the event log path for a network.
pub fn event_log_path(state_dir: &Path, network: &str) -> PathBuf {
    state_dir.join(format!("{network}.events.jsonl"))
}

/// Append an event to the network's event log.
pub fn append_event(state_dir: &Path, network: &str, event: DeployEvent) -> Result<(), String> {
    let path = event_log_path(state_dir, network);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| format!("cannot create state dir: {}", e))?;
    }

    let te = TimestampedEvent {
        ts: now_iso8601(),
        event,
    };
    let json = serde_json::to_string(&te).map_err(|e| format!("JSON serialize error: {}", e))?;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| format!("cannot open event log {}: {}", path.display(), e))?;

    writeln!(file, "{}", json).map_err(|e| format!("write error: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_now_iso8601() {
        let ts = now_iso8601();
        assert!(ts.starts_with("20"));
        assert!(ts.ends_with('Z'));
        assert!(ts.contains('T'));
    }

    #[test]
    fn test_events_generate_run_id() {
        let id = generate_run_id();
        assert!(id.starts_with("r-"));
        assert!(id.len() > 4);
    }

    #[test]
    fn test_events_log_path() {
        let p = event_log_path(Path::new("/deployments"), "sepolia");
        assert_eq!(p, PathBuf::from("/deployments/sepolia.events.jsonl"));
    }

    #[test]
    fn test_events_append() {
        let dir = tempfile::tempdir().unwrap();
        let event = DeployEvent::ContractDeployed {
            contract: "Registry".to_string(),
            address: "0xabc".to_string(),
        };
        append_event(dir.path(), "testnet", event).unwrap();

        let content =
            std::fs::read_to_string(dir.path().join("testnet.events.jsonl")).unwrap();
        assert!(content.contains("contract_deployed"));
        assert!(content.contains("0xabc"));
    }

    #[test]
    fn test_events_append_multiple() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..3 {
            let event = DeployEvent::ActionExecuted {
                contract: "Vault".to_string(),
                command: format!("step{}", i),
                block: i,
            };
            append_event(dir.path(), "testnet", event).unwrap();
        }
        let content =
            std::fs::read_to_string(dir.path().join("testnet.events.jsonl")).unwrap();
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_events_is_leap() {
        assert!(is_leap(2000));
        assert!(!is_leap(1900));
        assert!(is_leap(2024));
        assert!(!is_leap(2026));
    }
}
