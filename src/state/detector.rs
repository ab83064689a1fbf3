//! Change detection against the last recorded identity

use super::record::{EntityKey, TrackingRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an entity is (or is not) re-analyzed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeReason {
    /// Never seen before (or seen without an identity)
    New,
    /// Identity differs from the recorded one
    Updated,
    /// Identity matches the recorded one
    Unchanged,
    /// Force flag set by the caller
    Forced,
    /// Identity could not be determined
    Unknown,
}

impl ChangeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeReason::New => "new",
            ChangeReason::Updated => "updated",
            ChangeReason::Unchanged => "unchanged",
            ChangeReason::Forced => "forced",
            ChangeReason::Unknown => "unknown",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            ChangeReason::New => "🆕",
            ChangeReason::Updated => "🔄",
            ChangeReason::Unchanged => "⏭️",
            ChangeReason::Forced => "🔄",
            ChangeReason::Unknown => "❓",
        }
    }
}

impl fmt::Display for ChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict for one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub changed: bool,
    pub reason: ChangeReason,
    /// Date of the previous check, empty when there is none
    pub last_checked: String,
}

impl Detection {
    pub fn forced() -> Self {
        Self {
            changed: true,
            reason: ChangeReason::Forced,
            last_checked: String::new(),
        }
    }

    pub fn unknown() -> Self {
        Self {
            changed: true,
            reason: ChangeReason::Unknown,
            last_checked: String::new(),
        }
    }
}

/// Compare an observed identity with the one recorded for `key`
///
/// Pure and exact: no normalization of the identity is performed.
pub fn detect(key: &EntityKey, observed: &str, record: &TrackingRecord) -> Detection {
    let Some(stored) = record.get(key).filter(|s| s.has_identity()) else {
        return Detection {
            changed: true,
            reason: ChangeReason::New,
            last_checked: String::new(),
        };
    };

    if stored.identity != observed {
        Detection {
            changed: true,
            reason: ChangeReason::Updated,
            last_checked: stored.last_checked.clone(),
        }
    } else {
        Detection {
            changed: false,
            reason: ChangeReason::Unchanged,
            last_checked: stored.last_checked.clone(),
        }
    }
}

/// Detection with the caller-level overrides applied
///
/// A missing identity always means re-analysis, then `force` bypasses the
/// detector, otherwise [`detect`] decides.
pub fn classify(
    key: &EntityKey,
    observed: Option<&str>,
    force: bool,
    record: &TrackingRecord,
) -> Detection {
    match observed.filter(|id| !id.is_empty()) {
        None => Detection::unknown(),
        Some(_) if force => Detection::forced(),
        Some(identity) => detect(key, identity, record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::record::EntityState;

    fn record_with(key: &EntityKey, sha: &str, date: &str) -> TrackingRecord {
        let mut record = TrackingRecord::empty();
        record.upsert(key, EntityState::new(sha, date));
        record
    }

    #[test]
    fn test_new_entity() {
        let detection = detect(
            &EntityKey::pull_request(1),
            "abc123",
            &TrackingRecord::empty(),
        );

        assert_eq!(
            detection,
            Detection {
                changed: true,
                reason: ChangeReason::New,
                last_checked: String::new()
            }
        );
    }

    #[test]
    fn test_updated_entity() {
        let key = EntityKey::pull_request(42);
        let record = record_with(&key, "aaa", "2024-01-01");

        let detection = detect(&key, "bbb", &record);

        assert!(detection.changed);
        assert_eq!(detection.reason, ChangeReason::Updated);
        assert_eq!(detection.last_checked, "2024-01-01");
    }

    #[test]
    fn test_unchanged_is_idempotent() {
        let key = EntityKey::pull_request(42);
        let record = record_with(&key, "aaa", "2024-01-01");

        for _ in 0..3 {
            let detection = detect(&key, "aaa", &record);
            assert!(!detection.changed);
            assert_eq!(detection.reason, ChangeReason::Unchanged);
            assert_eq!(detection.last_checked, "2024-01-01");
        }
    }

    #[test]
    fn test_empty_identity_counts_as_new() {
        let key = EntityKey::pull_request(9);
        let record = record_with(&key, "", "2024-01-01");

        assert_eq!(detect(&key, "", &record).reason, ChangeReason::New);
        assert_eq!(detect(&key, "aaa", &record).reason, ChangeReason::New);
    }

    #[test]
    fn test_comparison_is_exact() {
        let key = EntityKey::pull_request(3);
        let record = record_with(&key, "ABC", "2024-01-01");

        assert_eq!(detect(&key, "abc", &record).reason, ChangeReason::Updated);
        assert_eq!(detect(&key, "ABC ", &record).reason, ChangeReason::Updated);
    }

    #[test]
    fn test_force_bypasses_detector() {
        let key = EntityKey::pull_request(42);
        let record = record_with(&key, "aaa", "2024-01-01");

        let detection = classify(&key, Some("aaa"), true, &record);

        assert_eq!(detection, Detection::forced());
    }

    #[test]
    fn test_missing_identity_is_unknown() {
        let key = EntityKey::pull_request(42);
        let record = record_with(&key, "aaa", "2024-01-01");

        assert_eq!(classify(&key, None, false, &record), Detection::unknown());
        assert_eq!(classify(&key, Some(""), true, &record), Detection::unknown());
    }

    #[test]
    fn test_composite_keys_are_independent() {
        let backend = EntityKey::branch("release", "backend");
        let frontend = EntityKey::branch("release", "frontend");
        let mut record = TrackingRecord::empty();
        record.upsert(&backend, EntityState::new("aaa", "2024-01-01"));
        record.upsert(&frontend, EntityState::new("aaa", "2024-01-01"));

        record.upsert(&backend, EntityState::new("bbb", "2024-01-02"));

        assert_eq!(detect(&backend, "bbb", &record).reason, ChangeReason::Unchanged);
        assert_eq!(detect(&frontend, "aaa", &record).reason, ChangeReason::Unchanged);
        assert_eq!(detect(&frontend, "bbb", &record).reason, ChangeReason::Updated);
    }

    #[test]
    fn test_reason_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ChangeReason::Forced).unwrap(),
            "\"forced\""
        );
    }
}
