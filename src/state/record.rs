//! Tracking record types
//!
//! A `TrackingRecord` is the persisted document for one tracking domain.
//! Records are decoded from untyped JSON through [`TrackingRecord::decode`],
//! which rejects the whole document if any entry has the wrong shape.

use super::error::{TrackingError, TrackingResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

const LAST_RUN_FIELD: &str = "last_run";
const LAST_CHECKED_FIELD: &str = "last_checked";

/// Which kind of entity a tracking file records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingDomain {
    /// Pull requests, keyed by PR number
    PullRequests,
    /// Branch comparisons, keyed by `target_branch:folder`
    Branches,
}

impl TrackingDomain {
    /// Name of the top-level map holding the entries
    pub fn entries_field(&self) -> &'static str {
        match self {
            TrackingDomain::PullRequests => "prs",
            TrackingDomain::Branches => "branches",
        }
    }

    /// Name of the field carrying the identity token inside each entry
    pub fn identity_field(&self) -> &'static str {
        match self {
            TrackingDomain::PullRequests => "sha",
            TrackingDomain::Branches => "target_sha",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TrackingDomain::PullRequests => "PR",
            TrackingDomain::Branches => "branch",
        }
    }
}

/// Key of one tracked entity inside a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey(String);

impl EntityKey {
    /// Separator between target branch and folder in branch keys
    pub const BRANCH_DELIMITER: char = ':';

    pub fn pull_request(number: u64) -> Self {
        Self(number.to_string())
    }

    /// The same branch compared for two folders yields two distinct keys.
    pub fn branch(target_branch: &str, folder: &str) -> Self {
        Self(format!(
            "{}{}{}",
            target_branch,
            Self::BRANCH_DELIMITER,
            folder
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Last-known observation of one tracked entity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityState {
    /// Opaque version token (commit SHA); the only field compared
    pub identity: String,

    /// Date (YYYY-MM-DD) of the run that recorded `identity`
    pub last_checked: String,

    /// Reporting-only metadata (title, state, branch names, ...)
    pub aux: Map<String, Value>,
}

impl EntityState {
    pub fn new(identity: impl Into<String>, last_checked: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            last_checked: last_checked.into(),
            aux: Map::new(),
        }
    }

    /// Attach a metadata field
    pub fn with_aux(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.aux.insert(key.to_string(), value.into());
        self
    }

    /// Read a string metadata field
    pub fn aux_str(&self, key: &str) -> Option<&str> {
        self.aux.get(key).and_then(Value::as_str)
    }

    /// An entity without identity counts as never checked
    pub fn has_identity(&self) -> bool {
        !self.identity.is_empty()
    }

    fn decode(key: &str, raw: Value, domain: TrackingDomain) -> TrackingResult<Self> {
        let Value::Object(mut fields) = raw else {
            return Err(TrackingError::InvalidStructure(format!(
                "entry '{}' is not an object",
                key
            )));
        };

        let identity_field = domain.identity_field();
        let identity = match fields.remove(identity_field) {
            Some(Value::String(identity)) => identity,
            Some(_) => {
                return Err(TrackingError::InvalidStructure(format!(
                    "entry '{}' has a non-string '{}'",
                    key, identity_field
                )))
            }
            None => {
                return Err(TrackingError::InvalidStructure(format!(
                    "entry '{}' is missing '{}'",
                    key, identity_field
                )))
            }
        };

        let last_checked = match fields.remove(LAST_CHECKED_FIELD) {
            Some(Value::String(date)) => date,
            None | Some(Value::Null) => String::new(),
            Some(other) => other.to_string(),
        };

        Ok(Self {
            identity,
            last_checked,
            aux: fields,
        })
    }

    fn encode(&self, domain: TrackingDomain) -> Value {
        let mut fields = self.aux.clone();
        fields.insert(
            domain.identity_field().to_string(),
            Value::String(self.identity.clone()),
        );
        fields.insert(
            LAST_CHECKED_FIELD.to_string(),
            Value::String(self.last_checked.clone()),
        );
        Value::Object(fields)
    }
}

/// Persisted tracking state for one domain
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackingRecord {
    /// Timestamp of the most recent successful save
    pub last_run: Option<String>,

    /// Entity key -> last observation
    pub entries: BTreeMap<String, EntityState>,
}

impl TrackingRecord {
    /// Record used on first run or after unrecoverable corruption
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &EntityKey) -> Option<&EntityState> {
        self.entries.get(key.as_str())
    }

    /// Insert or replace the state of one entity
    pub fn upsert(&mut self, key: &EntityKey, state: EntityState) {
        self.entries.insert(key.as_str().to_string(), state);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decode a record from parsed JSON, validating its structure
    ///
    /// The document must be an object holding the domain's entries map, and
    /// every entry must be an object with a string identity field. A single
    /// bad entry rejects the whole record.
    pub fn decode(value: Value, domain: TrackingDomain) -> TrackingResult<Self> {
        let Value::Object(mut root) = value else {
            return Err(TrackingError::InvalidStructure(
                "top level is not an object".to_string(),
            ));
        };

        let last_run = match root.remove(LAST_RUN_FIELD) {
            None | Some(Value::Null) => None,
            Some(Value::String(stamp)) => Some(stamp),
            Some(_) => {
                return Err(TrackingError::InvalidStructure(
                    "'last_run' must be a string or null".to_string(),
                ))
            }
        };

        let entries_field = domain.entries_field();
        let raw_entries = match root.remove(entries_field) {
            Some(Value::Object(raw_entries)) => raw_entries,
            Some(_) => {
                return Err(TrackingError::InvalidStructure(format!(
                    "'{}' is not an object",
                    entries_field
                )))
            }
            None => {
                return Err(TrackingError::InvalidStructure(format!(
                    "missing '{}' map",
                    entries_field
                )))
            }
        };

        let mut entries = BTreeMap::new();
        for (key, raw) in raw_entries {
            let state = EntityState::decode(&key, raw, domain)?;
            entries.insert(key, state);
        }

        Ok(Self { last_run, entries })
    }

    /// Encode the record into the on-disk JSON shape
    pub fn encode(&self, domain: TrackingDomain) -> Value {
        let entries: Map<String, Value> = self
            .entries
            .iter()
            .map(|(key, state)| (key.clone(), state.encode(domain)))
            .collect();

        let mut root = Map::new();
        root.insert(
            LAST_RUN_FIELD.to_string(),
            self.last_run.clone().map_or(Value::Null, Value::String),
        );
        root.insert(domain.entries_field().to_string(), Value::Object(entries));
        Value::Object(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_branch_key_combines_target_and_folder() {
        assert_eq!(EntityKey::branch("release", "backend").as_str(), "release:backend");
        assert_ne!(
            EntityKey::branch("release", "backend"),
            EntityKey::branch("release", "frontend")
        );
    }

    #[test]
    fn test_pull_request_key_is_number() {
        assert_eq!(EntityKey::pull_request(42).to_string(), "42");
    }

    #[test]
    fn test_decode_keeps_aux_metadata() {
        let value = json!({
            "last_run": "2024-01-01T09:00:00.000000",
            "prs": {
                "42": {"sha": "aaa", "last_checked": "2024-01-01", "title": "Fix", "state": "pending"}
            }
        });

        let record = TrackingRecord::decode(value, TrackingDomain::PullRequests).unwrap();
        let entry = record.get(&EntityKey::pull_request(42)).unwrap();

        assert_eq!(record.last_run.as_deref(), Some("2024-01-01T09:00:00.000000"));
        assert_eq!(entry.identity, "aaa");
        assert_eq!(entry.last_checked, "2024-01-01");
        assert_eq!(entry.aux_str("title"), Some("Fix"));
        assert!(!entry.aux.contains_key("sha"));
    }

    #[test]
    fn test_decode_rejects_entry_without_identity() {
        let value = json!({
            "last_run": null,
            "prs": {
                "1": {"sha": "aaa"},
                "2": {"last_checked": "2024-01-01"}
            }
        });

        let err = TrackingRecord::decode(value, TrackingDomain::PullRequests).unwrap_err();
        assert!(matches!(err, TrackingError::InvalidStructure(_)));
        assert!(err.to_string().contains("'2'"));
    }

    #[test]
    fn test_decode_uses_domain_identity_field() {
        let value = json!({"branches": {"main:.": {"sha": "aaa"}}});
        assert!(TrackingRecord::decode(value, TrackingDomain::Branches).is_err());

        let value = json!({"branches": {"main:.": {"target_sha": "aaa"}}});
        let record = TrackingRecord::decode(value, TrackingDomain::Branches).unwrap();
        assert_eq!(record.entries["main:."].identity, "aaa");
        assert!(record.last_run.is_none());
    }

    #[test]
    fn test_decode_rejects_wrong_shapes() {
        let cases = [
            json!([]),
            json!({"last_run": null}),
            json!({"prs": []}),
            json!({"prs": {"1": "aaa"}}),
            json!({"prs": {"1": {"sha": 7}}}),
            json!({"last_run": 5, "prs": {}}),
        ];

        for case in cases {
            assert!(
                TrackingRecord::decode(case.clone(), TrackingDomain::PullRequests).is_err(),
                "should reject {}",
                case
            );
        }
    }

    #[test]
    fn test_encode_writes_identity_under_domain_field() {
        let mut record = TrackingRecord::empty();
        record.upsert(
            &EntityKey::branch("develop", "."),
            EntityState::new("bbb", "2024-02-02").with_aux("my_branch", "feature"),
        );

        let value = record.encode(TrackingDomain::Branches);

        assert_eq!(value["last_run"], Value::Null);
        assert_eq!(value["branches"]["develop:."]["target_sha"], "bbb");
        assert_eq!(value["branches"]["develop:."]["last_checked"], "2024-02-02");
        assert_eq!(value["branches"]["develop:."]["my_branch"], "feature");
    }

    #[test]
    fn test_identity_field_wins_over_aux() {
        let state = EntityState::new("real", "2024-01-01").with_aux("sha", "shadow");
        let value = state.encode(TrackingDomain::PullRequests);
        assert_eq!(value["sha"], "real");
    }
}
