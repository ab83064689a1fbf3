//! TrackingStore - crash-safe persistence of tracking records
//!
//! Every save copies the current file to `<file>.backup` and then replaces
//! the primary through a same-directory temp file, so a reader only ever
//! sees complete content. Loading falls back to the backup, then to an
//! empty record, and never fails.

use super::error::{TrackingError, TrackingResult};
use super::record::{TrackingDomain, TrackingRecord};
use chrono::{DateTime, SecondsFormat, Utc};
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const BACKUP_SUFFIX: &str = ".backup";

/// How a record was obtained by [`TrackingStore::load`]
#[derive(Debug)]
pub enum LoadOutcome {
    /// Neither the file nor its backup exist (first run)
    Fresh,
    /// The primary file was valid
    Loaded,
    /// The primary was unusable and the backup was used instead
    RecoveredFromBackup {
        primary: TrackingError,
        /// Whether the backup was copied back over the primary
        restored: bool,
    },
    /// Primary and backup were both unusable; prior tracking is lost
    Reset {
        primary: TrackingError,
        backup: TrackingError,
    },
}

impl LoadOutcome {
    /// True when tracking history had to be discarded
    pub fn lost_history(&self) -> bool {
        matches!(self, LoadOutcome::Reset { .. })
    }
}

/// Result of a load: always a usable record
#[derive(Debug)]
pub struct LoadReport {
    pub record: TrackingRecord,
    pub outcome: LoadOutcome,
}

/// Result of a successful save
#[derive(Debug)]
pub struct SaveReport {
    /// The timestamp written to `last_run`
    pub last_run: String,
    /// Set when the previous file could not be copied to the backup
    pub backup_error: Option<std::io::Error>,
}

/// Load/save access to one tracking file and its backup
#[derive(Debug, Clone)]
pub struct TrackingStore {
    path: PathBuf,
    domain: TrackingDomain,
}

impl TrackingStore {
    pub fn new(path: impl Into<PathBuf>, domain: TrackingDomain) -> Self {
        Self {
            path: path.into(),
            domain,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn domain(&self) -> TrackingDomain {
        self.domain
    }

    /// Sibling file holding the previous generation (`<file>.backup`)
    pub fn backup_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(BACKUP_SUFFIX);
        PathBuf::from(name)
    }

    /// Load the record, recovering from the backup when the primary is bad
    ///
    /// A usable backup is also copied back over the primary.
    pub fn load(&self) -> LoadReport {
        self.load_with(true)
    }

    /// Same fallback as [`load`](Self::load), but never writes; a backup
    /// that would be restored is only reported with `restored: false`
    pub fn read(&self) -> LoadReport {
        self.load_with(false)
    }

    fn load_with(&self, restore: bool) -> LoadReport {
        let backup_path = self.backup_path();

        if !self.path.exists() && !backup_path.exists() {
            return LoadReport {
                record: TrackingRecord::empty(),
                outcome: LoadOutcome::Fresh,
            };
        }

        let primary = match read_record(&self.path, self.domain) {
            Ok(record) => {
                return LoadReport {
                    record,
                    outcome: LoadOutcome::Loaded,
                }
            }
            Err(e) => e,
        };
        log::debug!(
            "{} tracking file {} {}, trying backup",
            self.domain.label(),
            self.path.display(),
            primary.kind()
        );

        match read_record(&backup_path, self.domain) {
            Ok(record) => {
                // Best effort: the restored primary is not re-read.
                let restored = restore
                    && match fs::copy(&backup_path, &self.path) {
                        Ok(_) => true,
                        Err(e) => {
                            log::debug!("could not restore {}: {}", self.path.display(), e);
                            false
                        }
                    };
                LoadReport {
                    record,
                    outcome: LoadOutcome::RecoveredFromBackup { primary, restored },
                }
            }
            Err(backup) => LoadReport {
                record: TrackingRecord::empty(),
                outcome: LoadOutcome::Reset { primary, backup },
            },
        }
    }

    /// Stamp `last_run` and atomically write the record
    ///
    /// A failure to refresh the backup is reported in the returned
    /// [`SaveReport`]; a failure to write the new content is returned as an
    /// error and leaves no temp file behind.
    pub fn save(&self, record: &mut TrackingRecord) -> TrackingResult<SaveReport> {
        let last_run = next_last_run(record.last_run.as_deref(), Utc::now());
        record.last_run = Some(last_run.clone());

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let backup_error = if self.path.exists() {
            fs::copy(&self.path, self.backup_path()).err()
        } else {
            None
        };

        let content = serde_json::to_string_pretty(&record.encode(self.domain))?;

        // Temp file must live next to the target so the rename stays on one filesystem.
        let mut temp_file = tempfile::Builder::new()
            .prefix(&self.temp_prefix())
            .suffix(".tmp")
            .tempfile_in(&parent)?;
        temp_file.write_all(content.as_bytes())?;
        temp_file.flush()?;
        temp_file.as_file().sync_all()?;

        temp_file
            .persist(&self.path)
            .map_err(|e| TrackingError::Persist {
                path: self.path.clone(),
                source: e.error,
            })?;

        Ok(SaveReport {
            last_run,
            backup_error,
        })
    }

    fn temp_prefix(&self) -> String {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "tracking".to_string());
        format!(".{}-", stem)
    }
}

/// Read, parse and validate one tracking file
fn read_record(path: &Path, domain: TrackingDomain) -> TrackingResult<TrackingRecord> {
    if !path.exists() {
        return Err(TrackingError::Missing(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    TrackingRecord::decode(value, domain)
}

/// Never go backwards, even if the clock did
fn next_last_run(previous: Option<&str>, now: DateTime<Utc>) -> String {
    let stamp = previous
        .and_then(|p| DateTime::parse_from_rfc3339(p).ok())
        .map(|p| p.with_timezone(&Utc))
        .filter(|p| *p > now)
        .unwrap_or(now);
    stamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}
