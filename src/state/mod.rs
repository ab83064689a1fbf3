//! Tracking state module
//!
//! Persists the last-seen identity of every tracked entity between runs:
//! - Record types and structural validation
//! - Crash-safe load/save with backup recovery
//! - Change detection (new / updated / unchanged)

mod detector;
mod error;
mod record;
mod store;

pub use detector::{classify, detect, ChangeReason, Detection};
pub use error::{TrackingError, TrackingResult};
pub use record::{EntityKey, EntityState, TrackingDomain, TrackingRecord};
pub use store::{LoadOutcome, LoadReport, SaveReport, TrackingStore};
