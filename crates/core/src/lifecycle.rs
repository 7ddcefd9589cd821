//! Record lifecycle (soft delete).

use serde::{Deserialize, Serialize};

/// Whether a record is live or has been soft-retired.
///
/// Retired records stay readable but are excluded from default listings and
/// refuse new business.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordStatus {
    #[default]
    Active,
    Retired,
}

impl RecordStatus {
    pub fn is_active(self) -> bool {
        self == RecordStatus::Active
    }
}
