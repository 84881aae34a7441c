//! Soft-delete and timestamp metadata shared by every persisted entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle metadata embedded in catalog, promotion and user records.
///
/// Rows are never hard-deleted; removal flips `is_deleted` and stamps
/// `deleted_at`, and a restore clears both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Lifecycle {
    /// Metadata for a record created at `now`.
    pub fn created_at(now: DateTime<Utc>) -> Self {
        Self {
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: None,
        }
    }

    /// Returns true unless the record has been soft-deleted.
    pub fn is_live(&self) -> bool {
        !self.is_deleted
    }

    /// Records a modification.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(now);
    }

    /// Soft-deletes the record.
    pub fn mark_deleted(&mut self, now: DateTime<Utc>) {
        self.is_deleted = true;
        self.deleted_at = Some(now);
        self.touch(now);
    }

    /// Undoes a soft delete.
    pub fn restore(&mut self, now: DateTime<Utc>) {
        self.is_deleted = false;
        self.deleted_at = None;
        self.touch(now);
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::created_at(Utc::now())
    }
}
