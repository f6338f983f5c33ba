//! Sync result types.

use serde::Serialize;

/// How a reconciliation pass ended.
///
/// Mirrors a background job's result: `Retry` asks the scheduler to run the
/// pass again later, `Failure` means retrying will not help.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum SyncOutcome {
    Success,
    Retry(String),
    Failure(String),
}

impl SyncOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Counts collected during a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Pending records found at the start of the pass.
    pub pending: usize,
    /// Remote items created.
    pub inserted: usize,
    /// Listed records already present remotely by name.
    pub already_present: usize,
    /// Remote items deleted.
    pub deleted: usize,
    /// Unlisted records with nothing to delete remotely.
    pub already_absent: usize,
    /// Records whose pending flag was cleared.
    pub cleared: usize,
}

impl SyncStats {
    /// Records still pending after the pass.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.pending - self.cleared
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub outcome: SyncOutcome,
    pub stats: SyncStats,
}

/// Snapshot for `sync status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    /// Pending records for the signed-in user.
    pub pending: usize,
    /// Pending records across all cached users.
    pub pending_all_users: usize,
    pub mode: String,
    /// Pending items by name (signed-in user only)
    pub pending_items: Vec<PendingItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingItem {
    pub name: String,
    /// `add` when the item should be on the remote list, `remove` otherwise
    pub action: &'static str,
}
