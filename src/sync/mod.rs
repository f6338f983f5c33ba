//! Offline-to-remote synchronization.
//!
//! Cache writes made in offline mode set a pending flag on the record. The
//! reconciler pushes those records to the remote store:
//!
//! - **Listed** records become quantity-1 remote items, unless the remote
//!   list already has an item with that name.
//! - **Unlisted** records delete the matching remote item.
//!
//! A pass either clears every pending flag or stops at the first error and
//! asks to be retried. [`SyncWorker`] schedules passes in the background.
//!
//! # Example
//!
//! ```ignore
//! use chomp::sync::{reconcile, SyncOutcome};
//!
//! let report = reconcile(&remote, &mut cache).await;
//! if let SyncOutcome::Retry(reason) = report.outcome {
//!     // try again later
//! }
//! ```

mod reconciler;
mod status;
mod types;
mod worker;

pub use reconciler::{reconcile, Reconciler};
pub use status::{get_sync_status, print_status};
pub use types::{PendingItem, SyncOutcome, SyncReport, SyncStats, SyncStatus};
pub use worker::{
    Connectivity, HttpConnectivity, StaticConnectivity, SyncWorker, WorkerConfig, WorkerHandle,
    WorkerSummary, DEFAULT_POLL_INTERVAL, DEFAULT_RETRY_DELAY,
};

use crate::remote::RemoteStore;
use crate::session::{ReadMode, Session};
use crate::storage::SqliteStorage;
use tracing::info;

/// Switch a session to online mode.
///
/// Pending offline changes are pushed first; the mode only changes when that
/// pass succeeds, so reads never jump to a remote list that is missing them.
pub async fn go_online<R: RemoteStore>(
    remote: &R,
    cache: &mut SqliteStorage,
    session: &mut Session,
) -> SyncReport {
    let report = reconcile(remote, cache).await;
    if report.outcome.is_success() {
        session.mode = ReadMode::Online;
        info!(email = %session.email, "Switched to online mode");
    }
    report
}

/// Switch a session to offline mode.
pub fn go_offline(session: &mut Session) {
    session.mode = ReadMode::Offline;
    info!(email = %session.email, "Switched to offline mode");
}
