//! Background sync worker.
//!
//! Runs reconciliation passes whenever the network is up. A pass that ends in
//! `Retry` is rescheduled after a fixed delay; `Failure` stops the worker.

use crate::error::{Error, Result};
use crate::remote::RemoteStore;
use crate::storage::SqliteStorage;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::reconciler::reconcile;
use super::types::{SyncOutcome, SyncReport};

/// Default delay before retrying a pass that asked for a retry.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Default interval between checks when idle or offline.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Network reachability check.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> impl Future<Output = bool> + Send;
}

/// Connectivity fixed by the caller.
#[derive(Debug)]
pub struct StaticConnectivity(AtomicBool);

impl StaticConnectivity {
    #[must_use]
    pub fn new(online: bool) -> Self {
        Self(AtomicBool::new(online))
    }

    pub fn set(&self, online: bool) {
        self.0.store(online, Ordering::SeqCst);
    }
}

impl Connectivity for StaticConnectivity {
    async fn is_online(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl<C: Connectivity> Connectivity for Arc<C> {
    fn is_online(&self) -> impl Future<Output = bool> + Send {
        (**self).is_online()
    }
}

/// Online when an HTTP request to the probe URL gets any response.
pub struct HttpConnectivity {
    client: reqwest::Client,
    url: String,
}

impl HttpConnectivity {
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
        }
    }
}

impl Connectivity for HttpConnectivity {
    async fn is_online(&self) -> bool {
        self.client
            .head(&self.url)
            .timeout(Duration::from_secs(3))
            .send()
            .await
            .is_ok()
    }
}

/// Worker timing and stop conditions.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub retry_delay: Duration,
    pub poll_interval: Duration,
    /// Return after a successful pass leaves nothing pending.
    pub stop_when_idle: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            retry_delay: DEFAULT_RETRY_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            stop_when_idle: false,
        }
    }
}

/// What a worker did before it stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkerSummary {
    pub passes: usize,
    pub retries: usize,
    pub cleared: usize,
    pub last_outcome: Option<SyncOutcome>,
}

impl WorkerSummary {
    fn record(&mut self, report: &SyncReport) {
        self.passes += 1;
        self.cleared += report.stats.cleared;
        if matches!(report.outcome, SyncOutcome::Retry(_)) {
            self.retries += 1;
        }
        self.last_outcome = Some(report.outcome.clone());
    }
}

/// Periodic reconciler.
pub struct SyncWorker<R, C> {
    remote: Arc<R>,
    cache: SqliteStorage,
    connectivity: C,
    config: WorkerConfig,
}

impl<R, C> SyncWorker<R, C>
where
    R: RemoteStore + 'static,
    C: Connectivity + 'static,
{
    pub fn new(remote: Arc<R>, cache: SqliteStorage, connectivity: C, config: WorkerConfig) -> Self {
        Self {
            remote,
            cache,
            connectivity,
            config,
        }
    }

    /// Run until shutdown is signalled, a pass fails, or (with
    /// `stop_when_idle`) nothing is left to push.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> WorkerSummary {
        let mut summary = WorkerSummary::default();
        info!(
            retry_delay_ms = self.config.retry_delay.as_millis(),
            poll_interval_ms = self.config.poll_interval.as_millis(),
            "Sync worker started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            if !self.connectivity.is_online().await {
                debug!("Offline, waiting for network");
                if wait(self.config.poll_interval, &mut shutdown).await {
                    break;
                }
                continue;
            }

            let report = reconcile(&*self.remote, &mut self.cache).await;
            summary.record(&report);

            let delay = match &report.outcome {
                SyncOutcome::Success => {
                    if self.config.stop_when_idle && self.is_idle() {
                        break;
                    }
                    self.config.poll_interval
                }
                SyncOutcome::Retry(reason) => {
                    warn!(reason = %reason, delay_ms = self.config.retry_delay.as_millis(), "Sync will retry");
                    self.config.retry_delay
                }
                SyncOutcome::Failure(reason) => {
                    error!(reason = %reason, "Sync failed; worker stopping");
                    break;
                }
            };

            if wait(delay, &mut shutdown).await {
                break;
            }
        }

        info!(passes = summary.passes, cleared = summary.cleared, "Sync worker stopped");
        summary
    }

    fn is_idle(&self) -> bool {
        match self.cache.count_pending_sync(None) {
            Ok(count) => count == 0,
            Err(e) => {
                warn!(error = %e, "Could not count pending records");
                false
            }
        }
    }

    /// Run on the tokio runtime in the background.
    pub fn spawn(self) -> WorkerHandle {
        let (shutdown, receiver) = watch::channel(false);
        let join = tokio::spawn(self.run(receiver));
        WorkerHandle { shutdown, join }
    }
}

/// Sleep for `delay`; returns `true` if shutdown was requested meanwhile.
async fn wait(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        () = tokio::time::sleep(delay) => false,
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
    }
}

/// Handle to a spawned [`SyncWorker`].
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<WorkerSummary>,
}

impl WorkerHandle {
    /// Ask the worker to stop and wait for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker task panicked.
    pub async fn stop(self) -> Result<WorkerSummary> {
        self.shutdown.send_replace(true);
        self.wait().await
    }

    /// Wait for the worker to stop on its own.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker task panicked.
    pub async fn wait(self) -> Result<WorkerSummary> {
        self.join
            .await
            .map_err(|e| Error::Other(format!("sync worker task failed: {e}")))
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::register;
    use crate::model::Product;
    use crate::remote::MemoryRemote;

    fn fast_config() -> WorkerConfig {
        WorkerConfig {
            retry_delay: Duration::from_millis(10),
            poll_interval: Duration::from_millis(10),
            stop_when_idle: true,
        }
    }

    async fn setup(names: &[&str]) -> (Arc<MemoryRemote>, SqliteStorage, crate::session::Session) {
        let remote = Arc::new(MemoryRemote::new());
        let session = register(&*remote, "a@example.com", "hunter22", "hunter22")
            .await
            .unwrap();
        let mut cache = SqliteStorage::open_memory().unwrap();
        for name in names {
            cache
                .mark_listed(session.cache_user(), &Product::new(*name, "1.00"), "s")
                .unwrap();
        }
        (remote, cache, session)
    }

    #[tokio::test]
    async fn test_worker_drains_pending_and_stops_when_idle() {
        let (remote, cache, session) = setup(&["A", "B"]).await;
        let worker = SyncWorker::new(remote.clone(), cache, StaticConnectivity::new(true), fast_config());

        let summary = worker.spawn().wait().await.unwrap();
        assert_eq!(summary.passes, 1);
        assert_eq!(summary.cleared, 2);
        assert_eq!(summary.last_outcome, Some(SyncOutcome::Success));
        assert_eq!(remote.query_items(&session.list_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_worker_retries_until_remote_recovers() {
        let (remote, cache, session) = setup(&["A"]).await;
        remote.set_available(false);
        let handle = SyncWorker::new(remote.clone(), cache, StaticConnectivity::new(true), fast_config()).spawn();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());
        remote.set_available(true);

        let summary = handle.wait().await.unwrap();
        assert!(summary.retries >= 1);
        assert_eq!(summary.cleared, 1);
        assert_eq!(remote.query_items(&session.list_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_worker_waits_for_network() {
        let (remote, cache, _) = setup(&["A"]).await;
        let connectivity = Arc::new(StaticConnectivity::new(false));
        let calls_before = remote.call_count();
        let handle = SyncWorker::new(remote.clone(), cache, connectivity.clone(), fast_config()).spawn();

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(remote.call_count(), calls_before);

        connectivity.set(true);
        let summary = handle.wait().await.unwrap();
        assert_eq!(summary.cleared, 1);
    }

    #[tokio::test]
    async fn test_worker_stops_on_shutdown() {
        let (remote, cache, _) = setup(&[]).await;
        let config = WorkerConfig {
            stop_when_idle: false,
            ..fast_config()
        };
        let handle = SyncWorker::new(remote, cache, StaticConnectivity::new(true), config).spawn();

        tokio::time::sleep(Duration::from_millis(30)).await;
        let summary = handle.stop().await.unwrap();
        assert!(summary.passes >= 1);
        assert_eq!(summary.cleared, 0);
    }
}
