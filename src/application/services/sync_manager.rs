use crate::application::ports::{
    LocalStore, MutationQueue, RemoteApi, RemoteError, SyncStatusStore,
};
use crate::application::services::connectivity::Connectivity;
use crate::domain::entities::{
    CollectionRefresh, ConfirmedMutation, DrainReport, PurgeReport, QueueEntry, Record,
    RejectedMutation, SyncReport,
};
use crate::domain::value_objects::{Collection, QueueEntryId};
use crate::shared::config::SyncConfig;
use crate::shared::error::AppError;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify, RwLock, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Syncing,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    Timer,
    Reconnect,
    Manual,
}

impl SyncTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTrigger::Timer => "timer",
            SyncTrigger::Reconnect => "reconnect",
            SyncTrigger::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Completed(SyncReport),
    /// Nothing was queued; no request was made and no state changed.
    NothingToSync,
    /// Another pass was already running.
    Skipped,
    /// Not attempted while offline.
    Offline,
}

#[derive(Debug, Clone)]
pub enum SyncEvent {
    StateChanged(SyncState),
    Completed(SyncReport),
    /// Server changes pulled outside a pass.
    Refreshed(Vec<CollectionRefresh>),
    Failed(String),
    EntryRejected(RejectedMutation),
    EntriesDiscarded(Vec<QueueEntryId>),
}

struct Worker {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Drains the mutation queue against the remote API and refreshes local collections.
///
/// Passes are serialized by `gate`; a trigger that finds it held is skipped rather
/// than queued.
pub struct SyncManager {
    store: Arc<dyn LocalStore>,
    queue: Arc<dyn MutationQueue>,
    statuses: Arc<dyn SyncStatusStore>,
    remote: Arc<dyn RemoteApi>,
    connectivity: Connectivity,
    config: SyncConfig,
    state: RwLock<SyncState>,
    gate: Mutex<()>,
    wake: Notify,
    events: broadcast::Sender<SyncEvent>,
    worker: Mutex<Option<Worker>>,
}

impl SyncManager {
    pub fn new(
        store: Arc<dyn LocalStore>,
        queue: Arc<dyn MutationQueue>,
        statuses: Arc<dyn SyncStatusStore>,
        remote: Arc<dyn RemoteApi>,
        connectivity: Connectivity,
        config: SyncConfig,
    ) -> Arc<Self> {
        let initial = if connectivity.is_online() {
            SyncState::Idle
        } else {
            SyncState::Offline
        };
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            store,
            queue,
            statuses,
            remote,
            connectivity,
            config,
            state: RwLock::new(initial),
            gate: Mutex::new(()),
            wake: Notify::new(),
            events,
            worker: Mutex::new(None),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    pub async fn state(&self) -> SyncState {
        *self.state.read().await
    }

    pub async fn is_running(&self) -> bool {
        self.worker.lock().await.is_some()
    }

    /// Spawn the background loop. Calling it twice is a no-op.
    pub async fn start(self: &Arc<Self>) {
        let mut worker = self.worker.lock().await;
        if worker.is_some() {
            return;
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        // Subscribe before spawning so a transition right after start() is not missed.
        let mut online_rx = self.connectivity.subscribe();
        let was_online = *online_rx.borrow_and_update();
        if was_online {
            self.leave_offline().await;
        } else {
            self.set_state(SyncState::Offline).await;
        }
        let manager = Arc::clone(self);
        let handle = tokio::spawn(async move {
            manager.run_loop(shutdown_rx, online_rx, was_online).await;
        });
        *worker = Some(Worker { shutdown, handle });

        tracing::info!(
            target: "offline::sync",
            interval_secs = self.config.sync_interval,
            auto_sync = self.config.auto_sync,
            "sync manager started"
        );
    }

    /// Stop the background loop, letting an in-flight pass finish first.
    pub async fn stop(&self) {
        let worker = self.worker.lock().await.take();
        let Some(worker) = worker else {
            return;
        };

        let _ = worker.shutdown.send(true);
        if let Err(err) = worker.handle.await {
            tracing::warn!(target: "offline::sync", error = %err, "sync loop ended abnormally");
        }
        tracing::info!(target: "offline::sync", "sync manager stopped");
    }

    /// Ask the background loop to run a pass without waiting for it.
    pub fn request_sync(&self) {
        self.wake.notify_one();
    }

    /// Run one pass on the caller's task.
    pub async fn sync_now(&self) -> Result<SyncOutcome, AppError> {
        self.run_pass(SyncTrigger::Manual).await
    }

    /// Submit every pending entry once, in order. An empty queue is a no-op.
    pub async fn drain_queue(&self) -> Result<DrainReport, AppError> {
        let _guard = self.gate.lock().await;
        self.drain_pending().await
    }

    /// Pull server changes for every collection, independent of the queue.
    pub async fn refresh(&self) -> Vec<CollectionRefresh> {
        let _guard = self.gate.lock().await;
        let refreshed = self.refresh_collections(Utc::now()).await;
        self.publish(SyncEvent::Refreshed(refreshed.clone()));
        refreshed
    }

    async fn run_loop(
        self: Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
        mut online: watch::Receiver<bool>,
        mut was_online: bool,
    ) {
        let period = Duration::from_secs(self.config.sync_interval.max(1));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // First tick fires immediately so a started manager pulls right away.
        let background_refresh = self.config.auto_sync && self.config.refresh_interval > 0;
        let mut refresher =
            tokio::time::interval(Duration::from_secs(self.config.refresh_interval.max(1)));
        refresher.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick(), if self.config.auto_sync => {
                    if self.connectivity.is_online() {
                        self.run_scheduled(SyncTrigger::Timer).await;
                    }
                }
                _ = refresher.tick(), if background_refresh => {
                    if self.connectivity.is_online() {
                        self.run_scheduled_refresh().await;
                    }
                }
                _ = self.wake.notified() => {
                    self.run_scheduled(SyncTrigger::Manual).await;
                }
                changed = online.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let now_online = *online.borrow_and_update();
                    if now_online == was_online {
                        continue;
                    }
                    was_online = now_online;
                    if now_online {
                        self.leave_offline().await;
                        if let Ok(SyncOutcome::NothingToSync) =
                            self.run_pass(SyncTrigger::Reconnect).await
                        {
                            self.run_scheduled_refresh().await;
                        }
                    } else {
                        self.set_state(SyncState::Offline).await;
                    }
                }
            }
        }
    }

    async fn run_scheduled(&self, trigger: SyncTrigger) {
        // Failures are already logged and published by run_pass.
        let _ = self.run_pass(trigger).await;
    }

    /// Pull server changes unless a pass holds the gate; that pass pulls anyway.
    async fn run_scheduled_refresh(&self) {
        let Ok(_guard) = self.gate.try_lock() else {
            return;
        };
        let refreshed = self.refresh_collections(Utc::now()).await;
        self.publish(SyncEvent::Refreshed(refreshed));
    }

    async fn run_pass(&self, trigger: SyncTrigger) -> Result<SyncOutcome, AppError> {
        if !self.connectivity.is_online() {
            tracing::debug!(
                target: "offline::sync",
                trigger = trigger.as_str(),
                "offline; sync pass not attempted"
            );
            self.set_state(SyncState::Offline).await;
            return Ok(SyncOutcome::Offline);
        }

        let Ok(_guard) = self.gate.try_lock() else {
            tracing::debug!(
                target: "offline::sync",
                trigger = trigger.as_str(),
                "sync pass already running; trigger suppressed"
            );
            return Ok(SyncOutcome::Skipped);
        };

        let started_at = Utc::now();
        let (purged, pending) = match self.prepare_pass().await {
            Ok(prepared) => prepared,
            Err(err) => return Err(self.fail_pass(trigger, err)),
        };
        if pending.is_empty() && purged.stale_discarded.is_empty() {
            tracing::debug!(
                target: "offline::sync",
                trigger = trigger.as_str(),
                "queue empty; nothing to sync"
            );
            return Ok(SyncOutcome::NothingToSync);
        }

        self.set_state(SyncState::Syncing).await;
        tracing::debug!(
            target: "offline::sync",
            trigger = trigger.as_str(),
            pending = pending.len(),
            "sync pass started"
        );

        let result = self.execute_pass(started_at, purged, pending).await;

        let settled = if self.connectivity.is_online() {
            SyncState::Idle
        } else {
            SyncState::Offline
        };
        self.set_state(settled).await;

        match result {
            Ok(report) => {
                tracing::info!(
                    target: "offline::sync",
                    trigger = trigger.as_str(),
                    synced = report.drain.synced.len(),
                    retried = report.drain.retried.len(),
                    rejected = report.drain.rejected.len(),
                    discarded = report.drain.discarded.len() + report.purged.stale_discarded.len(),
                    "sync pass completed"
                );
                self.publish(SyncEvent::Completed(report.clone()));
                Ok(SyncOutcome::Completed(report))
            }
            Err(err) => Err(self.fail_pass(trigger, err)),
        }
    }

    fn fail_pass(&self, trigger: SyncTrigger, err: AppError) -> AppError {
        tracing::error!(
            target: "offline::sync",
            trigger = trigger.as_str(),
            error = %err,
            "sync pass failed"
        );
        self.publish(SyncEvent::Failed(err.to_string()));
        err
    }

    /// Purge aged-out entries, then snapshot what is left to send.
    async fn prepare_pass(&self) -> Result<(PurgeReport, Vec<QueueEntry>), AppError> {
        let purged = self.purge().await?;
        let pending = self.queue.list_pending().await?;
        Ok((purged, pending))
    }

    async fn execute_pass(
        &self,
        started_at: DateTime<Utc>,
        purged: PurgeReport,
        pending: Vec<QueueEntry>,
    ) -> Result<SyncReport, AppError> {
        let drain = self.drain_entries(pending).await?;
        let refreshed = if self.connectivity.is_online() {
            self.refresh_collections(started_at).await
        } else {
            Vec::new()
        };

        Ok(SyncReport {
            started_at,
            finished_at: Utc::now(),
            purged,
            drain,
            refreshed,
        })
    }

    async fn purge(&self) -> Result<PurgeReport, AppError> {
        let report = self.queue.purge_stale(self.config.retention_days).await?;
        if !report.stale_discarded.is_empty() {
            self.publish(SyncEvent::EntriesDiscarded(report.stale_discarded.clone()));
        }
        Ok(report)
    }

    async fn drain_pending(&self) -> Result<DrainReport, AppError> {
        let entries = self.queue.list_pending().await?;
        self.drain_entries(entries).await
    }

    async fn drain_entries(&self, entries: Vec<QueueEntry>) -> Result<DrainReport, AppError> {
        let mut report = DrainReport::default();
        if entries.is_empty() {
            return Ok(report);
        }

        let mut touched: Vec<Collection> = entries.iter().map(|entry| entry.entity).collect();
        touched.sort();
        touched.dedup();
        for collection in &touched {
            self.mark_pending(*collection).await;
        }

        let horizon = ChronoDuration::try_days(self.config.retention_days)
            .unwrap_or(ChronoDuration::MAX);
        let mut failures: BTreeMap<Collection, String> = BTreeMap::new();

        for (index, entry) in entries.iter().enumerate() {
            if !self.connectivity.is_online() {
                tracing::info!(
                    target: "offline::sync",
                    remaining = entries.len() - index,
                    "connectivity lost; leaving remaining entries queued"
                );
                for remaining in &entries[index..] {
                    failures
                        .entry(remaining.entity)
                        .or_insert_with(|| "connectivity lost before submit".to_string());
                }
                break;
            }

            match self.remote.submit(entry).await {
                Ok(()) => {
                    self.confirm(entry).await?;
                    report.synced.push(ConfirmedMutation {
                        entry_id: entry.id.clone(),
                        mutation_type: entry.mutation_type,
                        entity: entry.entity,
                    });
                }
                Err(RemoteError::Permanent { status, message }) => {
                    self.queue.mark_rejected(&entry.id, &message).await?;
                    tracing::warn!(
                        target: "offline::sync",
                        entry_id = %entry.id,
                        entity = %entry.entity,
                        status = ?status,
                        error = %message,
                        "queue entry rejected by server"
                    );
                    let rejected = RejectedMutation {
                        entry_id: entry.id.clone(),
                        entity: entry.entity,
                        status,
                        message: message.clone(),
                    };
                    self.publish(SyncEvent::EntryRejected(rejected.clone()));
                    failures.insert(entry.entity, message);
                    report.rejected.push(rejected);
                }
                Err(RemoteError::Retryable(message)) => {
                    if entry.is_older_than(horizon, Utc::now()) {
                        self.queue.discard(&entry.id).await?;
                        tracing::warn!(
                            target: "offline::sync",
                            entry_id = %entry.id,
                            entity = %entry.entity,
                            attempts = entry.attempts + 1,
                            error = %message,
                            "queue entry exceeded retention window; discarded"
                        );
                        report.discarded.push(entry.id.clone());
                    } else {
                        self.queue.record_failure(&entry.id, &message).await?;
                        tracing::debug!(
                            target: "offline::sync",
                            entry_id = %entry.id,
                            error = %message,
                            "queue entry will be retried"
                        );
                        report.retried.push(entry.id.clone());
                    }
                    failures.insert(entry.entity, message);
                }
            }
        }

        if !report.discarded.is_empty() {
            self.publish(SyncEvent::EntriesDiscarded(report.discarded.clone()));
        }

        for collection in touched {
            match failures.get(&collection) {
                Some(message) => self.record_error(collection, message).await,
                None => self.record_success(collection, None).await,
            }
        }

        Ok(report)
    }

    async fn confirm(&self, entry: &QueueEntry) -> Result<(), AppError> {
        self.queue.mark_synced(&entry.id).await?;
        if let Some(provisional) = entry.provisional_record_id() {
            // The server copy replaces it on the next pull.
            if let Err(err) = self.store.delete(entry.entity, provisional).await {
                tracing::warn!(
                    target: "offline::sync",
                    entity = %entry.entity,
                    record_id = provisional,
                    error = %err,
                    "failed to drop provisional record"
                );
            }
        }
        Ok(())
    }

    async fn refresh_collections(&self, pulled_at: DateTime<Utc>) -> Vec<CollectionRefresh> {
        let mut refreshed = Vec::with_capacity(Collection::ALL.len());
        for collection in Collection::ALL {
            refreshed.push(self.refresh_collection(collection, pulled_at).await);
        }
        refreshed
    }

    async fn refresh_collection(
        &self,
        collection: Collection,
        pulled_at: DateTime<Utc>,
    ) -> CollectionRefresh {
        let since = match self.statuses.get_status(collection).await {
            Ok(status) => status.and_then(|status| status.last_sync),
            Err(err) => {
                tracing::warn!(
                    target: "offline::sync",
                    collection = %collection,
                    error = %err,
                    "failed to read sync cursor; pulling everything"
                );
                None
            }
        };

        self.mark_pending(collection).await;
        match self.pull(collection, since).await {
            Ok(records) => {
                // Records held only in memory must be pulled again next session.
                let cursor = if self.store.is_durable() {
                    Some(pulled_at)
                } else {
                    tracing::debug!(
                        target: "offline::sync",
                        collection = %collection,
                        "store is memory-only; keeping previous sync cursor"
                    );
                    None
                };
                self.record_success(collection, cursor).await;
                CollectionRefresh {
                    collection,
                    records,
                    error: None,
                }
            }
            Err(err) => {
                let message = err.to_string();
                tracing::warn!(
                    target: "offline::sync",
                    collection = %collection,
                    error = %message,
                    "collection refresh failed"
                );
                self.record_error(collection, &message).await;
                CollectionRefresh {
                    collection,
                    records: 0,
                    error: Some(message),
                }
            }
        }
    }

    async fn pull(
        &self,
        collection: Collection,
        since: Option<DateTime<Utc>>,
    ) -> Result<usize, AppError> {
        let values = self.remote.fetch_updated(collection, since).await?;
        let received = values.len();
        let records: Vec<Record> = values.into_iter().filter_map(Record::from_remote).collect();
        if records.len() < received {
            tracing::warn!(
                target: "offline::sync",
                collection = %collection,
                skipped = received - records.len(),
                "server returned records without a numeric id"
            );
        }
        if records.is_empty() {
            return Ok(0);
        }
        self.store.bulk_put(collection, records).await
    }

    async fn mark_pending(&self, collection: Collection) {
        if let Err(err) = self.statuses.mark_pending(collection).await {
            warn_status_write(collection, &err);
        }
    }

    async fn record_success(&self, collection: Collection, pulled_at: Option<DateTime<Utc>>) {
        if let Err(err) = self.statuses.record_success(collection, pulled_at).await {
            warn_status_write(collection, &err);
        }
    }

    async fn record_error(&self, collection: Collection, message: &str) {
        if let Err(err) = self.statuses.record_error(collection, message).await {
            warn_status_write(collection, &err);
        }
    }

    async fn leave_offline(&self) {
        let mut state = self.state.write().await;
        if *state == SyncState::Offline {
            *state = SyncState::Idle;
            drop(state);
            self.publish(SyncEvent::StateChanged(SyncState::Idle));
        }
    }

    async fn set_state(&self, next: SyncState) {
        let mut state = self.state.write().await;
        if *state == next {
            return;
        }
        *state = next;
        drop(state);
        self.publish(SyncEvent::StateChanged(next));
    }

    fn publish(&self, event: SyncEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

fn warn_status_write(collection: Collection, err: &AppError) {
    tracing::warn!(
        target: "offline::sync",
        collection = %collection,
        error = %err,
        "failed to update sync status"
    );
}
