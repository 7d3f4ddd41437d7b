use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clinic_sync::application::ports::{RemoteApi, RemoteError};
use clinic_sync::domain::entities::QueueEntry;
use clinic_sync::domain::value_objects::Collection;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scriptable stand-in for the clinic API that records every call.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct MockRemoteApi {
    submitted: Arc<Mutex<Vec<QueueEntry>>>,
    submit_script: Arc<Mutex<VecDeque<Result<(), RemoteError>>>>,
    submit_fallback: Arc<Mutex<Option<RemoteError>>>,
    submit_delay: Arc<Mutex<Option<Duration>>>,
    fetches: Arc<Mutex<Vec<(Collection, Option<DateTime<Utc>>)>>>,
    pulls: Arc<Mutex<HashMap<Collection, Result<Vec<Value>, RemoteError>>>>,
}

#[allow(dead_code)]
impl MockRemoteApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a one-shot response for the next submit.
    pub fn push_submit_result(&self, result: Result<(), RemoteError>) {
        self.submit_script.lock().unwrap().push_back(result);
    }

    /// Fail every submit not covered by the script.
    pub fn fail_all_submits(&self, err: RemoteError) {
        *self.submit_fallback.lock().unwrap() = Some(err);
    }

    pub fn accept_all_submits(&self) {
        *self.submit_fallback.lock().unwrap() = None;
    }

    pub fn set_submit_delay(&self, delay: Duration) {
        *self.submit_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_pull(&self, collection: Collection, records: Vec<Value>) {
        self.pulls.lock().unwrap().insert(collection, Ok(records));
    }

    pub fn fail_pull(&self, collection: Collection, err: RemoteError) {
        self.pulls.lock().unwrap().insert(collection, Err(err));
    }

    pub fn submitted(&self) -> Vec<QueueEntry> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn submit_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    pub fn fetches(&self) -> Vec<(Collection, Option<DateTime<Utc>>)> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn fetches_for(&self, collection: Collection) -> Vec<Option<DateTime<Utc>>> {
        self.fetches
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == collection)
            .map(|(_, since)| *since)
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.submit_count() + self.fetches.lock().unwrap().len()
    }
}

#[async_trait]
impl RemoteApi for MockRemoteApi {
    async fn submit(&self, entry: &QueueEntry) -> Result<(), RemoteError> {
        self.submitted.lock().unwrap().push(entry.clone());

        let delay = *self.submit_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(result) = self.submit_script.lock().unwrap().pop_front() {
            return result;
        }
        match self.submit_fallback.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn fetch_updated(
        &self,
        collection: Collection,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Value>, RemoteError> {
        self.fetches.lock().unwrap().push((collection, since));
        self.pulls
            .lock()
            .unwrap()
            .get(&collection)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}
