use crate::domain::value_objects::Collection;
use tokio::sync::{Mutex, MutexGuard};

/// One async mutex per collection, held for the duration of a write.
#[derive(Debug, Default)]
pub struct CollectionLocks {
    patients: Mutex<()>,
    visits: Mutex<()>,
    prescriptions: Mutex<()>,
    lab_results: Mutex<()>,
}

impl CollectionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, collection: Collection) -> MutexGuard<'_, ()> {
        match collection {
            Collection::Patients => self.patients.lock().await,
            Collection::Visits => self.visits.lock().await,
            Collection::Prescriptions => self.prescriptions.lock().await,
            Collection::LabResults => self.lab_results.lock().await,
        }
    }
}
