use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Serialises write sections per patient so two requests touching the same
/// week cannot interleave their reads and writes.
#[derive(Clone, Default)]
pub struct PatientLocks {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl PatientLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, patient_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(patient_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}
