//! Read/write locks keyed by name, created on first use.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

#[derive(Default)]
pub(crate) struct NamedRwLock {
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl NamedRwLock {
    fn get(&self, name: &str) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(name.to_string()).or_default())
    }

    /// Shared access to `name`.
    pub(crate) async fn read(&self, name: &str) -> OwnedRwLockReadGuard<()> {
        self.get(name).read_owned().await
    }

    /// Exclusive access to `name`.
    pub(crate) async fn write(&self, name: &str) -> OwnedRwLockWriteGuard<()> {
        self.get(name).write_owned().await
    }
}
