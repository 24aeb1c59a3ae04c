#![allow(dead_code)]

use async_trait::async_trait;
use pubshare_crypto::HashCost;
use pubshare_manager::{ManagerConfig, PermissionChecker, PublicShareManager, ShareError, ShareResult};
use pubshare_metadata::{MetadataStorage, SqliteStorage};
use pubshare_types::{ResourceId, ResourceInfo, ResourcePermissions, User, UserId};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Grants list-grants on chosen (user, resource) pairs and viewer rights elsewhere.
#[derive(Default)]
pub struct StaticPermissions {
    grants: Mutex<HashSet<(UserId, ResourceId)>>,
    broken: Mutex<HashSet<ResourceId>>,
    calls: AtomicUsize,
}

impl StaticPermissions {
    pub fn allow(&self, user: &User, resource: &ResourceId) {
        self.grants
            .lock()
            .unwrap()
            .insert((user.id.clone(), resource.clone()));
    }

    /// Makes every check on `resource` fail.
    pub fn break_resource(&self, resource: &ResourceId) {
        self.broken.lock().unwrap().insert(resource.clone());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionChecker for StaticPermissions {
    async fn stat(&self, user: &User, resource: &ResourceId) -> ShareResult<ResourcePermissions> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.broken.lock().unwrap().contains(resource) {
            return Err(ShareError::Permission(format!("stat {resource} failed")));
        }
        let allowed = self
            .grants
            .lock()
            .unwrap()
            .contains(&(user.id.clone(), resource.clone()));
        Ok(if allowed {
            ResourcePermissions::manager()
        } else {
            ResourcePermissions::viewer()
        })
    }
}

pub struct Fixture {
    pub storage: Arc<dyn MetadataStorage>,
    pub permissions: Arc<StaticPermissions>,
    pub manager: PublicShareManager,
}

pub fn config() -> ManagerConfig {
    ManagerConfig {
        password_hash_cost: HashCost::test(),
        ..ManagerConfig::default()
    }
}

pub fn fixture() -> Fixture {
    let storage: Arc<dyn MetadataStorage> = Arc::new(SqliteStorage::open_in_memory().unwrap());
    fixture_with(storage)
}

pub fn fixture_with(storage: Arc<dyn MetadataStorage>) -> Fixture {
    let permissions = Arc::new(StaticPermissions::default());
    let manager = PublicShareManager::new(Arc::clone(&storage), permissions.clone(), config());
    Fixture {
        storage,
        permissions,
        manager,
    }
}

pub fn user(name: &str) -> User {
    User::new(UserId::new("https://idp.example.com", name), name)
}

pub fn resource_id(opaque: &str) -> ResourceId {
    ResourceId::new("storage-1", opaque)
}

pub fn resource(owner: &User, opaque: &str) -> ResourceInfo {
    ResourceInfo::new(resource_id(opaque), owner.id.clone())
}
