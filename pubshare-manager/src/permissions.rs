//! Permission checks against the resource owner's storage.

use crate::error::ShareResult;
use async_trait::async_trait;
use pubshare_types::{ResourceId, ResourcePermissions, User};

/// Answers what a user may do on a resource.
///
/// The manager asks this when a user lists shares on a resource they did not
/// create.
#[async_trait]
pub trait PermissionChecker: Send + Sync {
    async fn stat(&self, user: &User, resource: &ResourceId) -> ShareResult<ResourcePermissions>;
}

/// Grants nothing to anybody.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAllPermissions;

#[async_trait]
impl PermissionChecker for DenyAllPermissions {
    async fn stat(&self, _user: &User, _resource: &ResourceId) -> ShareResult<ResourcePermissions> {
        Ok(ResourcePermissions::default())
    }
}
