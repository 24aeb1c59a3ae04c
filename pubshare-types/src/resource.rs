//! Users, resources and the permission sets granted on them.

use crate::ids::{ResourceId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The acting user of an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub display_name: String,
}

impl User {
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            id,
            display_name: username.clone(),
            username,
        }
    }
}

/// Permissions on a resource, either held by a user or granted through a share.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcePermissions {
    pub stat: bool,
    pub list_container: bool,
    pub initiate_file_download: bool,
    pub initiate_file_upload: bool,
    pub create_container: bool,
    pub delete: bool,
    #[serde(rename = "move")]
    pub move_: bool,
    pub get_path: bool,
    pub add_grant: bool,
    pub list_grants: bool,
    pub update_grant: bool,
    pub remove_grant: bool,
}

impl ResourcePermissions {
    /// Read-only access.
    pub fn viewer() -> Self {
        Self {
            stat: true,
            list_container: true,
            initiate_file_download: true,
            get_path: true,
            ..Self::default()
        }
    }

    /// Read and write access.
    pub fn editor() -> Self {
        Self {
            initiate_file_upload: true,
            create_container: true,
            delete: true,
            move_: true,
            ..Self::viewer()
        }
    }

    /// Upload-only access ("file drop").
    pub fn uploader() -> Self {
        Self {
            stat: true,
            initiate_file_upload: true,
            create_container: true,
            ..Self::default()
        }
    }

    /// Full management access, including the right to see other users' grants.
    pub fn manager() -> Self {
        Self {
            add_grant: true,
            list_grants: true,
            update_grant: true,
            remove_grant: true,
            ..Self::editor()
        }
    }
}

/// Metadata about a resource as returned by a storage provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub id: ResourceId,
    pub owner: UserId,
    #[serde(default)]
    pub permission_set: ResourcePermissions,
    /// Free-form key/value metadata. `name` and `quicklink` are read when a
    /// share is created for the resource.
    #[serde(default)]
    pub arbitrary_metadata: HashMap<String, String>,
}

impl ResourceInfo {
    pub fn new(id: ResourceId, owner: UserId) -> Self {
        Self {
            id,
            owner,
            permission_set: ResourcePermissions::default(),
            arbitrary_metadata: HashMap::new(),
        }
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.arbitrary_metadata.insert(key.into(), value.into());
        self
    }
}
