//! The public share manager.

use crate::config::ManagerConfig;
use crate::error::{ShareError, ShareResult};
use crate::permissions::PermissionChecker;
use crate::secret::ShareWithSecret;
use chrono::Utc;
use pubshare_crypto::{
    create_signature, hash_password, random_string, signature_expiry, verify_password, verify_signature,
    CryptoError, HashCost, TOKEN_LENGTH,
};
use pubshare_indexer::{Field, IndexBy, IndexDefinition, Indexer};
use pubshare_metadata::{path, MetadataStorage};
use pubshare_types::{
    matches_filters, Grant, ListFilter, PublicShare, PublicShareId, PublicShareReference, ResourceId,
    ResourceInfo, ShareAuthentication, ShareSignature, ShareUpdate, User,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

pub(crate) const ID_FIELD: &str = "Id.OpaqueId";
pub(crate) const OWNER_FIELD: &str = "Owner";
pub(crate) const CREATOR_FIELD: &str = "Creator";
pub(crate) const RESOURCE_FIELD: &str = "ResourceId";

fn share_indexes(share_dir: &str) -> Vec<IndexDefinition<PublicShare>> {
    let pk = || IndexBy::field("Token", |s: &PublicShare| s.token.clone());
    vec![
        IndexDefinition::unique(pk(), IndexBy::field(ID_FIELD, |s: &PublicShare| s.id.opaque_id.clone())),
        IndexDefinition::non_unique(pk(), IndexBy::func(OWNER_FIELD, |s: &PublicShare| s.owner.index_key())),
        IndexDefinition::non_unique(pk(), IndexBy::func(CREATOR_FIELD, |s: &PublicShare| s.creator.index_key())),
        IndexDefinition::non_unique(
            pk(),
            IndexBy::func(RESOURCE_FIELD, |s: &PublicShare| s.resource_id.index_key()),
        ),
    ]
    .into_iter()
    .map(|definition| definition.case_insensitive(true).entity_dir(share_dir))
    .collect()
}

/// Parses a boolean the way link metadata writes them (`1`, `t`, `TRUE`, ...).
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

async fn hash_secret(password: String, cost: HashCost) -> ShareResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password, &cost))
        .await
        .map_err(|e| CryptoError::Hash(e.to_string()))?
        .map_err(ShareError::from)
}

/// Creates, reads, lists and revokes public links.
///
/// Each share is stored as one JSON blob at `<share_dir>/<token>` and indexed
/// by opaque id, owner, creator and resource. Blob and index writes are not
/// atomic together; a share whose blob is missing resolves to `NotFound`.
///
/// The storage namespace and the indexes are set up on first use.
pub struct PublicShareManager {
    storage: Arc<dyn MetadataStorage>,
    indexer: Arc<Indexer>,
    permissions: Arc<dyn PermissionChecker>,
    config: ManagerConfig,
    initialized: AtomicBool,
    init_lock: Mutex<()>,
}

impl PublicShareManager {
    /// Creates a manager with its own indexer over `storage`.
    pub fn new(
        storage: Arc<dyn MetadataStorage>,
        permissions: Arc<dyn PermissionChecker>,
        config: ManagerConfig,
    ) -> Self {
        let indexer = Arc::new(Indexer::new(Arc::clone(&storage), config.indexer.clone()));
        Self::with_indexer(storage, indexer, permissions, config)
    }

    /// Creates a manager sharing an existing indexer.
    pub fn with_indexer(
        storage: Arc<dyn MetadataStorage>,
        indexer: Arc<Indexer>,
        permissions: Arc<dyn PermissionChecker>,
        config: ManagerConfig,
    ) -> Self {
        Self {
            storage,
            indexer,
            permissions,
            config,
            initialized: AtomicBool::new(false),
            init_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn indexer(&self) -> &Arc<Indexer> {
        &self.indexer
    }

    pub(crate) fn storage(&self) -> &Arc<dyn MetadataStorage> {
        &self.storage
    }

    pub(crate) async fn initialize(&self) -> ShareResult<()> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }
        let _guard = self.init_lock.lock().await;
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }

        self.storage.init(&self.config.metadata_namespace).await?;
        self.storage.make_dir_if_not_exist(&self.config.share_dir).await?;
        for definition in share_indexes(&self.config.share_dir) {
            self.indexer.register_index(definition).await?;
        }

        self.initialized.store(true, Ordering::Release);
        info!(backend = self.storage.backend(), "public share manager initialized");
        Ok(())
    }

    // ── Create / Update ──────────────────────────────────────────

    /// Creates a link to `resource`.
    ///
    /// The display name comes from the resource's `name` metadata and falls
    /// back to the token. A non-empty grant password is hashed and the share
    /// marked password protected.
    #[tracing::instrument(skip_all, fields(user = %user.id, resource = %resource.id))]
    pub async fn create(&self, user: &User, resource: &ResourceInfo, grant: &Grant) -> ShareResult<PublicShare> {
        self.initialize().await?;

        let id = PublicShareId::new(random_string(TOKEN_LENGTH));
        let token = random_string(TOKEN_LENGTH);
        let display_name = resource
            .arbitrary_metadata
            .get("name")
            .cloned()
            .unwrap_or_else(|| token.clone());
        let quicklink = resource
            .arbitrary_metadata
            .get("quicklink")
            .and_then(|v| parse_bool(v))
            .unwrap_or(false);

        let password_hash = match grant.password.as_deref() {
            Some(password) if !password.is_empty() => {
                hash_secret(password.to_string(), self.config.password_hash_cost.clone()).await?
            }
            _ => String::new(),
        };

        let now = Utc::now();
        let share = PublicShare {
            id,
            token,
            owner: resource.owner.clone(),
            creator: user.id.clone(),
            resource_id: resource.id.clone(),
            permissions: grant.permissions,
            ctime: now,
            mtime: now,
            expiration: grant.expiration,
            display_name,
            quicklink,
            password_protected: !password_hash.is_empty(),
            signature: None,
        };

        let secret = ShareWithSecret::new(share, password_hash);
        self.persist(&secret).await?;
        info!(
            token = %secret.public_share.token,
            share_id = %secret.public_share.id,
            "public share created"
        );
        Ok(secret.public_share)
    }

    /// Applies one field change to an existing share.
    ///
    /// An empty password removes password protection. Identity fields never
    /// change, so only the blob is rewritten.
    #[tracing::instrument(skip_all, fields(user = %user.id))]
    pub async fn update(
        &self,
        user: &User,
        reference: &PublicShareReference,
        update: &ShareUpdate,
    ) -> ShareResult<PublicShare> {
        self.initialize().await?;
        let mut secret = self.resolve(reference).await?;

        match update {
            ShareUpdate::DisplayName { display_name } => {
                secret.public_share.display_name = display_name.clone();
            }
            ShareUpdate::Permissions { permissions } => {
                secret.public_share.permissions = *permissions;
            }
            ShareUpdate::Expiration { expiration } => {
                secret.public_share.expiration = *expiration;
            }
            ShareUpdate::Password { password } if password.is_empty() => {
                secret.password.clear();
                secret.public_share.password_protected = false;
            }
            ShareUpdate::Password { password } => {
                secret.password = hash_secret(password.clone(), self.config.password_hash_cost.clone()).await?;
                secret.public_share.password_protected = true;
            }
            ShareUpdate::Unspecified => {
                return Err(ShareError::BadRequest("no valid update type given".to_string()));
            }
        }
        secret.public_share.mtime = Utc::now();

        self.store(&secret).await?;
        debug!(token = %secret.public_share.token, "public share updated");
        Ok(secret.public_share)
    }

    // ── Read ─────────────────────────────────────────────────────

    /// Returns a share by token or opaque id.
    ///
    /// With `sign`, a password-protected share carries a fresh signature that
    /// redeems the link without the password until it expires.
    #[tracing::instrument(skip_all, fields(user = %user.id))]
    pub async fn get(&self, user: &User, reference: &PublicShareReference, sign: bool) -> ShareResult<PublicShare> {
        self.initialize().await?;
        let secret = self.resolve(reference).await?;
        self.present(secret, sign)
    }

    /// Lists the shares visible to `user`.
    ///
    /// Without resource filters these are the shares `user` owns or created.
    /// With resource filters, the user's own shares on those resources come
    /// first, followed by other users' shares on resources where the
    /// permission check reports list-grants. Expired shares are left out, and
    /// purged once the user is shown to be allowed to see them. Only the
    /// user's own shares are signed.
    #[tracing::instrument(skip_all, fields(user = %user.id, filters = filters.len()))]
    pub async fn list(&self, user: &User, filters: &[ListFilter], sign: bool) -> ShareResult<Vec<PublicShare>> {
        self.initialize().await?;

        let resources: Vec<&ResourceId> = filters
            .iter()
            .filter_map(|f| match f {
                ListFilter::ResourceId(id) => Some(id),
                _ => None,
            })
            .collect();

        let candidates = if resources.is_empty() {
            let key = user.id.index_key();
            self.indexer
                .find_by::<PublicShare>(&[Field::new(OWNER_FIELD, key.clone()), Field::new(CREATOR_FIELD, key)])
                .await?
        } else {
            let fields: Vec<Field> = resources
                .iter()
                .map(|id| Field::new(RESOURCE_FIELD, id.index_key()))
                .collect();
            self.indexer.find_by::<PublicShare>(&fields).await?
        };

        let mut result = Vec::new();
        let mut others = Vec::new();
        for token in &candidates {
            let Some(secret) = self.load_listed(token).await? else {
                continue;
            };
            let share = &secret.public_share;
            if !matches_filters(share, filters) {
                continue;
            }
            if share.owner != user.id && share.creator != user.id {
                others.push(secret);
                continue;
            }
            if share.is_expired() {
                self.purge(share).await;
                continue;
            }
            result.push(self.present(secret, sign)?);
        }

        if resources.is_empty() {
            return Ok(result);
        }

        let mut may_list: HashMap<String, bool> = HashMap::new();
        for secret in others {
            let share = &secret.public_share;
            let key = share.resource_id.index_key();
            let allowed = match may_list.get(&key) {
                Some(&allowed) => allowed,
                None => {
                    let allowed = self.may_list_grants(user, &share.resource_id).await;
                    may_list.insert(key, allowed);
                    allowed
                }
            };
            if !allowed {
                continue;
            }
            if share.is_expired() {
                self.purge(share).await;
                continue;
            }
            result.push(self.present(secret, false)?);
        }
        Ok(result)
    }

    /// Deletes a share and its index entries.
    #[tracing::instrument(skip_all, fields(user = %user.id))]
    pub async fn revoke(&self, user: &User, reference: &PublicShareReference) -> ShareResult<()> {
        self.initialize().await?;
        let secret = self.resolve(reference).await?;
        let share = &secret.public_share;

        match self.storage.delete(&self.share_path(&share.token)?).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }
        self.indexer.delete(share).await?;
        info!(token = %share.token, share_id = %share.id, "public share revoked");
        Ok(())
    }

    /// Opens a link anonymously.
    ///
    /// Password-protected shares need either the password or a valid
    /// signature; the password wins when both are given.
    #[tracing::instrument(skip_all, fields(token = %token))]
    pub async fn redeem_by_token(
        &self,
        token: &str,
        auth: &ShareAuthentication,
        sign: bool,
    ) -> ShareResult<PublicShare> {
        self.initialize().await?;
        let secret = self.load_by_token(token).await?;
        if secret.public_share.is_expired() {
            self.purge(&secret.public_share).await;
            return Err(ShareError::NotFound("public share has expired".to_string()));
        }
        if secret.public_share.password_protected && !self.authenticate(&secret, auth).await? {
            return Err(ShareError::InvalidCredentials);
        }
        self.present(secret, sign)
    }

    // ── Internals ────────────────────────────────────────────────

    fn share_path(&self, token: &str) -> ShareResult<String> {
        if token.is_empty() {
            return Err(ShareError::BadRequest("empty token".to_string()));
        }
        if token.contains('/') || token == "." || token == ".." {
            return Err(ShareError::NotFound(format!("public share {token}")));
        }
        Ok(path::join(&self.config.share_dir, token))
    }

    pub(crate) async fn load_by_token(&self, token: &str) -> ShareResult<ShareWithSecret> {
        let data = self.storage.download(&self.share_path(token)?).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    async fn load_by_id(&self, opaque_id: &str) -> ShareResult<ShareWithSecret> {
        let tokens = self
            .indexer
            .find_by::<PublicShare>(&[Field::new(ID_FIELD, opaque_id)])
            .await?;
        match tokens.first() {
            Some(token) => self.load_by_token(token).await,
            None => Err(ShareError::NotFound(format!("public share with id {opaque_id}"))),
        }
    }

    /// Loads a listed share; a token whose blob is gone yields `None`.
    async fn load_listed(&self, token: &str) -> ShareResult<Option<ShareWithSecret>> {
        match self.load_by_token(token).await {
            Ok(secret) => Ok(Some(secret)),
            Err(e) if e.is_not_found() => {
                debug!(token, "index entry without share blob");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Resolves a reference to a live share, purging it if it has expired.
    async fn resolve(&self, reference: &PublicShareReference) -> ShareResult<ShareWithSecret> {
        let secret = match reference {
            PublicShareReference::Token(token) if !token.is_empty() => self.load_by_token(token).await?,
            PublicShareReference::Id(id) if !id.opaque_id.is_empty() => self.load_by_id(&id.opaque_id).await?,
            _ => return Err(ShareError::BadRequest("neither id nor token given".to_string())),
        };
        if secret.public_share.is_expired() {
            self.purge(&secret.public_share).await;
            return Err(ShareError::NotFound("public share has expired".to_string()));
        }
        Ok(secret)
    }

    /// Writes the blob only.
    async fn store(&self, secret: &ShareWithSecret) -> ShareResult<()> {
        let data = serde_json::to_vec(secret)?;
        self.storage
            .upload(&self.share_path(&secret.public_share.token)?, &data)
            .await?;
        Ok(())
    }

    /// Writes the blob and indexes the share.
    ///
    /// A unique collision counts as already indexed. Any other indexing
    /// failure drops the share's entries and indexes it once more.
    pub(crate) async fn persist(&self, secret: &ShareWithSecret) -> ShareResult<()> {
        self.store(secret).await?;
        let share = &secret.public_share;
        match self.indexer.add(share).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_already_exists() => Ok(()),
            Err(e) => {
                warn!(token = %share.token, error = %e, "indexing public share failed, re-indexing");
                self.indexer.delete(share).await?;
                self.indexer.add(share).await?;
                Ok(())
            }
        }
    }

    /// Best-effort removal of an expired share. Failures are logged.
    async fn purge(&self, share: &PublicShare) {
        let blob = match self.share_path(&share.token) {
            Ok(blob) => blob,
            Err(e) => {
                error!(token = %share.token, share_id = %share.id, error = %e, "cannot purge expired public share");
                return;
            }
        };
        match self.storage.delete(&blob).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                error!(token = %share.token, share_id = %share.id, error = %e, "failed to delete expired public share");
                return;
            }
        }
        if let Err(e) = self.indexer.delete(share).await {
            error!(token = %share.token, share_id = %share.id, error = %e, "failed to unindex expired public share");
            return;
        }
        info!(token = %share.token, share_id = %share.id, "expired public share purged");
    }

    async fn may_list_grants(&self, user: &User, resource: &ResourceId) -> bool {
        match self.permissions.stat(user, resource).await {
            Ok(permissions) => permissions.list_grants,
            Err(e) => {
                warn!(resource = %resource, error = %e, "permission check failed");
                false
            }
        }
    }

    async fn authenticate(&self, secret: &ShareWithSecret, auth: &ShareAuthentication) -> ShareResult<bool> {
        match (auth.password.as_deref(), auth.signature.as_ref()) {
            (Some(password), _) if !password.is_empty() => {
                let (password, hash) = (password.to_string(), secret.password.clone());
                tokio::task::spawn_blocking(move || verify_password(&password, &hash))
                    .await
                    .map_err(|e| ShareError::from(CryptoError::Hash(e.to_string())))
            }
            (_, Some(signature)) => Ok(verify_signature(
                &secret.public_share.token,
                &secret.password,
                &signature.signature,
                signature.expiration,
                Utc::now(),
            )),
            _ => Ok(false),
        }
    }

    /// Strips the secret, attaching a signature when asked for one.
    fn present(&self, secret: ShareWithSecret, sign: bool) -> ShareResult<PublicShare> {
        let ShareWithSecret {
            public_share: mut share,
            password,
        } = secret;
        share.signature = None;
        if sign && share.password_protected {
            let expiration = signature_expiry(Utc::now(), self.config.signature_ttl_secs);
            let signature = create_signature(&share.token, &password, expiration)?;
            share.signature = Some(ShareSignature { signature, expiration });
        }
        Ok(share)
    }
}
