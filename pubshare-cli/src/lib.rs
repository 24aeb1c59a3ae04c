//! Command-line surface for the public share manager.
//!
//! The binary in `main.rs` parses a [`Cli`], opens the configured store and
//! hands the sub-command to [`execute`], which returns the JSON to print.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use pubshare_manager::{ManagerConfig, PublicShareManager, ShareWithSecret};
use pubshare_metadata::{DiskStorage, MetadataStorage, SqliteStorage};
use pubshare_types::{
    Grant, ListFilter, PublicShareReference, ResourceId, ResourceInfo, ResourcePermissions, ShareAuthentication,
    ShareSignature, ShareUpdate, User, UserId,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

/// Store used when neither `--store` nor `--disk` is given.
pub const DEFAULT_STORE: &str = "pubshare.db";

#[derive(Parser, Debug)]
#[command(name = "pubshare")]
#[command(about = "Manage public link shares in a local metadata store")]
pub struct Cli {
    /// SQLite store file
    #[arg(long, env = "PUBSHARE_STORE", conflicts_with = "disk")]
    pub store: Option<PathBuf>,

    /// Directory store root
    #[arg(long, env = "PUBSHARE_DISK")]
    pub disk: Option<PathBuf>,

    /// Manager configuration (JSON)
    #[arg(long, env = "PUBSHARE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Acting user as `idp:opaque_id`
    #[arg(long, env = "PUBSHARE_USER", default_value = "local:admin")]
    pub user: UserId,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn acting_user(&self) -> User {
        User::new(self.user.clone(), self.user.opaque_id.clone())
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a link to a resource
    Create {
        /// Resource as `storage_id!opaque_id`
        resource: ResourceId,
        /// Resource owner, defaults to the acting user
        #[arg(long)]
        owner: Option<UserId>,
        /// Display name stored as the resource's `name` metadata
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        quicklink: bool,
        #[arg(long, value_enum, default_value_t = Role::Viewer)]
        role: Role,
        #[arg(long)]
        password: Option<String>,
        /// Expiration as RFC 3339
        #[arg(long)]
        expires: Option<DateTime<Utc>>,
    },
    /// Show one link
    Get {
        #[command(flatten)]
        reference: ShareRef,
        /// Attach a signature to password-protected links
        #[arg(long)]
        sign: bool,
    },
    /// List links visible to the acting user
    List {
        #[arg(long)]
        resource: Vec<ResourceId>,
        #[arg(long)]
        owner: Vec<UserId>,
        #[arg(long)]
        creator: Vec<UserId>,
        #[arg(long)]
        sign: bool,
    },
    /// Change one property of a link
    Update {
        #[command(flatten)]
        reference: ShareRef,
        #[command(flatten)]
        change: Change,
    },
    /// Delete a link
    Revoke {
        #[command(flatten)]
        reference: ShareRef,
    },
    /// Open a link the way an anonymous visitor would
    Redeem {
        token: String,
        #[arg(long)]
        password: Option<String>,
        /// Hex signature, requires --signature-expires
        #[arg(long, requires = "signature_expires")]
        signature: Option<String>,
        #[arg(long)]
        signature_expires: Option<DateTime<Utc>>,
        #[arg(long)]
        sign: bool,
    },
    /// Write every link, password hashes included, as JSON lines
    Dump {
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Read links written by `dump`
    Load {
        #[arg(long, short)]
        input: PathBuf,
    },
}

/// Selects a link by token or by id.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct ShareRef {
    #[arg(long)]
    pub token: Option<String>,
    #[arg(long)]
    pub id: Option<String>,
}

impl ShareRef {
    pub fn to_reference(&self) -> PublicShareReference {
        match (&self.token, &self.id) {
            (Some(token), _) => PublicShareReference::token(token),
            (None, Some(id)) => PublicShareReference::id(id),
            (None, None) => PublicShareReference::token(""),
        }
    }
}

/// Exactly one property to change.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct Change {
    #[arg(long)]
    pub display_name: Option<String>,
    #[arg(long, value_enum)]
    pub role: Option<Role>,
    #[arg(long)]
    pub expires: Option<DateTime<Utc>>,
    #[arg(long)]
    pub no_expiration: bool,
    /// New password; an empty value removes protection
    #[arg(long)]
    pub password: Option<String>,
}

impl Change {
    pub fn to_update(&self) -> ShareUpdate {
        if let Some(display_name) = &self.display_name {
            ShareUpdate::DisplayName {
                display_name: display_name.clone(),
            }
        } else if let Some(role) = self.role {
            ShareUpdate::Permissions {
                permissions: role.permissions(),
            }
        } else if let Some(expiration) = self.expires {
            ShareUpdate::Expiration {
                expiration: Some(expiration),
            }
        } else if self.no_expiration {
            ShareUpdate::Expiration { expiration: None }
        } else if let Some(password) = &self.password {
            ShareUpdate::Password {
                password: password.clone(),
            }
        } else {
            ShareUpdate::Unspecified
        }
    }
}

/// Permission presets a link can carry.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Viewer,
    Editor,
    Uploader,
    Manager,
}

impl Role {
    pub fn permissions(self) -> ResourcePermissions {
        match self {
            Self::Viewer => ResourcePermissions::viewer(),
            Self::Editor => ResourcePermissions::editor(),
            Self::Uploader => ResourcePermissions::uploader(),
            Self::Manager => ResourcePermissions::manager(),
        }
    }
}

/// Reads a JSON manager configuration, or returns the defaults.
pub fn load_config(path: Option<&Path>) -> Result<ManagerConfig> {
    let Some(path) = path else {
        return Ok(ManagerConfig::default());
    };
    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse config {}", path.display()))
}

/// Opens the store selected on the command line.
pub fn open_storage(store: Option<&Path>, disk: Option<&Path>) -> Result<Arc<dyn MetadataStorage>> {
    match (store, disk) {
        (Some(_), Some(_)) => bail!("--store and --disk are mutually exclusive"),
        (None, Some(root)) => Ok(Arc::new(DiskStorage::new(root))),
        (store, None) => {
            let path = store.unwrap_or_else(|| Path::new(DEFAULT_STORE));
            let storage = SqliteStorage::open(path).with_context(|| format!("Failed to open store {}", path.display()))?;
            Ok(Arc::new(storage))
        }
    }
}

/// Runs one sub-command and returns its JSON output.
pub async fn execute(manager: &PublicShareManager, user: &User, command: Command) -> Result<Value> {
    match command {
        Command::Create {
            resource,
            owner,
            name,
            quicklink,
            role,
            password,
            expires,
        } => {
            let mut info = ResourceInfo::new(resource, owner.unwrap_or_else(|| user.id.clone()));
            if let Some(name) = name {
                info = info.with_metadata("name", name);
            }
            if quicklink {
                info = info.with_metadata("quicklink", "true");
            }
            let mut grant = Grant::new(role.permissions());
            if let Some(password) = password {
                grant = grant.with_password(password);
            }
            if let Some(expires) = expires {
                grant = grant.with_expiration(expires);
            }
            let share = manager.create(user, &info, &grant).await.context("Failed to create share")?;
            Ok(serde_json::to_value(share)?)
        }
        Command::Get { reference, sign } => {
            let share = manager
                .get(user, &reference.to_reference(), sign)
                .await
                .context("Failed to get share")?;
            Ok(serde_json::to_value(share)?)
        }
        Command::List {
            resource,
            owner,
            creator,
            sign,
        } => {
            let filters: Vec<ListFilter> = resource
                .into_iter()
                .map(ListFilter::ResourceId)
                .chain(owner.into_iter().map(ListFilter::Owner))
                .chain(creator.into_iter().map(ListFilter::Creator))
                .collect();
            let shares = manager.list(user, &filters, sign).await.context("Failed to list shares")?;
            Ok(serde_json::to_value(shares)?)
        }
        Command::Update { reference, change } => {
            let share = manager
                .update(user, &reference.to_reference(), &change.to_update())
                .await
                .context("Failed to update share")?;
            Ok(serde_json::to_value(share)?)
        }
        Command::Revoke { reference } => {
            let target = reference.to_reference();
            manager.revoke(user, &target).await.context("Failed to revoke share")?;
            Ok(json!({ "revoked": target }))
        }
        Command::Redeem {
            token,
            password,
            signature,
            signature_expires,
            sign,
        } => {
            let auth = ShareAuthentication {
                password,
                signature: signature.zip(signature_expires).map(|(signature, expiration)| ShareSignature {
                    signature,
                    expiration,
                }),
            };
            let share = manager
                .redeem_by_token(&token, &auth, sign)
                .await
                .context("Failed to redeem token")?;
            Ok(serde_json::to_value(share)?)
        }
        Command::Dump { output } => {
            let count = dump_to_file(manager, &output).await?;
            Ok(json!({ "dumped": count, "output": output }))
        }
        Command::Load { input } => {
            let count = load_from_file(manager, &input).await?;
            Ok(json!({ "loaded": count, "input": input }))
        }
    }
}

/// Streams every share into `output`, one JSON document per line.
pub async fn dump_to_file(manager: &PublicShareManager, output: &Path) -> Result<usize> {
    let mut file = tokio::fs::File::create(output)
        .await
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let (tx, mut rx) = mpsc::channel::<ShareWithSecret>(64);

    let writer = async move {
        let mut written = 0usize;
        while let Some(secret) = rx.recv().await {
            let mut line = serde_json::to_vec(&secret)?;
            line.push(b'\n');
            file.write_all(&line).await?;
            written += 1;
        }
        file.flush().await?;
        anyhow::Ok(written)
    };

    let (dumped, written) = tokio::join!(manager.dump(tx), writer);
    let written = written.with_context(|| format!("Failed to write {}", output.display()))?;
    dumped.context("Failed to dump shares")?;
    info!(count = written, path = %output.display(), "dump written");
    Ok(written)
}

/// Loads shares from a file written by [`dump_to_file`].
pub async fn load_from_file(manager: &PublicShareManager, input: &Path) -> Result<usize> {
    let file = tokio::fs::File::open(input)
        .await
        .with_context(|| format!("Failed to open {}", input.display()))?;
    let (tx, rx) = mpsc::channel::<ShareWithSecret>(64);

    let reader = async move {
        let mut lines = BufReader::new(file).lines();
        let mut line_no = 0usize;
        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let secret: ShareWithSecret =
                serde_json::from_str(&line).with_context(|| format!("Invalid share on line {line_no}"))?;
            if tx.send(secret).await.is_err() {
                break;
            }
        }
        anyhow::Ok(())
    };

    let (read, loaded) = tokio::join!(reader, manager.load(rx));
    read.with_context(|| format!("Failed to read {}", input.display()))?;
    loaded.context("Failed to load shares")
}
