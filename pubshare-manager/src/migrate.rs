//! Bulk export and import of shares, used when moving between stores.

use crate::error::{ShareError, ShareResult};
use crate::manager::PublicShareManager;
use crate::secret::ShareWithSecret;
use pubshare_metadata::NodeKind;
use tokio::sync::mpsc;
use tracing::{error, info};

impl PublicShareManager {
    /// Sends every stored share, password hash included, to `sink`.
    ///
    /// Expired shares are exported as they are. Fails with
    /// [`ShareError::ChannelClosed`] if the receiver goes away.
    pub async fn dump(&self, sink: mpsc::Sender<ShareWithSecret>) -> ShareResult<usize> {
        self.initialize().await?;
        let entries = self.storage().list_dir(&self.config().share_dir).await?;

        let mut count = 0;
        for entry in entries.iter().filter(|e| e.kind == NodeKind::File) {
            let secret = self.load_by_token(&entry.name).await?;
            sink.send(secret).await.map_err(|_| ShareError::ChannelClosed)?;
            count += 1;
        }
        info!(count, "public shares dumped");
        Ok(count)
    }

    /// Stores and indexes every share received from `source` until the
    /// channel closes. Shares that fail are logged and skipped.
    pub async fn load(&self, mut source: mpsc::Receiver<ShareWithSecret>) -> ShareResult<usize> {
        self.initialize().await?;

        let mut count = 0;
        while let Some(mut secret) = source.recv().await {
            secret.public_share.signature = None;
            secret.public_share.password_protected = !secret.password.is_empty();
            match self.persist(&secret).await {
                Ok(()) => count += 1,
                Err(e) => error!(
                    token = %secret.public_share.token,
                    share_id = %secret.public_share.id,
                    error = %e,
                    "error loading public share"
                ),
            }
        }
        info!(count, "public shares loaded");
        Ok(count)
    }
}
