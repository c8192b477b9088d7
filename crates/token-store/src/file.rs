//! JSON file token store
//!
//! Keeps the token items in a JSON array on disk. All writes use atomic
//! temp-file + rename so a crash never leaves a torn file, and a tokio Mutex
//! serializes concurrent writers within the process.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use common::TokenRecord;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{StoreError, StoreFuture, TokenKey, TokenStore};

/// File-backed token store for local development.
pub struct FileTokenStore {
    path: PathBuf,
    state: Mutex<BTreeSet<TokenKey>>,
}

impl FileTokenStore {
    /// Open the store at `path`, creating an empty file on cold start.
    pub async fn open(path: PathBuf) -> crate::Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| StoreError::Open(format!("reading token file: {e}")))?;
            let items: BTreeSet<TokenKey> = serde_json::from_str(&contents)
                .map_err(|e| StoreError::Open(format!("parsing token file: {e}")))?;
            info!(path = %path.display(), items = items.len(), "loaded token file");
            items
        } else {
            info!(path = %path.display(), "token file not found, starting empty");
            let items = BTreeSet::new();
            write_atomic(&path, &items)
                .await
                .map_err(StoreError::Open)?;
            items
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Snapshot of the stored items.
    pub async fn items(&self) -> Vec<TokenKey> {
        self.state.lock().await.iter().cloned().collect()
    }

    /// Replace the stored item with `key`.
    async fn replace(&self, key: TokenKey) -> crate::Result<()> {
        let mut state = self.state.lock().await;
        let next = BTreeSet::from([key]);
        write_atomic(&self.path, &next)
            .await
            .map_err(StoreError::Write)?;
        let replaced = std::mem::replace(&mut *state, next).len();
        info!(path = %self.path.display(), replaced, "stored token item");
        Ok(())
    }

    async fn remove(&self, key: TokenKey) -> crate::Result<()> {
        let mut state = self.state.lock().await;
        if state.remove(&key) {
            write_atomic(&self.path, &state)
                .await
                .map_err(StoreError::Delete)?;
            info!(path = %self.path.display(), "deleted token item");
        } else {
            debug!(path = %self.path.display(), "token item already absent");
        }
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn id(&self) -> &str {
        "file"
    }

    fn save<'a>(&'a self, record: &'a TokenRecord) -> StoreFuture<'a, ()> {
        Box::pin(self.replace(TokenKey::from_record(record)))
    }

    fn delete(&self, key: TokenKey) -> StoreFuture<'_, ()> {
        Box::pin(self.remove(key))
    }
}

/// Write the items to `path` atomically with 0600 permissions.
async fn write_atomic(path: &Path, items: &BTreeSet<TokenKey>) -> Result<(), String> {
    let json = serde_json::to_string_pretty(items)
        .map_err(|e| format!("serializing token items: {e}"))?;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let tmp_path = dir.join(format!(".tokens.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| format!("writing temp token file: {e}"))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| format!("setting token file permissions: {e}"))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| format!("renaming temp token file: {e}"))?;

    debug!(path = %path.display(), "persisted token items");
    Ok(())
}
