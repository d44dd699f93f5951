//! Durable slot holding the deployed contract address.
//!
//! The slot is written at most once per deployment epoch. `create_if_absent`
//! never overwrites a stored address; callers learn the canonical value
//! instead.

use alloy::primitives::Address;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;

const LOCK_RETRY: Duration = Duration::from_millis(20);
/// A lock file older than this was left by a crashed writer.
const STALE_LOCK: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Address store I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stored value '{0}' is not an address")]
    Corrupt(String),
}

/// Result of a create-if-absent write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// Our address is now the stored one.
    Created,
    /// Another address was already stored and is kept.
    Existing(Address),
}

/// Cross-process coordination slot.
#[async_trait]
pub trait AddressStore: Send + Sync {
    /// Stored address, `None` if nothing has been written yet.
    async fn try_read(&self) -> Result<Option<Address>, StoreError>;

    async fn create_if_absent(&self, address: Address) -> Result<CreateOutcome, StoreError>;
}

fn parse_address(content: &str) -> Result<Option<Address>, StoreError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse()
        .map(Some)
        .map_err(|_| StoreError::Corrupt(trimmed.to_string()))
}

/// Address file shared by replicas through a common volume.
///
/// The file is created by hard-linking a fully written temporary file into
/// place, so readers see either no file or the whole address. An empty file
/// counts as absent.
#[derive(Debug, Clone)]
pub struct FileAddressStore {
    path: PathBuf,
}

impl FileAddressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(suffix);
        self.path.with_file_name(name)
    }

    async fn publish(&self, temp: &Path) -> Result<CreateOutcome, StoreError> {
        loop {
            match fs::hard_link(temp, &self.path).await {
                Ok(()) => return Ok(CreateOutcome::Created),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(self.io_error(e)),
            }

            if let Some(existing) = self.try_read().await? {
                return Ok(CreateOutcome::Existing(existing));
            }

            // Empty placeholder left by an older deployment script. Clear it
            // and compete for the link again.
            let lock = self.acquire_lock().await?;
            let cleared = self.remove_placeholder().await;
            if let Err(e) = fs::remove_file(&lock).await {
                tracing::warn!(path = %lock.display(), error = %e, "Failed to remove address lock");
            }
            cleared?;
        }
    }

    /// Remove the address file only if it is still empty.
    ///
    /// Callers hold the lock, and only lock holders remove the file, so an
    /// empty file cannot turn into a published address in between.
    async fn remove_placeholder(&self) -> Result<(), StoreError> {
        match fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => {}
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(self.io_error(e)),
        }

        match fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Removed empty address placeholder");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    async fn acquire_lock(&self) -> Result<PathBuf, StoreError> {
        let lock = self.sibling(".lock");
        loop {
            let created = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock)
                .await;
            match created {
                Ok(_) => return Ok(lock),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if lock_is_stale(&lock).await {
                        tracing::warn!(path = %lock.display(), "Removing stale address lock");
                        let _ = fs::remove_file(&lock).await;
                    } else {
                        tokio::time::sleep(LOCK_RETRY).await;
                    }
                }
                Err(e) => return Err(self.io_error(e)),
            }
        }
    }
}

async fn lock_is_stale(lock: &Path) -> bool {
    fs::metadata(lock)
        .await
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .is_some_and(|age| age > STALE_LOCK)
}

#[async_trait]
impl AddressStore for FileAddressStore {
    async fn try_read(&self) -> Result<Option<Address>, StoreError> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => parse_address(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    async fn create_if_absent(&self, address: Address) -> Result<CreateOutcome, StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let temp = self.sibling(&format!(".{}.tmp", uuid::Uuid::new_v4()));
        fs::write(&temp, address.to_string())
            .await
            .map_err(|e| self.io_error(e))?;

        let outcome = self.publish(&temp).await;

        if let Err(e) = fs::remove_file(&temp).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %temp.display(),
                    error = %e,
                    "Failed to remove temporary address file"
                );
            }
        }

        outcome
    }
}

/// Single-process store.
#[derive(Debug, Default)]
pub struct MemoryAddressStore {
    slot: RwLock<Option<Address>>,
}

impl MemoryAddressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(address: Address) -> Self {
        Self {
            slot: RwLock::new(Some(address)),
        }
    }
}

#[async_trait]
impl AddressStore for MemoryAddressStore {
    async fn try_read(&self) -> Result<Option<Address>, StoreError> {
        Ok(*self.slot.read().await)
    }

    async fn create_if_absent(&self, address: Address) -> Result<CreateOutcome, StoreError> {
        let mut slot = self.slot.write().await;
        match *slot {
            Some(existing) => Ok(CreateOutcome::Existing(existing)),
            None => {
                *slot = Some(address);
                Ok(CreateOutcome::Created)
            }
        }
    }
}
