//! In-memory repository, used by `serve --memory` and by tests.

use crate::item::Item;
use crate::repository::{ItemRepository, RepoResult, RepositoryError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// Items kept in insertion order behind a single lock.
///
/// Each call takes the lock once, so every operation is atomic. The lock is
/// never held across an await point.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    items: RwLock<Vec<Item>>,
    simulate_write_error: AtomicBool,
    latency_ms: AtomicU64,
}

impl MemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write (insert, replace, delete) fail with a backend error.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.store(simulate, Ordering::SeqCst);
    }

    /// Delay every call by `latency` before touching the data.
    pub fn set_latency(&self, latency: Duration) {
        let ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(ms, Ordering::SeqCst);
    }

    /// Number of stored items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().map_or(0, |items| items.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn delay(&self) {
        let ms = self.latency_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    fn check_writable(&self) -> RepoResult<()> {
        if self.simulate_write_error.load(Ordering::SeqCst) {
            return Err(RepositoryError::backend("simulated write error"));
        }
        Ok(())
    }

    fn read(&self) -> RepoResult<RwLockReadGuard<'_, Vec<Item>>> {
        self.items
            .read()
            .map_err(|_| RepositoryError::backend("memory repository lock poisoned"))
    }

    fn write(&self) -> RepoResult<RwLockWriteGuard<'_, Vec<Item>>> {
        self.items
            .write()
            .map_err(|_| RepositoryError::backend("memory repository lock poisoned"))
    }
}

impl ItemRepository for MemoryRepository {
    async fn insert(&self, item: &Item) -> RepoResult<()> {
        self.delay().await;
        self.check_writable()?;

        let mut items = self.write()?;
        if items.iter().any(|i| i.id == item.id) {
            return Err(RepositoryError::AlreadyExists(item.id.clone()));
        }
        if items
            .iter()
            .any(|i| i.item_type == item.item_type && i.name == item.name)
        {
            return Err(RepositoryError::AlreadyExists(format!(
                "{}/{}",
                item.item_type, item.name
            )));
        }
        items.push(item.clone());
        Ok(())
    }

    async fn get_by_type_and_name(&self, item_type: &str, name: &str) -> RepoResult<Item> {
        self.delay().await;

        let items = self.read()?;
        items
            .iter()
            .find(|i| i.item_type == item_type && i.name == name)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_by_type(&self, item_type: &str) -> RepoResult<Vec<Item>> {
        self.delay().await;

        let items = self.read()?;
        Ok(items
            .iter()
            .filter(|i| i.item_type == item_type)
            .cloned()
            .collect())
    }

    async fn replace(&self, id: &str, item: &Item) -> RepoResult<()> {
        self.delay().await;
        self.check_writable()?;

        let mut items = self.write()?;
        let slot = items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = item.clone();
        Ok(())
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        self.delay().await;
        self.check_writable()?;

        let mut items = self.write()?;
        let idx = items
            .iter()
            .position(|i| i.id == id)
            .ok_or(RepositoryError::NotFound)?;
        items.remove(idx);
        Ok(())
    }
}
