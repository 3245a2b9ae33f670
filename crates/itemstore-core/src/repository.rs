//! Persistence contract consumed by the item service.
//!
//! Implementations must be safe to share between concurrent requests. Every
//! call is a single atomic operation; the service never asks for
//! multi-call transactions. Dropping a returned future cancels the call.

use crate::item::Item;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Result type alias for repository calls.
pub type RepoResult<T> = std::result::Result<T, RepositoryError>;

/// Failures reported by a repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No item matches the key.
    #[error("item not found")]
    NotFound,

    /// The id or the (type, name) pair is already taken.
    #[error("item already exists: {0}")]
    AlreadyExists(String),

    /// The call did not finish before its deadline.
    #[error("repository call exceeded its deadline")]
    DeadlineExceeded,

    /// Anything else the backend ran into.
    #[error("repository backend error")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl RepositoryError {
    /// Wrap a backend-specific error.
    pub fn backend(err: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        Self::Backend(err.into())
    }
}

/// Item storage keyed by `(item_type, name)` for lookups and by `id` for writes.
pub trait ItemRepository: Send + Sync {
    /// Store a new item.
    fn insert(&self, item: &Item) -> impl Future<Output = RepoResult<()>> + Send;

    /// Fetch the item with this type and name.
    fn get_by_type_and_name(
        &self,
        item_type: &str,
        name: &str,
    ) -> impl Future<Output = RepoResult<Item>> + Send;

    /// All items of a type, possibly none.
    fn list_by_type(&self, item_type: &str) -> impl Future<Output = RepoResult<Vec<Item>>> + Send;

    /// Overwrite the item stored under `id`.
    fn replace(&self, id: &str, item: &Item) -> impl Future<Output = RepoResult<()>> + Send;

    /// Remove the item stored under `id`.
    fn delete(&self, id: &str) -> impl Future<Output = RepoResult<()>> + Send;
}

impl<R: ItemRepository> ItemRepository for Arc<R> {
    fn insert(&self, item: &Item) -> impl Future<Output = RepoResult<()>> + Send {
        (**self).insert(item)
    }

    fn get_by_type_and_name(
        &self,
        item_type: &str,
        name: &str,
    ) -> impl Future<Output = RepoResult<Item>> + Send {
        (**self).get_by_type_and_name(item_type, name)
    }

    fn list_by_type(&self, item_type: &str) -> impl Future<Output = RepoResult<Vec<Item>>> + Send {
        (**self).list_by_type(item_type)
    }

    fn replace(&self, id: &str, item: &Item) -> impl Future<Output = RepoResult<()>> + Send {
        (**self).replace(id, item)
    }

    fn delete(&self, id: &str) -> impl Future<Output = RepoResult<()>> + Send {
        (**self).delete(id)
    }
}
