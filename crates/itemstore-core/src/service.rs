//! CRUD orchestration over an [`ItemRepository`].
//!
//! Every operation validates its identifiers first, so a malformed request
//! never reaches the repository. Read-modify-write operations (replace, patch)
//! are not guarded against concurrent writers: between the lookup and the
//! final write another request may replace or delete the same item, and the
//! last write wins.

use crate::error::{Result, StoreError};
use crate::item::{Item, ItemInput};
use crate::naming::{self, EnglishPluralizer, Pluralizer};
use crate::patch::{self, PatchFormat};
use crate::repository::{ItemRepository, RepoResult, RepositoryError};
use serde::de::Error as _;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Item operations addressed by plural type segment and name.
pub struct ItemService<R> {
    repo: R,
    pluralizer: Arc<dyn Pluralizer>,
    call_timeout: Option<Duration>,
}

impl<R: ItemRepository> ItemService<R> {
    /// Service with English pluralization and no per-call deadline.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            pluralizer: Arc::new(EnglishPluralizer),
            call_timeout: None,
        }
    }

    /// Use a different pluralizer.
    #[must_use]
    pub fn with_pluralizer(mut self, pluralizer: Arc<dyn Pluralizer>) -> Self {
        self.pluralizer = pluralizer;
        self
    }

    /// Bound every repository call by `timeout`.
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// The underlying repository.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Create an item of the given type from a JSON body carrying `name` and `data`.
    ///
    /// # Errors
    /// Validation errors for the type, body and name; `Conflict` when the name
    /// is taken; `Internal` when the repository fails.
    pub async fn create(&self, type_plural: &str, body: &[u8]) -> Result<Item> {
        let item_type = self.resolve_type(type_plural)?;
        let input = decode_input(body)?;

        let name = match input.name {
            Some(name) if !name.is_empty() => name,
            _ => return Err(StoreError::MissingName),
        };
        naming::validate_name(&name)?;

        match self
            .call(self.repo.get_by_type_and_name(&item_type, &name))
            .await
        {
            Ok(_) => return Err(conflict(&item_type, &name)),
            Err(RepositoryError::NotFound) => {}
            Err(err) => return Err(StoreError::internal("lookup", err)),
        }

        let item = Item::new(item_type, name, input.data);

        self.call(self.repo.insert(&item))
            .await
            .map_err(|err| match err {
                RepositoryError::AlreadyExists(_) => conflict(&item.item_type, &item.name),
                err => StoreError::internal("insert", err),
            })?;

        info!(item_type = %item.item_type, name = %item.name, id = %item.id, "Created item");

        Ok(item)
    }

    /// All items of a type.
    ///
    /// # Errors
    /// Validation errors for the type; `Internal` when the repository fails.
    pub async fn list(&self, type_plural: &str) -> Result<Vec<Item>> {
        let item_type = self.resolve_type(type_plural)?;

        let items = self
            .call(self.repo.list_by_type(&item_type))
            .await
            .map_err(|err| StoreError::internal("list", err))?;

        debug!(item_type = %item_type, count = items.len(), "Listed items");

        Ok(items)
    }

    /// A single item.
    ///
    /// # Errors
    /// Validation errors; `NotFound`; `Internal` when the repository fails.
    pub async fn read(&self, type_plural: &str, name: &str) -> Result<Item> {
        let item_type = self.resolve_addressed(type_plural, name)?;
        self.lookup(&item_type, name).await
    }

    /// Overwrite the `data` of an existing item.
    ///
    /// Identity fields in the body are ignored.
    ///
    /// # Errors
    /// Validation errors; `NotFound`; `Internal` when the repository fails.
    pub async fn replace(&self, type_plural: &str, name: &str, body: &[u8]) -> Result<Item> {
        let item_type = self.resolve_addressed(type_plural, name)?;
        let input = decode_input(body)?;

        let mut item = self.lookup(&item_type, name).await?;
        item.set_data(input.data);

        self.persist(&item).await?;

        info!(item_type = %item.item_type, name = %item.name, id = %item.id, "Replaced item");

        Ok(item)
    }

    /// Apply a JSON Patch or JSON Merge Patch to an existing item.
    ///
    /// The patch runs against the full item document, but only the resulting
    /// `data` is kept; `id`, `type`, `name` and `created_at` never change.
    ///
    /// # Errors
    /// Validation errors (including an unsupported `content_type`, rejected
    /// before the body is parsed); `NotFound`; `MalformedPatch`;
    /// `PatchNotApplicable`; `Internal` when the repository fails.
    pub async fn patch(
        &self,
        type_plural: &str,
        name: &str,
        content_type: &str,
        body: &[u8],
    ) -> Result<Item> {
        let item_type = self.resolve_addressed(type_plural, name)?;
        let format = PatchFormat::from_content_type(content_type)?;

        let mut item = self.lookup(&item_type, name).await?;

        let original =
            serde_json::to_value(&item).map_err(|err| StoreError::internal("snapshot", err))?;
        let data = patch::patch_data(format, body, original)?;

        item.set_data(data);

        self.persist(&item).await?;

        info!(
            item_type = %item.item_type,
            name = %item.name,
            id = %item.id,
            format = %format,
            "Patched item"
        );

        Ok(item)
    }

    /// Remove an item.
    ///
    /// # Errors
    /// Validation errors; `NotFound`; `Internal` when the repository fails.
    pub async fn delete(&self, type_plural: &str, name: &str) -> Result<()> {
        let item_type = self.resolve_addressed(type_plural, name)?;
        let item = self.lookup(&item_type, name).await?;

        self.call(self.repo.delete(&item.id))
            .await
            .map_err(|err| match err {
                RepositoryError::NotFound => not_found(&item_type, name),
                err => StoreError::internal("delete", err),
            })?;

        info!(item_type = %item_type, name = %name, id = %item.id, "Deleted item");

        Ok(())
    }

    // Private helpers

    fn resolve_type(&self, type_plural: &str) -> Result<String> {
        naming::resolve_type(self.pluralizer.as_ref(), type_plural)
    }

    fn resolve_addressed(&self, type_plural: &str, name: &str) -> Result<String> {
        let item_type = self.resolve_type(type_plural)?;
        naming::validate_name(name)?;
        Ok(item_type)
    }

    async fn lookup(&self, item_type: &str, name: &str) -> Result<Item> {
        debug!(item_type = %item_type, name = %name, "Looking up item");

        self.call(self.repo.get_by_type_and_name(item_type, name))
            .await
            .map_err(|err| match err {
                RepositoryError::NotFound => not_found(item_type, name),
                err => StoreError::internal("lookup", err),
            })
    }

    async fn persist(&self, item: &Item) -> Result<()> {
        self.call(self.repo.replace(&item.id, item))
            .await
            .map_err(|err| match err {
                RepositoryError::NotFound => not_found(&item.item_type, &item.name),
                err => StoreError::internal("replace", err),
            })
    }

    async fn call<T>(&self, fut: impl Future<Output = RepoResult<T>>) -> RepoResult<T> {
        match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .unwrap_or(Err(RepositoryError::DeadlineExceeded)),
            None => fut.await,
        }
    }
}

/// Decode a request body, which must be a JSON object.
fn decode_input(body: &[u8]) -> Result<ItemInput> {
    let value: Value = serde_json::from_slice(body).map_err(StoreError::InvalidBody)?;
    if !value.is_object() {
        return Err(StoreError::InvalidBody(serde_json::Error::custom(
            "request body must be a JSON object",
        )));
    }
    serde_json::from_value(value).map_err(StoreError::InvalidBody)
}

fn conflict(item_type: &str, name: &str) -> StoreError {
    StoreError::Conflict {
        item_type: item_type.to_string(),
        name: name.to_string(),
    }
}

fn not_found(item_type: &str, name: &str) -> StoreError {
    StoreError::NotFound {
        item_type: item_type.to_string(),
        name: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::memory::MemoryRepository;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    const JSON_PATCH: &str = "application/json-patch+json";
    const MERGE_PATCH: &str = "application/merge-patch+json";

    fn service() -> ItemService<Arc<MemoryRepository>> {
        ItemService::new(Arc::new(MemoryRepository::new()))
    }

    async fn seeded(data: Value) -> (ItemService<Arc<MemoryRepository>>, Item) {
        let svc = service();
        let body = serde_json::to_vec(&json!({"name": "a1", "data": data})).unwrap();
        let item = svc.create("widgets", &body).await.unwrap();
        (svc, item)
    }

    #[tokio::test]
    async fn test_create_then_conflict() {
        let svc = service();

        let item = svc
            .create("widgets", br#"{"name":"a1","data":{"x":1}}"#)
            .await
            .unwrap();
        assert!(!item.id.is_empty());
        assert_eq!(item.item_type, "widget");
        assert_eq!(item.name, "a1");
        assert_eq!(item.data, json!({"x": 1}));
        assert_eq!(item.created_at, item.updated_at);

        let err = svc
            .create("widgets", br#"{"name":"a1"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_create_ignores_body_identity() {
        let svc = service();
        let item = svc
            .create(
                "widgets",
                br#"{"id":"forged","type":"gadget","name":"a1","data":1}"#,
            )
            .await
            .unwrap();

        assert_ne!(item.id, "forged");
        assert_eq!(item.item_type, "widget");
    }

    #[tokio::test]
    async fn test_create_validation() {
        let svc = service();

        assert!(matches!(
            svc.create("widget", br#"{"name":"a1"}"#).await,
            Err(StoreError::NotPlural(_))
        ));
        assert!(matches!(
            svc.create("widgets", b"not json").await,
            Err(StoreError::InvalidBody(_))
        ));
        assert!(matches!(
            svc.create("widgets", br#"{"data":1}"#).await,
            Err(StoreError::MissingName)
        ));
        assert!(matches!(
            svc.create("widgets", br#"{"name":""}"#).await,
            Err(StoreError::MissingName)
        ));
        assert!(matches!(
            svc.create("widgets", br#"{"name":"bad name"}"#).await,
            Err(StoreError::InvalidName(_))
        ));
        assert!(svc.repository().is_empty());
    }

    #[tokio::test]
    async fn test_bodies_must_be_objects() {
        let (svc, original) = seeded(json!({"x": 1})).await;

        for body in [&br#"["b1", {"x":1}]"#[..], b"\"b1\"", b"null", b"42"] {
            assert!(matches!(
                svc.create("widgets", body).await,
                Err(StoreError::InvalidBody(_))
            ));
        }
        assert!(matches!(
            svc.replace("widgets", "a1", br#"[{"x":2}]"#).await,
            Err(StoreError::InvalidBody(_))
        ));
        assert!(matches!(
            svc.create("widgets", br#"{"name":5}"#).await,
            Err(StoreError::InvalidBody(_))
        ));

        assert_eq!(svc.repository().len(), 1);
        assert_eq!(svc.read("widgets", "a1").await.unwrap(), original);
    }

    #[tokio::test]
    async fn test_irregular_plural_types() {
        let svc = service();

        for (type_plural, item_type) in [
            ("people", "person"),
            ("children", "child"),
            ("mice", "mouse"),
            ("heroes", "hero"),
            ("sheep", "sheep"),
        ] {
            let item = svc
                .create(type_plural, br#"{"name":"a1"}"#)
                .await
                .unwrap();
            assert_eq!(item.item_type, item_type);
            assert_eq!(svc.read(type_plural, "a1").await.unwrap(), item);
        }

        assert!(matches!(
            svc.create("person", br#"{"name":"a1"}"#).await,
            Err(StoreError::NotPlural(_))
        ));
    }

    #[tokio::test]
    async fn test_read_missing() {
        let svc = service();
        let err = svc.read("widgets", "missing").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_invalid_identifiers_never_reach_repository() {
        let svc = service();
        svc.repository().set_simulate_write_error(true);
        svc.repository().set_latency(Duration::from_secs(60));

        // would hang for a minute if the repository were touched
        assert!(matches!(
            svc.read("widgets", "-bad").await,
            Err(StoreError::InvalidName(_))
        ));
        assert!(matches!(
            svc.delete("Widgets!", "a1").await,
            Err(StoreError::NotPlural(_) | StoreError::InvalidType(_))
        ));
        assert!(matches!(
            svc.patch("widgets", "a1", "text/plain", b"{}").await,
            Err(StoreError::UnsupportedPatchFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_list() {
        let svc = service();
        assert!(svc.list("widgets").await.unwrap().is_empty());

        svc.create("widgets", br#"{"name":"a"}"#).await.unwrap();
        svc.create("widgets", br#"{"name":"b"}"#).await.unwrap();
        svc.create("categories", br#"{"name":"c"}"#).await.unwrap();

        let names: Vec<String> = svc
            .list("widgets")
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(svc.list("categories").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replace_keeps_identity() {
        let (svc, original) = seeded(json!({"x": 1})).await;

        let updated = svc
            .replace(
                "widgets",
                "a1",
                br#"{"id":"forged","type":"forged","name":"forged","created_at":"2000-01-01T00:00:00Z","data":{"x":2}}"#,
            )
            .await
            .unwrap();

        assert_eq!(updated.data, json!({"x": 2}));
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.item_type, original.item_type);
        assert_eq!(updated.name, original.name);
        assert_eq!(updated.created_at, original.created_at);
        assert!(updated.updated_at > original.updated_at);

        let stored = svc.read("widgets", "a1").await.unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn test_replace_missing() {
        let svc = service();
        assert!(matches!(
            svc.replace("widgets", "nope", br#"{"data":1}"#).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete() {
        let (svc, _) = seeded(json!(null)).await;

        svc.delete("widgets", "a1").await.unwrap();
        assert!(matches!(
            svc.read("widgets", "a1").await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            svc.delete("widgets", "a1").await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_merge_patch_deletes_key() {
        let (svc, original) = seeded(json!({"y": 5, "z": 6})).await;

        let patched = svc
            .patch("widgets", "a1", MERGE_PATCH, br#"{"data":{"y":null}}"#)
            .await
            .unwrap();

        assert_eq!(patched.data, json!({"z": 6}));
        assert!(patched.updated_at > original.updated_at);
        assert_eq!(patched.created_at, original.created_at);
    }

    #[tokio::test]
    async fn test_json_patch_replace() {
        let (svc, _) = seeded(json!({"y": 5})).await;

        let patched = svc
            .patch(
                "widgets",
                "a1",
                JSON_PATCH,
                br#"[{"op":"replace","path":"/data/y","value":7}]"#,
            )
            .await
            .unwrap();

        assert_eq!(patched.data, json!({"y": 7}));
    }

    #[tokio::test]
    async fn test_json_patch_failed_test_leaves_item() {
        let (svc, original) = seeded(json!({"y": 5})).await;

        let err = svc
            .patch(
                "widgets",
                "a1",
                JSON_PATCH,
                br#"[{"op":"test","path":"/data/y","value":99},{"op":"replace","path":"/data/y","value":7}]"#,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::PatchNotApplicable(_)));
        assert_eq!(err.kind(), ErrorKind::Validation);

        let stored = svc.read("widgets", "a1").await.unwrap();
        assert_eq!(stored, original);
    }

    #[tokio::test]
    async fn test_patch_cannot_forge_identity() {
        let (svc, original) = seeded(json!({"y": 5})).await;

        let merged = svc
            .patch(
                "widgets",
                "a1",
                MERGE_PATCH,
                br#"{"id":"forged","type":"forged","name":"forged","data":{"y":1}}"#,
            )
            .await
            .unwrap();

        let operations = br#"[
            {"op":"replace","path":"/id","value":"forged"},
            {"op":"replace","path":"/type","value":"forged"},
            {"op":"replace","path":"/name","value":"forged"},
            {"op":"replace","path":"/created_at","value":"1999-01-01T00:00:00Z"},
            {"op":"copy","from":"/data","path":"/name"},
            {"op":"replace","path":"/data/y","value":2}
        ]"#;
        let patched = svc
            .patch("widgets", "a1", JSON_PATCH, operations)
            .await
            .unwrap();

        for item in [&merged, &patched] {
            assert_eq!(item.id, original.id);
            assert_eq!(item.item_type, original.item_type);
            assert_eq!(item.name, original.name);
            assert_eq!(item.created_at, original.created_at);
        }
        assert_eq!(merged.data, json!({"y": 1}));
        assert_eq!(patched.data, json!({"y": 2}));

        let stored = svc.read("widgets", "a1").await.unwrap();
        assert_eq!(stored.id, original.id);
        assert_eq!(stored.name, "a1");
    }

    #[tokio::test]
    async fn test_patch_errors() {
        let (svc, _) = seeded(json!({"y": 5})).await;

        assert!(matches!(
            svc.patch("widgets", "a1", "application/json", b"not even json")
                .await,
            Err(StoreError::UnsupportedPatchFormat(_))
        ));
        assert!(matches!(
            svc.patch("widgets", "a1", JSON_PATCH, br#"{"op":"add"}"#).await,
            Err(StoreError::MalformedPatch { .. })
        ));
        assert!(matches!(
            svc.patch("widgets", "a1", MERGE_PATCH, b"{").await,
            Err(StoreError::MalformedPatch { .. })
        ));
        assert!(matches!(
            svc.patch("widgets", "missing", MERGE_PATCH, b"{}").await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_repository_failures_are_internal() {
        let (svc, original) = seeded(json!({"y": 5})).await;
        svc.repository().set_simulate_write_error(true);

        let err = svc
            .replace("widgets", "a1", br#"{"data":{"y":6}}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Internal { step: "replace", .. }));
        assert_eq!(err.kind(), ErrorKind::Internal);

        let err = svc
            .create("widgets", br#"{"name":"b1"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Internal { step: "insert", .. }));

        svc.repository().set_simulate_write_error(false);
        assert_eq!(svc.read("widgets", "a1").await.unwrap(), original);
    }

    #[tokio::test]
    async fn test_call_timeout() {
        let repo = Arc::new(MemoryRepository::new());
        let svc = ItemService::new(Arc::clone(&repo)).with_call_timeout(Duration::from_millis(20));
        repo.set_latency(Duration::from_millis(500));

        let err = svc.read("widgets", "a1").await.unwrap_err();
        assert!(matches!(err, StoreError::Internal { step: "lookup", .. }));
    }
}
