//! Workspace management and item persistence.

use crate::config::WorkspaceConfig;
use crate::error::{FsError, Result};
use itemstore_core::{Item, ItemRepository, RepoResult, RepositoryError};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};
use uuid::Uuid;
use walkdir::WalkDir;

/// Directory name for itemstore configuration.
const STORE_DIR: &str = ".itemstore";
/// Configuration file name.
const CONFIG_FILE: &str = "config.yml";
/// Items directory name.
const ITEMS_DIR: &str = "items";
/// Extension of item documents.
const ITEM_EXT: &str = "json";

/// A workspace stores items as JSON documents under `items/<type>/<name>.json`.
///
/// Single calls are atomic: documents are written to a hidden temporary file
/// first, then linked (insert) or renamed (replace) into place.
///
/// Writes address items by id. Document paths are remembered per id after the
/// first full scan of `items/`, so the tree is only walked again when an
/// indexed path no longer holds the item.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Root path of the workspace.
    root: PathBuf,
    /// Workspace configuration.
    config: WorkspaceConfig,
    /// Document paths by item id, shared between clones.
    index: Arc<Mutex<Option<IdIndex>>>,
}

type IdIndex = HashMap<String, PathBuf>;

/// A hidden temporary document, removed on drop unless persisted.
///
/// Covers failed writes and futures dropped mid-call (e.g. by a deadline).
struct TempDocument {
    path: PathBuf,
    persisted: bool,
}

impl TempDocument {
    fn path(&self) -> &Path {
        &self.path
    }

    /// The file was moved into place; nothing to clean up.
    fn persist(mut self) {
        self.persisted = true;
    }
}

impl Drop for TempDocument {
    fn drop(&mut self) {
        if self.persisted {
            return;
        }
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != ErrorKind::NotFound {
                debug!(path = %self.path.display(), error = %err, "Failed to remove temp file");
            }
        }
    }
}

impl Workspace {
    /// Initialize a new workspace at the given path.
    ///
    /// # Errors
    /// Returns error if workspace already exists or IO fails.
    pub fn init(path: impl AsRef<Path>, config: WorkspaceConfig) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let store_dir = root.join(STORE_DIR);

        if store_dir.exists() {
            return Err(FsError::WorkspaceExists(root));
        }

        fs::create_dir_all(&store_dir)?;
        fs::create_dir_all(root.join(ITEMS_DIR))?;

        let config_content = serde_yaml::to_string(&config)?;
        fs::write(store_dir.join(CONFIG_FILE), config_content)?;

        info!(path = %root.display(), "Initialized workspace");

        Ok(Self {
            root,
            config,
            index: Arc::default(),
        })
    }

    /// Open an existing workspace at the given path.
    ///
    /// # Errors
    /// Returns error if workspace doesn't exist or config is invalid.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let config_path = root.join(STORE_DIR).join(CONFIG_FILE);

        if !config_path.exists() {
            return Err(FsError::WorkspaceNotFound(root));
        }

        let config_content = fs::read_to_string(&config_path)?;
        let config: WorkspaceConfig = serde_yaml::from_str(&config_content)?;

        debug!(path = %root.display(), "Opened workspace");

        Ok(Self {
            root,
            config,
            index: Arc::default(),
        })
    }

    /// Get the workspace root path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the workspace configuration.
    #[must_use]
    pub const fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    fn items_dir(&self) -> PathBuf {
        self.root.join(ITEMS_DIR)
    }

    fn type_dir(&self, item_type: &str) -> Result<PathBuf> {
        Ok(self.items_dir().join(checked_segment(item_type)?))
    }

    fn item_path(&self, item_type: &str, name: &str) -> Result<PathBuf> {
        let file = format!("{}.{ITEM_EXT}", checked_segment(name)?);
        Ok(self.type_dir(item_type)?.join(file))
    }

    async fn read_item(path: &Path) -> Result<Item> {
        let content = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&content)?)
    }

    /// Write `item` to a hidden temporary file next to `target`.
    async fn write_temp(target: &Path, item: &Item) -> Result<TempDocument> {
        let dir = target
            .parent()
            .ok_or_else(|| FsError::InvalidSegment(target.display().to_string()))?;
        tokio::fs::create_dir_all(dir).await?;

        let tmp = TempDocument {
            path: dir.join(format!(".{}.tmp", Uuid::new_v4().as_simple())),
            persisted: false,
        };
        let content = serde_json::to_vec_pretty(item)?;
        tokio::fs::write(tmp.path(), content).await?;
        Ok(tmp)
    }

    fn index(&self) -> MutexGuard<'_, Option<IdIndex>> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Walk the items tree, rebuild the index and return the path for `id`.
    async fn rescan(&self, id: &str) -> Result<Option<PathBuf>> {
        let items_dir = self.items_dir();

        let found = tokio::task::spawn_blocking(move || {
            WalkDir::new(&items_dir)
                .min_depth(2)
                .max_depth(2)
                .into_iter()
                .filter_map(std::result::Result::ok)
                .filter(|entry| entry.file_type().is_file() && is_item_document(entry.path()))
                .filter_map(|entry| {
                    let content = fs::read(entry.path()).ok()?;
                    Some((document_id(&content)?, entry.into_path()))
                })
                .collect::<IdIndex>()
        })
        .await?;

        debug!(count = found.len(), "Indexed item documents");

        let path = found.get(id).cloned();
        *self.index() = Some(found);
        Ok(path)
    }

    /// Find the document holding the item with `id`.
    async fn locate(&self, id: &str) -> Result<Option<PathBuf>> {
        let cached = self.index().as_ref().and_then(|index| index.get(id).cloned());

        if let Some(path) = cached {
            let content = tokio::fs::read(&path).await.ok();
            if content.as_deref().and_then(document_id).as_deref() == Some(id) {
                return Ok(Some(path));
            }
        }

        self.rescan(id).await
    }

    /// Whether some document already holds `id`. Ids are random, so once the
    /// index exists it is trusted without rescanning.
    async fn id_taken(&self, id: &str) -> Result<bool> {
        let known = self.index().as_ref().map(|index| index.contains_key(id));
        match known {
            Some(known) => Ok(known),
            None => Ok(self.rescan(id).await?.is_some()),
        }
    }

    fn remember(&self, id: &str, path: PathBuf) {
        if let Some(index) = self.index().as_mut() {
            index.insert(id.to_string(), path);
        }
    }

    fn forget(&self, id: &str) {
        if let Some(index) = self.index().as_mut() {
            index.remove(id);
        }
    }

    async fn insert_item(&self, item: &Item) -> Result<RepoResult<()>> {
        if self.id_taken(&item.id).await? {
            return Ok(Err(RepositoryError::AlreadyExists(item.id.clone())));
        }

        let target = self.item_path(&item.item_type, &item.name)?;
        let tmp = Self::write_temp(&target, item).await?;

        // hard_link refuses to overwrite, which makes the create exclusive
        let linked = tokio::fs::hard_link(tmp.path(), &target).await;
        drop(tmp);

        match linked {
            Ok(()) => {
                self.remember(&item.id, target);
                Ok(Ok(()))
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(Err(
                RepositoryError::AlreadyExists(format!("{}/{}", item.item_type, item.name)),
            )),
            Err(err) => Err(err.into()),
        }
    }

    async fn list_items(&self, item_type: &str) -> Result<Vec<Item>> {
        let dir = self.type_dir(item_type)?;

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut items = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_item_document(&path) {
                continue;
            }

            match Self::read_item(&path).await {
                Ok(item) => items.push(item),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Failed to read item, skipping");
                }
            }
        }

        items.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        Ok(items)
    }

    async fn replace_item(&self, id: &str, item: &Item) -> Result<()> {
        let target = self
            .locate(id)
            .await?
            .ok_or_else(|| std::io::Error::from(ErrorKind::NotFound))?;

        let tmp = Self::write_temp(&target, item).await?;
        tokio::fs::rename(tmp.path(), &target).await?;
        tmp.persist();
        Ok(())
    }

    async fn delete_item(&self, id: &str) -> Result<()> {
        let target = self
            .locate(id)
            .await?
            .ok_or_else(|| std::io::Error::from(ErrorKind::NotFound))?;

        tokio::fs::remove_file(&target).await?;
        self.forget(id);
        Ok(())
    }
}

impl ItemRepository for Workspace {
    async fn insert(&self, item: &Item) -> RepoResult<()> {
        self.insert_item(item).await?
    }

    async fn get_by_type_and_name(&self, item_type: &str, name: &str) -> RepoResult<Item> {
        let path = self.item_path(item_type, name)?;
        Ok(Self::read_item(&path).await?)
    }

    async fn list_by_type(&self, item_type: &str) -> RepoResult<Vec<Item>> {
        Ok(self.list_items(item_type).await?)
    }

    async fn replace(&self, id: &str, item: &Item) -> RepoResult<()> {
        Ok(self.replace_item(id, item).await?)
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        Ok(self.delete_item(id).await?)
    }
}

/// Reject anything that could escape its directory or collide with temp files.
fn checked_segment(segment: &str) -> Result<&str> {
    if segment.is_empty()
        || segment.starts_with('.')
        || segment.contains(['/', '\\'])
        || segment.contains('\0')
    {
        return Err(FsError::InvalidSegment(segment.to_string()));
    }
    Ok(segment)
}

fn is_item_document(path: &Path) -> bool {
    let visible = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| !n.starts_with('.'));
    visible && path.extension().is_some_and(|ext| ext == ITEM_EXT)
}

fn document_id(content: &[u8]) -> Option<String> {
    #[derive(Deserialize)]
    struct IdOnly {
        id: String,
    }

    serde_json::from_slice::<IdOnly>(content).ok().map(|d| d.id)
}
