//! itemstore-core: schema-less typed items with CRUD and patch semantics.
//!
//! This crate provides:
//! - `Item`: the stored resource, addressed by singular type and name
//! - Identifier rules and plural/singular type normalization
//! - `ItemRepository`: the persistence contract, plus an in-memory implementation
//! - `ItemService`: create, list, read, replace, patch and delete pipelines
//! - JSON Patch (RFC 6902) and JSON Merge Patch (RFC 7396) support

pub mod error;
mod inflection;
pub mod item;
pub mod memory;
pub mod naming;
pub mod patch;
pub mod repository;
pub mod service;

pub use error::{BoxError, ErrorKind, Result, StoreError};
pub use item::{Item, ItemInput, ItemList};
pub use memory::MemoryRepository;
pub use naming::{EnglishPluralizer, Pluralizer, resolve_type, validate_name, validate_type};
pub use patch::{JSON_PATCH_MEDIA_TYPE, MERGE_PATCH_MEDIA_TYPE, PatchDocument, PatchFormat};
pub use repository::{ItemRepository, RepoResult, RepositoryError};
pub use service::ItemService;
