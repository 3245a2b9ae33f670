//! Patch documents for partial item updates.
//!
//! Supports:
//! - JSON Patch (RFC 6902): an ordered list of operations addressed by JSON pointer
//! - JSON Merge Patch (RFC 7396): a partial document merged key by key
//!
//! Patches are applied to the full JSON representation of an item. Only the
//! `data` of the result is ever read back, see [`PatchedItem`].

use crate::error::{Result, StoreError};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Media type of a JSON Patch document.
pub const JSON_PATCH_MEDIA_TYPE: &str = "application/json-patch+json";

/// Media type of a JSON Merge Patch document.
pub const MERGE_PATCH_MEDIA_TYPE: &str = "application/merge-patch+json";

/// Supported patch formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchFormat {
    /// RFC 6902.
    JsonPatch,
    /// RFC 7396.
    MergePatch,
}

impl PatchFormat {
    /// Resolve a declared content type, ignoring parameters and case.
    ///
    /// # Errors
    /// Returns `StoreError::UnsupportedPatchFormat` for anything else.
    pub fn from_content_type(content_type: &str) -> Result<Self> {
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match media_type.as_str() {
            JSON_PATCH_MEDIA_TYPE => Ok(Self::JsonPatch),
            MERGE_PATCH_MEDIA_TYPE => Ok(Self::MergePatch),
            _ => Err(StoreError::UnsupportedPatchFormat(content_type.to_string())),
        }
    }

    /// Canonical media type.
    #[must_use]
    pub const fn media_type(self) -> &'static str {
        match self {
            Self::JsonPatch => JSON_PATCH_MEDIA_TYPE,
            Self::MergePatch => MERGE_PATCH_MEDIA_TYPE,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::JsonPatch => "json patch",
            Self::MergePatch => "merge patch",
        }
    }
}

impl FromStr for PatchFormat {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_content_type(s)
    }
}

impl fmt::Display for PatchFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.media_type())
    }
}

/// A decoded patch, ready to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchDocument {
    /// RFC 6902 operation list.
    Operations(json_patch::Patch),
    /// RFC 7396 merge document.
    Merge(Value),
}

impl PatchDocument {
    /// Decode `body` according to `format`.
    ///
    /// # Errors
    /// Returns `StoreError::MalformedPatch` if the body is not a valid document
    /// of that format.
    pub fn decode(format: PatchFormat, body: &[u8]) -> Result<Self> {
        let malformed = |source| StoreError::MalformedPatch {
            format: format.label(),
            source,
        };

        match format {
            PatchFormat::JsonPatch => serde_json::from_slice(body)
                .map(Self::Operations)
                .map_err(malformed),
            PatchFormat::MergePatch => serde_json::from_slice(body)
                .map(Self::Merge)
                .map_err(malformed),
        }
    }

    /// Apply the patch to `target` in place.
    ///
    /// A JSON Patch is all or nothing: when any operation fails (missing
    /// path, failed `test`, type mismatch) `target` is left as it was.
    /// A merge patch always applies.
    ///
    /// # Errors
    /// Returns `StoreError::PatchNotApplicable` when an operation fails.
    pub fn apply(&self, target: &mut Value) -> Result<()> {
        match self {
            Self::Operations(operations) => {
                let mut working = target.clone();
                json_patch::patch(&mut working, operations)
                    .map_err(|err| StoreError::PatchNotApplicable(err.to_string()))?;
                *target = working;
            }
            Self::Merge(document) => json_patch::merge(target, document),
        }
        Ok(())
    }
}

/// The part of a patched document that is read back into the item.
///
/// Identity fields and timestamps are deliberately absent: whatever a patch
/// did to them is discarded. A missing `data` reads as `null`.
#[derive(Debug, Clone, Deserialize)]
pub struct PatchedItem {
    #[serde(default)]
    pub data: Value,
}

impl PatchedItem {
    /// Read the candidate out of a patched document.
    ///
    /// # Errors
    /// Returns `StoreError::PatchNotApplicable` when the document is no longer
    /// an object.
    pub fn from_document(document: Value) -> Result<Self> {
        if !document.is_object() {
            return Err(StoreError::PatchNotApplicable(
                "patched document is not an object".to_string(),
            ));
        }
        serde_json::from_value(document).map_err(|err| {
            StoreError::PatchNotApplicable(format!("patched document is not an item: {err}"))
        })
    }
}

/// Decode `body` as `format`, apply it to `document` and return the resulting `data`.
///
/// # Errors
/// Propagates decode and apply failures from [`PatchDocument`] and [`PatchedItem`].
pub fn patch_data(format: PatchFormat, body: &[u8], mut document: Value) -> Result<Value> {
    let patch = PatchDocument::decode(format, body)?;
    patch.apply(&mut document)?;
    Ok(PatchedItem::from_document(document)?.data)
}
