//! Item model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A stored resource, addressed by `(item_type, name)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    /// Unique identifier, generated at creation.
    pub id: String,

    /// Singular type (e.g. "widget" for a `/widgets` path).
    #[serde(rename = "type")]
    pub item_type: String,

    /// Name, unique within its type.
    pub name: String,

    /// Opaque client payload.
    #[serde(default)]
    pub data: Value,

    /// Creation timestamp (RFC 3339 UTC).
    pub created_at: DateTime<Utc>,

    /// Last update timestamp (RFC 3339 UTC).
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Create a new item with a fresh id and both timestamps set to now.
    #[must_use]
    pub fn new(item_type: impl Into<String>, name: impl Into<String>, data: Value) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            item_type: item_type.into(),
            name: name.into(),
            data,
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh `updated_at`.
    ///
    /// The new value is always strictly greater than the previous one, even
    /// when the clock has not moved since the last mutation.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::microseconds(1)
        };
    }

    /// Replace the payload and refresh `updated_at`.
    pub fn set_data(&mut self, data: Value) {
        self.data = data;
        self.touch();
    }
}

/// Body accepted by create and replace.
///
/// Only `name` (create) and `data` (create, replace) are consumed; any other
/// field of the item representation is accepted and ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemInput {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub data: Value,
}

/// Wire envelope for list responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemList {
    pub items: Vec<Item>,
}
