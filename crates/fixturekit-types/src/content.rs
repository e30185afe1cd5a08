//! Content references and creation payloads exchanged with the host platform.
//!
//! The platform itself is opaque; builders only ever see a [`ContentRef`]
//! (physical path + portal type) and hand the platform a [`CreateRequest`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Accumulated named arguments of an object builder.
///
/// Ordered so that dumps and assertions are deterministic.
pub type Arguments = BTreeMap<String, serde_json::Value>;

/// A reference to an object living in the host platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentRef {
    /// Physical path, e.g. `/plone/folder/the-page`.
    pub path: String,
    /// Platform type name, e.g. `Folder`.
    pub portal_type: String,
}

impl ContentRef {
    pub fn new(path: impl Into<String>, portal_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            portal_type: portal_type.into(),
        }
    }

    /// The last path segment.
    pub fn id(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }

    /// Path of a child object with the given id.
    pub fn child_path(&self, id: &str) -> String {
        format!("{}/{}", self.path.trim_end_matches('/'), id)
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path, self.portal_type)
    }
}

/// Date fields a builder can set after creation.
///
/// Each field maps onto the catalog indexes that must be refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateField {
    Effective,
    Expiration,
    Creation,
    Modification,
}

impl DateField {
    /// Catalog indexes to reindex after setting this field.
    pub fn indexes(&self) -> &'static [&'static str] {
        match self {
            DateField::Effective => &["effective", "effectiveRange"],
            DateField::Expiration => &["expires", "effectiveRange"],
            DateField::Creation => &["created"],
            DateField::Modification => &["modified"],
        }
    }
}

/// A file payload attached to a file-like object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePayload {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Schema information about a single field of a content type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub readonly: bool,
    /// Field-level default, used when no default provider answers.
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            readonly: false,
            default: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }
}

/// Everything the platform needs to create one object.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRequest {
    pub container: ContentRef,
    pub portal_type: String,
    pub id: String,
    pub arguments: Arguments,
    /// Payload and the field it is stored in (`file` or `image`).
    pub payload: Option<(String, FilePayload)>,
    pub check_constraints: bool,
    pub created: Option<DateTime<Utc>>,
}
