//! Resource domain model.
//!
//! # Responsibility
//! - Define the canonical stored record and its fixed-shape content.
//! - Translate between the wire mapping (`{"location": .., "<uuid>": ..}`)
//!   and the typed content.
//!
//! # Invariants
//! - `id` is stable and never reused for another resource.
//! - Content holds `location` plus at most one attachment.
//! - An attachment key is a canonical UUID naming the derived record.

use crate::model::category::CategoryId;
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a resource record.
pub type ResourceId = Uuid;

/// Reserved content key holding the resource's own location.
pub const LOCATION_KEY: &str = "location";

/// Free-form content mapping as received on the wire.
pub type ContentMap = BTreeMap<String, String>;

/// Validation failure for resource payloads and records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceValidationError {
    /// Content has no `location` entry.
    MissingLocation,
    /// `location` (or an attachment path) is blank.
    EmptyLocation,
    /// Content carries more than one non-`location` entry.
    TooManyAttachments { count: usize },
    /// Attachment key is not a UUID.
    InvalidAttachmentId(String),
    /// Category is not part of the static catalog.
    UnknownCategory(CategoryId),
}

impl Display for ResourceValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingLocation => write!(f, "content is missing `{LOCATION_KEY}`"),
            Self::EmptyLocation => write!(f, "content location cannot be empty"),
            Self::TooManyAttachments { count } => {
                write!(f, "content has {count} attachments, at most 1 is allowed")
            }
            Self::InvalidAttachmentId(key) => {
                write!(f, "attachment key `{key}` is not a valid uuid")
            }
            Self::UnknownCategory(id) => write!(f, "unknown category {id}"),
        }
    }
}

impl Error for ResourceValidationError {}

/// Attachment reference embedded in a resource's content.
///
/// `id` doubles as the identifier of the derived `Content` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub id: ResourceId,
    pub location: String,
}

/// Fixed-shape resource content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceContent {
    pub location: String,
    pub attachment: Option<Attachment>,
}

impl ResourceContent {
    /// Content with a location and no attachment.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            attachment: None,
        }
    }

    /// Content with a location and one attachment.
    pub fn with_attachment(
        location: impl Into<String>,
        attachment_id: ResourceId,
        attachment_location: impl Into<String>,
    ) -> Self {
        Self {
            location: location.into(),
            attachment: Some(Attachment {
                id: attachment_id,
                location: attachment_location.into(),
            }),
        }
    }

    /// Builds typed content from a wire mapping.
    ///
    /// # Errors
    /// - `MissingLocation` / `EmptyLocation` for a bad `location` entry.
    /// - `TooManyAttachments` when more than one extra key is present.
    /// - `InvalidAttachmentId` when the extra key is not a UUID.
    pub fn from_map(map: &ContentMap) -> Result<Self, ResourceValidationError> {
        let location = map
            .get(LOCATION_KEY)
            .ok_or(ResourceValidationError::MissingLocation)?;

        let mut extra = map.iter().filter(|(key, _)| key.as_str() != LOCATION_KEY);
        let count = map.len() - 1;
        if count > 1 {
            return Err(ResourceValidationError::TooManyAttachments { count });
        }

        let attachment = match extra.next() {
            Some((key, value)) => Some(Attachment {
                id: parse_attachment_id(key)?,
                location: value.clone(),
            }),
            None => None,
        };

        let content = Self {
            location: location.clone(),
            attachment,
        };
        content.validate()?;
        Ok(content)
    }

    /// Renders the wire mapping for this content.
    pub fn to_map(&self) -> ContentMap {
        let mut map = ContentMap::new();
        map.insert(LOCATION_KEY.to_string(), self.location.clone());
        if let Some(attachment) = &self.attachment {
            map.insert(attachment.id.to_string(), attachment.location.clone());
        }
        map
    }

    /// Checks that all stored paths are non-blank.
    pub fn validate(&self) -> Result<(), ResourceValidationError> {
        if self.location.trim().is_empty() {
            return Err(ResourceValidationError::EmptyLocation);
        }
        if let Some(attachment) = &self.attachment {
            if attachment.location.trim().is_empty() {
                return Err(ResourceValidationError::EmptyLocation);
            }
        }
        Ok(())
    }
}

impl Serialize for ResourceContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = 1 + usize::from(self.attachment.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry(LOCATION_KEY, &self.location)?;
        if let Some(attachment) = &self.attachment {
            map.serialize_entry(&attachment.id.to_string(), &attachment.location)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ResourceContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = ContentMap::deserialize(deserializer)?;
        Self::from_map(&map).map_err(D::Error::custom)
    }
}

/// Canonical persisted resource record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub category: CategoryId,
    pub content: ResourceContent,
}

impl Resource {
    /// Creates a resource without attachment.
    pub fn new(id: ResourceId, category: CategoryId, location: impl Into<String>) -> Self {
        Self {
            id,
            category,
            content: ResourceContent::new(location),
        }
    }

    /// Builds the `Content` record derived from an attachment reference.
    pub fn derived_from(attachment: &Attachment) -> Self {
        Self::new(attachment.id, CategoryId::CONTENT, attachment.location.clone())
    }

    /// Returns the derived record this resource's attachment requires, if any.
    pub fn derived_record(&self) -> Option<Resource> {
        self.content.attachment.as_ref().map(Self::derived_from)
    }

    /// Validates category membership and content paths.
    pub fn validate(&self) -> Result<(), ResourceValidationError> {
        if !self.category.is_known() {
            return Err(ResourceValidationError::UnknownCategory(self.category));
        }
        self.content.validate()
    }
}

/// Incoming resource payload whose content is still a free mapping.
///
/// Add and update requests are decoded into this shape first so that an
/// oversized mapping reaches the attachment splitter instead of failing
/// during decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDraft {
    pub id: ResourceId,
    pub category: CategoryId,
    pub content: ContentMap,
}

impl ResourceDraft {
    pub fn new(id: ResourceId, category: CategoryId) -> Self {
        Self {
            id,
            category,
            content: ContentMap::new(),
        }
    }

    /// Builder-style helper for inserting one content entry.
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.content.insert(key.into(), value.into());
        self
    }

    /// Number of non-`location` entries in the mapping.
    pub fn attachment_count(&self) -> usize {
        self.content
            .keys()
            .filter(|key| key.as_str() != LOCATION_KEY)
            .count()
    }
}

impl From<&Resource> for ResourceDraft {
    fn from(value: &Resource) -> Self {
        Self {
            id: value.id,
            category: value.category,
            content: value.content.to_map(),
        }
    }
}

/// How a derived record is written together with its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DerivedWrite {
    /// Newly introduced attachment; the derived id must not exist yet.
    Create(Resource),
    /// Existing attachment whose location changed; the derived record is
    /// rewritten, or recreated when it was deleted in the meantime. A row under
    /// that id which no longer has the derived shape is never overwritten.
    Replace(Resource),
}

impl DerivedWrite {
    pub fn record(&self) -> &Resource {
        match self {
            Self::Create(record) | Self::Replace(record) => record,
        }
    }

    pub fn into_record(self) -> Resource {
        match self {
            Self::Create(record) | Self::Replace(record) => record,
        }
    }
}

/// Records committed together by one add or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSet {
    pub primary: Resource,
    pub derived: Option<DerivedWrite>,
}

fn parse_attachment_id(key: &str) -> Result<ResourceId, ResourceValidationError> {
    Uuid::parse_str(key).map_err(|_| ResourceValidationError::InvalidAttachmentId(key.to_string()))
}
