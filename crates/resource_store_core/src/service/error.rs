//! Store use-case error taxonomy.

use crate::model::category::CategoryId;
use crate::model::resource::{ResourceId, ResourceValidationError};
use crate::repo::resource_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Coarse failure class used for wire rendering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    DuplicateId,
    TooManyAttachments,
    NotFound,
    Validation,
    Internal,
}

impl StoreErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateId => "duplicate_id",
            Self::TooManyAttachments => "too_many_attachments",
            Self::NotFound => "not_found",
            Self::Validation => "validation",
            Self::Internal => "internal",
        }
    }
}

/// Error returned by store and query services.
#[derive(Debug)]
pub enum StoreError {
    /// Add (or a newly introduced attachment) collides with an existing id.
    DuplicateId(ResourceId),
    /// Content would carry more than one attachment.
    TooManyAttachments { count: usize },
    /// Target resource does not exist.
    ResourceNotFound(ResourceId),
    /// Batch lookup named ids that do not exist.
    ResourcesNotFound(Vec<ResourceId>),
    /// Category scan matched no resource.
    CategoryEmpty(CategoryId),
    /// Category id is not part of the catalog.
    CategoryUnknown(CategoryId),
    /// No catalog entry carries this name.
    CategoryNameUnknown(String),
    /// Payload could not be decoded.
    MalformedRequest(String),
    /// Decoded payload breaks a content or category rule.
    Validation(ResourceValidationError),
    /// Persistence-layer failure.
    Internal(RepoError),
}

impl StoreError {
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            Self::DuplicateId(_) => StoreErrorKind::DuplicateId,
            Self::TooManyAttachments { .. } => StoreErrorKind::TooManyAttachments,
            Self::ResourceNotFound(_)
            | Self::ResourcesNotFound(_)
            | Self::CategoryEmpty(_)
            | Self::CategoryUnknown(_)
            | Self::CategoryNameUnknown(_) => StoreErrorKind::NotFound,
            Self::MalformedRequest(_) | Self::Validation(_) => StoreErrorKind::Validation,
            Self::Internal(_) => StoreErrorKind::Internal,
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateId(id) => write!(f, "resource already exists: {id}"),
            Self::TooManyAttachments { count } => {
                write!(f, "resource has {count} attachments, at most 1 is allowed")
            }
            Self::ResourceNotFound(id) => write!(f, "resource not found: {id}"),
            Self::ResourcesNotFound(ids) => {
                let joined = ids
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                write!(f, "resources not found: {joined}")
            }
            Self::CategoryEmpty(id) => write!(f, "no resource in category {id}"),
            Self::CategoryUnknown(id) => write!(f, "category not found: {id}"),
            Self::CategoryNameUnknown(name) => write!(f, "category not found: `{name}`"),
            Self::MalformedRequest(message) => write!(f, "malformed request: {message}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Internal(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Internal(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceValidationError> for StoreError {
    fn from(value: ResourceValidationError) -> Self {
        match value {
            ResourceValidationError::TooManyAttachments { count } => {
                Self::TooManyAttachments { count }
            }
            other => Self::Validation(other),
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::ResourceNotFound(id),
            RepoError::AlreadyExists(id) => Self::DuplicateId(id),
            RepoError::Validation(err) => err.into(),
            other => Self::Internal(other),
        }
    }
}
