//! `{data, error}` response envelope shared by every adapter.
//!
//! # Responsibility
//! - Render typed store results into the wire envelope.
//! - Own the literal error strings adapters must return.
//!
//! # Invariants
//! - Success: `error` is empty. Failure: `data` is `""` and `error` is not.
//! - Add-path failures carry the `mysql error: ` prefix, no other path does.

use crate::model::resource::{ResourceDraft, ResourceId};
use crate::service::error::{StoreError, StoreErrorKind, StoreResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const RESOURCE_NOT_FOUND: &str = "The selected resource not found";
pub const RESOURCE_ALREADY_EXISTS: &str = "The resource already exists";
pub const TOO_MANY_ATTACHMENTS: &str = "The resource has too many attachements";
const ADD_ERROR_PREFIX: &str = "mysql error: ";

/// Store operation a result belongs to; selects error rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    AddResource,
    GetResourceById,
    UpdateResource,
    DeleteResource,
    GetResourcesByIds,
    GetResourcesByCategory,
    GetCategories,
    GetCategory,
}

/// Response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub data: Value,
    pub error: String,
}

impl Envelope {
    /// Wraps a successful payload.
    pub fn success<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self {
                data,
                error: String::new(),
            },
            Err(err) => Self::failure(format!("failed to encode response: {err}")),
        }
    }

    /// Wraps a failure message; `data` becomes the empty string.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            data: Value::String(String::new()),
            error: message.into(),
        }
    }

    /// Renders a store result for `operation`.
    pub fn from_result<T: Serialize>(operation: Operation, result: &StoreResult<T>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(err) => Self::failure(error_message(operation, err)),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_empty()
    }

    /// Compact JSON text of the envelope.
    pub fn to_json(&self) -> String {
        // `Envelope` holds only a `Value` and a `String`, which always encode.
        serde_json::to_string(self).unwrap_or_else(|_| String::from(r#"{"data":"","error":""}"#))
    }
}

/// Wire error string for `err` raised by `operation`.
pub fn error_message(operation: Operation, err: &StoreError) -> String {
    let message = match err.kind() {
        StoreErrorKind::DuplicateId => RESOURCE_ALREADY_EXISTS.to_string(),
        StoreErrorKind::TooManyAttachments => TOO_MANY_ATTACHMENTS.to_string(),
        StoreErrorKind::NotFound => RESOURCE_NOT_FOUND.to_string(),
        StoreErrorKind::Validation | StoreErrorKind::Internal => err.to_string(),
    };

    if operation == Operation::AddResource {
        format!("{ADD_ERROR_PREFIX}{message}")
    } else {
        message
    }
}

/// Decodes an add/update request body.
pub fn parse_draft(body: &str) -> StoreResult<ResourceDraft> {
    serde_json::from_str(body).map_err(|err| StoreError::MalformedRequest(err.to_string()))
}

/// Decodes a resource id given as text.
pub fn parse_resource_id(value: &str) -> StoreResult<ResourceId> {
    ResourceId::parse_str(value.trim())
        .map_err(|err| StoreError::MalformedRequest(format!("invalid resource id `{value}`: {err}")))
}
