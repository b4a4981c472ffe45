use std::collections::BTreeMap;
use std::fmt;

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// -------------------------
// Inbound event envelope
// -------------------------

/// Classification of an inbound remote event.
///
/// Unknown classifications are preserved in [`RemoteEventType::Other`] so the
/// dispatcher can reject them with a well-formed result instead of failing
/// deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RemoteEventType {
    AppInstalled,
    AppUninstalling,
    ItemAdding,
    ItemUpdating,
    Other(String),
}

impl RemoteEventType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::AppInstalled => "AppInstalled",
            Self::AppUninstalling => "AppUninstalling",
            Self::ItemAdding => "ItemAdding",
            Self::ItemUpdating => "ItemUpdating",
            Self::Other(name) => name,
        }
    }

    /// Whether this event carries pending item field values.
    pub fn is_item_mutation(&self) -> bool {
        matches!(self, Self::ItemAdding | Self::ItemUpdating)
    }
}

impl From<String> for RemoteEventType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "AppInstalled" => Self::AppInstalled,
            "AppUninstalling" => Self::AppUninstalling,
            "ItemAdding" => Self::ItemAdding,
            "ItemUpdating" => Self::ItemUpdating,
            _ => Self::Other(value),
        }
    }
}

impl From<RemoteEventType> for String {
    fn from(value: RemoteEventType) -> Self {
        match value {
            RemoteEventType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for RemoteEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Properties of an app lifecycle event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppEventProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_web_full_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_web_full_url: Option<String>,
}

/// Properties of an item mutation event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemEventProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_item_id: Option<i64>,
    /// Pending field values of the item, as proposed by the caller.
    #[serde(default)]
    pub after_properties: BTreeMap<String, serde_json::Value>,
}

/// The `properties` argument of `ProcessEvent` / `ProcessOneWayEvent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEventProperties {
    pub event_type: RemoteEventType,
    /// Opaque security context handed to the session factory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_event_properties: Option<AppEventProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_event_properties: Option<ItemEventProperties>,
}

impl RemoteEventProperties {
    pub fn new(event_type: RemoteEventType) -> Self {
        Self {
            event_type,
            context_token: None,
            app_event_properties: None,
            item_event_properties: None,
        }
    }

    pub fn with_context_token(mut self, token: impl Into<String>) -> Self {
        self.context_token = Some(token.into());
        self
    }

    pub fn with_host_web(mut self, url: impl Into<String>) -> Self {
        self.app_event_properties
            .get_or_insert_with(AppEventProperties::default)
            .host_web_full_url = Some(url.into());
        self
    }

    pub fn with_item(mut self, item: ItemEventProperties) -> Self {
        self.item_event_properties = Some(item);
        self
    }
}

// -------------------------
// Outbound result envelope
// -------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteEventStatus {
    #[serde(rename = "OK")]
    Ok,
    CancelWithError,
}

/// Result of `ProcessEvent`.
///
/// `changed_item_properties` is applied by the caller to the item before the
/// mutation is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEventResult {
    pub status: RemoteEventStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub changed_item_properties: BTreeMap<String, String>,
}

impl RemoteEventResult {
    pub fn ok() -> Self {
        Self {
            status: RemoteEventStatus::Ok,
            error_message: None,
            changed_item_properties: BTreeMap::new(),
        }
    }

    pub fn cancel_with_error(message: impl Into<String>) -> Self {
        Self {
            status: RemoteEventStatus::CancelWithError,
            error_message: Some(message.into()),
            changed_item_properties: BTreeMap::new(),
        }
    }

    pub fn with_changed_property(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.changed_item_properties.insert(field.into(), value.into());
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == RemoteEventStatus::Ok
    }
}

impl Default for RemoteEventResult {
    fn default() -> Self {
        Self::ok()
    }
}

// -------------------------
// Transport-level errors
// -------------------------

/// JSON body returned with transport-level failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fault {
    /// Machine-readable code: `invalid` or `not-supported`.
    pub code: String,
    pub message: String,
}

/// Failures raised before or outside event dispatch, mapped to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("Not implemented: {0}")]
    NotImplemented(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
    pub fn unsupported_media_type(msg: impl Into<String>) -> Self {
        Self::UnsupportedMediaType(msg.into())
    }
    pub fn not_implemented(msg: impl Into<String>) -> Self {
        Self::NotImplemented(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
        }
    }

    pub fn to_fault(&self) -> Fault {
        let (code, message) = match self {
            ApiError::BadRequest(msg) => ("invalid", msg),
            ApiError::UnsupportedMediaType(msg) => ("not-supported", msg),
            ApiError::NotImplemented(msg) => ("not-supported", msg),
        };
        Fault {
            code: code.to_string(),
            message: message.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::to_vec(&self.to_fault()).unwrap_or_else(|_| b"{}".to_vec());

        let mut response = (status, body).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}
