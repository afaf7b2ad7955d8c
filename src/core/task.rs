//! Task entity, lifecycle status and store update payloads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique task identifier.
pub type TaskId = Uuid;

/// Request headers supplied at creation time.
pub type RequestHeaders = BTreeMap<String, String>;

/// Response headers, each name mapped to its values in received order.
pub type ResponseHeaders = BTreeMap<String, Vec<String>>;

/// JSON object sent as the request body.
pub type RequestBody = serde_json::Map<String, serde_json::Value>;

/// Content length recorded when the remote server does not report one.
pub const UNKNOWN_CONTENT_LENGTH: i64 = -1;

/// Processing status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, not yet picked up.
    New,
    /// A processor is executing the outbound call.
    InProcess,
    /// The outbound call completed and the response was recorded.
    Done,
    /// The last attempt failed; a redelivery may retry it.
    Error,
}

impl TaskStatus {
    /// Whether a task in this status may move to `next`.
    ///
    /// `Done` accepts nothing. `Error` may be re-entered into `InProcess`
    /// on redelivery.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::New | Self::Error, Self::InProcess)
                | (Self::New | Self::InProcess, Self::Error)
                | (Self::InProcess, Self::Done)
        )
    }
}

/// Outbound call specification supplied when a task is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// HTTP method, e.g. `GET`.
    pub method: String,
    /// Absolute target URL.
    pub url: String,
    /// Optional request headers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<RequestHeaders>,
    /// Optional JSON object body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,
}

impl TaskSpec {
    /// A spec with no headers and no body.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: None,
            body: None,
        }
    }

    /// Attach request headers.
    #[must_use]
    pub fn with_headers(mut self, headers: RequestHeaders) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Attach a JSON object body.
    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }
}

/// Response data recorded on the transition into `Done`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseData {
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers in received order.
    pub headers: ResponseHeaders,
    /// Length reported by the transport, `-1` when unknown.
    pub content_length: i64,
}

/// A stored task and its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Task identifier.
    pub id: TaskId,
    /// Current status.
    pub status: TaskStatus,
    /// HTTP method.
    pub method: String,
    /// Target URL.
    pub url: String,
    /// Request headers.
    pub headers: Option<RequestHeaders>,
    /// Request body.
    pub body: Option<RequestBody>,
    /// Response status code, set only when `Done`.
    pub response_status_code: Option<u16>,
    /// Response headers, set only when `Done`.
    pub response_headers: Option<ResponseHeaders>,
    /// Response content length, set only when `Done`.
    pub response_content_length: Option<i64>,
}

impl Task {
    /// Build a fresh `New` task from a spec.
    #[must_use]
    pub fn from_spec(id: TaskId, spec: TaskSpec) -> Self {
        Self {
            id,
            status: TaskStatus::New,
            method: spec.method,
            url: spec.url,
            headers: spec.headers,
            body: spec.body,
            response_status_code: None,
            response_headers: None,
            response_content_length: None,
        }
    }

    /// Recorded response, if the task reached `Done`.
    #[must_use]
    pub fn response(&self) -> Option<ResponseData> {
        Some(ResponseData {
            status_code: self.response_status_code?,
            headers: self.response_headers.clone()?,
            content_length: self.response_content_length?,
        })
    }

    /// Apply a partial update in place.
    ///
    /// Returns `false` without touching anything when the task is already
    /// `Done` or the status change is not allowed by
    /// [`TaskStatus::can_transition_to`]. A repeated write of the current
    /// status counts as not allowed, so a late duplicate run changes nothing.
    pub fn apply(&mut self, update: TaskUpdate) -> bool {
        if self.status == TaskStatus::Done {
            return false;
        }
        if let Some(status) = update.status {
            if !self.status.can_transition_to(status) {
                return false;
            }
            self.status = status;
        }
        if let Some(response) = update.response {
            self.response_status_code = Some(response.status_code);
            self.response_headers = Some(response.headers);
            self.response_content_length = Some(response.content_length);
        }
        true
    }
}

/// Partial update applied by the task store as a single write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    /// New status, if changing.
    pub status: Option<TaskStatus>,
    /// Response fields, written together.
    pub response: Option<ResponseData>,
}

impl TaskUpdate {
    /// Status-only update.
    #[must_use]
    pub const fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            response: None,
        }
    }

    /// Transition into `Done` together with the response fields.
    #[must_use]
    pub const fn done(response: ResponseData) -> Self {
        Self {
            status: Some(TaskStatus::Done),
            response: Some(response),
        }
    }
}
