//! API surface used by the request-acceptance side.

pub mod api;

pub use api::{health, submit_task, task_status, Health, TaskStatusResponse};
