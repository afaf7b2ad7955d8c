//! Core task model, ports and the dispatch pipeline.

pub mod dispatcher;
pub mod error;
pub mod outbound;
pub mod processor;
pub mod store;
pub mod task;
pub mod transport;

pub use dispatcher::{
    DispatchStats, Dispatcher, DispatcherState, DEFAULT_RECEIVE_DEADLINE,
    DEFAULT_RECEIVE_ERROR_BACKOFF, DEFAULT_RECEIVE_WAIT, DEFAULT_WORKER_COUNT, MAX_WORKER_COUNT,
};
pub use error::{AppResult, PoisonError, RequesterError, StoreError};
pub use outbound::{OutboundClient, OutboundRequest};
pub use processor::{HttpTaskProcessor, TaskProcessor};
pub use store::TaskStore;
pub use task::{
    RequestBody, RequestHeaders, ResponseData, ResponseHeaders, Task, TaskId, TaskSpec, TaskStatus,
    TaskUpdate, UNKNOWN_CONTENT_LENGTH,
};
pub use transport::{QueueMessage, QueueTransport, QueueTransportExt, ReceiveRequest};
