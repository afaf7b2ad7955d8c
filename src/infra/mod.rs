//! Infrastructure adapters for queues, task storage and outbound HTTP.

pub mod http;
pub mod queue;
pub mod store;

pub use http::ReqwestClient;
pub use queue::InMemoryBroker;
pub use store::{FileTaskStore, InMemoryTaskStore};
