//! # Requester
//!
//! Executes stored HTTP requests asynchronously and records their outcome.
//!
//! A caller registers a request (method, URL, headers, JSON body) as a task
//! and enqueues its identifier. A [`Dispatcher`](core::Dispatcher) long-polls
//! the queue and fans messages out to a bounded pool; each member drives the
//! task through its state machine and deletes the message only once the
//! outcome is persisted.
//!
//! ## Task lifecycle
//!
//! `New → InProcess → Done`, with `Error` recorded for failed attempts. A
//! redelivered message retries an `Error` task; a `Done` task is never
//! touched again.
//!
//! ## Delivery
//!
//! The queue is at-least-once. A message that fails processing stays in the
//! queue and reappears after its visibility timeout. A message delivered
//! more often than the attempt limit, or whose body does not parse, is
//! deleted as poison without being processed.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use requester::builders::DispatcherBuilder;
//! use requester::config::RequesterConfig;
//! use requester::core::HttpTaskProcessor;
//! use requester::infra::{InMemoryBroker, InMemoryTaskStore, ReqwestClient};
//! use tokio_util::sync::CancellationToken;
//!
//! let cfg = RequesterConfig::from_env()?;
//! let broker = Arc::new(InMemoryBroker::new(&cfg.queue));
//! let store = Arc::new(InMemoryTaskStore::new());
//! let client = Arc::new(ReqwestClient::from_config(&cfg)?);
//! let queue_url = broker.queue_url(&cfg.task_queue).await?;
//!
//! let dispatcher = DispatcherBuilder::from_config(&cfg)
//!     .with_queue_url(queue_url)
//!     .with_transport(broker)
//!     .with_processor(Arc::new(HttpTaskProcessor::new(store, client)))
//!     .with_span(tracing::info_span!("requester"))
//!     .build()?;
//!
//! let cancel = CancellationToken::new();
//! dispatcher.run(cancel.child_token()).await?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Task model, ports, processor and dispatcher.
pub mod core;
/// Configuration models for the dispatcher, queue and outbound client.
pub mod config;
/// Builders to construct requester components from configuration.
pub mod builders;
/// Infrastructure adapters for queues, task storage and outbound HTTP.
pub mod infra;
/// Acceptance-side API helpers.
pub mod runtime;
/// Shared utilities.
pub mod util;
