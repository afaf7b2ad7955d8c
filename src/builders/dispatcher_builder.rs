//! Builder that assembles a validated [`Dispatcher`].

use std::sync::Arc;
use std::time::Duration;

use tracing::Span;

use crate::config::RequesterConfig;
use crate::core::dispatcher::DispatcherParts;
use crate::core::{
    Dispatcher, QueueTransport, RequesterError, TaskProcessor, DEFAULT_RECEIVE_DEADLINE,
    DEFAULT_RECEIVE_ERROR_BACKOFF, DEFAULT_RECEIVE_WAIT, DEFAULT_WORKER_COUNT, MAX_WORKER_COUNT,
};

/// Collects dispatcher components; [`build`](Self::build) validates them.
///
/// ```rust,ignore
/// let dispatcher = DispatcherBuilder::new()
///     .with_queue_url(queue_url)
///     .with_worker_count(4)
///     .with_transport(transport)
///     .with_processor(processor)
///     .with_span(tracing::info_span!("requester"))
///     .build()?;
/// ```
#[derive(Clone)]
pub struct DispatcherBuilder {
    queue_url: Option<String>,
    worker_count: usize,
    receive_wait: Duration,
    receive_deadline: Duration,
    receive_error_backoff: Duration,
    transport: Option<Arc<dyn QueueTransport>>,
    processor: Option<Arc<dyn TaskProcessor>>,
    span: Option<Span>,
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatcherBuilder {
    /// Builder with default timing and no components.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            queue_url: None,
            worker_count: DEFAULT_WORKER_COUNT,
            receive_wait: DEFAULT_RECEIVE_WAIT,
            receive_deadline: DEFAULT_RECEIVE_DEADLINE,
            receive_error_backoff: DEFAULT_RECEIVE_ERROR_BACKOFF,
            transport: None,
            processor: None,
            span: None,
        }
    }

    /// Builder with worker count and timing taken from configuration.
    #[must_use]
    pub fn from_config(cfg: &RequesterConfig) -> Self {
        Self::new()
            .with_worker_count(cfg.workers)
            .with_receive_wait(cfg.receive_wait())
            .with_receive_deadline(cfg.receive_deadline())
            .with_receive_error_backoff(cfg.receive_error_backoff())
    }

    /// Queue to consume.
    #[must_use]
    pub fn with_queue_url(mut self, queue_url: impl Into<String>) -> Self {
        self.queue_url = Some(queue_url.into());
        self
    }

    /// Number of pool members, `1..=10`.
    #[must_use]
    pub const fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Long-poll wait per receive.
    #[must_use]
    pub const fn with_receive_wait(mut self, wait: Duration) -> Self {
        self.receive_wait = wait;
        self
    }

    /// Deadline of a single receive call.
    #[must_use]
    pub const fn with_receive_deadline(mut self, deadline: Duration) -> Self {
        self.receive_deadline = deadline;
        self
    }

    /// Pause after a failed receive.
    #[must_use]
    pub const fn with_receive_error_backoff(mut self, backoff: Duration) -> Self {
        self.receive_error_backoff = backoff;
        self
    }

    /// Queue transport shared by the dispatch loop and every member.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn QueueTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Processor invoked for each decoded task id.
    #[must_use]
    pub fn with_processor(mut self, processor: Arc<dyn TaskProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Span that scopes every log line the dispatcher emits.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    ///
    /// Returns [`RequesterError::Config`] when the worker count is outside
    /// `1..=10` or a component is missing.
    pub fn build(self) -> Result<Dispatcher, RequesterError> {
        if self.worker_count == 0 || self.worker_count > MAX_WORKER_COUNT {
            return Err(RequesterError::Config(format!(
                "worker count must be between 1 and {MAX_WORKER_COUNT}, got {}",
                self.worker_count
            )));
        }
        if self.receive_deadline.is_zero() {
            return Err(RequesterError::Config("receive deadline must be non-zero".into()));
        }

        let queue_url = self
            .queue_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| missing("queue url"))?;
        let transport = self.transport.ok_or_else(|| missing("queue transport"))?;
        let processor = self.processor.ok_or_else(|| missing("task processor"))?;
        let span = self.span.ok_or_else(|| missing("logging span"))?;

        Ok(Dispatcher::from_parts(DispatcherParts {
            queue_url,
            worker_count: self.worker_count,
            receive_wait: self.receive_wait,
            receive_deadline: self.receive_deadline,
            receive_error_backoff: self.receive_error_backoff,
            transport,
            processor,
            span,
        }))
    }
}

fn missing(what: &str) -> RequesterError {
    RequesterError::Config(format!("{what} is required"))
}
