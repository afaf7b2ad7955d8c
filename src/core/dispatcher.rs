//! Dispatcher: long-polls the queue transport and fans messages out to a
//! fixed pool of members.
//!
//! # Lifecycle
//!
//! `Idle → Running → Draining → Stopped`
//!
//! - **Running**: a single dispatch loop receives batches sized to the pool
//!   and hands each message over a zero-capacity channel. The hand-off
//!   blocks while every member is busy, so nothing is buffered beyond the
//!   batch that was just received.
//! - **Draining**: the run's cancellation token fired (or the dispatch loop
//!   panicked). No new receive is issued; members finish the message they
//!   hold and exit.
//! - **Stopped**: every member has been joined.
//!
//! # Failure isolation
//!
//! A panic while handling one message is logged and the member moves on to
//! the next message. A panic in the dispatch loop is logged and ends the
//! run: the hand-off channel is dropped with the loop, which releases idle
//! members without touching the caller's cancellation token.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument, Span};

use super::error::RequesterError;
use super::processor::TaskProcessor;
use super::task::TaskId;
use super::transport::{QueueMessage, QueueTransport, QueueTransportExt, ReceiveRequest};
use crate::util::panic_message;

/// Pool size used when none is configured.
pub const DEFAULT_WORKER_COUNT: usize = 3;
/// Hard upper bound on the pool size.
pub const MAX_WORKER_COUNT: usize = 10;
/// Long-poll wait requested on each receive.
pub const DEFAULT_RECEIVE_WAIT: Duration = Duration::from_secs(10);
/// Deadline applied to each receive call independently of the run.
pub const DEFAULT_RECEIVE_DEADLINE: Duration = Duration::from_secs(20);
/// Pause after a failed receive before polling again.
pub const DEFAULT_RECEIVE_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Run state of a [`Dispatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// Built, not yet running.
    Idle,
    /// Receiving and dispatching messages.
    Running,
    /// No longer receiving; members are finishing in-flight messages.
    Draining,
    /// All members and the dispatch loop have exited.
    Stopped,
}

/// Snapshot of dispatcher activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Number of pool members.
    pub worker_count: usize,
    /// Messages returned by receive calls.
    pub received: u64,
    /// Messages whose task was processed successfully.
    pub processed: u64,
    /// Messages left for redelivery after a decode or processing failure.
    pub failed: u64,
    /// Messages evicted as poison.
    pub poisoned: u64,
    /// Messages deleted after successful processing.
    pub deleted: u64,
    /// Messages processed successfully whose delete failed; they will be redelivered.
    pub delete_failed: u64,
    /// Panics recovered in members or in the dispatch loop.
    pub panics: u64,
}

/// Internal counters for dispatcher statistics (thread-safe).
#[derive(Debug, Default)]
struct DispatchCounters {
    received: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
    poisoned: AtomicU64,
    deleted: AtomicU64,
    delete_failed: AtomicU64,
    panics: AtomicU64,
}

impl DispatchCounters {
    fn snapshot(&self, worker_count: usize) -> DispatchStats {
        DispatchStats {
            worker_count,
            received: self.received.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            poisoned: self.poisoned.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            delete_failed: self.delete_failed.load(Ordering::Relaxed),
            panics: self.panics.load(Ordering::Relaxed),
        }
    }
}

/// Validated dispatcher components, assembled by
/// [`DispatcherBuilder`](crate::builders::DispatcherBuilder).
pub(crate) struct DispatcherParts {
    pub queue_url: String,
    pub worker_count: usize,
    pub receive_wait: Duration,
    pub receive_deadline: Duration,
    pub receive_error_backoff: Duration,
    pub transport: Arc<dyn QueueTransport>,
    pub processor: Arc<dyn TaskProcessor>,
    pub span: Span,
}

/// Queue consumer driving a bounded pool of processing members.
pub struct Dispatcher {
    queue_url: String,
    worker_count: usize,
    receive_wait: Duration,
    receive_deadline: Duration,
    receive_error_backoff: Duration,
    transport: Arc<dyn QueueTransport>,
    processor: Arc<dyn TaskProcessor>,
    span: Span,
    state: RwLock<DispatcherState>,
    counters: Arc<DispatchCounters>,
}

impl Dispatcher {
    pub(crate) fn from_parts(parts: DispatcherParts) -> Self {
        Self {
            queue_url: parts.queue_url,
            worker_count: parts.worker_count,
            receive_wait: parts.receive_wait,
            receive_deadline: parts.receive_deadline,
            receive_error_backoff: parts.receive_error_backoff,
            transport: parts.transport,
            processor: parts.processor,
            span: parts.span,
            state: RwLock::new(DispatcherState::Idle),
            counters: Arc::new(DispatchCounters::default()),
        }
    }

    /// Queue this dispatcher consumes.
    #[must_use]
    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }

    /// Number of pool members.
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Current run state.
    #[must_use]
    pub fn state(&self) -> DispatcherState {
        *self.state.read()
    }

    /// Current statistics.
    #[must_use]
    pub fn stats(&self) -> DispatchStats {
        self.counters.snapshot(self.worker_count)
    }

    /// Run until `cancel` fires or the dispatch loop fails.
    ///
    /// Returns once every pool member has exited. A dispatcher runs once.
    ///
    /// # Errors
    ///
    /// - `RequesterError::Config` if the dispatcher already ran
    /// - `RequesterError::Panic` if the dispatch loop panicked
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), RequesterError> {
        {
            let mut state = self.state.write();
            if *state != DispatcherState::Idle {
                return Err(RequesterError::Config(format!(
                    "dispatcher can only run once, current state is {:?}",
                    *state
                )));
            }
            *state = DispatcherState::Running;
        }

        let span = self.span.clone();
        self.run_pool(cancel).instrument(span).await
    }

    async fn run_pool(&self, cancel: CancellationToken) -> Result<(), RequesterError> {
        let (tx, rx) = flume::bounded::<QueueMessage>(0);

        let mut members = Vec::with_capacity(self.worker_count);
        for member_id in 0..self.worker_count {
            let member = PoolMember {
                member_id,
                queue_url: self.queue_url.clone(),
                transport: Arc::clone(&self.transport),
                processor: Arc::clone(&self.processor),
                counters: Arc::clone(&self.counters),
            };
            members.push(tokio::spawn(
                member.run(rx.clone(), cancel.clone()).instrument(Span::current()),
            ));
        }
        drop(rx);

        info!(
            worker_count = self.worker_count,
            queue_url = %self.queue_url,
            "waiting for messages"
        );

        let outcome = AssertUnwindSafe(self.dispatch_loop(tx, &cancel))
            .catch_unwind()
            .await;
        self.set_state(DispatcherState::Draining);

        let result = outcome.map_err(|panic| {
            let message = panic_message(&*panic);
            self.counters.panics.fetch_add(1, Ordering::Relaxed);
            error!(panic = %message, "dispatch loop panicked, ending run");
            RequesterError::Panic(message)
        });

        for (member_id, member) in members.into_iter().enumerate() {
            if let Err(e) = member.await {
                warn!(member_id, error = %e, "pool member did not exit cleanly");
            }
        }

        self.set_state(DispatcherState::Stopped);
        info!(stats = ?self.stats(), "dispatcher stopped");
        result
    }

    async fn dispatch_loop(&self, tx: flume::Sender<QueueMessage>, cancel: &CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                info!("termination of the dispatcher due to cancellation");
                return;
            }

            let received = tokio::select! {
                () = cancel.cancelled() => {
                    info!("termination of the dispatcher due to cancellation");
                    return;
                }
                received = self.receive() => received,
            };

            let messages = match received {
                Ok(messages) => messages,
                Err(e) => {
                    error!(error = %e, "error reading messages from the queue");
                    tokio::select! {
                        () = cancel.cancelled() => return,
                        () = tokio::time::sleep(self.receive_error_backoff) => {}
                    }
                    continue;
                }
            };

            self.counters
                .received
                .fetch_add(messages.len() as u64, Ordering::Relaxed);

            for message in messages {
                tokio::select! {
                    () = cancel.cancelled() => return,
                    sent = tx.send_async(message) => {
                        if sent.is_err() {
                            warn!("no pool member is accepting messages");
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn receive(&self) -> Result<Vec<QueueMessage>, RequesterError> {
        let request = ReceiveRequest {
            queue_url: self.queue_url.clone(),
            max_messages: self.worker_count,
            wait_time: self.receive_wait,
            visibility_timeout: self.transport.visibility_timeout(),
        };

        tokio::time::timeout(self.receive_deadline, self.transport.receive(request))
            .await
            .map_err(|_| {
                RequesterError::Transport(format!(
                    "receive exceeded its deadline of {:?}",
                    self.receive_deadline
                ))
            })?
    }

    fn set_state(&self, state: DispatcherState) {
        *self.state.write() = state;
    }
}

/// One member of the pool.
struct PoolMember {
    member_id: usize,
    queue_url: String,
    transport: Arc<dyn QueueTransport>,
    processor: Arc<dyn TaskProcessor>,
    counters: Arc<DispatchCounters>,
}

impl PoolMember {
    async fn run(self, rx: flume::Receiver<QueueMessage>, cancel: CancellationToken) {
        debug!(member_id = self.member_id, "pool member started");

        loop {
            let message = tokio::select! {
                () = cancel.cancelled() => break,
                received = rx.recv_async() => match received {
                    Ok(message) => message,
                    // Dispatch loop is gone.
                    Err(_) => break,
                },
            };

            let message_id = message.message_id.clone();
            if let Err(panic) = AssertUnwindSafe(self.handle(message)).catch_unwind().await {
                self.counters.panics.fetch_add(1, Ordering::Relaxed);
                error!(
                    member_id = self.member_id,
                    message_id = %message_id,
                    panic = %panic_message(&*panic),
                    "panic while handling message"
                );
            }
        }

        debug!(member_id = self.member_id, "pool member exiting");
    }

    /// Decode, process, and delete on success.
    async fn handle(&self, message: QueueMessage) {
        let span = tracing::info_span!(
            "message",
            member_id = self.member_id,
            message_id = %message.message_id
        );
        self.handle_in_span(&message).instrument(span).await;
    }

    async fn handle_in_span(&self, message: &QueueMessage) {
        let start = Instant::now();
        info!("message received for processing");

        let task_id: TaskId = match self.transport.decode(&self.queue_url, message).await {
            Ok(task_id) => task_id,
            Err(e) => {
                if e.is_poison() {
                    self.counters.poisoned.fetch_add(1, Ordering::Relaxed);
                } else {
                    self.counters.failed.fetch_add(1, Ordering::Relaxed);
                }
                error!(error = %e, "error decoding the message");
                return;
            }
        };

        if let Err(e) = self.processor.process(task_id).await {
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
            error!(%task_id, error = %e, "error processing the message");
            return;
        }
        self.counters.processed.fetch_add(1, Ordering::Relaxed);

        if let Err(e) = self.transport.delete(&self.queue_url, message).await {
            self.counters.delete_failed.fetch_add(1, Ordering::Relaxed);
            error!(%task_id, error = %e, "error deleting the message");
            return;
        }
        self.counters.deleted.fetch_add(1, Ordering::Relaxed);

        info!(%task_id, duration = ?start.elapsed(), "successfully processed the message");
    }
}
