//! In-memory broker with at-least-once delivery semantics.
//!
//! Messages are kept per queue in FIFO order. A receive hides the returned
//! messages for the visibility timeout and bumps their receive count; a
//! message that is not deleted before the timeout expires becomes visible
//! again. Receives long-poll until a message is sent, a hidden message
//! reappears, or the wait elapses.
//!
//! Each delivery gets a fresh receipt handle. Only the handle of the latest
//! delivery deletes the message; an older handle is accepted as a no-op.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::config::QueueConfig;
use crate::core::{QueueMessage, QueueTransport, ReceiveRequest, RequesterError};

const URL_SCHEME: &str = "memory://";

/// Stand-in for "never" when a timeout does not fit on the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `now + timeout`, saturated to a far-future instant instead of overflowing.
fn instant_after(now: Instant, timeout: Duration) -> Instant {
    now.checked_add(timeout)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

struct StoredMessage {
    id: String,
    body: String,
    receive_count: u32,
    receipt_handle: Option<String>,
    visible_at: Instant,
}

#[derive(Default)]
struct BrokerQueue {
    messages: VecDeque<StoredMessage>,
}

impl BrokerQueue {
    /// Hide and return up to `max` visible messages, oldest first.
    fn take_visible(&mut self, now: Instant, max: usize, visibility: Duration) -> Vec<QueueMessage> {
        self.messages
            .iter_mut()
            .filter(|m| m.visible_at <= now)
            .take(max)
            .map(|m| {
                m.receive_count += 1;
                m.visible_at = instant_after(now, visibility);
                let receipt_handle = format!("{}:{}", m.id, m.receive_count);
                m.receipt_handle = Some(receipt_handle.clone());
                QueueMessage {
                    message_id: m.id.clone(),
                    receipt_handle,
                    body: m.body.clone(),
                    receive_count: Some(m.receive_count),
                }
            })
            .collect()
    }

    fn next_visible_at(&self) -> Option<Instant> {
        self.messages.iter().map(|m| m.visible_at).min()
    }
}

/// Process-local broker implementing [`QueueTransport`].
pub struct InMemoryBroker {
    visibility_timeout: Duration,
    max_attempts: Option<u32>,
    queues: Mutex<HashMap<String, BrokerQueue>>,
    arrivals: Notify,
}

impl InMemoryBroker {
    /// Create a broker with no queues.
    #[must_use]
    pub fn new(config: &QueueConfig) -> Self {
        Self {
            visibility_timeout: config.visibility_timeout(),
            max_attempts: config.max_attempts(),
            queues: Mutex::new(HashMap::new()),
            arrivals: Notify::new(),
        }
    }

    /// Override the visibility timeout with sub-second precision.
    #[must_use]
    pub const fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = timeout;
        self
    }

    /// Messages stored in a queue, hidden ones included.
    #[must_use]
    pub fn message_count(&self, queue_url: &str) -> usize {
        self.queues
            .lock()
            .get(queue_url)
            .map_or(0, |q| q.messages.len())
    }

    fn unknown_queue(queue_url: &str) -> RequesterError {
        RequesterError::Transport(format!("queue `{queue_url}` does not exist"))
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new(&QueueConfig::default())
    }
}

#[async_trait]
impl QueueTransport for InMemoryBroker {
    fn visibility_timeout(&self) -> Duration {
        self.visibility_timeout
    }

    fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    async fn queue_url(&self, name: &str) -> Result<String, RequesterError> {
        if name.is_empty() {
            return Err(RequesterError::Config("queue name must not be empty".into()));
        }
        let url = format!("{URL_SCHEME}{name}");
        self.queues.lock().entry(url.clone()).or_default();
        Ok(url)
    }

    async fn receive(&self, request: ReceiveRequest) -> Result<Vec<QueueMessage>, RequesterError> {
        let deadline = instant_after(Instant::now(), request.wait_time);

        loop {
            // Register for wake-ups before looking so a concurrent send is not missed.
            let arrival = self.arrivals.notified();
            tokio::pin!(arrival);
            arrival.as_mut().enable();

            let next_visible = {
                let mut queues = self.queues.lock();
                let queue = queues
                    .get_mut(&request.queue_url)
                    .ok_or_else(|| Self::unknown_queue(&request.queue_url))?;
                let batch = queue.take_visible(
                    Instant::now(),
                    request.max_messages,
                    request.visibility_timeout,
                );
                if !batch.is_empty() {
                    debug!(queue_url = %request.queue_url, count = batch.len(), "messages received");
                    return Ok(batch);
                }
                queue.next_visible_at()
            };

            if Instant::now() >= deadline {
                return Ok(Vec::new());
            }
            let wake_at = next_visible.map_or(deadline, |at| at.min(deadline));
            // Elapsing is the normal way out of an idle wait.
            let _ = tokio::time::timeout_at(wake_at, arrival).await;
        }
    }

    async fn delete(&self, queue_url: &str, message: &QueueMessage) -> Result<(), RequesterError> {
        let mut queues = self.queues.lock();
        let queue = queues
            .get_mut(queue_url)
            .ok_or_else(|| Self::unknown_queue(queue_url))?;
        let before = queue.messages.len();
        queue
            .messages
            .retain(|m| m.receipt_handle.as_deref() != Some(message.receipt_handle.as_str()));
        if queue.messages.len() == before {
            debug!(
                queue_url,
                message_id = %message.message_id,
                "receipt handle is stale or already deleted"
            );
        }
        Ok(())
    }

    async fn send_raw(&self, queue_url: &str, body: String) -> Result<(), RequesterError> {
        {
            let mut queues = self.queues.lock();
            let queue = queues
                .get_mut(queue_url)
                .ok_or_else(|| Self::unknown_queue(queue_url))?;
            queue.messages.push_back(StoredMessage {
                id: Uuid::new_v4().to_string(),
                body,
                receive_count: 0,
                receipt_handle: None,
                visible_at: Instant::now(),
            });
        }
        self.arrivals.notify_waiters();
        Ok(())
    }
}
