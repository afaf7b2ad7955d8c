//! Queue transport port and the shared poison-message policy.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::{PoisonError, RequesterError};

/// A message delivered by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Broker-assigned message identifier.
    pub message_id: String,
    /// Handle used to delete this delivery.
    pub receipt_handle: String,
    /// Raw message body.
    pub body: String,
    /// Approximate number of times the message has been received, if reported.
    pub receive_count: Option<u32>,
}

/// Parameters of one long-poll receive call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveRequest {
    /// Queue to poll.
    pub queue_url: String,
    /// Upper bound on the batch size.
    pub max_messages: usize,
    /// How long to wait for the first message.
    pub wait_time: Duration,
    /// How long received messages stay hidden from other receivers.
    pub visibility_timeout: Duration,
}

/// Receive/delete/send primitives of an at-least-once broker.
///
/// Payload encoding and the poison policy live in [`QueueTransportExt`],
/// which every transport gets for free.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Visibility timeout requested on every receive.
    fn visibility_timeout(&self) -> Duration;

    /// Maximum deliveries before a message is evicted, `None` when eviction is disabled.
    fn max_attempts(&self) -> Option<u32>;

    /// Resolve a queue name to its URL, creating the queue if needed.
    async fn queue_url(&self, name: &str) -> Result<String, RequesterError>;

    /// Long-poll for a batch of messages. An empty batch means the wait elapsed.
    async fn receive(&self, request: ReceiveRequest) -> Result<Vec<QueueMessage>, RequesterError>;

    /// Delete a delivered message. Deleting an already-deleted message succeeds.
    async fn delete(&self, queue_url: &str, message: &QueueMessage) -> Result<(), RequesterError>;

    /// Enqueue a raw body.
    async fn send_raw(&self, queue_url: &str, body: String) -> Result<(), RequesterError>;
}

/// Typed decode and send on top of [`QueueTransport`].
#[async_trait]
pub trait QueueTransportExt: QueueTransport {
    /// Decode a message body into `P`.
    ///
    /// Messages over the attempt limit and messages whose body does not
    /// parse are deleted and reported as [`RequesterError::Poison`]; the
    /// caller must not process them. A failed delete is returned as is.
    async fn decode<P>(&self, queue_url: &str, message: &QueueMessage) -> Result<P, RequesterError>
    where
        P: DeserializeOwned + Send,
    {
        if let (Some(receive_count), Some(max_attempts)) = (message.receive_count, self.max_attempts()) {
            if receive_count > max_attempts {
                self.delete(queue_url, message).await?;
                return Err(PoisonError::AttemptLimitExceeded {
                    receive_count,
                    max_attempts,
                }
                .into());
            }
        }

        let reason = match serde_json::from_str::<P>(&message.body) {
            Ok(payload) => return Ok(payload),
            Err(e) => e.to_string(),
        };
        self.delete(queue_url, message).await?;
        Err(PoisonError::MalformedBody(reason).into())
    }

    /// Encode `payload` as JSON and enqueue it.
    async fn send<P>(&self, queue_url: &str, payload: &P) -> Result<(), RequesterError>
    where
        P: Serialize + Sync,
    {
        let body = serde_json::to_string(payload)?;
        self.send_raw(queue_url, body).await
    }
}

impl<T: QueueTransport + ?Sized> QueueTransportExt for T {}
