//! Test doubles shared by the integration suites.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use requester::core::{
    OutboundClient, OutboundRequest, QueueMessage, QueueTransport, ReceiveRequest, RequesterError,
    ResponseData, StoreError, Task, TaskId, TaskProcessor, TaskSpec, TaskStatus, TaskStore,
    TaskUpdate,
};
use requester::infra::{InMemoryBroker, InMemoryTaskStore};

// ============================================================================
// OUTBOUND CLIENT
// ============================================================================

/// What the scripted client does on each call.
#[derive(Clone)]
pub enum Reply {
    Respond(ResponseData),
    Fail(String),
    Panic(&'static str),
}

/// Outbound client returning a fixed reply after an optional delay.
pub struct ScriptedClient {
    reply: Reply,
    delay: Duration,
    calls: AtomicUsize,
    requests: Mutex<Vec<OutboundRequest>>,
}

impl ScriptedClient {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl OutboundClient for ScriptedClient {
    async fn execute(&self, request: OutboundRequest) -> Result<ResponseData, RequesterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.reply {
            Reply::Respond(data) => Ok(data.clone()),
            Reply::Fail(msg) => Err(RequesterError::Outbound(msg.clone())),
            Reply::Panic(msg) => panic!("{msg}"),
        }
    }
}

// ============================================================================
// TASK STORE
// ============================================================================

/// In-memory store whose updates to selected statuses can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemoryTaskStore,
    failing: Mutex<Vec<TaskStatus>>,
    fail_gets: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every update that sets `status` fail.
    pub fn fail_updates_to(&self, status: TaskStatus) {
        self.failing.lock().push(status);
    }

    pub fn fail_gets(&self) {
        self.fail_gets.store(true, Ordering::SeqCst);
    }

    pub async fn task(&self, id: TaskId) -> Task {
        self.inner
            .get(id)
            .await
            .expect("get")
            .expect("task exists")
    }
}

#[async_trait]
impl TaskStore for FlakyStore {
    async fn create(&self, spec: TaskSpec) -> Result<Task, StoreError> {
        self.inner.create(spec).await
    }

    async fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("database unavailable".into()));
        }
        self.inner.get(id).await
    }

    async fn update(&self, id: TaskId, update: TaskUpdate) -> Result<(), StoreError> {
        if let Some(status) = update.status {
            if self.failing.lock().contains(&status) {
                return Err(StoreError::Backend(format!("cannot write status {status:?}")));
            }
        }
        self.inner.update(id, update).await
    }
}

// ============================================================================
// TASK PROCESSOR
// ============================================================================

/// Processor that records invocations and returns a fixed outcome.
pub struct CountingProcessor {
    succeed: bool,
    delay: Duration,
    panic_on_first: AtomicBool,
    calls: AtomicUsize,
    seen: Mutex<Vec<TaskId>>,
}

impl CountingProcessor {
    pub fn succeeding() -> Self {
        Self::new(true)
    }

    pub fn failing() -> Self {
        Self::new(false)
    }

    fn new(succeed: bool) -> Self {
        Self {
            succeed,
            delay: Duration::ZERO,
            panic_on_first: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Panic on the first invocation only.
    pub fn panicking_once(self) -> Self {
        self.panic_on_first.store(true, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<TaskId> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl TaskProcessor for CountingProcessor {
    async fn process(&self, task_id: TaskId) -> Result<(), RequesterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(task_id);
        if self.panic_on_first.swap(false, Ordering::SeqCst) {
            panic!("processor exploded");
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.succeed {
            Ok(())
        } else {
            Err(RequesterError::Outbound("remote unavailable".into()))
        }
    }
}

// ============================================================================
// QUEUE TRANSPORT
// ============================================================================

/// Behaviour of [`BrokenTransport::receive`].
#[derive(Clone, Copy)]
pub enum ReceiveFault {
    Error,
    Panic,
}

/// Transport whose receive always fails; sends are recorded.
pub struct BrokenTransport {
    fault: ReceiveFault,
    receives: AtomicUsize,
    sends: Mutex<Vec<String>>,
    fail_sends: bool,
}

impl BrokenTransport {
    pub fn new(fault: ReceiveFault) -> Self {
        Self {
            fault,
            receives: AtomicUsize::new(0),
            sends: Mutex::new(Vec::new()),
            fail_sends: false,
        }
    }

    /// Transport that rejects every send.
    pub fn rejecting_sends() -> Self {
        Self {
            fail_sends: true,
            ..Self::new(ReceiveFault::Error)
        }
    }

    pub fn receives(&self) -> usize {
        self.receives.load(Ordering::SeqCst)
    }

    pub fn sends(&self) -> Vec<String> {
        self.sends.lock().clone()
    }
}

#[async_trait]
impl QueueTransport for BrokenTransport {
    fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(30)
    }

    fn max_attempts(&self) -> Option<u32> {
        Some(3)
    }

    async fn queue_url(&self, name: &str) -> Result<String, RequesterError> {
        Ok(format!("broken://{name}"))
    }

    async fn receive(&self, _request: ReceiveRequest) -> Result<Vec<QueueMessage>, RequesterError> {
        self.receives.fetch_add(1, Ordering::SeqCst);
        match self.fault {
            ReceiveFault::Error => Err(RequesterError::Transport("broker unreachable".into())),
            ReceiveFault::Panic => panic!("receive exploded"),
        }
    }

    async fn delete(&self, _queue_url: &str, _message: &QueueMessage) -> Result<(), RequesterError> {
        Ok(())
    }

    async fn send_raw(&self, _queue_url: &str, body: String) -> Result<(), RequesterError> {
        if self.fail_sends {
            return Err(RequesterError::Transport("broker rejected message".into()));
        }
        self.sends.lock().push(body);
        Ok(())
    }
}

/// In-memory broker whose deletes always fail; everything else is forwarded.
pub struct UndeletableBroker {
    inner: InMemoryBroker,
    delete_attempts: AtomicUsize,
}

impl UndeletableBroker {
    pub fn new(inner: InMemoryBroker) -> Self {
        Self {
            inner,
            delete_attempts: AtomicUsize::new(0),
        }
    }

    pub fn delete_attempts(&self) -> usize {
        self.delete_attempts.load(Ordering::SeqCst)
    }

    pub fn message_count(&self, queue_url: &str) -> usize {
        self.inner.message_count(queue_url)
    }
}

#[async_trait]
impl QueueTransport for UndeletableBroker {
    fn visibility_timeout(&self) -> Duration {
        self.inner.visibility_timeout()
    }

    fn max_attempts(&self) -> Option<u32> {
        self.inner.max_attempts()
    }

    async fn queue_url(&self, name: &str) -> Result<String, RequesterError> {
        self.inner.queue_url(name).await
    }

    async fn receive(&self, request: ReceiveRequest) -> Result<Vec<QueueMessage>, RequesterError> {
        self.inner.receive(request).await
    }

    async fn delete(&self, _queue_url: &str, _message: &QueueMessage) -> Result<(), RequesterError> {
        self.delete_attempts.fetch_add(1, Ordering::SeqCst);
        Err(RequesterError::Transport("delete rejected".into()))
    }

    async fn send_raw(&self, queue_url: &str, body: String) -> Result<(), RequesterError> {
        self.inner.send_raw(queue_url, body).await
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
