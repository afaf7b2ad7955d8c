//! Tests for the acceptance-side API helpers

use requester::core::{QueueTransport, RequesterError, TaskSpec, TaskStatus, TaskStore};
use requester::infra::{InMemoryBroker, InMemoryTaskStore};
use requester::runtime::{health, submit_task, task_status};
use uuid::Uuid;

use crate::common::{BrokenTransport, FlakyStore, ReceiveFault};

#[tokio::test]
async fn test_submit_creates_new_task_and_enqueues_its_id() {
    let store = InMemoryTaskStore::new();
    let broker = InMemoryBroker::default();
    let url = broker.queue_url("task-queue").await.expect("queue url");

    let task = submit_task(&store, &broker, &url, TaskSpec::new("GET", "https://example.com"))
        .await
        .expect("submit");

    assert_eq!(task.status, TaskStatus::New);
    assert!(task.response().is_none());
    assert_eq!(broker.message_count(&url), 1);
}

#[tokio::test]
async fn test_queue_body_is_the_bare_json_id() {
    let store = InMemoryTaskStore::new();
    let transport = BrokenTransport::new(ReceiveFault::Error);

    let task = submit_task(&store, &transport, "broken://q", TaskSpec::new("GET", "https://example.com"))
        .await
        .expect("submit");

    assert_eq!(transport.sends(), vec![format!("\"{}\"", task.id)]);
}

#[tokio::test]
async fn test_failed_enqueue_marks_task_error() {
    let store = InMemoryTaskStore::new();
    let transport = BrokenTransport::rejecting_sends();

    let err = submit_task(&store, &transport, "broken://q", TaskSpec::new("GET", "https://example.com"))
        .await
        .expect_err("enqueue fails");
    assert!(matches!(err, RequesterError::Transport(_)));
    let tasks = store.snapshot();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].status, TaskStatus::Error);
}

#[tokio::test]
async fn test_failed_enqueue_and_status_write_reports_both() {
    let store = FlakyStore::new();
    store.fail_updates_to(TaskStatus::Error);
    let transport = BrokenTransport::rejecting_sends();

    let err = submit_task(&store, &transport, "broken://q", TaskSpec::new("GET", "https://example.com"))
        .await
        .expect_err("enqueue fails");
    assert!(matches!(err, RequesterError::StatusWrite { .. }));
}

#[tokio::test]
async fn test_task_status_reports_response_fields() {
    let store = InMemoryTaskStore::new();
    let task = store
        .create(TaskSpec::new("GET", "https://example.com"))
        .await
        .expect("create");

    let status = task_status(&store, task.id)
        .await
        .expect("status")
        .expect("exists");
    assert_eq!(status.id, task.id);
    assert_eq!(status.status, TaskStatus::New);
    assert!(status.http_status_code.is_none());

    let json = serde_json::to_value(&status).expect("serialize");
    assert_eq!(json["status"], "new");
    assert!(json.get("httpStatusCode").is_none());

    assert!(task_status(&store, Uuid::new_v4())
        .await
        .expect("status")
        .is_none());
}

#[test]
fn test_health() {
    assert!(health().ok);
}
