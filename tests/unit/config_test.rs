//! Tests for configuration validation and loading

use std::collections::HashMap;
use std::time::Duration;

use requester::config::{QueueConfig, RequesterConfig};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_defaults_match_documented_values() {
    let cfg = RequesterConfig::from_lookup(lookup(&[])).expect("defaults are valid");
    assert_eq!(cfg.workers, 3);
    assert_eq!(cfg.task_queue, "task-queue");
    assert_eq!(cfg.receive_wait(), Duration::from_secs(10));
    assert_eq!(cfg.receive_deadline(), Duration::from_secs(20));
    assert_eq!(cfg.receive_error_backoff(), Duration::from_secs(1));
    assert_eq!(cfg.http_timeout(), Duration::from_secs(10));
    assert_eq!(cfg.http_connect_timeout(), Duration::from_secs(5));
    assert_eq!(cfg.queue.visibility_timeout(), Duration::from_secs(300));
    assert_eq!(cfg.queue.max_attempts(), Some(3));
}

#[test]
fn test_lookup_overrides() {
    let cfg = RequesterConfig::from_lookup(lookup(&[
        ("WORKERS", "10"),
        ("TASK_QUEUE", "webhooks"),
        ("VISIBILITY_TIMEOUT_SECS", "60"),
        ("MAX_MESSAGE_ATTEMPTS", "5"),
        ("HTTP_TIMEOUT_SECS", "3"),
    ]))
    .expect("valid overrides");
    assert_eq!(cfg.workers, 10);
    assert_eq!(cfg.task_queue, "webhooks");
    assert_eq!(cfg.queue.visibility_timeout_secs, 60);
    assert_eq!(cfg.queue.max_attempts(), Some(5));
    assert_eq!(cfg.http_timeout_secs, 3);
}

#[test]
fn test_debug_disables_eviction() {
    let cfg = RequesterConfig::from_lookup(lookup(&[("DEBUG", "true")])).expect("valid");
    assert!(cfg.queue.debug);
    assert_eq!(cfg.queue.max_attempts(), None);
}

#[test]
fn test_too_many_workers_rejected() {
    let err = RequesterConfig::from_lookup(lookup(&[("WORKERS", "11")])).unwrap_err();
    assert!(err.contains("workers"));
}

#[test]
fn test_unparseable_value_names_the_key() {
    let err = RequesterConfig::from_lookup(lookup(&[("RECEIVE_WAIT_SECS", "soon")])).unwrap_err();
    assert!(err.contains("RECEIVE_WAIT_SECS"));
}

#[test]
fn test_deadline_must_exceed_wait() {
    let err = RequesterConfig::from_lookup(lookup(&[
        ("RECEIVE_WAIT_SECS", "20"),
        ("RECEIVE_DEADLINE_SECS", "20"),
    ]))
    .unwrap_err();
    assert!(err.contains("receive_deadline_secs"));
}

#[test]
fn test_receive_wait_is_capped() {
    let err = RequesterConfig::from_lookup(lookup(&[
        ("RECEIVE_WAIT_SECS", "21"),
        ("RECEIVE_DEADLINE_SECS", "60"),
    ]))
    .unwrap_err();
    assert!(err.contains("receive_wait_secs"));
}

#[test]
fn test_huge_visibility_timeout_rejected() {
    let err = RequesterConfig::from_lookup(lookup(&[(
        "VISIBILITY_TIMEOUT_SECS",
        "18446744073709551615",
    )]))
    .unwrap_err();
    assert!(err.contains("visibility_timeout_secs"));
}

#[test]
fn test_from_json_str_fills_defaults() {
    let cfg = RequesterConfig::from_json_str(r#"{"workers": 5, "queue": {"debug": true}}"#)
        .expect("valid json");
    assert_eq!(cfg.workers, 5);
    assert_eq!(cfg.task_queue, "task-queue");
    assert!(cfg.queue.debug);
    assert_eq!(cfg.queue.max_message_attempts, 3);
}

#[test]
fn test_from_json_str_rejects_invalid() {
    assert!(RequesterConfig::from_json_str(r#"{"workers": 0}"#).is_err());
    assert!(RequesterConfig::from_json_str("not json").is_err());
}

#[test]
fn test_queue_config_zero_visibility_rejected() {
    let cfg = QueueConfig {
        visibility_timeout_secs: 0,
        ..QueueConfig::default()
    };
    assert!(cfg.validate().is_err());
}
