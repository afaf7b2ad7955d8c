//! Configuration models for the dispatcher, queue transport and outbound client.

pub mod queue;
pub mod requester;

pub use queue::{
    QueueConfig, DEFAULT_MAX_MESSAGE_ATTEMPTS, DEFAULT_VISIBILITY_TIMEOUT_SECS,
    MAX_VISIBILITY_TIMEOUT_SECS,
};
pub use requester::{RequesterConfig, DEFAULT_TASK_QUEUE, MAX_RECEIVE_WAIT_SECS};

/// Parse an optional variable, naming the key on failure.
fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, String>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| format!("{key}: cannot parse `{raw}`: {e}"))
        })
        .transpose()
}
