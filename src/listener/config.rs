use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ListenerError;
use crate::listener::deletion::DeletionPolicy;

pub const DEFAULT_CONTAINER_NAME: &str = "listener-container";
pub const DEFAULT_MAX_NUMBER_OF_MESSAGES: i32 = 10;
pub const DEFAULT_WAIT_TIME_SECONDS: i32 = 20;
pub const DEFAULT_BACK_OFF_TIME_MS: u64 = 10_000;
pub const DEFAULT_QUEUE_STOP_TIMEOUT_MS: u64 = 20_000;

/// Prefix of environment variables read by [`ContainerConfig::load`],
/// e.g. `SQS_LISTENER__BACK_OFF_TIME_MS=500`.
const ENV_PREFIX: &str = "SQS_LISTENER";

/// Configuration for the listener container.
///
/// # Fields
/// - `back_off_time_ms`: how long a polling loop sleeps after a failed receive.
/// - `queue_stop_timeout_ms`: how long stopping waits for a queue's loop to finish.
/// - `max_number_of_messages` / `wait_time_seconds` / `visibility_timeout`:
///   receive defaults for queues that do not override them.
/// - `worker_pool_size`: slots of the internal worker pool; computed from the
///   number of queues when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Name used in logs and for the internal worker pool.
    pub name: String,

    pub back_off_time_ms: u64,

    pub queue_stop_timeout_ms: u64,

    /// The maximum number of messages to receive in a single request.
    pub max_number_of_messages: i32,

    /// The wait time for long polling, in seconds.
    pub wait_time_seconds: i32,

    pub visibility_timeout: Option<i32>,

    pub worker_pool_size: Option<usize>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        ContainerConfig {
            name: DEFAULT_CONTAINER_NAME.to_string(),
            back_off_time_ms: DEFAULT_BACK_OFF_TIME_MS,
            queue_stop_timeout_ms: DEFAULT_QUEUE_STOP_TIMEOUT_MS,
            max_number_of_messages: DEFAULT_MAX_NUMBER_OF_MESSAGES,
            wait_time_seconds: DEFAULT_WAIT_TIME_SECONDS,
            visibility_timeout: None,
            worker_pool_size: None,
        }
    }
}

impl ContainerConfig {
    /// Loads the configuration from defaults, an optional file (format picked
    /// by extension) and `SQS_LISTENER__*` environment variables, in that order
    /// of precedence from lowest to highest.
    pub fn load(path: Option<&Path>) -> Result<Self, ListenerError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let config = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    pub fn back_off_time(&self) -> Duration {
        Duration::from_millis(self.back_off_time_ms)
    }

    pub fn queue_stop_timeout(&self) -> Duration {
        Duration::from_millis(self.queue_stop_timeout_ms)
    }

    /// Pool size for `queue_count` queues: one slot per polling loop plus one
    /// per message of a full batch.
    pub(crate) fn worker_pool_size_for(&self, queue_count: usize) -> usize {
        self.worker_pool_size.unwrap_or_else(|| {
            let per_queue = usize::try_from(self.max_number_of_messages.max(1)).unwrap_or(1) + 1;
            (queue_count * per_queue).max(1)
        })
    }
}

/// Per-queue settings supplied at registration.
///
/// Every unset field is resolved when the queue is registered: the URL and
/// the redrive policy through the client, the FIFO flag from the `.fifo` URL
/// suffix, and the receive settings from [`ContainerConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub queue_url: Option<String>,
    pub deletion_policy: DeletionPolicy,
    pub fifo: Option<bool>,
    pub has_redrive_policy: Option<bool>,
    pub max_number_of_messages: Option<i32>,
    pub wait_time_seconds: Option<i32>,
    pub visibility_timeout: Option<i32>,
}

impl QueueConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_url(mut self, queue_url: impl Into<String>) -> Self {
        self.queue_url = Some(queue_url.into());
        self
    }

    pub fn deletion_policy(mut self, deletion_policy: DeletionPolicy) -> Self {
        self.deletion_policy = deletion_policy;
        self
    }

    pub fn fifo(mut self, fifo: bool) -> Self {
        self.fifo = Some(fifo);
        self
    }

    pub fn has_redrive_policy(mut self, has_redrive_policy: bool) -> Self {
        self.has_redrive_policy = Some(has_redrive_policy);
        self
    }

    pub fn max_number_of_messages(mut self, max_number_of_messages: i32) -> Self {
        self.max_number_of_messages = Some(max_number_of_messages);
        self
    }

    pub fn wait_time_seconds(mut self, wait_time_seconds: i32) -> Self {
        self.wait_time_seconds = Some(wait_time_seconds);
        self
    }

    pub fn visibility_timeout(mut self, visibility_timeout: i32) -> Self {
        self.visibility_timeout = Some(visibility_timeout);
        self
    }
}
