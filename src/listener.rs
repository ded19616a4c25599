//! The listener container: one polling loop per registered queue, sharing a
//! bounded worker pool with the dispatch of received message groups.
//!
//! Stopping is cooperative. Clearing a queue's running flag prevents the next
//! receive and any further group dispatch, while messages already handed to
//! the handler are allowed to finish.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::client::{ReceiveRequest, SqsClient};
use crate::errors::ListenerError;
use crate::handler::MessageHandler;
use crate::worker_pool::WorkerPool;

pub mod config;
pub mod deletion;
mod dispatcher;
pub mod group;
mod polling;
pub mod registry;
pub mod running_state;

use config::{ContainerConfig, QueueConfig};
use polling::PollingLoop;
use registry::{QueueAttributes, QueueRegistry};
use running_state::RunningStateTracker;

/// Completion of a polling loop, awaitable by any number of stop calls.
type LoopCompletion = Shared<BoxFuture<'static, ()>>;

#[derive(Clone)]
pub(crate) struct InFlightTask {
    pub(crate) loop_id: u64,
    completion: LoopCompletion,
}

pub(crate) struct ContainerInner {
    pub(crate) config: ContainerConfig,
    pub(crate) client: Arc<dyn SqsClient>,
    pub(crate) handler: Arc<dyn MessageHandler>,
    pub(crate) registry: QueueRegistry,
    pub(crate) running_state: RunningStateTracker,
    pub(crate) in_flight: DashMap<String, InFlightTask>,
    worker_pool: RwLock<Option<WorkerPool>>,
    owns_worker_pool: AtomicBool,
    next_loop_id: AtomicU64,
    active: AtomicBool,
    running: AtomicBool,
    lifecycle: Mutex<()>,
}

impl ContainerInner {
    /// Removes the in-flight entry of a stopping loop. Returns `false` when the
    /// queue was restarted in the meantime and the loop must keep polling.
    ///
    /// Runs under the entry lock that `start_queue` also takes, so a restart
    /// either sees the loop alive and reuses it or sees it gone and spawns a
    /// new one.
    pub(crate) fn retire_loop(&self, queue: &str, loop_id: u64) -> bool {
        match self.in_flight.entry(queue.to_string()) {
            Entry::Occupied(entry) if entry.get().loop_id == loop_id => {
                if self.running_state.is_running(queue) {
                    return false;
                }
                entry.remove();
                true
            }
            _ => true,
        }
    }
}

/// Polls registered SQS queues and dispatches their messages to a handler.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use sqs_listener::client::create_sqs_client_from_env;
/// use sqs_listener::listener::config::{ContainerConfig, QueueConfig};
/// use sqs_listener::listener::deletion::DeletionPolicy;
/// use sqs_listener::{HandlerError, ListenerContainer, ListenerMessage};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = create_sqs_client_from_env().await;
///     let container = ListenerContainer::new(
///         Arc::new(client),
///         |message: ListenerMessage| async move {
///             println!("Processing message: {}", message.payload());
///             Ok::<(), HandlerError>(())
///         },
///         ContainerConfig::default(),
///     );
///
///     container
///         .register_queue("orders", QueueConfig::new().deletion_policy(DeletionPolicy::OnSuccess))
///         .await?;
///     container.initialize();
///     container.start()?;
///
///     tokio::signal::ctrl_c().await?;
///     container.destroy().await;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct ListenerContainer {
    inner: Arc<ContainerInner>,
}

impl ListenerContainer {
    pub fn new(
        client: Arc<dyn SqsClient>,
        handler: impl MessageHandler,
        config: ContainerConfig,
    ) -> Self {
        ListenerContainer {
            inner: Arc::new(ContainerInner {
                config,
                client,
                handler: Arc::new(handler),
                registry: QueueRegistry::new(),
                running_state: RunningStateTracker::new(),
                in_flight: DashMap::new(),
                worker_pool: RwLock::new(None),
                owns_worker_pool: AtomicBool::new(false),
                next_loop_id: AtomicU64::new(0),
                active: AtomicBool::new(false),
                running: AtomicBool::new(false),
                lifecycle: Mutex::new(()),
            }),
        }
    }

    /// Runs loops and dispatches on `pool` instead of an internal one.
    ///
    /// The container never shuts a supplied pool down. Has no effect once
    /// the container is initialized.
    pub fn with_worker_pool(self, pool: WorkerPool) -> Self {
        {
            let mut current = self.inner.worker_pool.write();
            if current.is_some() {
                warn!(
                    container = %self.inner.config.name,
                    "Worker pool already set, ignoring the supplied pool"
                );
            } else {
                *current = Some(pool);
            }
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }

    /// The pool loops and dispatches run on. An internal pool only exists
    /// between [`initialize`](Self::initialize) and [`destroy`](Self::destroy).
    pub fn worker_pool(&self) -> Option<WorkerPool> {
        self.inner.worker_pool.read().clone()
    }

    /// Registers a queue under `logical_name`, resolving whatever `queue`
    /// leaves unset. Only allowed before [`initialize`](Self::initialize).
    pub async fn register_queue(
        &self,
        logical_name: &str,
        queue: QueueConfig,
    ) -> Result<(), ListenerError> {
        self.ensure_not_active()?;

        let resolution_error = |reason: String| ListenerError::DestinationResolution {
            queue: logical_name.to_string(),
            reason,
        };

        let queue_url = match queue.queue_url {
            Some(url) => url,
            None => self
                .inner
                .client
                .queue_url(logical_name)
                .await
                .map_err(|e| resolution_error(e.to_string()))?,
        };

        let has_redrive_policy = match queue.has_redrive_policy {
            Some(has_redrive_policy) => has_redrive_policy,
            None => self
                .inner
                .client
                .has_redrive_policy(&queue_url)
                .await
                .map_err(|e| resolution_error(e.to_string()))?,
        };

        let config = &self.inner.config;
        let attributes = QueueAttributes {
            logical_name: logical_name.to_string(),
            is_fifo: queue.fifo.unwrap_or_else(|| queue_url.ends_with(".fifo")),
            deletion_policy: queue.deletion_policy,
            has_redrive_policy,
            receive_request: ReceiveRequest {
                queue_url,
                max_number_of_messages: queue
                    .max_number_of_messages
                    .unwrap_or(config.max_number_of_messages),
                wait_time_seconds: queue.wait_time_seconds.unwrap_or(config.wait_time_seconds),
                visibility_timeout: queue.visibility_timeout.or(config.visibility_timeout),
            },
        };

        let _lifecycle = self.inner.lifecycle.lock();
        self.ensure_not_active()?;
        debug!(
            container = %config.name,
            queue = logical_name,
            queue_url = %attributes.queue_url(),
            fifo = attributes.is_fifo,
            deletion_policy = %attributes.deletion_policy,
            has_redrive_policy = attributes.has_redrive_policy,
            "Registered queue"
        );
        self.inner.registry.register(logical_name, attributes);
        Ok(())
    }

    pub fn registered_queues(&self) -> Vec<String> {
        self.inner.registry.all_queues()
    }

    pub fn queue_attributes(&self, logical_name: &str) -> Result<Arc<QueueAttributes>, ListenerError> {
        self.inner.registry.get(logical_name)
    }

    /// Creates the internal worker pool if none was supplied and marks every
    /// registered queue as stopped. Calling it again has no effect.
    pub fn initialize(&self) {
        let _lifecycle = self.inner.lifecycle.lock();
        if self.inner.active.load(Ordering::SeqCst) {
            return;
        }

        let queue_count = self.inner.registry.len();
        let pool = self
            .inner
            .worker_pool
            .write()
            .get_or_insert_with(|| {
                self.inner.owns_worker_pool.store(true, Ordering::SeqCst);
                WorkerPool::new(
                    &self.inner.config.name,
                    self.inner.config.worker_pool_size_for(queue_count),
                )
            })
            .clone();

        if pool.capacity() <= queue_count {
            warn!(
                container = %self.inner.config.name,
                capacity = pool.capacity(),
                queues = queue_count,
                "Worker pool cannot run every polling loop alongside message dispatch"
            );
        }

        self.inner
            .running_state
            .initialize(self.inner.registry.all_queues());
        self.inner.active.store(true, Ordering::SeqCst);
        info!(
            container = %self.inner.config.name,
            queues = queue_count,
            pool_capacity = pool.capacity(),
            "Listener container initialized"
        );
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Whether the container as a whole has been started and not stopped.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Starts polling every registered queue that is not running yet.
    ///
    /// Every queue is attempted; the first failure is returned.
    pub fn start(&self) -> Result<(), ListenerError> {
        self.ensure_active()?;
        debug!(container = %self.inner.config.name, "Starting container");
        self.inner.running.store(true, Ordering::SeqCst);

        let mut first_error = None;
        for queue in self.inner.registry.all_queues() {
            if let Err(err) = self.start_queue(&queue) {
                warn!(queue = %queue, error = %err, "Failed to start queue");
                first_error.get_or_insert(err);
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Starts polling one queue. Does nothing if it is already running.
    ///
    /// A queue that was stopped but whose loop is still draining its last
    /// batch resumes that loop instead of starting a second one.
    pub fn start_queue(&self, logical_name: &str) -> Result<(), ListenerError> {
        self.ensure_active()?;
        let attributes = self.inner.registry.get(logical_name)?;
        if !self.inner.running_state.contains(logical_name) {
            return Err(ListenerError::QueueNotFound(logical_name.to_string()));
        }

        let pool = self
            .inner
            .worker_pool
            .read()
            .clone()
            .ok_or_else(|| ListenerError::NotInitialized(self.inner.config.name.clone()))?;

        match self.inner.in_flight.entry(logical_name.to_string()) {
            Entry::Occupied(_) => {
                if !self.inner.running_state.is_running(logical_name) {
                    debug!(queue = logical_name, "Resuming draining polling loop");
                    self.inner.running_state.set_running(logical_name, true);
                }
                Ok(())
            }
            Entry::Vacant(entry) => {
                if self.inner.running_state.is_running(logical_name) {
                    return Ok(());
                }

                let loop_id = self.inner.next_loop_id.fetch_add(1, Ordering::SeqCst);
                self.inner.running_state.set_running(logical_name, true);
                let polling_loop =
                    PollingLoop::new(self.inner.clone(), attributes, pool.clone(), loop_id);

                let handle = match pool.try_submit(polling_loop.run()) {
                    Ok(handle) => handle,
                    Err(err) => {
                        self.inner.running_state.set_running(logical_name, false);
                        return Err(err.into());
                    }
                };

                entry.insert(InFlightTask {
                    loop_id,
                    completion: handle.map(|_| ()).boxed().shared(),
                });
                debug!(queue = logical_name, "Started queue");
                Ok(())
            }
        }
    }

    /// Asks one queue to stop polling without waiting for its loop.
    pub fn stop_queue(&self, logical_name: &str) -> Result<(), ListenerError> {
        if !self.inner.running_state.contains(logical_name) {
            return Err(ListenerError::QueueNotFound(logical_name.to_string()));
        }
        self.inner.running_state.set_running(logical_name, false);
        debug!(queue = logical_name, "Stopping queue");
        Ok(())
    }

    /// Stops one queue and waits for its loop to finish, at most
    /// `queue_stop_timeout`. A timeout is logged, not returned.
    ///
    /// Dropping the returned future only abandons the wait; the queue stays
    /// stopped.
    pub async fn stop_queue_and_wait(&self, logical_name: &str) -> Result<(), ListenerError> {
        self.stop_queue(logical_name)?;
        self.await_loop(logical_name).await;
        Ok(())
    }

    /// Stops every running queue, then waits for each loop in turn up to
    /// `queue_stop_timeout`.
    pub async fn stop(&self) {
        debug!(container = %self.inner.config.name, "Stopping container");
        self.inner.running.store(false, Ordering::SeqCst);

        for queue in self.inner.running_state.running_queues() {
            self.inner.running_state.set_running(&queue, false);
        }

        for queue in self.inner.registry.all_queues() {
            self.await_loop(&queue).await;
        }
    }

    pub fn is_queue_running(&self, logical_name: &str) -> bool {
        self.inner.running_state.is_running(logical_name)
    }

    /// Whether a polling loop for the queue is still alive. Stays `true` after
    /// a stop until the loop has drained its last batch.
    pub fn is_polling(&self, logical_name: &str) -> bool {
        self.inner.in_flight.contains_key(logical_name)
    }

    /// Stops the container and shuts the worker pool down if the container
    /// created it. The container can then be initialized again, with a new
    /// internal pool.
    pub async fn destroy(&self) {
        self.stop().await;

        let _lifecycle = self.inner.lifecycle.lock();
        self.inner.active.store(false, Ordering::SeqCst);
        if self.inner.owns_worker_pool.swap(false, Ordering::SeqCst) {
            if let Some(pool) = self.inner.worker_pool.write().take() {
                pool.shutdown();
            }
        }
        info!(container = %self.inner.config.name, "Listener container destroyed");
    }

    async fn await_loop(&self, logical_name: &str) {
        let Some(completion) = self
            .inner
            .in_flight
            .get(logical_name)
            .map(|task| task.completion.clone())
        else {
            return;
        };

        let timeout = self.inner.config.queue_stop_timeout();
        if tokio::time::timeout(timeout, completion).await.is_err() {
            warn!(
                queue = logical_name,
                timeout_ms = timeout.as_millis() as u64,
                "Queue did not stop within the timeout"
            );
        }
    }

    fn ensure_active(&self) -> Result<(), ListenerError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(ListenerError::NotInitialized(self.inner.config.name.clone()))
        }
    }

    fn ensure_not_active(&self) -> Result<(), ListenerError> {
        if self.is_active() {
            Err(ListenerError::AlreadyInitialized(self.inner.config.name.clone()))
        } else {
            Ok(())
        }
    }
}
