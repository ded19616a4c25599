use std::convert::Infallible;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, warn};

use crate::listener::ContainerInner;
use crate::listener::dispatcher::MessageGroupDispatcher;
use crate::listener::group;
use crate::listener::registry::QueueAttributes;
use crate::message::QueueMessage;
use crate::worker_pool::WorkerPool;

/// The long-lived task polling one queue.
///
/// Receives are never concurrent for a queue: the next receive is only issued
/// once every group of the previous batch has been handled.
pub(crate) struct PollingLoop {
    container: Arc<ContainerInner>,
    attributes: Arc<QueueAttributes>,
    pool: WorkerPool,
    loop_id: u64,
}

impl PollingLoop {
    pub(crate) fn new(
        container: Arc<ContainerInner>,
        attributes: Arc<QueueAttributes>,
        pool: WorkerPool,
        loop_id: u64,
    ) -> Self {
        PollingLoop {
            container,
            attributes,
            pool,
            loop_id,
        }
    }

    pub(crate) async fn run(self) -> Result<(), Infallible> {
        let queue = self.attributes.logical_name.as_str();
        let _guard = RetireGuard {
            container: self.container.clone(),
            queue: queue.to_string(),
            loop_id: self.loop_id,
        };
        debug!(queue, "Polling loop started");

        loop {
            if !self.container.running_state.is_running(queue) {
                if self.container.retire_loop(queue, self.loop_id) {
                    break;
                }
                continue;
            }

            match self
                .container
                .client
                .receive(&self.attributes.receive_request)
                .await
            {
                Ok(messages) => self.dispatch(messages).await,
                Err(err) => {
                    let back_off = self.container.config.back_off_time();
                    warn!(
                        queue,
                        error = %err,
                        back_off_ms = back_off.as_millis() as u64,
                        "An error occurred while polling queue, retrying after back-off"
                    );
                    tokio::time::sleep(back_off).await;
                }
            }
        }

        debug!(queue, "Polling loop stopped");
        Ok(())
    }

    /// Dispatches every group of the batch and waits for all of them.
    async fn dispatch(&self, messages: Vec<QueueMessage>) {
        if messages.is_empty() {
            return;
        }

        let queue = self.attributes.logical_name.as_str();
        let groups = group::partition(messages, self.attributes.is_fifo);
        let mut pending = Vec::with_capacity(groups.len());

        for group in groups {
            // Groups left over after a stop are counted as done and stay on
            // the queue. Waiting for a slot can outlast a stop, so the flag is
            // checked again once the slot is held.
            if !self.container.running_state.is_running(queue) {
                break;
            }
            let slot = match self.pool.acquire().await {
                Ok(slot) => slot,
                Err(err) => {
                    warn!(queue, error = %err, "Could not dispatch message group");
                    continue;
                }
            };
            if !self.container.running_state.is_running(queue) {
                break;
            }

            let dispatcher = MessageGroupDispatcher::new(
                self.attributes.clone(),
                group,
                self.container.client.clone(),
                self.container.handler.clone(),
            );
            pending.push(slot.spawn(dispatcher.run()));
        }

        for result in join_all(pending).await {
            if let Err(err) = result {
                error!(queue, error = %err, "Message group task panicked");
            }
        }
    }
}

/// Clears the loop's in-flight entry if the task ends without retiring
/// normally, i.e. when it panics.
struct RetireGuard {
    container: Arc<ContainerInner>,
    queue: String,
    loop_id: u64,
}

impl Drop for RetireGuard {
    fn drop(&mut self) {
        let removed = self
            .container
            .in_flight
            .remove_if(&self.queue, |_, task| task.loop_id == self.loop_id);

        if removed.is_some() && std::thread::panicking() {
            error!(queue = %self.queue, "Polling loop panicked, queue stopped");
            self.container.running_state.set_running(&self.queue, false);
        }
    }
}
