use std::sync::Arc;

use tracing::{debug, warn};

use crate::client::SqsClient;
use crate::errors::HandlerError;
use crate::handler::MessageHandler;
use crate::listener::deletion::{DeletionPolicy, Outcome};
use crate::listener::group::MessageGroup;
use crate::listener::registry::QueueAttributes;
use crate::message::{Acknowledgment, ListenerMessage, QueueMessage, Visibility};

/// Hands the messages of one group to the handler, strictly in order, and
/// applies the queue's deletion policy after each of them.
pub(crate) struct MessageGroupDispatcher {
    attributes: Arc<QueueAttributes>,
    queue_url: Arc<str>,
    group: MessageGroup,
    client: Arc<dyn SqsClient>,
    handler: Arc<dyn MessageHandler>,
}

impl MessageGroupDispatcher {
    pub(crate) fn new(
        attributes: Arc<QueueAttributes>,
        group: MessageGroup,
        client: Arc<dyn SqsClient>,
        handler: Arc<dyn MessageHandler>,
    ) -> Self {
        let queue_url = Arc::from(attributes.queue_url());
        MessageGroupDispatcher {
            attributes,
            queue_url,
            group,
            client,
            handler,
        }
    }

    /// Processes the group. An unexpected handler error stops the group and
    /// is returned to the worker pool; later messages are left on the queue.
    pub(crate) async fn run(self) -> Result<(), HandlerError> {
        for message in self.group.messages() {
            let listener_message = self.message_for_execution(message);

            match self.handler.handle_message(listener_message).await {
                Ok(()) => self.apply_deletion_policy(Outcome::Success, message),
                Err(HandlerError::Messaging(reason)) => {
                    debug!(
                        queue = %self.attributes.logical_name,
                        message_id = %message.message_id,
                        reason = %reason,
                        "Message handling failed"
                    );
                    self.apply_deletion_policy(Outcome::Failure, message);
                }
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }

    fn message_for_execution(&self, message: &QueueMessage) -> ListenerMessage {
        let acknowledgment = (self.attributes.deletion_policy == DeletionPolicy::Never).then(|| {
            Acknowledgment::new(
                self.client.clone(),
                self.queue_url.clone(),
                &message.receipt_handle,
            )
        });
        let visibility = Visibility::new(
            self.client.clone(),
            self.queue_url.clone(),
            &message.receipt_handle,
        );

        ListenerMessage::from_queue_message(
            &self.attributes.logical_name,
            message,
            acknowledgment,
            visibility,
        )
    }

    fn apply_deletion_policy(&self, outcome: Outcome, message: &QueueMessage) {
        if self
            .attributes
            .deletion_policy
            .should_delete(outcome, self.attributes.has_redrive_policy)
        {
            self.delete_message(message);
        }
    }

    /// Fire-and-forget delete; the outcome is only logged.
    fn delete_message(&self, message: &QueueMessage) {
        let client = self.client.clone();
        let queue_url = self.queue_url.clone();
        let queue = self.attributes.logical_name.clone();
        let receipt_handle = message.receipt_handle.clone();

        tokio::spawn(async move {
            match client.delete(&queue_url, &receipt_handle).await {
                Ok(()) => debug!(queue = %queue, receipt_handle = %receipt_handle, "Deleted message"),
                Err(err) => warn!(
                    queue = %queue,
                    receipt_handle = %receipt_handle,
                    error = %err,
                    "Failed to delete message"
                ),
            }
        });
    }
}
