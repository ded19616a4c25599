use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::HandlerError;
use crate::message::ListenerMessage;

/// Processes messages delivered by the listener container.
///
/// Return `Err(HandlerError::Messaging)` to report a processing failure: the
/// queue's deletion policy then decides whether the message is deleted or left
/// for redelivery. `Err(HandlerError::Unexpected)` aborts the rest of the
/// message group and is only logged.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    async fn handle_message(&self, message: ListenerMessage) -> Result<(), HandlerError>;
}

#[async_trait]
impl<F, Fut> MessageHandler for F
where
    F: Fn(ListenerMessage) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle_message(&self, message: ListenerMessage) -> Result<(), HandlerError> {
        (self)(message).await
    }
}

/// Routes messages to per-queue handlers by their logical queue name.
#[derive(Default, Clone)]
pub struct QueueRouter {
    routes: HashMap<String, Arc<dyn MessageHandler>>,
}

impl QueueRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for messages received from `logical_name`,
    /// replacing any previous route.
    pub fn route(mut self, logical_name: &str, handler: impl MessageHandler) -> Self {
        self.routes
            .insert(logical_name.to_string(), Arc::new(handler));
        self
    }

    pub fn destinations(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }
}

#[async_trait]
impl MessageHandler for QueueRouter {
    async fn handle_message(&self, message: ListenerMessage) -> Result<(), HandlerError> {
        let handler = message
            .logical_resource_id()
            .and_then(|name| self.routes.get(name))
            .cloned();

        match handler {
            Some(handler) => handler.handle_message(message).await,
            None => Err(HandlerError::messaging(format!(
                "no handler registered for destination '{}'",
                message.logical_resource_id().unwrap_or_default()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::client::testing::NoopClient;
    use crate::message::{QueueMessage, Visibility};

    fn message_for(queue: &str) -> ListenerMessage {
        let raw = QueueMessage::new("id-1", "rh-1", "body");
        let visibility = Visibility::new(Arc::new(NoopClient), Arc::from("https://queue"), "rh-1");
        ListenerMessage::from_queue_message(queue, &raw, None, visibility)
    }

    #[tokio::test]
    async fn router_dispatches_by_logical_name() {
        let orders = Arc::new(AtomicUsize::new(0));
        let counter = orders.clone();

        let router = QueueRouter::new().route("orders", move |_message: ListenerMessage| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), HandlerError>(())
            }
        });

        router
            .handle_message(message_for("orders"))
            .await
            .expect("routed");
        assert_eq!(orders.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn later_route_replaces_earlier_one() {
        let handler = |_message: ListenerMessage| async { Ok::<(), HandlerError>(()) };
        let router = QueueRouter::new()
            .route("orders", handler)
            .route("payments", handler)
            .route("orders", handler);

        let mut destinations: Vec<&str> = router.destinations().collect();
        destinations.sort_unstable();
        assert_eq!(destinations, vec!["orders", "payments"]);
    }

    #[tokio::test]
    async fn router_reports_unknown_destination_as_messaging_failure() {
        let router = QueueRouter::new();
        let result = router.handle_message(message_for("payments")).await;
        assert!(matches!(result, Err(HandlerError::Messaging(_))));
    }
}
