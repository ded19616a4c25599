use std::fmt;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::client::SqsClient;
use crate::errors::ClientError;

/// Deletes the message it was created for.
///
/// Handed to handlers of queues with the `NEVER` deletion policy, which then
/// decide themselves when a message is done.
#[derive(Clone)]
pub struct Acknowledgment {
    client: Arc<dyn SqsClient>,
    queue_url: Arc<str>,
    receipt_handle: String,
}

impl Acknowledgment {
    pub(crate) fn new(
        client: Arc<dyn SqsClient>,
        queue_url: Arc<str>,
        receipt_handle: impl Into<String>,
    ) -> Self {
        Acknowledgment {
            client,
            queue_url,
            receipt_handle: receipt_handle.into(),
        }
    }

    /// Deletes the message and waits for the broker to confirm.
    pub async fn acknowledge(&self) -> Result<(), ClientError> {
        self.client
            .delete(&self.queue_url, &self.receipt_handle)
            .await
    }

    /// Deletes the message on a background task.
    pub fn acknowledge_async(&self) -> JoinHandle<Result<(), ClientError>> {
        let this = self.clone();
        tokio::spawn(async move { this.acknowledge().await })
    }

    pub fn receipt_handle(&self) -> &str {
        &self.receipt_handle
    }
}

impl fmt::Debug for Acknowledgment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Acknowledgment")
            .field("queue_url", &self.queue_url)
            .field("receipt_handle", &self.receipt_handle)
            .finish()
    }
}

/// Changes the visibility timeout of the message it was created for.
#[derive(Clone)]
pub struct Visibility {
    client: Arc<dyn SqsClient>,
    queue_url: Arc<str>,
    receipt_handle: String,
}

impl Visibility {
    pub(crate) fn new(
        client: Arc<dyn SqsClient>,
        queue_url: Arc<str>,
        receipt_handle: impl Into<String>,
    ) -> Self {
        Visibility {
            client,
            queue_url,
            receipt_handle: receipt_handle.into(),
        }
    }

    /// Sets the message's remaining visibility timeout to `seconds` from now.
    pub async fn extend(&self, seconds: i32) -> Result<(), ClientError> {
        self.client
            .change_visibility(&self.queue_url, &self.receipt_handle, seconds)
            .await
    }

    pub fn extend_async(&self, seconds: i32) -> JoinHandle<Result<(), ClientError>> {
        let this = self.clone();
        tokio::spawn(async move { this.extend(seconds).await })
    }

    pub fn receipt_handle(&self) -> &str {
        &self.receipt_handle
    }
}

impl fmt::Debug for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Visibility")
            .field("queue_url", &self.queue_url)
            .field("receipt_handle", &self.receipt_handle)
            .finish()
    }
}
