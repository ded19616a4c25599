use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_sqs::config::SharedCredentialsProvider;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::{MessageSystemAttributeName, QueueAttributeName};

use crate::errors::ClientError;
use crate::message::{MessageAttributeValue, QueueMessage};

/// Requests every system and message attribute on receive.
const ALL_ATTRIBUTES: &str = "All";

/// The receive call issued for every poll of a queue.
///
/// Built once at registration and reused verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveRequest {
    pub queue_url: String,
    /// The maximum number of messages to receive in a single request.
    pub max_number_of_messages: i32,
    /// The wait time for long polling, in seconds.
    pub wait_time_seconds: i32,
    /// Overrides the queue's visibility timeout for received messages.
    pub visibility_timeout: Option<i32>,
}

/// The queue operations the listener container relies on.
///
/// Implementations must be safe to share between every polling loop and
/// dispatch task; the container never locks around calls.
#[async_trait]
pub trait SqsClient: Send + Sync + 'static {
    /// Long-polls the queue described by `request`. An empty batch is not an error.
    async fn receive(&self, request: &ReceiveRequest) -> Result<Vec<QueueMessage>, ClientError>;

    async fn delete(&self, queue_url: &str, receipt_handle: &str) -> Result<(), ClientError>;

    async fn change_visibility(
        &self,
        queue_url: &str,
        receipt_handle: &str,
        visibility_timeout_seconds: i32,
    ) -> Result<(), ClientError>;

    /// Resolves a queue name to its physical URL.
    async fn queue_url(&self, queue_name: &str) -> Result<String, ClientError>;

    /// Whether the queue has a redrive policy (dead-letter queue) configured.
    async fn has_redrive_policy(&self, queue_url: &str) -> Result<bool, ClientError>;
}

#[async_trait]
impl SqsClient for aws_sdk_sqs::Client {
    async fn receive(&self, request: &ReceiveRequest) -> Result<Vec<QueueMessage>, ClientError> {
        let output = self
            .receive_message()
            .queue_url(&request.queue_url)
            .max_number_of_messages(request.max_number_of_messages)
            .wait_time_seconds(request.wait_time_seconds)
            .set_visibility_timeout(request.visibility_timeout)
            .message_system_attribute_names(MessageSystemAttributeName::All)
            .message_attribute_names(ALL_ATTRIBUTES)
            .send()
            .await
            .map_err(|e| ClientError::new("ReceiveMessage", DisplayErrorContext(e).to_string()))?;

        Ok(output
            .messages()
            .iter()
            .filter_map(convert_message)
            .collect())
    }

    async fn delete(&self, queue_url: &str, receipt_handle: &str) -> Result<(), ClientError> {
        self.delete_message()
            .queue_url(queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| ClientError::new("DeleteMessage", DisplayErrorContext(e).to_string()))?;
        Ok(())
    }

    async fn change_visibility(
        &self,
        queue_url: &str,
        receipt_handle: &str,
        visibility_timeout_seconds: i32,
    ) -> Result<(), ClientError> {
        self.change_message_visibility()
            .queue_url(queue_url)
            .receipt_handle(receipt_handle)
            .visibility_timeout(visibility_timeout_seconds)
            .send()
            .await
            .map_err(|e| {
                ClientError::new("ChangeMessageVisibility", DisplayErrorContext(e).to_string())
            })?;
        Ok(())
    }

    async fn queue_url(&self, queue_name: &str) -> Result<String, ClientError> {
        let output = self
            .get_queue_url()
            .queue_name(queue_name)
            .send()
            .await
            .map_err(|e| ClientError::new("GetQueueUrl", DisplayErrorContext(e).to_string()))?;

        output
            .queue_url()
            .map(str::to_string)
            .ok_or_else(|| ClientError::new("GetQueueUrl", "response did not contain a queue URL"))
    }

    async fn has_redrive_policy(&self, queue_url: &str) -> Result<bool, ClientError> {
        let output = self
            .get_queue_attributes()
            .queue_url(queue_url)
            .attribute_names(QueueAttributeName::RedrivePolicy)
            .send()
            .await
            .map_err(|e| {
                ClientError::new("GetQueueAttributes", DisplayErrorContext(e).to_string())
            })?;

        Ok(output
            .attributes()
            .is_some_and(|attributes| attributes.contains_key(&QueueAttributeName::RedrivePolicy)))
    }
}

/// Converts an SDK message. Messages without a receipt handle cannot be
/// deleted and are dropped.
fn convert_message(message: &aws_sdk_sqs::types::Message) -> Option<QueueMessage> {
    let receipt_handle = message.receipt_handle()?.to_string();

    let attributes: HashMap<String, String> = message
        .attributes()
        .map(|attributes| {
            attributes
                .iter()
                .map(|(name, value)| (name.as_str().to_string(), value.clone()))
                .collect()
        })
        .unwrap_or_default();

    let message_attributes: HashMap<String, MessageAttributeValue> = message
        .message_attributes()
        .map(|attributes| {
            attributes
                .iter()
                .map(|(name, value)| {
                    (
                        name.clone(),
                        MessageAttributeValue {
                            data_type: value.data_type().to_string(),
                            string_value: value.string_value().map(str::to_string),
                            binary_value: value.binary_value().map(|blob| blob.as_ref().to_vec()),
                        },
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    Some(QueueMessage {
        message_id: message.message_id().unwrap_or_default().to_string(),
        receipt_handle,
        body: message.body().unwrap_or_default().to_string(),
        attributes,
        message_attributes,
    })
}

/// Creates an AWS SQS client using credentials and configuration from the environment.
///
/// This function loads AWS configuration from environment variables such as:
/// - `AWS_ACCESS_KEY_ID`
/// - `AWS_SECRET_ACCESS_KEY`
/// - `AWS_REGION`
/// - `AWS_PROFILE`
///
/// # Example
///
/// ```rust,no_run
/// use sqs_listener::client::create_sqs_client_from_env;
///
/// #[tokio::main]
/// async fn main() {
///     let client = create_sqs_client_from_env().await;
///     // Use the client...
/// }
/// ```
pub async fn create_sqs_client_from_env() -> aws_sdk_sqs::Client {
    let config = aws_config::load_from_env().await;
    aws_sdk_sqs::Client::new(&config)
}

/// Creates an AWS SQS client with explicitly provided credentials and region.
///
/// Useful for applications that manage credentials dynamically or need to use
/// different credentials than those in the environment.
///
/// # Arguments
///
/// * `access_key_id` - The AWS access key ID
/// * `secret_access_key` - The AWS secret access key
/// * `region` - The AWS region (e.g., "us-east-1", "eu-west-1")
pub fn create_sqs_client_with_credentials(
    access_key_id: &str,
    secret_access_key: &str,
    region: &str,
) -> aws_sdk_sqs::Client {
    let credentials =
        aws_sdk_sqs::config::Credentials::new(access_key_id, secret_access_key, None, None, "aws");

    let shared_credentials = SharedCredentialsProvider::new(credentials);

    let config = aws_sdk_sqs::config::Builder::new()
        .region(Region::new(region.to_string()))
        .credentials_provider(shared_credentials)
        .build();

    aws_sdk_sqs::Client::from_conf(config)
}
