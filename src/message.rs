//! Raw broker messages and the application-facing message handed to handlers.

use std::collections::{BTreeMap, HashMap};

mod acknowledgment;

pub use acknowledgment::{Acknowledgment, Visibility};

/// Header carrying the logical queue name the message was received from.
pub const LOGICAL_RESOURCE_ID: &str = "LogicalResourceId";
pub const MESSAGE_ID: &str = "MessageId";
pub const RECEIPT_HANDLE: &str = "ReceiptHandle";

/// System attribute naming the FIFO message group.
pub const MESSAGE_GROUP_ID: &str = "MessageGroupId";

const STRING_DATA_TYPE: &str = "String";
const NUMBER_DATA_TYPE: &str = "Number";
const BINARY_DATA_TYPE: &str = "Binary";

/// A user-defined message attribute as delivered by SQS.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageAttributeValue {
    /// `String`, `Number` or `Binary`, optionally followed by a custom suffix
    /// such as `Number.int`.
    pub data_type: String,
    pub string_value: Option<String>,
    pub binary_value: Option<Vec<u8>>,
}

impl MessageAttributeValue {
    pub fn string(value: impl Into<String>) -> Self {
        MessageAttributeValue {
            data_type: STRING_DATA_TYPE.to_string(),
            string_value: Some(value.into()),
            binary_value: None,
        }
    }

    pub fn number(value: impl Into<String>) -> Self {
        MessageAttributeValue {
            data_type: NUMBER_DATA_TYPE.to_string(),
            string_value: Some(value.into()),
            binary_value: None,
        }
    }

    pub fn binary(value: impl Into<Vec<u8>>) -> Self {
        MessageAttributeValue {
            data_type: BINARY_DATA_TYPE.to_string(),
            string_value: None,
            binary_value: Some(value.into()),
        }
    }

    fn to_header(&self) -> Option<HeaderValue> {
        if self.data_type.starts_with(STRING_DATA_TYPE) {
            self.string_value.clone().map(HeaderValue::String)
        } else if self.data_type.starts_with(NUMBER_DATA_TYPE) {
            self.string_value.clone().map(HeaderValue::Number)
        } else if self.data_type.starts_with(BINARY_DATA_TYPE) {
            self.binary_value.clone().map(HeaderValue::Binary)
        } else {
            None
        }
    }
}

/// A message as received from the queue, before it is handed to a handler.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueueMessage {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: String,
    /// System attributes such as `MessageGroupId` or `ApproximateReceiveCount`.
    pub attributes: HashMap<String, String>,
    pub message_attributes: HashMap<String, MessageAttributeValue>,
}

impl QueueMessage {
    pub fn new(
        message_id: impl Into<String>,
        receipt_handle: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        QueueMessage {
            message_id: message_id.into(),
            receipt_handle: receipt_handle.into(),
            body: body.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_message_attribute(
        mut self,
        name: impl Into<String>,
        value: MessageAttributeValue,
    ) -> Self {
        self.message_attributes.insert(name.into(), value);
        self
    }

    pub fn message_group_id(&self) -> Option<&str> {
        self.attributes.get(MESSAGE_GROUP_ID).map(String::as_str)
    }
}

/// A typed message header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    String(String),
    /// Numeric attribute in its textual wire form.
    Number(String),
    Binary(Vec<u8>),
}

impl HeaderValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::String(value) | HeaderValue::Number(value) => Some(value),
            HeaderValue::Binary(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HeaderValue::Number(value) => value.parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Number(value) => value.parse().ok(),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            HeaderValue::Binary(value) => Some(value),
            _ => None,
        }
    }
}

/// Message headers keyed by name.
pub type MessageHeaders = BTreeMap<String, HeaderValue>;

/// The message delivered to a [`MessageHandler`](crate::handler::MessageHandler).
#[derive(Debug, Clone)]
pub struct ListenerMessage {
    payload: String,
    headers: MessageHeaders,
    acknowledgment: Option<Acknowledgment>,
    visibility: Visibility,
}

impl ListenerMessage {
    /// Builds the handler-facing message.
    ///
    /// Headers are layered in order: identifiers, system attributes, then
    /// message attributes. Later layers win on name clashes.
    pub(crate) fn from_queue_message(
        logical_name: &str,
        message: &QueueMessage,
        acknowledgment: Option<Acknowledgment>,
        visibility: Visibility,
    ) -> Self {
        let mut headers = MessageHeaders::new();
        headers.insert(
            LOGICAL_RESOURCE_ID.to_string(),
            HeaderValue::String(logical_name.to_string()),
        );
        headers.insert(
            MESSAGE_ID.to_string(),
            HeaderValue::String(message.message_id.clone()),
        );
        headers.insert(
            RECEIPT_HANDLE.to_string(),
            HeaderValue::String(message.receipt_handle.clone()),
        );

        for (name, value) in &message.attributes {
            headers.insert(name.clone(), HeaderValue::String(value.clone()));
        }

        for (name, value) in &message.message_attributes {
            if let Some(header) = value.to_header() {
                headers.insert(name.clone(), header);
            }
        }

        ListenerMessage {
            payload: message.body.clone(),
            headers,
            acknowledgment,
            visibility,
        }
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn headers(&self) -> &MessageHeaders {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    pub fn logical_resource_id(&self) -> Option<&str> {
        self.header(LOGICAL_RESOURCE_ID).and_then(HeaderValue::as_str)
    }

    pub fn message_id(&self) -> Option<&str> {
        self.header(MESSAGE_ID).and_then(HeaderValue::as_str)
    }

    /// Manual acknowledgment, only present when the queue's deletion policy
    /// is `NEVER`.
    pub fn acknowledgment(&self) -> Option<&Acknowledgment> {
        self.acknowledgment.as_ref()
    }

    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::client::testing::NoopClient;

    fn visibility() -> Visibility {
        Visibility::new(Arc::new(NoopClient), Arc::from("https://queue"), "rh-1")
    }

    #[test]
    fn headers_carry_identifiers_and_typed_attributes() {
        let raw = QueueMessage::new("id-1", "rh-1", "hello")
            .with_attribute("ApproximateReceiveCount", "3")
            .with_message_attribute("tenant", MessageAttributeValue::string("acme"))
            .with_message_attribute("retries", MessageAttributeValue::number("7"))
            .with_message_attribute("blob", MessageAttributeValue::binary(vec![1, 2]));

        let message = ListenerMessage::from_queue_message("orders", &raw, None, visibility());

        assert_eq!(message.payload(), "hello");
        assert_eq!(message.logical_resource_id(), Some("orders"));
        assert_eq!(message.message_id(), Some("id-1"));
        assert_eq!(
            message.header(RECEIPT_HANDLE),
            Some(&HeaderValue::String("rh-1".to_string()))
        );
        assert_eq!(
            message.header("ApproximateReceiveCount").and_then(HeaderValue::as_str),
            Some("3")
        );
        assert_eq!(message.header("tenant").and_then(HeaderValue::as_str), Some("acme"));
        assert_eq!(message.header("retries").and_then(HeaderValue::as_i64), Some(7));
        assert_eq!(
            message.header("blob").and_then(HeaderValue::as_bytes),
            Some(&[1u8, 2][..])
        );
        assert!(message.acknowledgment().is_none());
    }

    #[test]
    fn custom_number_types_are_kept_as_numbers() {
        let raw = QueueMessage::new("id-1", "rh-1", "body").with_message_attribute(
            "ratio",
            MessageAttributeValue {
                data_type: "Number.float".to_string(),
                string_value: Some("0.5".to_string()),
                binary_value: None,
            },
        );

        let message = ListenerMessage::from_queue_message("orders", &raw, None, visibility());

        assert_eq!(message.header("ratio").and_then(HeaderValue::as_f64), Some(0.5));
    }
}
