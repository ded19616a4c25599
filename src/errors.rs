use thiserror::Error;

/// Error types for listener container operations.
///
/// These cover registration, lifecycle and configuration failures. Errors that
/// happen while polling or handling messages never surface through this type;
/// they are logged and isolated per queue.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The logical queue name was never registered with the container.
    #[error("queue with name '{0}' does not exist")]
    QueueNotFound(String),

    /// The physical queue URL or its attributes could not be resolved.
    #[error("failed to resolve queue '{queue}': {reason}")]
    DestinationResolution { queue: String, reason: String },

    /// Queues can only be registered before the container is initialized.
    #[error("container '{0}' is already initialized")]
    AlreadyInitialized(String),

    /// A lifecycle operation was invoked before `initialize()`.
    #[error("container '{0}' is not initialized")]
    NotInitialized(String),

    #[error(transparent)]
    WorkerPool(#[from] WorkerPoolError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),
}

/// Rejections from the bounded worker pool.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkerPoolError {
    /// Every slot is taken and the pool keeps no backlog.
    #[error("worker pool '{pool}' is exhausted ({capacity} slots in use)")]
    Exhausted { pool: String, capacity: usize },

    #[error("worker pool '{pool}' has been shut down")]
    Shutdown { pool: String },
}

/// Error returned by a message handler.
///
/// `Messaging` signals a processing failure the container recovers from by
/// applying the queue's deletion policy. `Unexpected` is not recovered: the
/// remaining messages of the group are skipped and the error is logged by the
/// worker pool.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    #[error("message processing failed: {0}")]
    Messaging(String),

    #[error("unexpected handler error: {0}")]
    Unexpected(String),
}

impl HandlerError {
    pub fn messaging(message: impl Into<String>) -> Self {
        HandlerError::Messaging(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        HandlerError::Unexpected(message.into())
    }
}

/// Error raised by a queue client call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{operation} failed: {message}")]
pub struct ClientError {
    operation: &'static str,
    message: String,
}

impl ClientError {
    /// Creates a new `ClientError` for the named client operation.
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        ClientError {
            operation,
            message: message.into(),
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_error_display_names_operation() {
        let err = ClientError::new("ReceiveMessage", "connection reset");
        assert_eq!(err.to_string(), "ReceiveMessage failed: connection reset");
        assert_eq!(err.operation(), "ReceiveMessage");
        assert_eq!(err.message(), "connection reset");
    }

    #[test]
    fn listener_error_wraps_pool_error() {
        let err: ListenerError = WorkerPoolError::Shutdown {
            pool: "listener".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "worker pool 'listener' has been shut down");
    }
}
