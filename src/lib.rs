//! # SQS Listener
//!
//! A listener container that long-polls any number of AWS SQS queues and hands
//! their messages to a handler, on a bounded pool of tokio tasks.
//!
//! ## Features
//!
//! - One polling loop per queue, at most one batch in flight per queue
//! - FIFO queues: messages of a message group are handled strictly in order,
//!   groups in parallel
//! - Standard queues: every message of a batch is handled in parallel
//! - Deletion policies (`ON_SUCCESS`, `ALWAYS`, `NEVER`, `NO_REDRIVE`) aware of
//!   the queue's redrive policy
//! - Manual acknowledgment and visibility extension from within handlers
//! - Per-queue start/stop with bounded, cooperative shutdown
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use sqs_listener::client::create_sqs_client_from_env;
//! use sqs_listener::listener::config::{ContainerConfig, QueueConfig};
//! use sqs_listener::{HandlerError, ListenerContainer, ListenerMessage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     sqs_listener::logging::init_tracing();
//!
//!     let client = create_sqs_client_from_env().await;
//!     let container = ListenerContainer::new(
//!         Arc::new(client),
//!         |message: ListenerMessage| async move {
//!             println!("Processing message: {}", message.payload());
//!             Ok::<(), HandlerError>(())
//!         },
//!         ContainerConfig::load(None)?,
//!     );
//!
//!     container.register_queue("orders", QueueConfig::new()).await?;
//!     container.initialize();
//!     container.start()?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     container.destroy().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod errors;
pub mod handler;
pub mod listener;
pub mod logging;
pub mod message;
pub mod worker_pool;

pub use client::{ReceiveRequest, SqsClient};
pub use errors::{ClientError, HandlerError, ListenerError, WorkerPoolError};
pub use handler::{MessageHandler, QueueRouter};
pub use listener::ListenerContainer;
pub use listener::config::{ContainerConfig, QueueConfig};
pub use listener::deletion::DeletionPolicy;
pub use message::{Acknowledgment, ListenerMessage, QueueMessage, Visibility};
pub use worker_pool::{WorkerPool, WorkerSlot};
