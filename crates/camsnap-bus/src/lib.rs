//! camsnap-bus — the node's pub/sub edge.
//!
//! The capture node only needs two things from its messaging layer:
//! "deliver boolean triggers from named topics" and "publish this image on
//! this topic". This crate provides both with in-process plumbing.
//!
//! # Architecture
//!
//! ```text
//! camsnap-trigger ── TCP (len + JSON) ──► TriggerListener ──► mpsc<Trigger> ──► dispatch loop
//!                                                                                   │
//!                                   mpsc<Publication> ◄── ChannelPublisher ◄── controller
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use camsnap_bus::{send_trigger, Trigger, TriggerListener};
//! use tokio::sync::mpsc;
//!
//! # async fn example() -> Result<(), camsnap_bus::BusError> {
//! let listener = TriggerListener::bind("127.0.0.1:7879").await?;
//! let (tx, mut rx) = mpsc::channel(16);
//! listener.spawn(tx);
//!
//! send_trigger("127.0.0.1:7879", &Trigger::new("/camera0/snapshot/trigger", true)).await?;
//! let trigger = rx.recv().await;
//! # Ok(())
//! # }
//! ```

pub mod ingress;
pub mod message;
pub mod publisher;

pub use ingress::{send_trigger, TriggerListener};
pub use message::{Header, ImageMessage, Publication, Trigger};
pub use publisher::{ChannelPublisher, Publisher};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("Channel closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Message too large: {len} bytes")]
    MessageTooLarge { len: usize },
}
