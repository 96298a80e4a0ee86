//! Outbound side of the pub/sub edge.

use tokio::sync::mpsc;
use tracing::trace;

use crate::message::{ImageMessage, Publication};
use crate::BusError;

/// Accepts image messages for publication on a named topic.
pub trait Publisher {
    fn publish(&mut self, topic: &str, message: ImageMessage) -> Result<(), BusError>;
}

impl<P: Publisher + ?Sized> Publisher for Box<P> {
    fn publish(&mut self, topic: &str, message: ImageMessage) -> Result<(), BusError> {
        (**self).publish(topic, message)
    }
}

// ── ChannelPublisher ──────────────────────────────────────────────────────────

/// Publisher that forwards every [`Publication`] over an unbounded channel.
///
/// Never blocks the caller; fails only once the receiving side is gone.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: mpsc::UnboundedSender<Publication>,
}

impl ChannelPublisher {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Publication>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Publisher for ChannelPublisher {
    fn publish(&mut self, topic: &str, message: ImageMessage) -> Result<(), BusError> {
        trace!("publish {} ({}x{})", topic, message.width, message.height);
        self.tx
            .send(Publication { topic: topic.to_owned(), message })
            .map_err(|_| BusError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Header;
    use bytes::Bytes;

    fn message() -> ImageMessage {
        ImageMessage {
            header: Header::default(),
            width: 1,
            height: 1,
            encoding: "bgr8",
            step: 3,
            data: Bytes::from_static(&[1, 2, 3]),
        }
    }

    #[test]
    fn forwards_publications_in_order() {
        let (mut publisher, mut rx) = ChannelPublisher::new();
        publisher.publish("/a", message()).unwrap();
        publisher.publish("/b", message()).unwrap();

        assert_eq!(rx.try_recv().unwrap().topic, "/a");
        assert_eq!(rx.try_recv().unwrap().topic, "/b");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn publish_fails_once_receiver_dropped() {
        let (mut publisher, rx) = ChannelPublisher::new();
        drop(rx);
        assert!(matches!(publisher.publish("/a", message()), Err(BusError::Closed)));
    }
}
