//! Hands frames to the publish collaborator on the right output topic.

use camsnap_bus::{BusError, ImageMessage, Publisher};
use camsnap_core::{Frame, Topics};

pub struct FrameDelivery<P> {
    publisher:        P,
    livestream_topic: String,
    snapshot_topic:   String,
}

impl<P: Publisher> FrameDelivery<P> {
    pub fn new(publisher: P, livestream_topic: impl Into<String>, snapshot_topic: impl Into<String>) -> Self {
        Self {
            publisher,
            livestream_topic: livestream_topic.into(),
            snapshot_topic: snapshot_topic.into(),
        }
    }

    pub fn from_topics(publisher: P, topics: &Topics) -> Self {
        Self::new(publisher, &topics.livestream_image, &topics.snapshot_image)
    }

    /// Publish a livestream frame, without sequence annotation.
    pub fn livestream(&mut self, frame: &Frame) -> Result<(), BusError> {
        let message = ImageMessage::from_frame(frame, None);
        self.publisher.publish(&self.livestream_topic, message)
    }

    /// Publish a snapshot stamped with `sequence`, the number in its file name.
    pub fn snapshot(&mut self, frame: &Frame, sequence: u64) -> Result<(), BusError> {
        let message = ImageMessage::from_frame(frame, Some(sequence));
        self.publisher.publish(&self.snapshot_topic, message)
    }
}
