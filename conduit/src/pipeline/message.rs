//! Element type carried by a pipeline queue.

/// An item travelling from producer to consumer, or the end-of-stream marker.
///
/// End-of-stream is a distinct variant rather than a reserved payload value,
/// so no payload can ever be mistaken for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message<T> {
    /// A value produced from the source.
    Payload(T),
    /// The producer has no more values. Sent exactly once per producer.
    EndOfStream,
}

impl<T> Message<T> {
    /// Returns `true` for [`Message::EndOfStream`].
    #[must_use]
    pub const fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }

    /// Returns the payload, or `None` for end-of-stream.
    #[must_use]
    pub fn into_payload(self) -> Option<T> {
        match self {
            Self::Payload(item) => Some(item),
            Self::EndOfStream => None,
        }
    }
}

impl<T> From<T> for Message<T> {
    fn from(item: T) -> Self {
        Self::Payload(item)
    }
}
