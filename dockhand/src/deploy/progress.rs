//! Progress events streamed by the pipeline collaborators

use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::mpsc;

/// One item of a collaborator's progress feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Plain output line
    Log(String),

    /// Status/progress update (layer pushed, digest, ...)
    Status(String),

    /// Raw image id reported by the build
    ImageId(String),

    /// The operation failed; nothing useful follows
    Error(String),
}

/// Ordered, one-way event feed. Dropping it cancels the producer.
pub type ProgressStream = BoxStream<'static, ProgressEvent>;

/// Capacity of the channel between a producer task and its stream
pub const PROGRESS_BUFFER: usize = 256;

/// Turn the receiving half of a progress channel into a [`ProgressStream`].
pub fn from_receiver(rx: mpsc::Receiver<ProgressEvent>) -> ProgressStream {
    stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (event, rx))
    })
    .boxed()
}

/// A stream over a fixed list of events
pub fn from_events(events: Vec<ProgressEvent>) -> ProgressStream {
    stream::iter(events).boxed()
}

/// End the stream right after its first [`ProgressEvent::Error`].
///
/// The inner stream is not polled again once the error has been yielded.
pub fn until_error(events: ProgressStream) -> ProgressStream {
    stream::unfold(Some(events), |state| async move {
        let mut events = state?;
        let event = events.next().await?;
        let rest = match event {
            ProgressEvent::Error(_) => None,
            _ => Some(events),
        };
        Some((event, rest))
    })
    .boxed()
}
