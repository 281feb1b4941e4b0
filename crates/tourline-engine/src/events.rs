//! Change notifications for UI collaborators.
//!
//! Every publish point in the engine sends exactly one [`TourEvent`]; a
//! subscriber refreshes from the engine's read accessors when it sees one.

use serde::Serialize;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The caller ended it.
    Requested,
    /// The tour's source disappeared during discovery.
    SourceRemoved,
    /// A recording was abandoned before any step was saved.
    RecordingCancelled,
}

/// Something observable changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TourEvent {
    /// The canonical tour set was replaced.
    ToursChanged { count: usize, has_tours: bool },
    SessionStarted {
        tour_id: String,
        step: Option<usize>,
    },
    StepChanged {
        tour_id: String,
        step: Option<usize>,
    },
    /// A tour's fields or steps changed in place.
    TourUpdated { tour_id: String },
    RecordingChanged { recording: bool },
    /// The session is over. Previews of this tour's embedded content should
    /// be closed.
    SessionEnded { tour_id: String, reason: EndReason },
}

/// Fan-out of [`TourEvent`]s to any number of subscribers.
///
/// Publishing never blocks and never fails; with no subscribers the event
/// is dropped. A subscriber that falls more than the channel capacity
/// behind receives `RecvError::Lagged` and should refresh from scratch.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TourEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TourEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: TourEvent) {
        tracing::trace!(?event, "publish");
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
