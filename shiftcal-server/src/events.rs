//! Live update fan-out.
//!
//! Mutations publish a [`ChangeEvent`] naming the calendar and what kind of
//! resource changed; SSE subscribers refetch on receipt. Payloads carry no
//! resource data, so a slow or lagged subscriber can always skip to the
//! live edge and refetch.

use futures::stream::Stream;
use serde::Serialize;
use shiftcal_core::ChangeKind;
use tokio::sync::broadcast;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    pub calendar_id: String,
    pub kind: ChangeKind,
}

/// Broadcast bus carrying change events for all calendars. Filtering down
/// to one calendar happens per subscriber.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        EventBus { sender }
    }

    /// Publish a change. No subscribers is not an error.
    pub fn publish(&self, calendar_id: &str, kind: ChangeKind) {
        let event = ChangeEvent {
            calendar_id: calendar_id.to_string(),
            kind,
        };
        let _ = self.sender.send(event);
    }

    /// Stream of changes for one calendar. Lagged receivers drop the missed
    /// events and continue from the live edge.
    pub fn subscribe(&self, calendar_id: String) -> impl Stream<Item = ChangeEvent> + use<> {
        let receiver = self.sender.subscribe();
        futures::stream::unfold(
            (receiver, calendar_id),
            |(mut receiver, calendar_id)| async move {
                loop {
                    match receiver.recv().await {
                        Ok(event) if event.calendar_id == calendar_id => {
                            return Some((event, (receiver, calendar_id)));
                        }
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            debug!("sse subscriber lagged, skipped {missed} events");
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            },
        )
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
