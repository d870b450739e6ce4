//! Event bus for inter-component notification.
//!
//! Handlers publish events after their mutations commit; observers
//! (metrics, outbound notification workers) subscribe independently.
//! Publishing is best-effort: a bus without subscribers or a lagging
//! subscriber never fails the action that produced the event.

use market_types::MarketEvent;
use tokio::sync::broadcast;

/// Broadcast-based event bus carrying [`MarketEvent`]s.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<MarketEvent>,
}

impl EventBus {
	/// Creates a new event bus with the given channel capacity.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Publishes an event to all current subscribers.
	///
	/// Returns Err only when there are no subscribers; callers treat
	/// the result as advisory (`.ok()`).
	pub fn publish(&self, event: MarketEvent) -> Result<(), Box<broadcast::error::SendError<MarketEvent>>> {
		self.sender.send(event).map(|_| ()).map_err(Box::new)
	}

	/// Subscribes to all future events.
	pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
		self.sender.subscribe()
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(256)
	}
}
