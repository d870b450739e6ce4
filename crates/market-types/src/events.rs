//! Event types for inter-component notification.
//!
//! This module defines the event system used by the marketplace for
//! best-effort notification after a handler commits its mutations.
//! Events flow through a broadcast bus so observers (metrics, outbound
//! email, audit logs) can react without participating in the
//! transaction; a lost event never rolls back a committed action.

use crate::{OrderStatus, ResponseStatus, UserId};
use serde::{Deserialize, Serialize};

/// Main event type encompassing all marketplace events.
///
/// Events are categorized by the entity they concern, allowing
/// consumers to filter and handle specific event types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MarketEvent {
	/// Events from the order lifecycle.
	Order(OrderEvent),
	/// Events from response and delivery bookkeeping.
	Workflow(WorkflowEvent),
	/// Events from the chat store.
	Chat(ChatEvent),
}

/// Events related to the order lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderEvent {
	/// A new order has been created.
	Created { order_id: String, client: UserId },
	/// An order moved to a new status.
	StatusChanged {
		order_id: String,
		from: OrderStatus,
		to: OrderStatus,
	},
	/// A creator was assigned to an order.
	CreatorAssigned { order_id: String, creator: UserId },
}

/// Events related to responses, deliveries and reviews.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WorkflowEvent {
	/// A creator responded to an order.
	ResponseCreated {
		order_id: String,
		response_id: String,
		creator: UserId,
	},
	/// A response changed status (accepted or rejected).
	ResponseResolved {
		response_id: String,
		status: ResponseStatus,
	},
	/// A delivery was submitted against an order.
	DeliverySubmitted {
		order_id: String,
		delivery_id: String,
		is_final: bool,
	},
	/// A review was saved and the recipient's rating recomputed.
	ReviewSaved {
		order_id: String,
		recipient: UserId,
		rating: u8,
	},
}

/// Events related to chat threads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChatEvent {
	/// A new chat thread was created.
	ChatCreated {
		chat_id: String,
		order_id: Option<String>,
	},
	/// A message was posted to a chat.
	MessagePosted {
		chat_id: String,
		message_id: String,
		is_system: bool,
	},
}
