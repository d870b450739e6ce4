//! Chat thread types for the marketplace system.
//!
//! A chat is a persistent two-party thread between a client and a
//! creator, optionally scoped to one order. Messages are either
//! user-authored or senderless system messages narrating an
//! order-lifecycle event.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::UserId;

/// A persistent two-party message thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
	/// Unique identifier for this chat.
	pub id: String,
	/// Client participant. Immutable after creation.
	pub client: UserId,
	/// Creator participant. Immutable after creation.
	pub creator: UserId,
	/// Order this chat is scoped to, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub order_id: Option<String>,
	/// Inactive chats are hidden from listings but never deleted.
	pub is_active: bool,
	/// Timestamp when this chat was created.
	pub created_at: u64,
	/// Bumped on every new message.
	pub updated_at: u64,
}

impl Chat {
	/// The natural key identifying a chat: (client, creator, order).
	/// All creation paths must derive the lookup key through this
	/// function so duplicates cannot arise structurally.
	pub fn natural_key(client: &str, creator: &str, order_id: Option<&str>) -> String {
		format!("{}:{}:{}", client, creator, order_id.unwrap_or("-"))
	}

	/// True if `user` is one of the two fixed participants.
	pub fn is_participant(&self, user: &str) -> bool {
		self.client == user || self.creator == user
	}

	/// The participant opposite to `user`, if `user` participates.
	pub fn counterpart(&self, user: &str) -> Option<&str> {
		if self.client == user {
			Some(self.creator.as_str())
		} else if self.creator == user {
			Some(self.client.as_str())
		} else {
			None
		}
	}
}

/// A single message within a chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
	/// Unique identifier for this message.
	pub id: String,
	/// Chat this message belongs to.
	pub chat_id: String,
	/// Author of the message. None means system-generated.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub sender: Option<UserId>,
	/// Message body.
	pub content: String,
	/// System messages are senderless and immutable.
	pub is_system: bool,
	/// Whether the client participant has read this message.
	#[serde(default)]
	pub read_by_client: bool,
	/// Whether the creator participant has read this message.
	#[serde(default)]
	pub read_by_creator: bool,
	/// Timestamp when this message was created.
	pub created_at: u64,
}

/// Order-lifecycle events that produce system messages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MessageEvent {
	/// A creator submitted a response to the order.
	CreatorResponded,
	/// A creator was assigned and the order entered progress.
	CreatorAssigned,
	/// The order moved to a new status.
	StatusChanged,
	/// Work was submitted; remind the client to review it.
	ReviewReminder,
	/// The order was completed.
	OrderCompleted,
}

impl MessageEvent {
	/// Returns the string representation used as the template lookup key.
	pub fn as_str(&self) -> &'static str {
		match self {
			MessageEvent::CreatorResponded => "creator_responded",
			MessageEvent::CreatorAssigned => "creator_assigned",
			MessageEvent::StatusChanged => "status_changed",
			MessageEvent::ReviewReminder => "review_reminder",
			MessageEvent::OrderCompleted => "order_completed",
		}
	}

	/// Returns an iterator over all event variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::CreatorResponded,
			Self::CreatorAssigned,
			Self::StatusChanged,
			Self::ReviewReminder,
			Self::OrderCompleted,
		]
		.into_iter()
	}
}

impl fmt::Display for MessageEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

impl FromStr for MessageEvent {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"creator_responded" => Ok(Self::CreatorResponded),
			"creator_assigned" => Ok(Self::CreatorAssigned),
			"status_changed" => Ok(Self::StatusChanged),
			"review_reminder" => Ok(Self::ReviewReminder),
			"order_completed" => Ok(Self::OrderCompleted),
			_ => Err(()),
		}
	}
}

/// Admin-managed template for a system message event.
///
/// Read-only from the orchestration's perspective; a missing or inactive
/// template falls back to the hardcoded default for the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemMessageTemplate {
	/// Event this template renders.
	pub event: MessageEvent,
	/// Format string with `{named}` placeholders.
	pub template: String,
	/// Inactive templates are skipped in favor of the default.
	pub is_active: bool,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn natural_key_shape() {
		assert_eq!(Chat::natural_key("c", "k", Some("o")), "c:k:o");
		assert_eq!(Chat::natural_key("c", "k", None), "c:k:-");
	}

	#[test]
	fn counterpart_resolution() {
		let chat = Chat {
			id: "ch1".into(),
			client: "u1".into(),
			creator: "u2".into(),
			order_id: None,
			is_active: true,
			created_at: 0,
			updated_at: 0,
		};
		assert_eq!(chat.counterpart("u1"), Some("u2"));
		assert_eq!(chat.counterpart("u2"), Some("u1"));
		assert_eq!(chat.counterpart("u3"), None);
		assert!(chat.is_participant("u1"));
		assert!(!chat.is_participant("u3"));
	}

	#[test]
	fn event_key_round_trip() {
		for event in MessageEvent::all() {
			assert_eq!(event.as_str().parse::<MessageEvent>(), Ok(event));
		}
		assert!("unknown_event".parse::<MessageEvent>().is_err());
	}
}
