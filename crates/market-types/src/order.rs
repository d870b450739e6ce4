//! Order lifecycle types for the marketplace system.
//!
//! This module defines the order entity and the entities hanging off it:
//! creator responses, work deliveries and post-completion reviews. The
//! status enum here only names the states; the transition table lives in
//! the core crate's state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Actor, UserId};

/// A unit of commissioned work moving through a fixed status lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
	/// Unique identifier for this order.
	pub id: String,
	/// Short title shown in listings and system messages.
	pub title: String,
	/// Full description of the commissioned work.
	pub description: String,
	/// Owner of the order. Immutable after creation.
	pub client: UserId,
	/// Assigned executor. Set only when the order enters progress.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub creator: Option<UserId>,
	/// Pre-selected creator for private orders.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub target_creator: Option<UserId>,
	/// Category the order is listed under.
	pub category: String,
	/// Free-form tags for discovery.
	#[serde(default)]
	pub tags: Vec<String>,
	/// Budget in minor currency units.
	pub budget: u64,
	/// Optional deadline as Unix seconds.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub deadline: Option<u64>,
	/// Current status of the order.
	pub status: OrderStatus,
	/// Private orders are addressed to one pre-selected creator.
	pub is_private: bool,
	/// Number of times the order page was viewed by non-owners.
	#[serde(default)]
	pub views_count: u64,
	/// Timestamp when this order was created.
	pub created_at: u64,
	/// Timestamp when this order was last updated.
	pub updated_at: u64,
}

impl Order {
	/// True if `actor` may see this order: public orders are visible to
	/// everyone, private orders only to the client, the target creator
	/// and staff.
	pub fn can_be_viewed_by(&self, actor: &Actor) -> bool {
		if !self.is_private || actor.is_staff {
			return true;
		}
		actor.id == self.client || self.target_creator.as_deref() == Some(actor.id.as_str())
	}

	/// True if `actor` may respond to this order.
	///
	/// Public orders accept responses from any creator other than the
	/// client while listed, which covers both the published state and
	/// awaiting_response once earlier responses arrived. Private orders
	/// accept only the target creator. The at-most-one-response rule is
	/// enforced by the response handler's unique-key create, not here.
	pub fn can_respond(&self, actor: &Actor) -> bool {
		if actor.id == self.client {
			return false;
		}
		let listed = matches!(
			self.status,
			OrderStatus::Published | OrderStatus::AwaitingResponse
		);
		if self.is_private {
			return listed && self.target_creator.as_deref() == Some(actor.id.as_str());
		}
		listed && actor.is_creator()
	}

	/// True if `user` is the assigned executor.
	pub fn is_assigned_to(&self, user: &str) -> bool {
		self.creator.as_deref() == Some(user)
	}
}

/// Status of an order in the marketplace.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
	/// Order drafted by the client, not yet visible to creators.
	Draft,
	/// Order is listed and open for creator responses.
	Published,
	/// At least one response arrived (or a private order awaits its
	/// target creator); the client has not selected anyone yet.
	AwaitingResponse,
	/// A creator is assigned and working on the order.
	InProgress,
	/// Work was submitted; the client is reviewing the delivery.
	OnReview,
	/// Order finished and accepted. Terminal.
	Completed,
	/// Order canceled by the client. Recoverable only back to draft.
	Canceled,
}

impl OrderStatus {
	/// Returns an iterator over all status variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Draft,
			Self::Published,
			Self::AwaitingResponse,
			Self::InProgress,
			Self::OnReview,
			Self::Completed,
			Self::Canceled,
		]
		.into_iter()
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OrderStatus::Draft => write!(f, "draft"),
			OrderStatus::Published => write!(f, "published"),
			OrderStatus::AwaitingResponse => write!(f, "awaiting_response"),
			OrderStatus::InProgress => write!(f, "in_progress"),
			OrderStatus::OnReview => write!(f, "on_review"),
			OrderStatus::Completed => write!(f, "completed"),
			OrderStatus::Canceled => write!(f, "canceled"),
		}
	}
}

/// A creator's bid against a published order.
///
/// At most one response exists per (order, creator) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
	/// Unique identifier for this response.
	pub id: String,
	/// Order this response belongs to.
	pub order_id: String,
	/// Creator who submitted the response.
	pub creator: UserId,
	/// Creator's display name as seen at response time, kept so system
	/// messages stay readable without a profile lookup.
	pub creator_name: String,
	/// Pitch message to the client.
	pub message: String,
	/// Offered price in minor currency units.
	pub price: u64,
	/// Offered timeframe in days.
	pub timeframe_days: u32,
	/// Current status of the response.
	pub status: ResponseStatus,
	/// Timestamp when this response was created.
	pub created_at: u64,
}

/// Status of a creator response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
	/// Awaiting the client's decision.
	Pending,
	/// Selected by the client.
	Accepted,
	/// Passed over when a sibling response was accepted.
	Rejected,
}

impl fmt::Display for ResponseStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ResponseStatus::Pending => write!(f, "pending"),
			ResponseStatus::Accepted => write!(f, "accepted"),
			ResponseStatus::Rejected => write!(f, "rejected"),
		}
	}
}

/// A submitted work artifact against an in-progress order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
	/// Unique identifier for this delivery.
	pub id: String,
	/// Order this delivery belongs to.
	pub order_id: String,
	/// Creator who submitted the delivery.
	pub creator: UserId,
	/// Note accompanying the delivered files.
	pub comment: String,
	/// Final deliveries gate submit_for_review.
	pub is_final: bool,
	/// Set once the client accepts the work at completion.
	#[serde(default)]
	pub client_approved: bool,
	/// Files attached to this delivery. Owned exclusively: removing the
	/// delivery removes its files.
	#[serde(default)]
	pub files: Vec<DeliveryFile>,
	/// Timestamp when this delivery was created.
	pub created_at: u64,
}

/// An opaque file reference attached to a delivery.
///
/// The marketplace never inspects content; blobs live in the external
/// attachment store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryFile {
	/// Unique identifier for this file record.
	pub id: String,
	/// Reference into the external attachment store.
	pub file_ref: String,
	/// Original file name for display.
	pub name: String,
}

/// Post-completion feedback from the client to the creator.
///
/// At most one review exists per (order, author) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
	/// Unique identifier for this review.
	pub id: String,
	/// Order this review belongs to.
	pub order_id: String,
	/// Client who wrote the review.
	pub author: UserId,
	/// Creator the review is about.
	pub recipient: UserId,
	/// Rating from 1 to 5.
	pub rating: u8,
	/// Free-form comment.
	pub comment: String,
	/// Timestamp when this review was created.
	pub created_at: u64,
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Role;

	fn order(is_private: bool, status: OrderStatus) -> Order {
		Order {
			id: "o1".into(),
			title: "Logo".into(),
			description: "A logo".into(),
			client: "client-1".into(),
			creator: None,
			target_creator: is_private.then(|| "creator-1".to_string()),
			category: "design".into(),
			tags: vec![],
			budget: 10_000,
			deadline: None,
			status,
			is_private,
			views_count: 0,
			created_at: 0,
			updated_at: 0,
		}
	}

	#[test]
	fn public_order_visible_to_anyone() {
		let o = order(false, OrderStatus::Published);
		assert!(o.can_be_viewed_by(&Actor::new("stranger", Role::Creator)));
	}

	#[test]
	fn private_order_visible_to_participants_and_staff() {
		let o = order(true, OrderStatus::AwaitingResponse);
		assert!(o.can_be_viewed_by(&Actor::new("client-1", Role::Client)));
		assert!(o.can_be_viewed_by(&Actor::new("creator-1", Role::Creator)));
		assert!(!o.can_be_viewed_by(&Actor::new("stranger", Role::Creator)));

		let mut staff = Actor::new("admin", Role::Client);
		staff.is_staff = true;
		assert!(o.can_be_viewed_by(&staff));
	}

	#[test]
	fn can_respond_public() {
		let o = order(false, OrderStatus::Published);
		assert!(o.can_respond(&Actor::new("creator-9", Role::Creator)));
		// The client never responds to their own order.
		assert!(!o.can_respond(&Actor::new("client-1", Role::Client)));
		// Clients without a creator profile cannot respond.
		assert!(!o.can_respond(&Actor::new("other", Role::Client)));
	}

	#[test]
	fn can_respond_public_requires_listed_status() {
		// Still open while earlier responses are awaiting a decision.
		let o = order(false, OrderStatus::AwaitingResponse);
		assert!(o.can_respond(&Actor::new("creator-9", Role::Creator)));

		for status in [
			OrderStatus::Draft,
			OrderStatus::InProgress,
			OrderStatus::OnReview,
			OrderStatus::Completed,
			OrderStatus::Canceled,
		] {
			let o = order(false, status);
			assert!(!o.can_respond(&Actor::new("creator-9", Role::Creator)));
		}
	}

	#[test]
	fn can_respond_private_only_target() {
		let o = order(true, OrderStatus::AwaitingResponse);
		assert!(o.can_respond(&Actor::new("creator-1", Role::Creator)));
		assert!(!o.can_respond(&Actor::new("creator-2", Role::Creator)));
	}
}
