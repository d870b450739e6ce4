//! API types for HTTP endpoints and request/response structures.
//!
//! These DTOs are the wire surface of the action handlers. The entities
//! themselves serialize directly in responses; this module only adds the
//! request payloads and the error envelope.

use serde::{Deserialize, Serialize};

use crate::{Chat, Message, UserId};

/// Payload for creating an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
	pub title: String,
	pub description: String,
	pub category: String,
	#[serde(default)]
	pub tags: Vec<String>,
	pub budget: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub deadline: Option<u64>,
	/// Private orders are addressed to `target_creator` only.
	#[serde(default)]
	pub is_private: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub target_creator: Option<UserId>,
	/// Publish immediately instead of saving as a draft.
	#[serde(default)]
	pub publish: bool,
}

/// Payload for a creator responding to an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResponseRequest {
	pub message: String,
	pub price: u64,
	pub timeframe_days: u32,
}

/// Payload for the client selecting a creator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectCreatorRequest {
	pub creator_id: UserId,
	/// When given, the response must belong to `creator_id`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub response_id: Option<String>,
}

/// One file reference within a delivery payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryFileInput {
	pub file_ref: String,
	pub name: String,
}

/// Payload for submitting a delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitDeliveryRequest {
	#[serde(default)]
	pub comment: String,
	#[serde(default)]
	pub is_final: bool,
	#[serde(default)]
	pub files: Vec<DeliveryFileInput>,
}

/// Payload for the client reviewing a completed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReviewRequest {
	pub rating: u8,
	#[serde(default)]
	pub comment: String,
}

/// Payload for opening a chat against an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChatRequest {
	pub order_id: String,
}

/// Payload for posting a user message to a chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostMessageRequest {
	pub content: String,
}

/// A chat thread together with its message log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessagesResponse {
	pub chat: Chat,
	pub messages: Vec<Message>,
}

/// Unread-counter payload for a chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadCountResponse {
	pub chat_id: String,
	pub unread: usize,
}

/// Standard error response structure for API failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Machine-readable error code.
	pub error: String,
	/// Human-readable reason naming the violated precondition.
	pub message: String,
}

impl ErrorResponse {
	pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			error: error.into(),
			message: message.into(),
		}
	}
}
