//! Chat thread endpoints.

use crate::apis::ApiError;
use crate::server::{AppState, AuthActor};
use axum::extract::{Path, State};
use axum::response::Json;
use market_types::{
	Chat, ChatMessagesResponse, CreateChatRequest, Message, PostMessageRequest,
	UnreadCountResponse,
};

/// Handles POST /api/chats.
pub async fn create_chat(
	State(state): State<AppState>,
	AuthActor(actor): AuthActor,
	Json(request): Json<CreateChatRequest>,
) -> Result<Json<Chat>, ApiError> {
	Ok(Json(
		state
			.market
			.chat_actions()
			.create_chat_for_order(&actor, &request.order_id)
			.await?,
	))
}

/// Handles GET /api/chats/{id}/messages.
pub async fn get_messages(
	State(state): State<AppState>,
	AuthActor(actor): AuthActor,
	Path(id): Path<String>,
) -> Result<Json<ChatMessagesResponse>, ApiError> {
	let (chat, messages) = state.market.chats().messages(&id, &actor).await?;
	Ok(Json(ChatMessagesResponse { chat, messages }))
}

/// Handles POST /api/chats/{id}/messages.
pub async fn post_message(
	State(state): State<AppState>,
	AuthActor(actor): AuthActor,
	Path(id): Path<String>,
	Json(request): Json<PostMessageRequest>,
) -> Result<Json<Message>, ApiError> {
	Ok(Json(
		state
			.market
			.chats()
			.post_message(&id, &actor, &request.content)
			.await?,
	))
}

/// Handles POST /api/chats/{id}/read.
pub async fn mark_read(
	State(state): State<AppState>,
	AuthActor(actor): AuthActor,
	Path(id): Path<String>,
) -> Result<Json<UnreadCountResponse>, ApiError> {
	state.market.chats().mark_read(&id, &actor).await?;
	let unread = state.market.chats().unread_count(&id, &actor).await?;
	Ok(Json(UnreadCountResponse { chat_id: id, unread }))
}

/// Handles GET /api/chats/{id}/unread.
pub async fn unread_count(
	State(state): State<AppState>,
	AuthActor(actor): AuthActor,
	Path(id): Path<String>,
) -> Result<Json<UnreadCountResponse>, ApiError> {
	let unread = state.market.chats().unread_count(&id, &actor).await?;
	Ok(Json(UnreadCountResponse { chat_id: id, unread }))
}
