//! Order, response, delivery and review endpoints.

use crate::apis::ApiError;
use crate::server::{AppState, AuthActor};
use axum::extract::{Path, State};
use axum::response::Json;
use market_types::{
	CreateOrderRequest, CreateResponseRequest, CreateReviewRequest, CreatorProfile, Delivery,
	Order, OrderResponse, Review, SelectCreatorRequest, SubmitDeliveryRequest,
};

/// Handles POST /api/orders.
pub async fn create_order(
	State(state): State<AppState>,
	AuthActor(actor): AuthActor,
	Json(request): Json<CreateOrderRequest>,
) -> Result<Json<Order>, ApiError> {
	Ok(Json(
		state.market.orders().create_order(&actor, request).await?,
	))
}

/// Handles GET /api/orders/{id}.
pub async fn get_order(
	State(state): State<AppState>,
	AuthActor(actor): AuthActor,
	Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
	Ok(Json(state.market.orders().get_order_for(&actor, &id).await?))
}

/// Handles POST /api/orders/{id}/publish.
pub async fn publish_order(
	State(state): State<AppState>,
	AuthActor(actor): AuthActor,
	Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
	Ok(Json(state.market.orders().publish_order(&actor, &id).await?))
}

/// Handles POST /api/orders/{id}/select-creator.
pub async fn select_creator(
	State(state): State<AppState>,
	AuthActor(actor): AuthActor,
	Path(id): Path<String>,
	Json(request): Json<SelectCreatorRequest>,
) -> Result<Json<Order>, ApiError> {
	Ok(Json(
		state
			.market
			.orders()
			.select_creator(&actor, &id, request)
			.await?,
	))
}

/// Handles POST /api/orders/{id}/start.
pub async fn start_order(
	State(state): State<AppState>,
	AuthActor(actor): AuthActor,
	Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
	Ok(Json(state.market.orders().start_order(&actor, &id).await?))
}

/// Handles POST /api/orders/{id}/submit-for-review.
pub async fn submit_for_review(
	State(state): State<AppState>,
	AuthActor(actor): AuthActor,
	Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
	Ok(Json(
		state.market.orders().submit_for_review(&actor, &id).await?,
	))
}

/// Handles POST /api/orders/{id}/complete.
pub async fn complete_order(
	State(state): State<AppState>,
	AuthActor(actor): AuthActor,
	Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
	Ok(Json(state.market.orders().complete_order(&actor, &id).await?))
}

/// Handles POST /api/orders/{id}/cancel.
pub async fn cancel_order(
	State(state): State<AppState>,
	AuthActor(actor): AuthActor,
	Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
	Ok(Json(state.market.orders().cancel_order(&actor, &id).await?))
}

/// Handles POST /api/orders/{id}/reopen.
pub async fn reopen_order(
	State(state): State<AppState>,
	AuthActor(actor): AuthActor,
	Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
	Ok(Json(state.market.orders().reopen_order(&actor, &id).await?))
}

/// Handles POST /api/orders/{id}/responses.
pub async fn create_response(
	State(state): State<AppState>,
	AuthActor(actor): AuthActor,
	Path(id): Path<String>,
	Json(request): Json<CreateResponseRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
	Ok(Json(
		state
			.market
			.responses()
			.create_response(&actor, &id, request)
			.await?,
	))
}

/// Handles GET /api/orders/{id}/responses.
pub async fn list_responses(
	State(state): State<AppState>,
	AuthActor(actor): AuthActor,
	Path(id): Path<String>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
	Ok(Json(
		state
			.market
			.responses()
			.responses_for_order(&actor, &id)
			.await?,
	))
}

/// Handles POST /api/orders/{id}/deliveries.
pub async fn submit_delivery(
	State(state): State<AppState>,
	AuthActor(actor): AuthActor,
	Path(id): Path<String>,
	Json(request): Json<SubmitDeliveryRequest>,
) -> Result<Json<Delivery>, ApiError> {
	Ok(Json(
		state
			.market
			.deliveries()
			.submit_delivery(&actor, &id, request)
			.await?,
	))
}

/// Handles GET /api/orders/{id}/deliveries.
pub async fn list_deliveries(
	State(state): State<AppState>,
	AuthActor(actor): AuthActor,
	Path(id): Path<String>,
) -> Result<Json<Vec<Delivery>>, ApiError> {
	Ok(Json(
		state
			.market
			.deliveries()
			.list_deliveries(&actor, &id)
			.await?,
	))
}

/// Handles POST /api/orders/{id}/reviews.
pub async fn create_review(
	State(state): State<AppState>,
	AuthActor(actor): AuthActor,
	Path(id): Path<String>,
	Json(request): Json<CreateReviewRequest>,
) -> Result<Json<Review>, ApiError> {
	Ok(Json(
		state
			.market
			.reviews()
			.create_review(&actor, &id, request)
			.await?,
	))
}

/// Handles GET /api/creators/{id}/reviews.
pub async fn creator_reviews(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<Vec<Review>>, ApiError> {
	Ok(Json(state.market.reviews().reviews_for_creator(&id).await?))
}

/// Handles GET /api/creators/{id}/profile.
pub async fn creator_profile(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<CreatorProfile>, ApiError> {
	Ok(Json(state.market.creator_profile(&id).await?))
}
