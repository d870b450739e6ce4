//! HTTP server for the marketplace API.
//!
//! Hosts the action handlers behind an axum router. Authentication is
//! delegated to an upstream gateway; this server trusts the identity
//! headers it forwards and resolves them into an [`Actor`] once per
//! request.

use crate::apis::{self, ApiError};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::routing::{get, post};
use axum::Router;
use market_config::ApiConfig;
use market_core::Marketplace;
use market_types::{is_key_safe_id, Actor, Role};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// The marketplace engine processing all requests.
	pub market: Arc<Marketplace>,
}

/// The request principal, extracted from gateway identity headers.
///
/// `x-actor-id` and `x-actor-role` are required; `x-actor-name`
/// defaults to the id and `x-actor-staff` to false.
pub struct AuthActor(pub Actor);

impl<S> FromRequestParts<S> for AuthActor
where
	S: Send + Sync,
{
	type Rejection = ApiError;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		let header = |name: &str| {
			parts
				.headers
				.get(name)
				.and_then(|v| v.to_str().ok())
				.map(str::to_string)
		};

		let id = header("x-actor-id")
			.ok_or_else(|| ApiError::Unauthorized("missing x-actor-id header".to_string()))?;
		// Ids become storage key segments; separator characters would
		// alias other keys.
		if !is_key_safe_id(&id) {
			return Err(ApiError::Unauthorized(
				"x-actor-id must be non-empty and free of ':' and '/'".to_string(),
			));
		}
		let role = header("x-actor-role")
			.ok_or_else(|| ApiError::Unauthorized("missing x-actor-role header".to_string()))?
			.parse::<Role>()
			.map_err(|_| {
				ApiError::Unauthorized("x-actor-role must be 'client' or 'creator'".to_string())
			})?;

		let mut actor = Actor::new(id, role);
		if let Some(name) = header("x-actor-name") {
			actor.display_name = name;
		}
		actor.is_staff = matches!(header("x-actor-staff").as_deref(), Some("true") | Some("1"));

		Ok(AuthActor(actor))
	}
}

/// Builds the router with all API routes under /api.
pub fn build_router(market: Arc<Marketplace>) -> Router {
	let state = AppState { market };

	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/orders", post(apis::order::create_order))
				.route("/orders/{id}", get(apis::order::get_order))
				.route("/orders/{id}/publish", post(apis::order::publish_order))
				.route(
					"/orders/{id}/select-creator",
					post(apis::order::select_creator),
				)
				.route("/orders/{id}/start", post(apis::order::start_order))
				.route(
					"/orders/{id}/submit-for-review",
					post(apis::order::submit_for_review),
				)
				.route("/orders/{id}/complete", post(apis::order::complete_order))
				.route("/orders/{id}/cancel", post(apis::order::cancel_order))
				.route("/orders/{id}/reopen", post(apis::order::reopen_order))
				.route(
					"/orders/{id}/responses",
					post(apis::order::create_response).get(apis::order::list_responses),
				)
				.route(
					"/orders/{id}/deliveries",
					post(apis::order::submit_delivery).get(apis::order::list_deliveries),
				)
				.route("/orders/{id}/reviews", post(apis::order::create_review))
				.route("/creators/{id}/profile", get(apis::order::creator_profile))
				.route("/creators/{id}/reviews", get(apis::order::creator_reviews))
				.route("/chats", post(apis::chat::create_chat))
				.route(
					"/chats/{id}/messages",
					get(apis::chat::get_messages).post(apis::chat::post_message),
				)
				.route("/chats/{id}/read", post(apis::chat::mark_read))
				.route("/chats/{id}/unread", get(apis::chat::unread_count)),
		)
		.layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
		.with_state(state)
}

/// Starts the HTTP server and serves until the task is dropped.
pub async fn start_server(
	api_config: ApiConfig,
	market: Arc<Marketplace>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = build_router(market);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Marketplace API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::http::Request;

	async fn extract(request: Request<()>) -> Result<Actor, ApiError> {
		let (mut parts, _) = request.into_parts();
		AuthActor::from_request_parts(&mut parts, &())
			.await
			.map(|AuthActor(actor)| actor)
	}

	#[tokio::test]
	async fn extracts_full_identity() {
		let request = Request::builder()
			.header("x-actor-id", "u1")
			.header("x-actor-name", "Ada")
			.header("x-actor-role", "creator")
			.header("x-actor-staff", "true")
			.body(())
			.unwrap();

		let actor = extract(request).await.unwrap();
		assert_eq!(actor.id, "u1");
		assert_eq!(actor.display_name, "Ada");
		assert_eq!(actor.role, Role::Creator);
		assert!(actor.is_staff);
	}

	#[tokio::test]
	async fn name_defaults_to_id_and_staff_to_false() {
		let request = Request::builder()
			.header("x-actor-id", "u1")
			.header("x-actor-role", "client")
			.body(())
			.unwrap();

		let actor = extract(request).await.unwrap();
		assert_eq!(actor.display_name, "u1");
		assert!(!actor.is_staff);
	}

	#[tokio::test]
	async fn rejects_missing_or_bad_headers() {
		let request = Request::builder()
			.header("x-actor-role", "client")
			.body(())
			.unwrap();
		assert!(extract(request).await.is_err());

		let request = Request::builder()
			.header("x-actor-id", "u1")
			.header("x-actor-role", "admin")
			.body(())
			.unwrap();
		assert!(extract(request).await.is_err());
	}

	#[tokio::test]
	async fn rejects_ids_with_key_separators() {
		for id in ["a:b", "a/b", "  "] {
			let request = Request::builder()
				.header("x-actor-id", id)
				.header("x-actor-role", "creator")
				.body(())
				.unwrap();
			assert!(extract(request).await.is_err());
		}
	}
}
