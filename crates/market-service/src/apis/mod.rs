//! HTTP API handlers for the marketplace service.

pub mod chat;
pub mod order;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use market_core::ActionError;
use market_types::ErrorResponse;

/// Error envelope for all API handlers.
///
/// Maps the core error taxonomy onto HTTP status codes and the standard
/// error body.
#[derive(Debug)]
pub enum ApiError {
	Action(ActionError),
	Unauthorized(String),
}

impl From<ActionError> for ApiError {
	fn from(err: ActionError) -> Self {
		ApiError::Action(err)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let (status, code, message) = match self {
			ApiError::Unauthorized(message) => {
				(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
			},
			ApiError::Action(err) => {
				let message = err.to_string();
				match err {
					ActionError::PermissionDenied(_) => {
						(StatusCode::FORBIDDEN, "PERMISSION_DENIED", message)
					},
					ActionError::InvalidTransition { .. } | ActionError::InvalidState { .. } => {
						(StatusCode::BAD_REQUEST, "INVALID_STATE", message)
					},
					ActionError::Validation(_) => {
						(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
					},
					ActionError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", message),
					ActionError::Storage(_) => {
						// Do not leak backend details to clients.
						tracing::error!(error = %message, "Storage failure in API handler");
						(
							StatusCode::INTERNAL_SERVER_ERROR,
							"STORAGE_ERROR",
							"internal storage error".to_string(),
						)
					},
				}
			},
		};
		(status, Json(ErrorResponse::new(code, message))).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use market_types::OrderStatus;

	fn status_of(err: ActionError) -> StatusCode {
		ApiError::from(err).into_response().status()
	}

	#[test]
	fn error_status_mapping() {
		assert_eq!(
			status_of(ActionError::PermissionDenied("no".into())),
			StatusCode::FORBIDDEN
		);
		assert_eq!(
			status_of(ActionError::InvalidTransition {
				from: OrderStatus::Draft,
				to: OrderStatus::Completed,
			}),
			StatusCode::BAD_REQUEST
		);
		assert_eq!(
			status_of(ActionError::Validation("bad".into())),
			StatusCode::BAD_REQUEST
		);
		assert_eq!(
			status_of(ActionError::NotFound("order x".into())),
			StatusCode::NOT_FOUND
		);
		assert_eq!(
			status_of(ActionError::Storage("disk".into())),
			StatusCode::INTERNAL_SERVER_ERROR
		);
	}
}
