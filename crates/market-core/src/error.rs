//! Error taxonomy for the action handlers.
//!
//! Every handler resolves to one of these categories at its boundary.
//! Permission and state failures carry a human-readable reason naming
//! the violated precondition; storage failures surface as opaque
//! internal errors.

use market_storage::StorageError;
use market_types::OrderStatus;
use thiserror::Error;

/// Errors returned by action handlers.
#[derive(Debug, Error)]
pub enum ActionError {
	/// The actor lacks the role or ownership required for the action.
	#[error("Permission denied: {0}")]
	PermissionDenied(String),
	/// The requested status is not reachable from the current one.
	#[error("Invalid state transition from {from} to {to}")]
	InvalidTransition { from: OrderStatus, to: OrderStatus },
	/// The action is incompatible with the order's current status.
	#[error("Order is {status}: {reason}")]
	InvalidState {
		status: OrderStatus,
		reason: String,
	},
	/// Malformed or missing input.
	#[error("Validation error: {0}")]
	Validation(String),
	/// A referenced entity does not exist.
	#[error("Not found: {0}")]
	NotFound(String),
	/// Failure in the storage backend.
	#[error("Storage error: {0}")]
	Storage(String),
}

impl ActionError {
	/// Shorthand for permission failures.
	pub fn denied(reason: impl Into<String>) -> Self {
		ActionError::PermissionDenied(reason.into())
	}
}

impl From<StorageError> for ActionError {
	fn from(err: StorageError) -> Self {
		match err {
			StorageError::NotFound => ActionError::NotFound("record not found".to_string()),
			other => ActionError::Storage(other.to_string()),
		}
	}
}
