//! Order state machine implementation.
//!
//! Manages order state transitions with validation, ensuring orders move
//! through valid lifecycle states: draft -> published ->
//! awaiting_response -> in_progress -> on_review -> completed, with
//! canceled reachable from every non-terminal state and recoverable only
//! back to draft. Also provides utilities for updating order fields.

use crate::error::ActionError;
use market_storage::StorageService;
use market_types::{unix_now, Order, OrderStatus, StorageKey, UserId};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Static transition table - each state maps to allowed next states.
static TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
	let mut m = HashMap::new();
	m.insert(
		OrderStatus::Draft,
		HashSet::from([OrderStatus::Published, OrderStatus::Canceled]),
	);
	m.insert(
		OrderStatus::Published,
		HashSet::from([
			OrderStatus::AwaitingResponse,
			OrderStatus::InProgress,
			OrderStatus::Canceled,
		]),
	);
	m.insert(
		OrderStatus::AwaitingResponse,
		HashSet::from([OrderStatus::InProgress, OrderStatus::Canceled]),
	);
	m.insert(
		OrderStatus::InProgress,
		HashSet::from([OrderStatus::OnReview, OrderStatus::Canceled]),
	);
	m.insert(
		OrderStatus::OnReview,
		HashSet::from([
			OrderStatus::InProgress,
			OrderStatus::Completed,
			OrderStatus::Canceled,
		]),
	);
	m.insert(OrderStatus::Completed, HashSet::new()); // terminal
	m.insert(OrderStatus::Canceled, HashSet::from([OrderStatus::Draft]));
	m
});

/// Manages order state transitions and persistence.
///
/// This is the single authority for status writes: every handler path
/// that moves an order between states goes through [`transition`] or
/// [`assign_and_start`], so no call site re-implements "set status and
/// save" on its own.
///
/// [`transition`]: OrderStateMachine::transition
/// [`assign_and_start`]: OrderStateMachine::assign_and_start
pub struct OrderStateMachine {
	storage: Arc<StorageService>,
}

impl OrderStateMachine {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Checks if a state transition is valid.
	pub fn is_valid_transition(from: &OrderStatus, to: &OrderStatus) -> bool {
		TRANSITIONS.get(from).is_some_and(|set| set.contains(to))
	}

	/// Validates a transition without touching storage.
	///
	/// Handlers call this before any side-effecting write so an aborted
	/// transition leaves every store untouched.
	pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> Result<(), ActionError> {
		if Self::is_valid_transition(&from, &to) {
			Ok(())
		} else {
			Err(ActionError::InvalidTransition { from, to })
		}
	}

	/// Gets an order by ID.
	pub async fn get_order(&self, order_id: &str) -> Result<Order, ActionError> {
		self.storage
			.retrieve(StorageKey::Orders.as_str(), order_id)
			.await
			.map_err(|e| match e {
				market_storage::StorageError::NotFound => {
					ActionError::NotFound(format!("order {}", order_id))
				},
				other => ActionError::Storage(other.to_string()),
			})
	}

	/// Stores a new order.
	pub async fn store_order(&self, order: &Order) -> Result<(), ActionError> {
		self.storage
			.store(StorageKey::Orders.as_str(), &order.id, order)
			.await
			.map_err(|e| ActionError::Storage(e.to_string()))
	}

	/// Updates an order with a closure and persists it.
	pub async fn update_order_with<F>(
		&self,
		order_id: &str,
		updater: F,
	) -> Result<Order, ActionError>
	where
		F: FnOnce(&mut Order),
	{
		let mut order = self.get_order(order_id).await?;

		updater(&mut order);

		// Automatically set updated_at timestamp
		order.updated_at = unix_now();

		self.storage
			.update(StorageKey::Orders.as_str(), order_id, &order)
			.await
			.map_err(|e| ActionError::Storage(e.to_string()))?;

		Ok(order)
	}

	/// Transitions an order to a new status with validation.
	pub async fn transition(
		&self,
		order_id: &str,
		new_status: OrderStatus,
	) -> Result<Order, ActionError> {
		let order = self.get_order(order_id).await?;

		Self::validate_transition(order.status, new_status)?;

		self.update_order_with(order_id, |o| {
			o.status = new_status;
		})
		.await
	}

	/// Assigns a creator and moves the order into progress in one write.
	///
	/// This is the only path that sets `Order::creator`, which keeps the
	/// invariant "creator is non-null iff the order is in progress, on
	/// review or completed" true on every handler path.
	pub async fn assign_and_start(
		&self,
		order_id: &str,
		creator: &UserId,
	) -> Result<Order, ActionError> {
		let order = self.get_order(order_id).await?;

		Self::validate_transition(order.status, OrderStatus::InProgress)?;

		self.update_order_with(order_id, |o| {
			o.creator = Some(creator.clone());
			if o.target_creator.is_none() {
				o.target_creator = Some(creator.clone());
			}
			o.status = OrderStatus::InProgress;
		})
		.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use market_storage::implementations::memory::MemoryStorage;
	use market_types::Order;

	fn machine() -> OrderStateMachine {
		OrderStateMachine::new(Arc::new(StorageService::new(Box::new(
			MemoryStorage::new(),
		))))
	}

	fn order(status: OrderStatus) -> Order {
		Order {
			id: "o1".into(),
			title: "Logo".into(),
			description: String::new(),
			client: "c1".into(),
			creator: None,
			target_creator: None,
			category: "design".into(),
			tags: vec![],
			budget: 100,
			deadline: None,
			status,
			is_private: false,
			views_count: 0,
			created_at: 0,
			updated_at: 0,
		}
	}

	fn allowed(from: OrderStatus) -> Vec<OrderStatus> {
		match from {
			OrderStatus::Draft => vec![OrderStatus::Published, OrderStatus::Canceled],
			OrderStatus::Published => vec![
				OrderStatus::AwaitingResponse,
				OrderStatus::InProgress,
				OrderStatus::Canceled,
			],
			OrderStatus::AwaitingResponse => {
				vec![OrderStatus::InProgress, OrderStatus::Canceled]
			},
			OrderStatus::InProgress => vec![OrderStatus::OnReview, OrderStatus::Canceled],
			OrderStatus::OnReview => vec![
				OrderStatus::InProgress,
				OrderStatus::Completed,
				OrderStatus::Canceled,
			],
			OrderStatus::Completed => vec![],
			OrderStatus::Canceled => vec![OrderStatus::Draft],
		}
	}

	#[test]
	fn transition_table_is_exhaustive() {
		// Every (from, to) pair outside the declared table must fail.
		for from in OrderStatus::all() {
			let allowed = allowed(from);
			for to in OrderStatus::all() {
				assert_eq!(
					OrderStateMachine::is_valid_transition(&from, &to),
					allowed.contains(&to),
					"unexpected verdict for {} -> {}",
					from,
					to
				);
			}
		}
	}

	#[test]
	fn completed_is_terminal() {
		for to in OrderStatus::all() {
			assert!(!OrderStateMachine::is_valid_transition(
				&OrderStatus::Completed,
				&to
			));
		}
	}

	#[tokio::test]
	async fn failed_transition_leaves_order_unchanged() {
		let machine = machine();
		machine.store_order(&order(OrderStatus::Draft)).await.unwrap();

		let err = machine
			.transition("o1", OrderStatus::InProgress)
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			ActionError::InvalidTransition {
				from: OrderStatus::Draft,
				to: OrderStatus::InProgress
			}
		));

		let unchanged = machine.get_order("o1").await.unwrap();
		assert_eq!(unchanged.status, OrderStatus::Draft);
	}

	#[tokio::test]
	async fn transition_persists_and_bumps_updated_at() {
		let machine = machine();
		machine.store_order(&order(OrderStatus::Draft)).await.unwrap();

		let updated = machine
			.transition("o1", OrderStatus::Published)
			.await
			.unwrap();
		assert_eq!(updated.status, OrderStatus::Published);
		assert!(updated.updated_at > 0);
	}

	#[tokio::test]
	async fn assign_and_start_sets_creator_and_target() {
		let machine = machine();
		machine
			.store_order(&order(OrderStatus::Published))
			.await
			.unwrap();

		let updated = machine
			.assign_and_start("o1", &"creator-1".to_string())
			.await
			.unwrap();
		assert_eq!(updated.status, OrderStatus::InProgress);
		assert_eq!(updated.creator.as_deref(), Some("creator-1"));
		assert_eq!(updated.target_creator.as_deref(), Some("creator-1"));
	}

	#[tokio::test]
	async fn assign_and_start_rejects_terminal_states() {
		let machine = machine();
		machine
			.store_order(&order(OrderStatus::Completed))
			.await
			.unwrap();

		let err = machine
			.assign_and_start("o1", &"creator-1".to_string())
			.await
			.unwrap_err();
		assert!(matches!(err, ActionError::InvalidTransition { .. }));
	}
}
