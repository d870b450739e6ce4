//! Order-scoped chat actions.
//!
//! A creator opening a chat against an order is also an entry point
//! into the order lifecycle: for an unassigned order it assigns the
//! caller and starts the work, through the same state-machine path as
//! select_creator and start_order. Re-entering for an order the caller
//! already works on is an idempotent get of the existing chat.

use crate::error::ActionError;
use crate::event_bus::EventBus;
use crate::handlers::order_vars;
use crate::locks::LockRegistry;
use crate::messaging::ChatStore;
use crate::state::OrderStateMachine;
use market_types::{
	truncate_id, Actor, Chat, MarketEvent, MessageEvent, OrderEvent, OrderStatus,
};
use std::sync::Arc;
use tracing::instrument;

/// Handler for opening chats against orders.
pub struct ChatActionHandler {
	state_machine: Arc<OrderStateMachine>,
	chat_store: Arc<ChatStore>,
	locks: Arc<LockRegistry>,
	event_bus: EventBus,
}

impl ChatActionHandler {
	pub fn new(
		state_machine: Arc<OrderStateMachine>,
		chat_store: Arc<ChatStore>,
		locks: Arc<LockRegistry>,
		event_bus: EventBus,
	) -> Self {
		Self {
			state_machine,
			chat_store,
			locks,
			event_bus,
		}
	}

	/// Opens (or returns) the chat between `actor` and their counterpart
	/// on an order.
	///
	/// The client gets the chat with the assigned or target creator. A
	/// creator who may respond to an unassigned order is assigned and
	/// the order started; the already-assigned creator gets the existing
	/// chat back with no further transition.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), user = %actor.id))]
	pub async fn create_chat_for_order(
		&self,
		actor: &Actor,
		order_id: &str,
	) -> Result<Chat, ActionError> {
		let _guard = self.locks.acquire(&LockRegistry::order_key(order_id)).await;

		let order = self.state_machine.get_order(order_id).await?;

		if actor.id == order.client {
			let counterpart = order
				.creator
				.clone()
				.or_else(|| order.target_creator.clone())
				.ok_or_else(|| {
					ActionError::Validation(format!(
						"order {} has no creator to chat with yet",
						order.id
					))
				})?;
			let (chat, _) = self
				.chat_store
				.get_or_create(&order.client, &counterpart, Some(order_id))
				.await?;
			return Ok(chat);
		}

		if order.is_assigned_to(&actor.id) {
			let (chat, _) = self
				.chat_store
				.get_or_create(&order.client, &actor.id, Some(order_id))
				.await?;
			return Ok(chat);
		}

		if !order.can_respond(actor) {
			return Err(ActionError::denied(format!(
				"user {} is not involved with order {}",
				actor.id, order.id
			)));
		}

		// A respondable order gets assigned and started by this entry
		// point, exactly once, through the central transition path.
		let updated = self.state_machine.assign_and_start(order_id, &actor.id).await?;

		let (chat, _) = self
			.chat_store
			.get_or_create(&updated.client, &actor.id, Some(order_id))
			.await?;
		let mut vars = order_vars(&updated);
		vars.insert("creator_name", actor.display_name.clone());
		if let Err(e) = self
			.chat_store
			.post_system_message(&chat.id, MessageEvent::CreatorAssigned, &vars)
			.await
		{
			tracing::warn!(error = %e, "Failed to emit creator-assigned message");
		}

		self.event_bus
			.publish(MarketEvent::Order(OrderEvent::StatusChanged {
				order_id: updated.id.clone(),
				from: order.status,
				to: OrderStatus::InProgress,
			}))
			.ok();
		self.event_bus
			.publish(MarketEvent::Order(OrderEvent::CreatorAssigned {
				order_id: updated.id.clone(),
				creator: actor.id.clone(),
			}))
			.ok();

		Ok(chat)
	}
}
