//! Creator response handler.
//!
//! A response is a creator's bid against an order. At most one response
//! exists per (order, creator) pair, enforced with an atomic unique-key
//! create rather than a read-then-write check. The first response to a
//! public order moves it to awaiting_response; a response to a private
//! order assigns the target creator and starts the order directly.

use crate::error::ActionError;
use crate::event_bus::EventBus;
use crate::handlers::order_vars;
use crate::locks::LockRegistry;
use crate::messaging::ChatStore;
use crate::state::OrderStateMachine;
use market_storage::{StorageError, StorageService};
use market_types::{
	truncate_id, unix_now, Actor, CreateResponseRequest, MarketEvent, MessageEvent, Order,
	OrderEvent, OrderResponse, OrderStatus, ResponseStatus, StorageKey, WorkflowEvent,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Handler for creator responses to orders.
pub struct ResponseHandler {
	storage: Arc<StorageService>,
	state_machine: Arc<OrderStateMachine>,
	chat_store: Arc<ChatStore>,
	locks: Arc<LockRegistry>,
	event_bus: EventBus,
}

impl ResponseHandler {
	pub fn new(
		storage: Arc<StorageService>,
		state_machine: Arc<OrderStateMachine>,
		chat_store: Arc<ChatStore>,
		locks: Arc<LockRegistry>,
		event_bus: EventBus,
	) -> Self {
		Self {
			storage,
			state_machine,
			chat_store,
			locks,
			event_bus,
		}
	}

	/// Submits `actor`'s response to an order.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), creator = %actor.id))]
	pub async fn create_response(
		&self,
		actor: &Actor,
		order_id: &str,
		request: CreateResponseRequest,
	) -> Result<OrderResponse, ActionError> {
		let _guard = self.locks.acquire(&LockRegistry::order_key(order_id)).await;

		let order = self.state_machine.get_order(order_id).await?;
		Self::check_can_respond(&order, actor)?;

		if request.message.trim().is_empty() {
			return Err(ActionError::Validation(
				"response message must not be empty".to_string(),
			));
		}
		if request.price == 0 {
			return Err(ActionError::Validation("price must be positive".to_string()));
		}

		let response = OrderResponse {
			id: Uuid::new_v4().to_string(),
			order_id: order_id.to_string(),
			creator: actor.id.clone(),
			creator_name: actor.display_name.clone(),
			message: request.message,
			price: request.price,
			timeframe_days: request.timeframe_days,
			status: ResponseStatus::Pending,
			created_at: unix_now(),
		};

		// The unique key is the only duplicate check; racing duplicates
		// from the same creator lose here before any other write.
		let unique_key = format!("{}:{}", order_id, actor.id);
		match self
			.storage
			.create(
				StorageKey::ResponseByOrderCreator.as_str(),
				&unique_key,
				&response.id,
			)
			.await
		{
			Ok(()) => {},
			Err(StorageError::AlreadyExists) => {
				return Err(ActionError::Validation(format!(
					"creator {} has already responded to order {}",
					actor.id, order_id
				)));
			},
			Err(other) => return Err(other.into()),
		}

		self.storage
			.store(StorageKey::Responses.as_str(), &response.id, &response)
			.await?;
		self.storage
			.push_index(StorageKey::ResponsesByOrder.as_str(), order_id, &response.id)
			.await?;

		let updated = if order.is_private {
			// Private orders skip client selection: the target creator's
			// response is the acceptance.
			self.accept_private_response(&order, &response).await?
		} else if order.status == OrderStatus::Published {
			self.state_machine
				.transition(order_id, OrderStatus::AwaitingResponse)
				.await?
		} else {
			order.clone()
		};

		self.open_response_chat(&updated, actor).await;

		if order.status != updated.status {
			self.event_bus
				.publish(MarketEvent::Order(OrderEvent::StatusChanged {
					order_id: order_id.to_string(),
					from: order.status,
					to: updated.status,
				}))
				.ok();
		}
		self.event_bus
			.publish(MarketEvent::Workflow(WorkflowEvent::ResponseCreated {
				order_id: order_id.to_string(),
				response_id: response.id.clone(),
				creator: actor.id.clone(),
			}))
			.ok();

		Ok(response)
	}

	/// Responses against an order. Visible to the client and staff; a
	/// creator sees only their own.
	pub async fn responses_for_order(
		&self,
		actor: &Actor,
		order_id: &str,
	) -> Result<Vec<OrderResponse>, ActionError> {
		let order = self.state_machine.get_order(order_id).await?;

		let ids = self
			.storage
			.index_ids(StorageKey::ResponsesByOrder.as_str(), order_id)
			.await?;
		let mut responses = Vec::with_capacity(ids.len());
		for id in ids {
			let response: OrderResponse = self
				.storage
				.retrieve(StorageKey::Responses.as_str(), &id)
				.await?;
			responses.push(response);
		}

		if actor.id != order.client && !actor.is_staff {
			responses.retain(|r| r.creator == actor.id);
		}
		Ok(responses)
	}

	fn check_can_respond(order: &Order, actor: &Actor) -> Result<(), ActionError> {
		if order.can_respond(actor) {
			return Ok(());
		}
		// Name the precondition that actually failed.
		if actor.id == order.client {
			return Err(ActionError::denied(
				"the client cannot respond to their own order".to_string(),
			));
		}
		if order.is_private {
			if order.target_creator.as_deref() != Some(actor.id.as_str()) {
				return Err(ActionError::denied(format!(
					"order {} is private and addressed to another creator",
					order.id
				)));
			}
			return Err(ActionError::InvalidState {
				status: order.status,
				reason: "the private order no longer accepts a response".to_string(),
			});
		}
		if !actor.is_creator() {
			return Err(ActionError::denied(
				"only creators can respond to orders".to_string(),
			));
		}
		Err(ActionError::InvalidState {
			status: order.status,
			reason: "responses are accepted only while the order is listed".to_string(),
		})
	}

	async fn accept_private_response(
		&self,
		order: &Order,
		response: &OrderResponse,
	) -> Result<Order, ActionError> {
		let mut accepted = response.clone();
		accepted.status = ResponseStatus::Accepted;
		self.storage
			.store(StorageKey::Responses.as_str(), &accepted.id, &accepted)
			.await?;
		self.event_bus
			.publish(MarketEvent::Workflow(WorkflowEvent::ResponseResolved {
				response_id: accepted.id.clone(),
				status: ResponseStatus::Accepted,
			}))
			.ok();

		let updated = self
			.state_machine
			.assign_and_start(&order.id, &response.creator)
			.await?;
		self.event_bus
			.publish(MarketEvent::Order(OrderEvent::CreatorAssigned {
				order_id: updated.id.clone(),
				creator: response.creator.clone(),
			}))
			.ok();
		Ok(updated)
	}

	async fn open_response_chat(&self, order: &Order, actor: &Actor) {
		let (chat, created) = match self
			.chat_store
			.get_or_create(&order.client, &actor.id, Some(&order.id))
			.await
		{
			Ok(result) => result,
			Err(e) => {
				tracing::warn!(error = %e, "Failed to open chat for response");
				return;
			},
		};

		// A private response assigns the creator, which the assignment
		// message already narrates; the plain "responded" message is
		// only emitted into a freshly created chat.
		let event = if order.status == OrderStatus::InProgress {
			MessageEvent::CreatorAssigned
		} else if created {
			MessageEvent::CreatorResponded
		} else {
			return;
		};

		let mut vars = order_vars(order);
		vars.insert("creator_name", actor.display_name.clone());
		if let Err(e) = self.chat_store.post_system_message(&chat.id, event, &vars).await {
			tracing::warn!(error = %e, "Failed to emit response message");
		}
	}
}
