//! Order lifecycle handler.
//!
//! Owns order creation and every direct status action: publish, select
//! a creator, creator self-start, submit for review, complete, cancel
//! and reopen. All status writes go through the state machine; chat
//! side effects are emitted here, after the order mutation commits.

use crate::error::ActionError;
use crate::event_bus::EventBus;
use crate::handlers::delivery::deliveries_for_order;
use crate::handlers::{load_profile, order_vars, store_profile};
use crate::locks::LockRegistry;
use crate::messaging::ChatStore;
use crate::state::OrderStateMachine;
use market_storage::StorageService;
use market_types::{
	is_key_safe_id, truncate_id, unix_now, Actor, CreateOrderRequest, MarketEvent, MessageEvent,
	Order, OrderEvent, OrderResponse, OrderStatus, ResponseStatus, SelectCreatorRequest,
	StorageKey, WorkflowEvent,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Handler for order creation and direct status actions.
pub struct LifecycleHandler {
	storage: Arc<StorageService>,
	state_machine: Arc<OrderStateMachine>,
	chat_store: Arc<ChatStore>,
	locks: Arc<LockRegistry>,
	event_bus: EventBus,
}

impl LifecycleHandler {
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

	/// Creates a new order owned by `actor`.
	///
	/// Private orders require a target creator and start awaiting that
	/// creator's response; public orders start published or as a draft.
	#[instrument(skip_all, fields(client = %actor.id))]
	pub async fn create_order(
		&self,
		actor: &Actor,
		request: CreateOrderRequest,
	) -> Result<Order, ActionError> {
		if request.title.trim().is_empty() {
			return Err(ActionError::Validation("title must not be empty".to_string()));
		}
		if request.budget == 0 {
			return Err(ActionError::Validation("budget must be positive".to_string()));
		}
		if request.is_private && request.target_creator.is_none() {
			return Err(ActionError::Validation(
				"a private order requires a target_creator".to_string(),
			));
		}
		if let Some(target) = &request.target_creator {
			if !is_key_safe_id(target) {
				return Err(ActionError::Validation(
					"target_creator must be non-empty and free of ':' and '/'".to_string(),
				));
			}
		}
		if request.target_creator.as_deref() == Some(actor.id.as_str()) {
			return Err(ActionError::Validation(
				"the client cannot be the target creator of their own order".to_string(),
			));
		}

		let status = if request.is_private {
			OrderStatus::AwaitingResponse
		} else if request.publish {
			OrderStatus::Published
		} else {
			OrderStatus::Draft
		};

		let now = unix_now();
		let order = Order {
			id: Uuid::new_v4().to_string(),
			title: request.title,
			description: request.description,
			client: actor.id.clone(),
			creator: None,
			target_creator: request.target_creator,
			category: request.category,
			tags: request.tags,
			budget: request.budget,
			deadline: request.deadline,
			status,
			is_private: request.is_private,
			views_count: 0,
			created_at: now,
			updated_at: now,
		};

		self.state_machine.store_order(&order).await?;
		tracing::info!(order_id = %truncate_id(&order.id), status = %order.status, "Created order");

		self.event_bus
			.publish(MarketEvent::Order(OrderEvent::Created {
				order_id: order.id.clone(),
				client: order.client.clone(),
			}))
			.ok();

		Ok(order)
	}

	/// Returns the order for a viewer, counting the view.
	///
	/// Views by the owner or staff do not count.
	pub async fn get_order_for(
		&self,
		actor: &Actor,
		order_id: &str,
	) -> Result<Order, ActionError> {
		let _guard = self.locks.acquire(&LockRegistry::order_key(order_id)).await;

		let order = self.state_machine.get_order(order_id).await?;
		if !order.can_be_viewed_by(actor) {
			return Err(ActionError::denied(format!(
				"user {} may not view this private order",
				actor.id
			)));
		}

		if actor.id != order.client && !actor.is_staff {
			return self
				.state_machine
				.update_order_with(order_id, |o| o.views_count += 1)
				.await;
		}
		Ok(order)
	}

	/// Publishes a drafted order.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn publish_order(
		&self,
		actor: &Actor,
		order_id: &str,
	) -> Result<Order, ActionError> {
		let _guard = self.locks.acquire(&LockRegistry::order_key(order_id)).await;

		let order = self.state_machine.get_order(order_id).await?;
		self.require_client(&order, actor, "publish the order")?;

		let updated = self
			.state_machine
			.transition(order_id, OrderStatus::Published)
			.await?;
		self.publish_status_event(&order, &updated);
		Ok(updated)
	}

	/// Assigns a creator chosen by the client and starts the order.
	///
	/// When a response id is given it must belong to the chosen creator;
	/// the response is accepted and all sibling responses are rejected.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), creator = %request.creator_id))]
	pub async fn select_creator(
		&self,
		actor: &Actor,
		order_id: &str,
		request: SelectCreatorRequest,
	) -> Result<Order, ActionError> {
		let _guard = self.locks.acquire(&LockRegistry::order_key(order_id)).await;

		let order = self.state_machine.get_order(order_id).await?;
		self.require_client(&order, actor, "select a creator")?;

		if !is_key_safe_id(&request.creator_id) {
			return Err(ActionError::Validation(
				"creator_id must be non-empty and free of ':' and '/'".to_string(),
			));
		}

		// Everything that can fail is checked before the first write.
		OrderStateMachine::validate_transition(order.status, OrderStatus::InProgress)?;

		let accepted = match &request.response_id {
			Some(response_id) => {
				let response: OrderResponse = self
					.storage
					.retrieve_opt(StorageKey::Responses.as_str(), response_id)
					.await?
					.ok_or_else(|| ActionError::NotFound(format!("response {}", response_id)))?;
				if response.order_id != order_id {
					return Err(ActionError::Validation(format!(
						"response {} does not belong to order {}",
						response_id, order_id
					)));
				}
				if response.creator != request.creator_id {
					return Err(ActionError::Validation(format!(
						"response {} was not submitted by creator {}",
						response_id, request.creator_id
					)));
				}
				Some(response)
			},
			// Without an explicit response id, the chosen creator's own
			// pending response (if any) is the accepted one.
			None => {
				let unique_key = format!("{}:{}", order_id, request.creator_id);
				match self
					.storage
					.retrieve_opt::<String>(
						StorageKey::ResponseByOrderCreator.as_str(),
						&unique_key,
					)
					.await?
				{
					Some(response_id) => Some(
						self.storage
							.retrieve(StorageKey::Responses.as_str(), &response_id)
							.await?,
					),
					None => None,
				}
			},
		};

		if let Some(mut response) = accepted.clone() {
			response.status = ResponseStatus::Accepted;
			self.storage
				.store(StorageKey::Responses.as_str(), &response.id, &response)
				.await?;
			self.event_bus
				.publish(MarketEvent::Workflow(WorkflowEvent::ResponseResolved {
					response_id: response.id.clone(),
					status: ResponseStatus::Accepted,
				}))
				.ok();
		}

		let updated = self
			.state_machine
			.assign_and_start(order_id, &request.creator_id)
			.await?;

		self.reject_sibling_responses(order_id, accepted.as_ref().map(|r| r.id.as_str()))
			.await?;

		// Chat side effects after the order commit; failures only warn.
		let creator_name = accepted
			.as_ref()
			.map(|r| r.creator_name.clone())
			.unwrap_or_else(|| request.creator_id.clone());
		self.announce_assignment(&updated, &creator_name).await;

		self.publish_status_event(&order, &updated);
		self.event_bus
			.publish(MarketEvent::Order(OrderEvent::CreatorAssigned {
				order_id: updated.id.clone(),
				creator: request.creator_id.clone(),
			}))
			.ok();

		Ok(updated)
	}

	/// Creator self-start on a published order.
	///
	/// Once responses exist the client picks via select_creator instead,
	/// so self-start is limited to the published state.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), creator = %actor.id))]
	pub async fn start_order(&self, actor: &Actor, order_id: &str) -> Result<Order, ActionError> {
		let _guard = self.locks.acquire(&LockRegistry::order_key(order_id)).await;

		let order = self.state_machine.get_order(order_id).await?;
		if !order.can_respond(actor) {
			return Err(ActionError::denied(format!(
				"user {} may not start order {}",
				actor.id, order_id
			)));
		}
		if order.status != OrderStatus::Published {
			return Err(ActionError::InvalidState {
				status: order.status,
				reason: "self-start is only possible while the order is published".to_string(),
			});
		}

		let updated = self.state_machine.assign_and_start(order_id, &actor.id).await?;

		let (chat, _) = self
			.chat_store
			.get_or_create(&updated.client, &actor.id, Some(order_id))
			.await?;
		let mut vars = order_vars(&updated);
		vars.insert("creator_name", actor.display_name.clone());
		if let Err(e) = self
			.chat_store
			.post_system_message(&chat.id, MessageEvent::StatusChanged, &vars)
			.await
		{
			tracing::warn!(error = %e, "Failed to emit status-change message");
		}

		self.publish_status_event(&order, &updated);
		self.event_bus
			.publish(MarketEvent::Order(OrderEvent::CreatorAssigned {
				order_id: updated.id.clone(),
				creator: actor.id.clone(),
			}))
			.ok();

		Ok(updated)
	}

	/// Moves an in-progress order to review once a final delivery exists.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn submit_for_review(
		&self,
		actor: &Actor,
		order_id: &str,
	) -> Result<Order, ActionError> {
		let _guard = self.locks.acquire(&LockRegistry::order_key(order_id)).await;

		let order = self.state_machine.get_order(order_id).await?;
		if !order.is_assigned_to(&actor.id) {
			return Err(ActionError::denied(format!(
				"only the assigned creator can submit order {} for review",
				order_id
			)));
		}
		OrderStateMachine::validate_transition(order.status, OrderStatus::OnReview)?;

		let deliveries = deliveries_for_order(&self.storage, order_id).await?;
		if !deliveries.iter().any(|d| d.is_final) {
			return Err(ActionError::Validation(
				"at least one final delivery is required before review".to_string(),
			));
		}

		let updated = self
			.state_machine
			.transition(order_id, OrderStatus::OnReview)
			.await?;

		let mut vars = order_vars(&updated);
		vars.insert("creator_name", actor.display_name.clone());
		for chat in self.chat_store.chats_for_order(order_id).await? {
			if let Err(e) = self
				.chat_store
				.post_system_message(&chat.id, MessageEvent::StatusChanged, &vars)
				.await
			{
				tracing::warn!(error = %e, "Failed to emit status-change message");
			}
			// The reminder goes to the client in the working chat only,
			// not to chats with passed-over creators.
			if chat.creator == actor.id {
				if let Err(e) = self
					.chat_store
					.post_system_message(&chat.id, MessageEvent::ReviewReminder, &vars)
					.await
				{
					tracing::warn!(error = %e, "Failed to emit review-reminder message");
				}
			}
		}

		self.publish_status_event(&order, &updated);
		Ok(updated)
	}

	/// Completes an order, accepting the delivered work.
	///
	/// Permitted from on_review and, as a shortcut, from in_progress:
	/// the shortcut walks the order through on_review so every write
	/// still follows the declared transition table.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn complete_order(
		&self,
		actor: &Actor,
		order_id: &str,
	) -> Result<Order, ActionError> {
		let _guard = self.locks.acquire(&LockRegistry::order_key(order_id)).await;

		let order = self.state_machine.get_order(order_id).await?;
		self.require_client(&order, actor, "complete the order")?;

		match order.status {
			OrderStatus::OnReview => {},
			OrderStatus::InProgress => {
				self.state_machine
					.transition(order_id, OrderStatus::OnReview)
					.await?;
			},
			from => {
				return Err(ActionError::InvalidTransition {
					from,
					to: OrderStatus::Completed,
				})
			},
		}

		let updated = self
			.state_machine
			.transition(order_id, OrderStatus::Completed)
			.await?;
		let creator = updated.creator.clone().ok_or_else(|| {
			ActionError::Storage(format!("completed order {} has no creator", order_id))
		})?;

		// Accepting the work approves the final deliveries.
		for mut delivery in deliveries_for_order(&self.storage, order_id).await? {
			if delivery.is_final && !delivery.client_approved {
				delivery.client_approved = true;
				self.storage
					.store(StorageKey::Deliveries.as_str(), &delivery.id, &delivery)
					.await?;
			}
		}

		self.increment_completed_orders(&creator).await?;

		let mut vars = order_vars(&updated);
		vars.insert("creator_name", creator.clone());
		for chat in self.chat_store.chats_for_order(order_id).await? {
			for event in [MessageEvent::StatusChanged, MessageEvent::OrderCompleted] {
				if let Err(e) = self
					.chat_store
					.post_system_message(&chat.id, event, &vars)
					.await
				{
					tracing::warn!(error = %e, "Failed to emit completion message");
				}
			}
		}

		self.publish_status_event(&order, &updated);
		Ok(updated)
	}

	/// Cancels an order. No chat side effect.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn cancel_order(&self, actor: &Actor, order_id: &str) -> Result<Order, ActionError> {
		let _guard = self.locks.acquire(&LockRegistry::order_key(order_id)).await;

		let order = self.state_machine.get_order(order_id).await?;
		self.require_client(&order, actor, "cancel the order")?;
		OrderStateMachine::validate_transition(order.status, OrderStatus::Canceled)?;

		// Dropping the assignment keeps "creator set iff order active or
		// completed" true for canceled orders.
		let updated = self
			.state_machine
			.update_order_with(order_id, |o| {
				o.status = OrderStatus::Canceled;
				o.creator = None;
			})
			.await?;

		self.publish_status_event(&order, &updated);
		Ok(updated)
	}

	/// Returns a canceled order to the draft state.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn reopen_order(&self, actor: &Actor, order_id: &str) -> Result<Order, ActionError> {
		let _guard = self.locks.acquire(&LockRegistry::order_key(order_id)).await;

		let order = self.state_machine.get_order(order_id).await?;
		self.require_client(&order, actor, "reopen the order")?;

		let updated = self
			.state_machine
			.transition(order_id, OrderStatus::Draft)
			.await?;
		self.publish_status_event(&order, &updated);
		Ok(updated)
	}

	fn require_client(
		&self,
		order: &Order,
		actor: &Actor,
		action: &str,
	) -> Result<(), ActionError> {
		if order.client != actor.id {
			return Err(ActionError::denied(format!(
				"only the client can {}",
				action
			)));
		}
		Ok(())
	}

	async fn reject_sibling_responses(
		&self,
		order_id: &str,
		accepted_id: Option<&str>,
	) -> Result<(), ActionError> {
		let ids = self
			.storage
			.index_ids(StorageKey::ResponsesByOrder.as_str(), order_id)
			.await?;
		for id in ids {
			if Some(id.as_str()) == accepted_id {
				continue;
			}
			let Some(mut response) = self
				.storage
				.retrieve_opt::<OrderResponse>(StorageKey::Responses.as_str(), &id)
				.await?
			else {
				continue;
			};
			if response.status == ResponseStatus::Pending {
				response.status = ResponseStatus::Rejected;
				self.storage
					.store(StorageKey::Responses.as_str(), &id, &response)
					.await?;
				self.event_bus
					.publish(MarketEvent::Workflow(WorkflowEvent::ResponseResolved {
						response_id: id,
						status: ResponseStatus::Rejected,
					}))
					.ok();
			}
		}
		Ok(())
	}

	async fn announce_assignment(&self, order: &Order, creator_name: &str) {
		let creator = match &order.creator {
			Some(creator) => creator.clone(),
			None => return,
		};
		let chat = match self
			.chat_store
			.get_or_create(&order.client, &creator, Some(&order.id))
			.await
		{
			Ok((chat, _)) => chat,
			Err(e) => {
				tracing::warn!(error = %e, "Failed to open chat for assignment");
				return;
			},
		};
		let mut vars = order_vars(order);
		vars.insert("creator_name", creator_name.to_string());
		if let Err(e) = self
			.chat_store
			.post_system_message(&chat.id, MessageEvent::CreatorAssigned, &vars)
			.await
		{
			tracing::warn!(error = %e, "Failed to emit creator-assigned message");
		}
	}

	async fn increment_completed_orders(&self, creator: &str) -> Result<(), ActionError> {
		let _guard = self
			.locks
			.acquire(&LockRegistry::profile_key(creator))
			.await;
		let mut profile = load_profile(&self.storage, creator).await?;
		profile.completed_orders += 1;
		store_profile(&self.storage, profile)
			.await
			.map_err(ActionError::from)
	}

	fn publish_status_event(&self, before: &Order, after: &Order) {
		if before.status != after.status {
			self.event_bus
				.publish(MarketEvent::Order(OrderEvent::StatusChanged {
					order_id: after.id.clone(),
					from: before.status,
					to: after.status,
				}))
				.ok();
		}
	}
}
