//! Delivery handler.
//!
//! Deliveries are work artifacts submitted by the assigned creator
//! while the order is in progress or on review. Files are embedded in
//! the delivery record and share its lifetime. Final deliveries gate
//! submit_for_review and get approved when the client completes the
//! order.

use crate::error::ActionError;
use crate::event_bus::EventBus;
use crate::locks::LockRegistry;
use crate::state::OrderStateMachine;
use market_storage::StorageService;
use market_types::{
	truncate_id, unix_now, Actor, Delivery, DeliveryFile, MarketEvent, OrderStatus,
	StorageKey, SubmitDeliveryRequest, WorkflowEvent,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Loads all deliveries recorded against an order.
pub(crate) async fn deliveries_for_order(
	storage: &StorageService,
	order_id: &str,
) -> Result<Vec<Delivery>, ActionError> {
	let ids = storage
		.index_ids(StorageKey::DeliveriesByOrder.as_str(), order_id)
		.await?;
	let mut deliveries = Vec::with_capacity(ids.len());
	for id in ids {
		deliveries.push(storage.retrieve(StorageKey::Deliveries.as_str(), &id).await?);
	}
	Ok(deliveries)
}

/// Handler for work deliveries.
pub struct DeliveryHandler {
	storage: Arc<StorageService>,
	state_machine: Arc<OrderStateMachine>,
	locks: Arc<LockRegistry>,
	event_bus: EventBus,
}

impl DeliveryHandler {
	pub fn new(
		storage: Arc<StorageService>,
		state_machine: Arc<OrderStateMachine>,
		locks: Arc<LockRegistry>,
		event_bus: EventBus,
	) -> Self {
		Self {
			storage,
			state_machine,
			locks,
			event_bus,
		}
	}

	/// Records a delivery from the assigned creator.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), creator = %actor.id))]
	pub async fn submit_delivery(
		&self,
		actor: &Actor,
		order_id: &str,
		request: SubmitDeliveryRequest,
	) -> Result<Delivery, ActionError> {
		let _guard = self.locks.acquire(&LockRegistry::order_key(order_id)).await;

		let order = self.state_machine.get_order(order_id).await?;
		if !order.is_assigned_to(&actor.id) {
			return Err(ActionError::denied(format!(
				"only the assigned creator can deliver against order {}",
				order_id
			)));
		}
		if !matches!(order.status, OrderStatus::InProgress | OrderStatus::OnReview) {
			return Err(ActionError::InvalidState {
				status: order.status,
				reason: "deliveries are accepted only while the order is in progress or on review"
					.to_string(),
			});
		}
		if request.files.is_empty() && request.comment.trim().is_empty() {
			return Err(ActionError::Validation(
				"a delivery needs files or a comment".to_string(),
			));
		}

		let delivery = Delivery {
			id: Uuid::new_v4().to_string(),
			order_id: order_id.to_string(),
			creator: actor.id.clone(),
			comment: request.comment,
			is_final: request.is_final,
			client_approved: false,
			files: request
				.files
				.into_iter()
				.map(|f| DeliveryFile {
					id: Uuid::new_v4().to_string(),
					file_ref: f.file_ref,
					name: f.name,
				})
				.collect(),
			created_at: unix_now(),
		};

		self.storage
			.store(StorageKey::Deliveries.as_str(), &delivery.id, &delivery)
			.await?;
		self.storage
			.push_index(StorageKey::DeliveriesByOrder.as_str(), order_id, &delivery.id)
			.await?;

		self.event_bus
			.publish(MarketEvent::Workflow(WorkflowEvent::DeliverySubmitted {
				order_id: order_id.to_string(),
				delivery_id: delivery.id.clone(),
				is_final: delivery.is_final,
			}))
			.ok();

		Ok(delivery)
	}

	/// Deliveries for an order, visible to its participants and staff.
	pub async fn list_deliveries(
		&self,
		actor: &Actor,
		order_id: &str,
	) -> Result<Vec<Delivery>, ActionError> {
		let order = self.state_machine.get_order(order_id).await?;
		let involved =
			actor.id == order.client || order.is_assigned_to(&actor.id) || actor.is_staff;
		if !involved {
			return Err(ActionError::denied(format!(
				"user {} may not list deliveries for order {}",
				actor.id, order_id
			)));
		}
		deliveries_for_order(&self.storage, order_id).await
	}
}
