//! Review handler.
//!
//! Post-completion feedback from the client about the creator. One
//! review per (order, author), enforced with a unique-key create. The
//! recipient's profile rating is recomputed as the mean over all their
//! reviews under the profile lock.

use crate::error::ActionError;
use crate::event_bus::EventBus;
use crate::handlers::{load_profile, store_profile};
use crate::locks::LockRegistry;
use crate::state::OrderStateMachine;
use market_storage::{StorageError, StorageService};
use market_types::{
	truncate_id, unix_now, Actor, CreateReviewRequest, MarketEvent, OrderStatus, Review,
	StorageKey, WorkflowEvent,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Handler for post-completion reviews.
pub struct ReviewHandler {
	storage: Arc<StorageService>,
	state_machine: Arc<OrderStateMachine>,
	locks: Arc<LockRegistry>,
	event_bus: EventBus,
}

impl ReviewHandler {
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

	/// Saves the client's review of a completed order and refreshes the
	/// creator's aggregate rating.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), author = %actor.id))]
	pub async fn create_review(
		&self,
		actor: &Actor,
		order_id: &str,
		request: CreateReviewRequest,
	) -> Result<Review, ActionError> {
		if !(1..=5).contains(&request.rating) {
			return Err(ActionError::Validation(
				"rating must be between 1 and 5".to_string(),
			));
		}

		let _guard = self.locks.acquire(&LockRegistry::order_key(order_id)).await;

		let order = self.state_machine.get_order(order_id).await?;
		if order.client != actor.id {
			return Err(ActionError::denied(
				"only the client can review the order".to_string(),
			));
		}
		if order.status != OrderStatus::Completed {
			return Err(ActionError::InvalidState {
				status: order.status,
				reason: "reviews are accepted only on completed orders".to_string(),
			});
		}
		let recipient = order.creator.clone().ok_or_else(|| {
			ActionError::Storage(format!("completed order {} has no creator", order_id))
		})?;

		let review = Review {
			id: Uuid::new_v4().to_string(),
			order_id: order_id.to_string(),
			author: actor.id.clone(),
			recipient: recipient.clone(),
			rating: request.rating,
			comment: request.comment,
			created_at: unix_now(),
		};

		let unique_key = format!("{}:{}", order_id, actor.id);
		match self
			.storage
			.create(StorageKey::ReviewByOrderAuthor.as_str(), &unique_key, &review.id)
			.await
		{
			Ok(()) => {},
			Err(StorageError::AlreadyExists) => {
				return Err(ActionError::Validation(format!(
					"order {} is already reviewed by {}",
					order_id, actor.id
				)));
			},
			Err(other) => return Err(other.into()),
		}

		self.storage
			.store(StorageKey::Reviews.as_str(), &review.id, &review)
			.await?;
		self.storage
			.push_index(StorageKey::ReviewsByRecipient.as_str(), &recipient, &review.id)
			.await?;

		self.recompute_rating(&recipient).await?;

		self.event_bus
			.publish(MarketEvent::Workflow(WorkflowEvent::ReviewSaved {
				order_id: order_id.to_string(),
				recipient: recipient.clone(),
				rating: review.rating,
			}))
			.ok();

		Ok(review)
	}

	/// Reviews written about a creator. Public.
	pub async fn reviews_for_creator(&self, creator: &str) -> Result<Vec<Review>, ActionError> {
		let ids = self
			.storage
			.index_ids(StorageKey::ReviewsByRecipient.as_str(), creator)
			.await?;
		let mut reviews = Vec::with_capacity(ids.len());
		for id in ids {
			reviews.push(self.storage.retrieve(StorageKey::Reviews.as_str(), &id).await?);
		}
		Ok(reviews)
	}

	/// Recomputes the recipient's rating as the mean over all reviews.
	///
	/// A full recompute instead of an incremental running average keeps
	/// the stored value correct even if a review write was retried.
	async fn recompute_rating(&self, recipient: &str) -> Result<(), ActionError> {
		let _guard = self
			.locks
			.acquire(&LockRegistry::profile_key(recipient))
			.await;

		let reviews = self.reviews_for_creator(recipient).await?;
		let rating = if reviews.is_empty() {
			None
		} else {
			let sum: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
			Some(f64::from(sum) / reviews.len() as f64)
		};

		let mut profile = load_profile(&self.storage, recipient).await?;
		profile.rating = rating;
		store_profile(&self.storage, profile)
			.await
			.map_err(ActionError::from)
	}
}
