//! Core marketplace engine.
//!
//! This crate wires the order state machine, chat store and action
//! handlers into a single [`Marketplace`] facade. Handlers are the only
//! mutation entry points: each one serializes on the per-order lock,
//! validates permissions and transitions before writing, and emits
//! best-effort chat messages and bus events after its writes commit.

pub mod builder;
pub mod error;
pub mod event_bus;
pub mod handlers;
pub mod locks;
pub mod messaging;
pub mod state;

pub use builder::MarketplaceBuilder;
pub use error::ActionError;
pub use event_bus::EventBus;
pub use handlers::{
	ChatActionHandler, DeliveryHandler, LifecycleHandler, ResponseHandler, ReviewHandler,
};
pub use messaging::{ChatStore, TemplateCatalog, TemplateVars};
pub use state::OrderStateMachine;

use market_storage::StorageService;
use market_types::{CreatorProfile, StorageKey};
use std::sync::Arc;

/// The assembled marketplace engine.
///
/// Construct via [`MarketplaceBuilder`]. All handlers share one storage
/// service, one lock registry and one event bus, so cross-handler
/// actions on the same order serialize correctly.
pub struct Marketplace {
	storage: Arc<StorageService>,
	event_bus: EventBus,
	chat_store: Arc<ChatStore>,
	lifecycle: LifecycleHandler,
	responses: ResponseHandler,
	deliveries: DeliveryHandler,
	reviews: ReviewHandler,
	chat_actions: ChatActionHandler,
}

impl Marketplace {
	/// Order creation and direct status actions.
	pub fn orders(&self) -> &LifecycleHandler {
		&self.lifecycle
	}

	/// Creator responses.
	pub fn responses(&self) -> &ResponseHandler {
		&self.responses
	}

	/// Work deliveries.
	pub fn deliveries(&self) -> &DeliveryHandler {
		&self.deliveries
	}

	/// Post-completion reviews.
	pub fn reviews(&self) -> &ReviewHandler {
		&self.reviews
	}

	/// Chat opening against orders.
	pub fn chat_actions(&self) -> &ChatActionHandler {
		&self.chat_actions
	}

	/// Chat threads and messages.
	pub fn chats(&self) -> &ChatStore {
		&self.chat_store
	}

	/// The shared event bus.
	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	/// The underlying storage service.
	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}

	/// A creator's public profile; empty defaults when none is stored.
	pub async fn creator_profile(&self, user_id: &str) -> Result<CreatorProfile, ActionError> {
		Ok(self
			.storage
			.retrieve_opt(StorageKey::Profiles.as_str(), user_id)
			.await?
			.unwrap_or_else(|| CreatorProfile::empty(user_id)))
	}
}
