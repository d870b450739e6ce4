//! Marketplace assembly.

use crate::event_bus::EventBus;
use crate::handlers::{
	ChatActionHandler, DeliveryHandler, LifecycleHandler, ResponseHandler, ReviewHandler,
};
use crate::locks::LockRegistry;
use crate::messaging::{ChatStore, TemplateCatalog};
use crate::state::OrderStateMachine;
use crate::Marketplace;
use market_storage::StorageService;
use std::sync::Arc;

/// Builder wiring a storage backend into a [`Marketplace`].
pub struct MarketplaceBuilder {
	storage: Arc<StorageService>,
	event_capacity: usize,
}

impl MarketplaceBuilder {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self {
			storage,
			event_capacity: 256,
		}
	}

	/// Capacity of the broadcast event channel.
	pub fn event_capacity(mut self, capacity: usize) -> Self {
		self.event_capacity = capacity;
		self
	}

	pub fn build(self) -> Marketplace {
		let event_bus = EventBus::new(self.event_capacity);
		let locks = Arc::new(LockRegistry::new());
		let templates = Arc::new(TemplateCatalog::new(Arc::clone(&self.storage)));
		let chat_store = Arc::new(ChatStore::new(
			Arc::clone(&self.storage),
			templates,
			Arc::clone(&locks),
			event_bus.clone(),
		));
		let state_machine = Arc::new(OrderStateMachine::new(Arc::clone(&self.storage)));

		Marketplace {
			lifecycle: LifecycleHandler::new(
				Arc::clone(&self.storage),
				Arc::clone(&state_machine),
				Arc::clone(&chat_store),
				Arc::clone(&locks),
				event_bus.clone(),
			),
			responses: ResponseHandler::new(
				Arc::clone(&self.storage),
				Arc::clone(&state_machine),
				Arc::clone(&chat_store),
				Arc::clone(&locks),
				event_bus.clone(),
			),
			deliveries: DeliveryHandler::new(
				Arc::clone(&self.storage),
				Arc::clone(&state_machine),
				Arc::clone(&locks),
				event_bus.clone(),
			),
			reviews: ReviewHandler::new(
				Arc::clone(&self.storage),
				Arc::clone(&state_machine),
				Arc::clone(&locks),
				event_bus.clone(),
			),
			chat_actions: ChatActionHandler::new(
				state_machine,
				Arc::clone(&chat_store),
				locks,
				event_bus.clone(),
			),
			chat_store,
			storage: self.storage,
			event_bus,
		}
	}
}
