//! Action handlers orchestrating order, chat and workflow mutations.
//!
//! Each handler method is a single logical transaction: it takes the
//! per-order lock, loads state, checks permissions and transition
//! validity, and only then writes. System messages and bus events are
//! emitted after the primary mutations commit and are best-effort.

mod chat;
mod delivery;
mod order;
mod response;
mod review;

pub use chat::ChatActionHandler;
pub use delivery::DeliveryHandler;
pub use order::LifecycleHandler;
pub use response::ResponseHandler;
pub use review::ReviewHandler;

use crate::messaging::TemplateVars;
use market_storage::{StorageError, StorageService};
use market_types::{unix_now, CreatorProfile, Order, StorageKey};

/// Base template variables every order-scoped system message provides.
/// Callers add `creator_name` when a creator participates in the event.
pub(crate) fn order_vars(order: &Order) -> TemplateVars {
	TemplateVars::from([
		("order_title", order.title.clone()),
		("client_name", order.client.clone()),
		("status", order.status.to_string()),
	])
}

/// Loads a creator profile, defaulting to an empty one.
pub(crate) async fn load_profile(
	storage: &StorageService,
	user_id: &str,
) -> Result<CreatorProfile, StorageError> {
	Ok(storage
		.retrieve_opt(StorageKey::Profiles.as_str(), user_id)
		.await?
		.unwrap_or_else(|| CreatorProfile::empty(user_id)))
}

/// Persists a creator profile with a refreshed timestamp.
pub(crate) async fn store_profile(
	storage: &StorageService,
	mut profile: CreatorProfile,
) -> Result<(), StorageError> {
	profile.updated_at = unix_now();
	storage
		.store(StorageKey::Profiles.as_str(), &profile.user_id.clone(), &profile)
		.await
}
