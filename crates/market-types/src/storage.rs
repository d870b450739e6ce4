//! Storage-related types for the marketplace system.

use std::str::FromStr;

/// Storage namespaces for different data collections.
///
/// This enum provides type safety for storage operations by replacing
/// string literals with strongly typed variants. Entries suffixed with
/// `ByKey`/`By...` are secondary indexes mapping a natural key to ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Key for storing order data.
	Orders,
	/// Key for storing creator responses.
	Responses,
	/// Unique-key index: (order, creator) -> response id.
	ResponseByOrderCreator,
	/// Index: order id -> response ids.
	ResponsesByOrder,
	/// Key for storing deliveries.
	Deliveries,
	/// Index: order id -> delivery ids.
	DeliveriesByOrder,
	/// Key for storing reviews.
	Reviews,
	/// Unique-key index: (order, author) -> review id.
	ReviewByOrderAuthor,
	/// Index: recipient id -> review ids.
	ReviewsByRecipient,
	/// Key for storing chat threads.
	Chats,
	/// Unique-key index: (client, creator, order) -> chat id.
	ChatByKey,
	/// Index: order id -> chat ids.
	ChatsByOrder,
	/// Key for storing per-chat message logs.
	ChatMessages,
	/// Key for storing creator profile counters.
	Profiles,
	/// Key for storing system message templates.
	Templates,
}

impl StorageKey {
	/// Returns the string representation of the storage namespace.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Orders => "orders",
			StorageKey::Responses => "responses",
			StorageKey::ResponseByOrderCreator => "response_by_order_creator",
			StorageKey::ResponsesByOrder => "responses_by_order",
			StorageKey::Deliveries => "deliveries",
			StorageKey::DeliveriesByOrder => "deliveries_by_order",
			StorageKey::Reviews => "reviews",
			StorageKey::ReviewByOrderAuthor => "review_by_order_author",
			StorageKey::ReviewsByRecipient => "reviews_by_recipient",
			StorageKey::Chats => "chats",
			StorageKey::ChatByKey => "chat_by_key",
			StorageKey::ChatsByOrder => "chats_by_order",
			StorageKey::ChatMessages => "chat_messages",
			StorageKey::Profiles => "profiles",
			StorageKey::Templates => "templates",
		}
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Orders,
			Self::Responses,
			Self::ResponseByOrderCreator,
			Self::ResponsesByOrder,
			Self::Deliveries,
			Self::DeliveriesByOrder,
			Self::Reviews,
			Self::ReviewByOrderAuthor,
			Self::ReviewsByRecipient,
			Self::Chats,
			Self::ChatByKey,
			Self::ChatsByOrder,
			Self::ChatMessages,
			Self::Profiles,
			Self::Templates,
		]
		.into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		StorageKey::all().find(|k| k.as_str() == s).ok_or(())
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn namespace_round_trip() {
		for key in StorageKey::all() {
			assert_eq!(key.as_str().parse::<StorageKey>(), Ok(key));
		}
		assert!("nonsense".parse::<StorageKey>().is_err());
	}
}
