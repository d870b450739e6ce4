//! Chat thread store.
//!
//! Owns Chat and Message persistence: race-safe get-or-create keyed by
//! the (client, creator, order) triple, per-chat message logs, read
//! flags and unread counters. System messages are rendered through the
//! template catalog and appended senderless.

use crate::error::ActionError;
use crate::event_bus::EventBus;
use crate::locks::LockRegistry;
use crate::messaging::template::{TemplateCatalog, TemplateVars};
use market_storage::{StorageError, StorageService};
use market_types::{
	unix_now, Actor, Chat, ChatEvent, MarketEvent, Message, MessageEvent, Role, StorageKey, UserId,
};
use std::sync::Arc;
use uuid::Uuid;

/// Storage-backed chat and message operations.
pub struct ChatStore {
	storage: Arc<StorageService>,
	templates: Arc<TemplateCatalog>,
	locks: Arc<LockRegistry>,
	event_bus: EventBus,
}

impl ChatStore {
	pub fn new(
		storage: Arc<StorageService>,
		templates: Arc<TemplateCatalog>,
		locks: Arc<LockRegistry>,
		event_bus: EventBus,
	) -> Self {
		Self {
			storage,
			templates,
			locks,
			event_bus,
		}
	}

	/// Gets a chat by id.
	pub async fn get_chat(&self, chat_id: &str) -> Result<Chat, ActionError> {
		self.storage
			.retrieve(StorageKey::Chats.as_str(), chat_id)
			.await
			.map_err(|e| match e {
				StorageError::NotFound => ActionError::NotFound(format!("chat {}", chat_id)),
				other => ActionError::Storage(other.to_string()),
			})
	}

	/// Returns the existing chat for (client, creator, order) or creates
	/// one. The boolean is true when this call created the chat.
	///
	/// Race-safe: the chat record is written first, then the natural-key
	/// mapping is claimed with an atomic create. A loser deletes its
	/// orphan record and reads the winner's chat, so concurrent callers
	/// with the same key always end with exactly one chat row.
	pub async fn get_or_create(
		&self,
		client: &UserId,
		creator: &UserId,
		order_id: Option<&str>,
	) -> Result<(Chat, bool), ActionError> {
		let key = Chat::natural_key(client, creator, order_id);

		if let Some(existing_id) = self
			.storage
			.retrieve_opt::<String>(StorageKey::ChatByKey.as_str(), &key)
			.await?
		{
			return Ok((self.get_chat(&existing_id).await?, false));
		}

		let now = unix_now();
		let chat = Chat {
			id: Uuid::new_v4().to_string(),
			client: client.clone(),
			creator: creator.clone(),
			order_id: order_id.map(str::to_string),
			is_active: true,
			created_at: now,
			updated_at: now,
		};

		self.storage
			.store(StorageKey::Chats.as_str(), &chat.id, &chat)
			.await?;

		match self
			.storage
			.create(StorageKey::ChatByKey.as_str(), &key, &chat.id)
			.await
		{
			Ok(()) => {
				if let Some(order_id) = order_id {
					self.storage
						.push_index(StorageKey::ChatsByOrder.as_str(), order_id, &chat.id)
						.await?;
				}
				self.event_bus
					.publish(MarketEvent::Chat(ChatEvent::ChatCreated {
						chat_id: chat.id.clone(),
						order_id: chat.order_id.clone(),
					}))
					.ok();
				Ok((chat, true))
			},
			Err(StorageError::AlreadyExists) => {
				// Lost the race: drop the orphan and read the winner.
				self.storage
					.remove(StorageKey::Chats.as_str(), &chat.id)
					.await?;
				let winner_id: String = self
					.storage
					.retrieve(StorageKey::ChatByKey.as_str(), &key)
					.await?;
				Ok((self.get_chat(&winner_id).await?, false))
			},
			Err(other) => Err(other.into()),
		}
	}

	/// All chats scoped to an order.
	pub async fn chats_for_order(&self, order_id: &str) -> Result<Vec<Chat>, ActionError> {
		let ids = self
			.storage
			.index_ids(StorageKey::ChatsByOrder.as_str(), order_id)
			.await?;
		let mut chats = Vec::with_capacity(ids.len());
		for id in ids {
			chats.push(self.get_chat(&id).await?);
		}
		Ok(chats)
	}

	/// Posts a user-authored message. The sender must be a participant
	/// and the content non-empty.
	pub async fn post_message(
		&self,
		chat_id: &str,
		sender: &Actor,
		content: &str,
	) -> Result<Message, ActionError> {
		if content.trim().is_empty() {
			return Err(ActionError::Validation(
				"message content must not be empty".to_string(),
			));
		}
		self.append(chat_id, Some(sender.id.clone()), content.to_string())
			.await
	}

	/// Renders and posts a senderless system message for `event`.
	pub async fn post_system_message(
		&self,
		chat_id: &str,
		event: MessageEvent,
		vars: &TemplateVars,
	) -> Result<Message, ActionError> {
		let content = self.templates.render(event, vars).await;
		self.append(chat_id, None, content).await
	}

	async fn append(
		&self,
		chat_id: &str,
		sender: Option<UserId>,
		content: String,
	) -> Result<Message, ActionError> {
		let _guard = self.locks.acquire(&LockRegistry::chat_key(chat_id)).await;

		let mut chat = self.get_chat(chat_id).await?;
		if let Some(sender) = &sender {
			if !chat.is_participant(sender) {
				return Err(ActionError::denied(format!(
					"user {} is not a participant of chat {}",
					sender, chat_id
				)));
			}
		}

		let now = unix_now();
		let message = Message {
			id: Uuid::new_v4().to_string(),
			chat_id: chat_id.to_string(),
			// The author's own side starts read; system messages start
			// unread for both participants.
			read_by_client: sender.as_deref() == Some(chat.client.as_str()),
			read_by_creator: sender.as_deref() == Some(chat.creator.as_str()),
			is_system: sender.is_none(),
			sender,
			content,
			created_at: now,
		};

		let mut log: Vec<Message> = self
			.storage
			.retrieve_opt(StorageKey::ChatMessages.as_str(), chat_id)
			.await?
			.unwrap_or_default();
		log.push(message.clone());
		self.storage
			.store(StorageKey::ChatMessages.as_str(), chat_id, &log)
			.await?;

		chat.updated_at = now;
		self.storage
			.store(StorageKey::Chats.as_str(), chat_id, &chat)
			.await?;

		self.event_bus
			.publish(MarketEvent::Chat(ChatEvent::MessagePosted {
				chat_id: chat_id.to_string(),
				message_id: message.id.clone(),
				is_system: message.is_system,
			}))
			.ok();

		Ok(message)
	}

	/// The chat and its full message log, for a participant or staff.
	pub async fn messages(
		&self,
		chat_id: &str,
		reader: &Actor,
	) -> Result<(Chat, Vec<Message>), ActionError> {
		let chat = self.get_chat(chat_id).await?;
		if !chat.is_participant(&reader.id) && !reader.is_staff {
			return Err(ActionError::denied(format!(
				"user {} is not a participant of chat {}",
				reader.id, chat_id
			)));
		}
		let log = self
			.storage
			.retrieve_opt(StorageKey::ChatMessages.as_str(), chat_id)
			.await?
			.unwrap_or_default();
		Ok((chat, log))
	}

	/// Marks messages not authored by `reader` as read by them.
	///
	/// Idempotent: a second call finds nothing unread and writes
	/// nothing. Returns the number of messages newly marked.
	pub async fn mark_read(&self, chat_id: &str, reader: &Actor) -> Result<usize, ActionError> {
		let _guard = self.locks.acquire(&LockRegistry::chat_key(chat_id)).await;

		let chat = self.get_chat(chat_id).await?;
		let side = self.reader_side(&chat, reader)?;

		let mut log: Vec<Message> = self
			.storage
			.retrieve_opt(StorageKey::ChatMessages.as_str(), chat_id)
			.await?
			.unwrap_or_default();

		let mut changed = 0;
		for message in log.iter_mut() {
			if message.sender.as_deref() == Some(reader.id.as_str()) {
				continue;
			}
			let flag = match side {
				Role::Client => &mut message.read_by_client,
				Role::Creator => &mut message.read_by_creator,
			};
			if !*flag {
				*flag = true;
				changed += 1;
			}
		}

		if changed > 0 {
			self.storage
				.store(StorageKey::ChatMessages.as_str(), chat_id, &log)
				.await?;
		}
		Ok(changed)
	}

	/// Counts messages from the counterpart (or the system) not yet read
	/// by `user`.
	pub async fn unread_count(&self, chat_id: &str, user: &Actor) -> Result<usize, ActionError> {
		let chat = self.get_chat(chat_id).await?;
		let side = self.reader_side(&chat, user)?;

		let log: Vec<Message> = self
			.storage
			.retrieve_opt(StorageKey::ChatMessages.as_str(), chat_id)
			.await?
			.unwrap_or_default();

		Ok(log
			.iter()
			.filter(|m| m.sender.as_deref() != Some(user.id.as_str()))
			.filter(|m| match side {
				Role::Client => !m.read_by_client,
				Role::Creator => !m.read_by_creator,
			})
			.count())
	}

	/// Which side of the chat `user` occupies. The participant sets are
	/// fixed at creation, so this is an identity check, not a role
	/// check: a user acting under either role keeps their seat.
	fn reader_side(&self, chat: &Chat, user: &Actor) -> Result<Role, ActionError> {
		if chat.client == user.id {
			Ok(Role::Client)
		} else if chat.creator == user.id {
			Ok(Role::Creator)
		} else {
			Err(ActionError::denied(format!(
				"user {} is not a participant of chat {}",
				user.id, chat.id
			)))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use market_storage::implementations::memory::MemoryStorage;

	fn store() -> ChatStore {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		ChatStore::new(
			Arc::clone(&storage),
			Arc::new(TemplateCatalog::new(Arc::clone(&storage))),
			Arc::new(LockRegistry::new()),
			EventBus::default(),
		)
	}

	fn client() -> Actor {
		Actor::new("u-client", Role::Client)
	}

	fn creator() -> Actor {
		Actor::new("u-creator", Role::Creator)
	}

	#[tokio::test]
	async fn get_or_create_returns_same_chat() {
		let store = store();
		let (chat, created) = store
			.get_or_create(&"u-client".into(), &"u-creator".into(), Some("o1"))
			.await
			.unwrap();
		assert!(created);

		let (again, created) = store
			.get_or_create(&"u-client".into(), &"u-creator".into(), Some("o1"))
			.await
			.unwrap();
		assert!(!created);
		assert_eq!(chat.id, again.id);

		// A different order key yields a different chat.
		let (other, created) = store
			.get_or_create(&"u-client".into(), &"u-creator".into(), Some("o2"))
			.await
			.unwrap();
		assert!(created);
		assert_ne!(chat.id, other.id);
	}

	#[tokio::test]
	async fn concurrent_get_or_create_yields_one_chat() {
		let store = Arc::new(store());

		let mut tasks = Vec::new();
		for _ in 0..12 {
			let store = Arc::clone(&store);
			tasks.push(tokio::spawn(async move {
				store
					.get_or_create(&"u-client".into(), &"u-creator".into(), Some("o1"))
					.await
					.unwrap()
			}));
		}

		let mut ids = std::collections::HashSet::new();
		let mut creations = 0;
		for task in tasks {
			let (chat, created) = task.await.unwrap();
			ids.insert(chat.id);
			if created {
				creations += 1;
			}
		}
		assert_eq!(ids.len(), 1);
		assert_eq!(creations, 1);
		assert_eq!(store.chats_for_order("o1").await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn post_message_bumps_chat_and_sets_read_flags() {
		let store = store();
		let (chat, _) = store
			.get_or_create(&"u-client".into(), &"u-creator".into(), None)
			.await
			.unwrap();

		let message = store
			.post_message(&chat.id, &client(), "hello")
			.await
			.unwrap();
		assert!(!message.is_system);
		assert!(message.read_by_client);
		assert!(!message.read_by_creator);

		let bumped = store.get_chat(&chat.id).await.unwrap();
		assert!(bumped.updated_at >= chat.updated_at);
	}

	#[tokio::test]
	async fn outsiders_cannot_post() {
		let store = store();
		let (chat, _) = store
			.get_or_create(&"u-client".into(), &"u-creator".into(), None)
			.await
			.unwrap();

		let err = store
			.post_message(&chat.id, &Actor::new("stranger", Role::Creator), "hi")
			.await
			.unwrap_err();
		assert!(matches!(err, ActionError::PermissionDenied(_)));
	}

	#[tokio::test]
	async fn empty_content_is_rejected() {
		let store = store();
		let (chat, _) = store
			.get_or_create(&"u-client".into(), &"u-creator".into(), None)
			.await
			.unwrap();

		let err = store
			.post_message(&chat.id, &client(), "   ")
			.await
			.unwrap_err();
		assert!(matches!(err, ActionError::Validation(_)));
	}

	#[tokio::test]
	async fn unread_and_mark_read_are_consistent() {
		let store = store();
		let (chat, _) = store
			.get_or_create(&"u-client".into(), &"u-creator".into(), None)
			.await
			.unwrap();

		store
			.post_message(&chat.id, &creator(), "first")
			.await
			.unwrap();
		store
			.post_message(&chat.id, &creator(), "second")
			.await
			.unwrap();
		store
			.post_message(&chat.id, &client(), "reply")
			.await
			.unwrap();

		// The creator's own messages do not count against them.
		assert_eq!(store.unread_count(&chat.id, &creator()).await.unwrap(), 1);
		assert_eq!(store.unread_count(&chat.id, &client()).await.unwrap(), 2);

		assert_eq!(store.mark_read(&chat.id, &client()).await.unwrap(), 2);
		assert_eq!(store.unread_count(&chat.id, &client()).await.unwrap(), 0);

		// Idempotent: nothing left to mark.
		assert_eq!(store.mark_read(&chat.id, &client()).await.unwrap(), 0);
	}

	#[tokio::test]
	async fn system_messages_are_senderless_and_unread_for_both() {
		let store = store();
		let (chat, _) = store
			.get_or_create(&"u-client".into(), &"u-creator".into(), Some("o1"))
			.await
			.unwrap();

		let vars = TemplateVars::from([
			("order_title", "Logo".to_string()),
			("creator_name", "Ada".to_string()),
		]);
		let message = store
			.post_system_message(&chat.id, MessageEvent::CreatorResponded, &vars)
			.await
			.unwrap();

		assert!(message.is_system);
		assert!(message.sender.is_none());
		assert_eq!(message.content, "Ada responded to \"Logo\".");
		assert_eq!(store.unread_count(&chat.id, &client()).await.unwrap(), 1);
		assert_eq!(store.unread_count(&chat.id, &creator()).await.unwrap(), 1);
	}
}
