//! Storage module for the marketplace system.
//!
//! This module provides abstractions for persistent storage of
//! marketplace data, supporting different backend implementations such
//! as in-memory or file-based storage. On top of the byte-level backend
//! it offers typed operations, atomic create-if-absent for unique
//! natural keys, and small list indexes used to look entities up by a
//! parent id.

use async_trait::async_trait;
use market_types::ConfigSchema;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
	#[error("Not found")]
	NotFound,
	/// Error that occurs when creating a key that already exists.
	#[error("Already exists")]
	AlreadyExists,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the low-level interface for storage backends.
///
/// This trait must be implemented by any storage backend that wants to
/// integrate with the marketplace. It provides basic key-value
/// operations plus an atomic create, which is the primitive the unique
/// constraints (one response per creator, one chat per natural key)
/// are built on.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes, creating or overwriting.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Stores raw bytes only if the key does not exist yet.
	///
	/// Must be atomic with respect to concurrent callers: exactly one of
	/// N racing creates succeeds, the rest observe `AlreadyExists`.
	async fn create_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for storage factory functions.
///
/// This is the function signature that all storage implementations must
/// provide to create instances of their storage interface.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Get all registered storage implementations.
///
/// Returns a vector of (name, factory) tuples for all available storage
/// implementations, used by the service to wire the configured backend.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		("file", file::create_storage as StorageFactory),
		("memory", memory::create_storage as StorageFactory),
	]
}

/// High-level storage service that provides typed operations.
///
/// The StorageService wraps a low-level storage backend and provides
/// convenient methods for storing and retrieving typed data with
/// automatic serialization/deserialization.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	fn key(namespace: &str, id: &str) -> String {
		format!("{}:{}", namespace, id)
	}

	fn serialize<T: Serialize>(data: &T) -> Result<Vec<u8>, StorageError> {
		serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Stores a serializable value, creating or overwriting.
	///
	/// The namespace and id are combined to form a unique key.
	/// The data is serialized to JSON before storage.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let bytes = Self::serialize(data)?;
		self.backend.set_bytes(&Self::key(namespace, id), bytes).await
	}

	/// Stores a serializable value only if the key does not exist yet.
	///
	/// Returns `AlreadyExists` when a concurrent or earlier writer got
	/// there first. This is the entry point for all unique-constraint
	/// writes.
	pub async fn create<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let bytes = Self::serialize(data)?;
		self.backend
			.create_bytes(&Self::key(namespace, id), bytes)
			.await
	}

	/// Retrieves and deserializes a value from storage.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&Self::key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Retrieves a value, mapping a missing key to `None`.
	pub async fn retrieve_opt<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<Option<T>, StorageError> {
		match self.retrieve(namespace, id).await {
			Ok(value) => Ok(Some(value)),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}

	/// Updates an existing value in storage.
	///
	/// This method first checks if the key exists, then updates the
	/// value. Returns an error if the key doesn't exist, making it
	/// semantically different from store() which creates or overwrites.
	pub async fn update<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let key = Self::key(namespace, id);

		if !self.backend.exists(&key).await? {
			return Err(StorageError::NotFound);
		}

		let bytes = Self::serialize(data)?;
		self.backend.set_bytes(&key, bytes).await
	}

	/// Removes a value from storage.
	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&Self::key(namespace, id)).await
	}

	/// Checks if a value exists in storage.
	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&Self::key(namespace, id)).await
	}

	/// Reads a list index: the ids stored under `namespace:key`.
	///
	/// A missing index reads as empty.
	pub async fn index_ids(&self, namespace: &str, key: &str) -> Result<Vec<String>, StorageError> {
		Ok(self
			.retrieve_opt::<Vec<String>>(namespace, key)
			.await?
			.unwrap_or_default())
	}

	/// Appends an id to a list index if not already present.
	///
	/// Index writes happen inside handler-held locks, so the
	/// read-modify-write here does not race with itself for a given key.
	pub async fn push_index(
		&self,
		namespace: &str,
		key: &str,
		id: &str,
	) -> Result<(), StorageError> {
		let mut ids = self.index_ids(namespace, key).await?;
		if !ids.iter().any(|existing| existing == id) {
			ids.push(id.to_string());
			self.store(namespace, key, &ids).await?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::implementations::memory::MemoryStorage;
	use super::*;
	use serde::{Deserialize, Serialize};

	#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
	struct Doc {
		id: String,
		value: u64,
	}

	fn service() -> StorageService {
		StorageService::new(Box::new(MemoryStorage::new()))
	}

	#[tokio::test]
	async fn typed_round_trip() {
		let storage = service();
		let doc = Doc {
			id: "d1".into(),
			value: 42,
		};

		storage.store("docs", &doc.id, &doc).await.unwrap();
		let loaded: Doc = storage.retrieve("docs", "d1").await.unwrap();
		assert_eq!(loaded, doc);

		assert!(storage.exists("docs", "d1").await.unwrap());
		storage.remove("docs", "d1").await.unwrap();
		assert!(matches!(
			storage.retrieve::<Doc>("docs", "d1").await,
			Err(StorageError::NotFound)
		));
	}

	#[tokio::test]
	async fn create_rejects_duplicates() {
		let storage = service();
		let doc = Doc {
			id: "d1".into(),
			value: 1,
		};

		storage.create("docs", "d1", &doc).await.unwrap();
		assert!(matches!(
			storage.create("docs", "d1", &doc).await,
			Err(StorageError::AlreadyExists)
		));
	}

	#[tokio::test]
	async fn update_requires_existing_key() {
		let storage = service();
		let doc = Doc {
			id: "d1".into(),
			value: 1,
		};

		assert!(matches!(
			storage.update("docs", "d1", &doc).await,
			Err(StorageError::NotFound)
		));

		storage.store("docs", "d1", &doc).await.unwrap();
		let updated = Doc {
			id: "d1".into(),
			value: 2,
		};
		storage.update("docs", "d1", &updated).await.unwrap();
		let loaded: Doc = storage.retrieve("docs", "d1").await.unwrap();
		assert_eq!(loaded.value, 2);
	}

	#[tokio::test]
	async fn index_push_is_idempotent() {
		let storage = service();

		assert!(storage.index_ids("by_order", "o1").await.unwrap().is_empty());

		storage.push_index("by_order", "o1", "r1").await.unwrap();
		storage.push_index("by_order", "o1", "r2").await.unwrap();
		storage.push_index("by_order", "o1", "r1").await.unwrap();

		assert_eq!(
			storage.index_ids("by_order", "o1").await.unwrap(),
			vec!["r1".to_string(), "r2".to_string()]
		);
	}
}
