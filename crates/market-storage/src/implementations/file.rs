//! File-based storage backend implementation for the marketplace.
//!
//! This module stores each key as one file on the filesystem, providing
//! simple persistence without external dependencies. Overwrites go
//! through a temp-file + rename so readers never observe partial
//! writes; exclusive create relies on `OpenOptions::create_new`, which
//! the filesystem guarantees to be atomic.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use market_types::{ConfigSchema, Field, FieldType, Schema, ValidationError};
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// File-based storage implementation.
pub struct FileStorage {
	/// Base directory path for storing files.
	base_path: PathBuf,
}

impl FileStorage {
	/// Creates a new FileStorage instance with the specified base path.
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	/// Converts a storage key to a filesystem-safe file path.
	///
	/// Sanitizes the key by replacing problematic characters and
	/// appending a .json extension.
	fn get_file_path(&self, key: &str) -> PathBuf {
		let safe_key = key.replace(['/', ':'], "_");
		self.base_path.join(format!("{}.json", safe_key))
	}

	async fn ensure_base_dir(&self) -> Result<(), StorageError> {
		fs::create_dir_all(&self.base_path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.get_file_path(key);

		match fs::read(&path).await {
			Ok(data) => Ok(data),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		self.ensure_base_dir().await?;
		let path = self.get_file_path(key);

		// Write atomically by writing to temp file then renaming
		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, value)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		Ok(())
	}

	async fn create_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		self.ensure_base_dir().await?;
		let path = self.get_file_path(key);

		// create_new fails with AlreadyExists if the file is present,
		// making the winner of a create race unambiguous.
		let mut file = match fs::OpenOptions::new()
			.write(true)
			.create_new(true)
			.open(&path)
			.await
		{
			Ok(file) => file,
			Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
				return Err(StorageError::AlreadyExists)
			}
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		file.write_all(&value)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		file.flush()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let path = self.get_file_path(key);

		match fs::remove_file(&path).await {
			Ok(_) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let path = self.get_file_path(key);
		Ok(path.exists())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![], // No required fields
			vec![Field::new("storage_path", FieldType::String)],
		);
		schema.validate(config)
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: Base directory for file storage (default: "./data/storage")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or("./data/storage")
		.to_string();

	Ok(Box::new(FileStorage::new(PathBuf::from(storage_path))))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn storage() -> (tempfile::TempDir, FileStorage) {
		let dir = tempfile::tempdir().unwrap();
		let storage = FileStorage::new(dir.path().to_path_buf());
		(dir, storage)
	}

	#[tokio::test]
	async fn test_basic_operations() {
		let (_dir, storage) = storage();

		let key = "orders:o1";
		let value = br#"{"id":"o1"}"#.to_vec();
		storage.set_bytes(key, value.clone()).await.unwrap();

		assert_eq!(storage.get_bytes(key).await.unwrap(), value);
		assert!(storage.exists(key).await.unwrap());

		storage.delete(key).await.unwrap();
		assert!(!storage.exists(key).await.unwrap());
		assert!(matches!(
			storage.get_bytes(key).await,
			Err(StorageError::NotFound)
		));

		// Deleting a missing key is a no-op
		storage.delete(key).await.unwrap();
	}

	#[tokio::test]
	async fn test_key_sanitization() {
		let (_dir, storage) = storage();

		// Keys with separators must not escape the base directory.
		let key = "chat_by_key:client/1:creator:o";
		storage.set_bytes(key, b"x".to_vec()).await.unwrap();
		assert_eq!(storage.get_bytes(key).await.unwrap(), b"x".to_vec());
	}

	#[tokio::test]
	async fn test_create_is_exclusive() {
		let (_dir, storage) = storage();

		let key = "chat_by_key:c:k:o";
		storage.create_bytes(key, b"chat-1".to_vec()).await.unwrap();

		let second = storage.create_bytes(key, b"chat-2".to_vec()).await;
		assert!(matches!(second, Err(StorageError::AlreadyExists)));
		assert_eq!(storage.get_bytes(key).await.unwrap(), b"chat-1".to_vec());
	}
}
