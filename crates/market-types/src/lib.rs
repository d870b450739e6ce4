//! Common types module for the marketplace system.
//!
//! This module defines the core data types and structures used throughout
//! the marketplace. It provides a centralized location for shared types
//! to ensure consistency across all components.

/// Actor identity and role types resolved at the request boundary.
pub mod actor;
/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Chat, message and system-message-template types.
pub mod chat;
/// Event types for inter-component notification.
pub mod events;
/// Order, response, delivery and review types.
pub mod order;
/// Storage namespaces for managing persistent data.
pub mod storage;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

// Re-export all types for convenient access
pub use actor::*;
pub use api::*;
pub use chat::*;
pub use events::*;
pub use order::*;
pub use storage::*;
pub use validation::*;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as Unix seconds.
///
/// Clock-before-epoch is not a condition the marketplace can recover
/// from, so it degrades to 0 rather than propagating an error.
pub fn unix_now() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or(0)
}

/// Utility function to truncate an id for display purposes.
///
/// Shows only the first 8 characters followed by ".." for longer
/// strings. Cuts on a character boundary, so ids taken verbatim from a
/// request path are safe to pass in whatever their encoding.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((cut, _)) => format!("{}..", &id[..cut]),
		None => id.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn truncate_id_short_and_long() {
		assert_eq!(truncate_id("abc"), "abc");
		assert_eq!(truncate_id("abcdefgh"), "abcdefgh");
		assert_eq!(truncate_id("abcdefghijkl"), "abcdefgh..");
	}

	#[test]
	fn truncate_id_cuts_on_char_boundaries() {
		// The 8th byte of a multibyte id falls inside a character; a
		// byte-offset slice would panic here.
		assert_eq!(truncate_id("€€€€"), "€€€€");
		assert_eq!(truncate_id("€€€€€€€€€"), "€€€€€€€€..");
	}
}
