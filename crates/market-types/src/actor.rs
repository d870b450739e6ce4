//! Actor identity types for the marketplace system.
//!
//! Every request carries an `Actor` resolved once at the authentication
//! boundary. The role is an explicit tagged enum rather than a runtime
//! capability probe, so permission checks inside the action handlers are
//! plain comparisons.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User identifier as issued by the external user service.
pub type UserId = String;

/// True if `id` can be embedded in composite storage keys.
///
/// Chat natural keys join ids with `:` and the file backend folds `/`
/// into file names, so an id carrying either character could alias
/// another pair's key. Such ids are rejected at the request boundary.
pub fn is_key_safe_id(id: &str) -> bool {
	!id.trim().is_empty() && !id.contains([':', '/'])
}

/// The role an authenticated user acts under for a given request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	/// The requester role: posts orders, selects creators, reviews work.
	Client,
	/// The executor role: responds to orders and delivers work.
	Creator,
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Role::Client => write!(f, "client"),
			Role::Creator => write!(f, "creator"),
		}
	}
}

impl FromStr for Role {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"client" => Ok(Role::Client),
			"creator" => Ok(Role::Creator),
			_ => Err(()),
		}
	}
}

/// An authenticated request principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
	/// Identifier of the user behind the request.
	pub id: UserId,
	/// Human-readable name used in system messages.
	pub display_name: String,
	/// Role the user acts under for this request.
	pub role: Role,
	/// Staff users can view any order.
	#[serde(default)]
	pub is_staff: bool,
}

impl Actor {
	/// Creates a non-staff actor whose display name defaults to the id.
	pub fn new(id: impl Into<UserId>, role: Role) -> Self {
		let id = id.into();
		Self {
			display_name: id.clone(),
			id,
			role,
			is_staff: false,
		}
	}

	/// Returns true if the actor holds a creator profile.
	pub fn is_creator(&self) -> bool {
		self.role == Role::Creator
	}
}

/// The slice of the external profile service the marketplace owns:
/// denormalized per-creator counters updated by the action handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatorProfile {
	/// User this profile belongs to.
	pub user_id: UserId,
	/// Number of orders completed by this creator.
	pub completed_orders: u64,
	/// Mean of all review ratings received, recomputed on every review save.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub rating: Option<f64>,
	/// Timestamp of the last counter update.
	pub updated_at: u64,
}

impl CreatorProfile {
	/// An empty profile for a creator with no completed orders or reviews.
	pub fn empty(user_id: impl Into<UserId>) -> Self {
		Self {
			user_id: user_id.into(),
			completed_orders: 0,
			rating: None,
			updated_at: 0,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn role_round_trip() {
		assert_eq!("client".parse::<Role>(), Ok(Role::Client));
		assert_eq!("creator".parse::<Role>(), Ok(Role::Creator));
		assert!("staff".parse::<Role>().is_err());
		assert_eq!(Role::Creator.to_string(), "creator");
	}

	#[test]
	fn key_safe_ids_reject_separators() {
		assert!(is_key_safe_id("user-1"));
		assert!(!is_key_safe_id(""));
		assert!(!is_key_safe_id("  "));
		assert!(!is_key_safe_id("a:b"));
		assert!(!is_key_safe_id("a/b"));
	}

	#[test]
	fn actor_defaults() {
		let actor = Actor::new("u1", Role::Creator);
		assert_eq!(actor.display_name, "u1");
		assert!(!actor.is_staff);
		assert!(actor.is_creator());
	}
}
