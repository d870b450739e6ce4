//! System message templating.
//!
//! Renders event-driven notifications into chat threads from
//! admin-managed templates with named-placeholder substitution. Lookup
//! or substitution failure degrades to a hardcoded default message for
//! the event; rendering never fails, so a misconfigured template cannot
//! abort the order or chat mutation that triggered it.

use market_storage::StorageService;
use market_types::{MessageEvent, StorageKey, SystemMessageTemplate};
use std::collections::HashMap;
use std::sync::Arc;

/// Named variables available to a template.
pub type TemplateVars = HashMap<&'static str, String>;

/// Storage-backed template lookup with hardcoded fallbacks.
pub struct TemplateCatalog {
	storage: Arc<StorageService>,
}

impl TemplateCatalog {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Renders the message text for `event`.
	///
	/// Uses the stored template when one exists, is active, and all its
	/// placeholders resolve against `vars`; otherwise falls back to the
	/// default text for the event.
	pub async fn render(&self, event: MessageEvent, vars: &TemplateVars) -> String {
		let stored = self
			.storage
			.retrieve_opt::<SystemMessageTemplate>(StorageKey::Templates.as_str(), event.as_str())
			.await;

		match stored {
			Ok(Some(template)) if template.is_active => {
				match substitute(&template.template, vars) {
					Some(text) => text,
					None => {
						tracing::warn!(
							event = %event,
							"System message template has unresolved placeholders, using default"
						);
						Self::default_text(event, vars)
					},
				}
			},
			Ok(_) => Self::default_text(event, vars),
			Err(e) => {
				tracing::warn!(event = %event, error = %e, "Template lookup failed, using default");
				Self::default_text(event, vars)
			},
		}
	}

	/// The hardcoded default text for an event, with the same variables
	/// substituted. Defaults only reference variables the handlers
	/// always provide; should that ever not hold, the raw default is
	/// used rather than failing.
	fn default_text(event: MessageEvent, vars: &TemplateVars) -> String {
		let default = match event {
			MessageEvent::CreatorResponded => "{creator_name} responded to \"{order_title}\".",
			MessageEvent::CreatorAssigned => {
				"{creator_name} was assigned to \"{order_title}\". The order is now in progress."
			},
			MessageEvent::StatusChanged => "\"{order_title}\" moved to status {status}.",
			MessageEvent::ReviewReminder => {
				"Work on \"{order_title}\" was submitted for review. Please check the delivery."
			},
			MessageEvent::OrderCompleted => {
				"\"{order_title}\" is completed. Thank you for working together."
			},
		};
		substitute(default, vars).unwrap_or_else(|| default.to_string())
	}
}

/// Substitutes `{name}` placeholders from `vars`.
///
/// Returns None when the template references a variable that is not
/// provided or has unbalanced braces, signalling the caller to fall
/// back.
fn substitute(template: &str, vars: &TemplateVars) -> Option<String> {
	let mut out = String::with_capacity(template.len());
	let mut rest = template;

	while let Some(open) = rest.find('{') {
		out.push_str(&rest[..open]);
		let after = &rest[open + 1..];
		let close = after.find('}')?;
		let name = &after[..close];
		out.push_str(vars.get(name)?);
		rest = &after[close + 1..];
	}
	if rest.contains('}') {
		return None;
	}
	out.push_str(rest);
	Some(out)
}

#[cfg(test)]
mod tests {
	use super::*;
	use market_storage::implementations::memory::MemoryStorage;

	fn catalog() -> TemplateCatalog {
		TemplateCatalog::new(Arc::new(StorageService::new(Box::new(
			MemoryStorage::new(),
		))))
	}

	fn vars() -> TemplateVars {
		TemplateVars::from([
			("order_title", "Logo".to_string()),
			("creator_name", "Ada".to_string()),
			("client_name", "Bob".to_string()),
			("status", "in_progress".to_string()),
		])
	}

	#[test]
	fn substitute_resolves_placeholders() {
		let vars = vars();
		assert_eq!(
			substitute("{creator_name} -> {order_title}", &vars).unwrap(),
			"Ada -> Logo"
		);
		assert_eq!(substitute("no placeholders", &vars).unwrap(), "no placeholders");
	}

	#[test]
	fn substitute_fails_on_unknown_or_unbalanced() {
		let vars = vars();
		assert!(substitute("{unknown}", &vars).is_none());
		assert!(substitute("{order_title", &vars).is_none());
	}

	#[tokio::test]
	async fn missing_template_uses_default() {
		let catalog = catalog();
		let text = catalog
			.render(MessageEvent::CreatorResponded, &vars())
			.await;
		assert_eq!(text, "Ada responded to \"Logo\".");
	}

	#[tokio::test]
	async fn stored_template_wins() {
		let catalog = catalog();
		catalog
			.storage
			.store(
				StorageKey::Templates.as_str(),
				MessageEvent::CreatorResponded.as_str(),
				&SystemMessageTemplate {
					event: MessageEvent::CreatorResponded,
					template: "New bid from {creator_name}!".to_string(),
					is_active: true,
				},
			)
			.await
			.unwrap();

		let text = catalog
			.render(MessageEvent::CreatorResponded, &vars())
			.await;
		assert_eq!(text, "New bid from Ada!");
	}

	#[tokio::test]
	async fn inactive_template_uses_default() {
		let catalog = catalog();
		catalog
			.storage
			.store(
				StorageKey::Templates.as_str(),
				MessageEvent::OrderCompleted.as_str(),
				&SystemMessageTemplate {
					event: MessageEvent::OrderCompleted,
					template: "ignored".to_string(),
					is_active: false,
				},
			)
			.await
			.unwrap();

		let text = catalog.render(MessageEvent::OrderCompleted, &vars()).await;
		assert_eq!(text, "\"Logo\" is completed. Thank you for working together.");
	}

	#[tokio::test]
	async fn broken_template_falls_back_with_variables() {
		let catalog = catalog();
		catalog
			.storage
			.store(
				StorageKey::Templates.as_str(),
				MessageEvent::StatusChanged.as_str(),
				&SystemMessageTemplate {
					event: MessageEvent::StatusChanged,
					template: "status is now {no_such_var}".to_string(),
					is_active: true,
				},
			)
			.await
			.unwrap();

		let text = catalog.render(MessageEvent::StatusChanged, &vars()).await;
		assert_eq!(text, "\"Logo\" moved to status in_progress.");
	}
}
