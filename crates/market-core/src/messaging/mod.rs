//! Chat threads and system-message templating.

mod chat;
mod template;

pub use chat::ChatStore;
pub use template::{TemplateCatalog, TemplateVars};
