//! icie: worker bridge and task workflow for competitive programming.

pub mod bridge;
pub mod dir;
mod error;
mod freshness;
pub mod host;
pub mod manifest;
pub mod naming;
pub mod orchestrator;

pub use dir::Directory;
pub use error::{Error, Result};
pub use freshness::requires_compilation;
pub use host::{Config, Host, Notification, Position, TemplateConfig, TextPrompt};
pub use manifest::Manifest;
pub use orchestrator::Orchestrator;
