//! Capabilities supplied by the interactive environment.
//!
//! The core never draws UI itself. Prompts, notifications, editor actions and
//! configuration all go through [`Host`], which the embedding front end
//! implements.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::bridge::protocol::QuickPickItem;
use crate::error::Result;

/// 1-based cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub row: u32,
    pub column: u32,
}

impl Default for Position {
    fn default() -> Self {
        Self { row: 1, column: 1 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// File copied into a new project's source path.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Where the cursor goes when the new project opens.
    #[serde(default)]
    pub start: Position,
}

/// The slice of host configuration the core reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub template: TemplateConfig,
}

/// A single-line text question.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextPrompt {
    pub prompt: Option<String>,
    pub placeholder: Option<String>,
    /// Keep the prompt open when focus moves elsewhere.
    pub ignore_focus_out: bool,
}

impl TextPrompt {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            ..Self::default()
        }
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn sticky(mut self) -> Self {
        self.ignore_focus_out = true;
        self
    }
}

/// Fire-and-forget display events.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Status(Option<String>),
    Info(String),
    Error(String),
    ConsoleLog(String),
    ConsoleError(String),
    ProgressStart {
        id: String,
        title: Option<String>,
    },
    ProgressUpdate {
        id: String,
        increment: Option<f64>,
        message: Option<String>,
    },
    ProgressEnd {
        id: String,
    },
}

#[async_trait]
pub trait Host: Send + Sync {
    /// Persist every unsaved document.
    async fn flush_open_documents(&self) -> Result<()>;

    /// Ask for one line of text. `Ok(None)` means the user dismissed it.
    async fn prompt_text(&self, prompt: &TextPrompt) -> Result<Option<String>>;

    /// Like [`prompt_text`](Self::prompt_text), without echoing the input.
    async fn prompt_secret(&self, prompt: &TextPrompt) -> Result<Option<String>>;

    /// Let the user choose one item; returns its `id`.
    async fn quick_pick(&self, items: &[QuickPickItem]) -> Result<Option<String>>;

    async fn load_config(&self) -> Result<Config>;

    /// Move the environment to a different project root.
    async fn switch_context(&self, root: &Path) -> Result<()>;

    async fn open_editor(&self, path: &Path, position: Position) -> Result<()>;

    async fn open_folder(&self, path: &Path, in_new_window: bool) -> Result<()>;

    fn notify(&self, notification: Notification);

    /// Parent directory for new projects.
    fn home_dir(&self) -> Result<PathBuf>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: Config = serde_json::from_str(r#"{"template": {"path": "/t/main.cpp"}}"#).unwrap();
        assert_eq!(config.template.path, Some(PathBuf::from("/t/main.cpp")));
        assert_eq!(config.template.start, Position { row: 1, column: 1 });

        let empty: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, Config::default());
    }

    #[test]
    fn text_prompt_builder() {
        let prompt = TextPrompt::new("Task URL").with_placeholder("https://").sticky();
        assert_eq!(prompt.prompt.as_deref(), Some("Task URL"));
        assert_eq!(prompt.placeholder.as_deref(), Some("https://"));
        assert!(prompt.ignore_focus_out);
    }
}
