//! Terminal implementation of the host capabilities.
//!
//! Prompts use dialoguer on a blocking thread so the worker's output keeps
//! flowing into the bridge while the user types. An empty answer counts as a
//! dismissed prompt.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Password, Select};

use icie::bridge::QuickPickItem;
use icie::{Config, Error, Host, Notification, Position, Result, TextPrompt};

pub struct TerminalHost {
    config: Config,
}

impl TerminalHost {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

/// Run a dialoguer interaction off the async thread.
async fn interact<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> dialoguer::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::io("prompt task failed", io::Error::other(e)))?
        .map_err(|e| Error::io("terminal prompt failed", io::Error::other(e)))
}

fn prompt_line(prompt: &TextPrompt) -> String {
    let text = prompt.prompt.clone().unwrap_or_default();
    match &prompt.placeholder {
        Some(placeholder) => format!("{text} ({placeholder})"),
        None => text,
    }
}

fn non_empty(answer: String) -> Option<String> {
    let trimmed = answer.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn item_label(item: &QuickPickItem) -> String {
    let mut label = item.label.clone();
    if let Some(description) = &item.description {
        label.push_str("  ");
        label.push_str(description);
    }
    if let Some(detail) = &item.detail {
        label.push_str("\n    ");
        label.push_str(detail);
    }
    label
}

#[async_trait]
impl Host for TerminalHost {
    async fn flush_open_documents(&self) -> Result<()> {
        // Files are edited outside this process and already on disk.
        tracing::trace!("No open documents to flush");
        Ok(())
    }

    async fn prompt_text(&self, prompt: &TextPrompt) -> Result<Option<String>> {
        let line = prompt_line(prompt);
        let answer = interact(move || {
            Input::<String>::with_theme(&ColorfulTheme::default())
                .with_prompt(line)
                .allow_empty(true)
                .interact_text()
        })
        .await?;
        Ok(non_empty(answer))
    }

    async fn prompt_secret(&self, prompt: &TextPrompt) -> Result<Option<String>> {
        let line = prompt_line(prompt);
        let answer = interact(move || {
            Password::with_theme(&ColorfulTheme::default())
                .with_prompt(line)
                .allow_empty_password(true)
                .interact()
        })
        .await?;
        Ok(if answer.is_empty() { None } else { Some(answer) })
    }

    async fn quick_pick(&self, items: &[QuickPickItem]) -> Result<Option<String>> {
        if items.is_empty() {
            return Ok(None);
        }
        let labels: Vec<String> = items.iter().map(item_label).collect();
        let selection = interact(move || {
            Select::with_theme(&ColorfulTheme::default())
                .items(&labels)
                .default(0)
                .interact_opt()
        })
        .await?;
        Ok(selection.and_then(|index| items.get(index)).map(|item| item.id.clone()))
    }

    async fn load_config(&self) -> Result<Config> {
        Ok(self.config.clone())
    }

    async fn switch_context(&self, root: &Path) -> Result<()> {
        println!("Project ready: {}", root.display());
        Ok(())
    }

    async fn open_editor(&self, path: &Path, position: Position) -> Result<()> {
        println!("{}:{}:{}", path.display(), position.row, position.column);
        Ok(())
    }

    async fn open_folder(&self, path: &Path, _in_new_window: bool) -> Result<()> {
        println!("{}", path.display());
        Ok(())
    }

    fn notify(&self, notification: Notification) {
        match notification {
            Notification::Status(Some(message)) => eprintln!("{message}"),
            Notification::Status(None) => {}
            Notification::Info(message) => println!("{message}"),
            Notification::Error(message) => eprintln!("error: {message}"),
            Notification::ConsoleLog(message) => println!("{message}"),
            Notification::ConsoleError(message) => eprintln!("{message}"),
            Notification::ProgressStart { title, .. } => {
                if let Some(title) = title {
                    eprintln!("{title}");
                }
            }
            Notification::ProgressUpdate { message, .. } => {
                if let Some(message) = message {
                    eprintln!("  {message}");
                }
            }
            Notification::ProgressEnd { .. } => {}
        }
    }

    fn home_dir(&self) -> Result<PathBuf> {
        dirs::home_dir().ok_or_else(|| Error::Config("could not determine home directory".to_string()))
    }
}
