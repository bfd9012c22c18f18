//! Orchestrator - sequences build, test, submit and init against the worker.
//!
//! Flow of one operation:
//! 1. Check preconditions (flush documents, freshness, tests passing)
//! 2. Send the trigger Impulse
//! 3. Dispatch Reactions in arrival order until `finished` arrives
//! 4. An `auth_request` parks the operation until the host has produced a
//!    username and password; both are sent back before anything else
//!
//! Operations never overlap: every public method takes `&mut self`.

use std::path::PathBuf;
use std::sync::Arc;

use crate::bridge::process::WorkerBridge;
use crate::bridge::protocol::{Impulse, Reaction};
use crate::dir::Directory;
use crate::error::{Error, Result};
use crate::freshness;
use crate::host::{Host, Notification, Position, TextPrompt};
use crate::manifest::Manifest;
use crate::naming::{self, Existence, NameSampler};

/// What a triggered operation may do while in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Credentials {
    Forbidden,
    Allowed,
}

/// How an operation ended once the worker reported `finished`.
enum Outcome {
    Finished(Completion),
    /// The user dismissed a credential prompt; the worker wound down.
    Cancelled(Error),
}

/// Terminal result of one worker operation.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Completion {
    success: bool,
    message: Option<String>,
}

impl Completion {
    fn into_result(self, operation: &'static str) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            Err(Error::OperationFailed {
                operation,
                message: self.message,
            })
        }
    }
}

pub struct Orchestrator {
    dir: Directory,
    bridge: WorkerBridge,
    host: Arc<dyn Host>,
    sampler: Box<dyn NameSampler>,
    existence: Arc<dyn Existence>,
    /// Set when an operation ended without its `finished`.
    abandoned: Option<&'static str>,
}

impl Orchestrator {
    /// Take ownership of the worker connection and announce the workspace.
    pub async fn connect(dir: Directory, bridge: WorkerBridge, host: Arc<dyn Host>) -> Result<Self> {
        let mut orchestrator = Self {
            dir,
            bridge,
            host,
            sampler: Box::new(naming::UuidSampler),
            existence: Arc::new(naming::Filesystem),
            abandoned: None,
        };
        let root_path = Some(orchestrator.dir.root().to_path_buf());
        orchestrator
            .bridge
            .send(Impulse::WorkspaceInfo { root_path })
            .await?;
        Ok(orchestrator)
    }

    /// Replace how `init` samples and checks project names.
    pub fn with_naming(
        mut self,
        sampler: Box<dyn NameSampler>,
        existence: Arc<dyn Existence>,
    ) -> Self {
        self.sampler = sampler;
        self.existence = existence;
        self
    }

    pub fn directory(&self) -> &Directory {
        &self.dir
    }

    pub async fn requires_compilation(&self) -> Result<bool> {
        freshness::requires_compilation(&self.dir).await
    }

    pub async fn build(&mut self) -> Result<()> {
        tracing::info!(source = %self.dir.source().display(), "Build requested");
        self.host.flush_open_documents().await?;
        let source = self.dir.source();
        self.run("build", Impulse::TriggerBuild { source }, Credentials::Forbidden)
            .await?
            .into_result("build")
    }

    /// Build only if the executable is missing or stale.
    pub async fn assure_compiled(&mut self) -> Result<()> {
        if self.requires_compilation().await? {
            self.build().await
        } else {
            tracing::debug!("Executable up to date, skipping build");
            Ok(())
        }
    }

    /// Run the tests; `Ok(false)` means at least one test failed.
    pub async fn test(&mut self) -> Result<bool> {
        self.assure_compiled().await?;
        tracing::info!(tests = %self.dir.tests().display(), "Test requested");
        let impulse = Impulse::TriggerTest {
            executable: self.dir.executable(),
            tests: self.dir.tests(),
        };
        let completion = self.run("test", impulse, Credentials::Forbidden).await?;
        if !completion.success {
            tracing::warn!(message = ?completion.message, "Tests failed");
        }
        Ok(completion.success)
    }

    pub async fn assure_tested(&mut self) -> Result<()> {
        if self.test().await? {
            Ok(())
        } else {
            Err(Error::PreconditionFailed(
                "some tests failed, refusing to submit".to_string(),
            ))
        }
    }

    pub async fn submit(&mut self) -> Result<()> {
        self.assure_tested().await?;
        let manifest = Manifest::load(self.dir.root()).await?;
        tracing::info!(task_url = %manifest.task_url, "Submit requested");
        let impulse = Impulse::TriggerSubmit {
            source: self.dir.source(),
            task_url: manifest.task_url,
        };
        self.run("submit", impulse, Credentials::Allowed)
            .await?
            .into_result("submit")
    }

    /// Hand the task over for submission outside the worker's judge client.
    pub async fn manual_submit(&mut self) -> Result<()> {
        let manifest = Manifest::load(self.dir.root()).await?;
        tracing::info!(task_url = %manifest.task_url, "Manual submit requested");
        let impulse = Impulse::TriggerManualSubmit {
            task_url: manifest.task_url,
        };
        self.run("manual submit", impulse, Credentials::Allowed)
            .await?
            .into_result("manual submit")
    }

    pub async fn instantiate_template(&mut self) -> Result<()> {
        let root = self.dir.root().to_path_buf();
        tracing::info!(root = %root.display(), "Template instantiation requested");
        self.run(
            "template instantiate",
            Impulse::TriggerTemplateInstantiate { root },
            Credentials::Forbidden,
        )
        .await?
        .into_result("template instantiate")
    }

    /// Create a fresh project for a task and switch the host into it.
    ///
    /// Returns the new project root.
    pub async fn init(&mut self) -> Result<PathBuf> {
        let prompt = TextPrompt::new("Enter task URL")
            .with_placeholder("https://codeforces.com/contest/.../problem/...")
            .sticky();
        let url = self
            .host
            .prompt_text(&prompt)
            .await?
            .ok_or_else(|| Error::PromptCancelled("task URL".to_string()))?;

        let config = self.host.load_config().await?;
        let template = config
            .template
            .path
            .ok_or_else(|| Error::Config("template.path is not set".to_string()))?;

        let home = self.host.home_dir()?;
        let root =
            naming::random_project_name(&home, self.sampler.as_mut(), self.existence.as_ref())
                .await?;
        tokio::fs::create_dir(&root)
            .await
            .map_err(|e| Error::io(format!("failed to create {}", root.display()), e))?;
        tracing::info!(%url, root = %root.display(), "Init requested");

        let impulse = Impulse::TriggerInit {
            url: url.clone(),
            root: root.clone(),
        };
        self.run("init", impulse, Credentials::Allowed)
            .await?
            .into_result("init")?;

        Manifest::new(url).save(&root).await?;

        let project = Directory::new(&root);
        let source = project.source();
        let source_exists = tokio::fs::try_exists(&source)
            .await
            .map_err(|e| Error::io(format!("failed to check {}", source.display()), e))?;
        if source_exists {
            tracing::debug!(path = %source.display(), "Worker already created the source file");
        } else {
            tokio::fs::copy(&template, &source).await.map_err(|e| {
                Error::io(
                    format!("failed to copy template {}", template.display()),
                    e,
                )
            })?;
        }

        self.host.switch_context(&root).await?;
        self.host
            .open_editor(&source, config.template.start)
            .await?;
        tracing::info!(root = %root.display(), "Project ready");
        Ok(root)
    }

    /// Handle Reactions that arrived while no operation was in flight.
    ///
    /// Returns how many were dispatched.
    pub async fn dispatch_pending(&mut self) -> Result<usize> {
        let mut count = 0;
        while let Some(reaction) = self.bridge.try_recv()? {
            match reaction {
                Reaction::AuthRequest { domain } => {
                    return Err(Error::protocol(format!(
                        "credential request for {domain} with no operation in flight"
                    )));
                }
                Reaction::Finished { success, .. } => {
                    tracing::warn!(success, "Finished received with no operation in flight");
                }
                other => self.dispatch(other).await?,
            }
            count += 1;
        }
        Ok(count)
    }

    pub async fn shutdown(self) -> Result<()> {
        self.bridge.shutdown().await
    }

    /// Send `trigger` and dispatch Reactions until the worker reports the
    /// operation finished.
    ///
    /// Any error before `finished` leaves the worker mid-operation, so the
    /// connection is marked out of sync and later operations are refused.
    /// A dismissed credential prompt is the exception: the worker is told,
    /// and its `finished` is awaited before `PromptCancelled` is returned.
    async fn run(
        &mut self,
        operation: &'static str,
        trigger: Impulse,
        credentials: Credentials,
    ) -> Result<Completion> {
        if let Some(abandoned) = self.abandoned {
            return Err(Error::protocol(format!(
                "{abandoned} was abandoned mid-flight, worker connection out of sync"
            )));
        }
        tracing::info!(operation, "Operation started");

        match self.drive(operation, trigger, credentials).await {
            Ok(Outcome::Finished(completion)) => Ok(completion),
            Ok(Outcome::Cancelled(e)) => Err(e),
            Err(e) => {
                tracing::warn!(operation, error = %e, "Operation abandoned before finishing");
                self.abandoned = Some(operation);
                Err(e)
            }
        }
    }

    async fn drive(
        &mut self,
        operation: &'static str,
        trigger: Impulse,
        credentials: Credentials,
    ) -> Result<Outcome> {
        self.bridge.send(trigger).await?;

        let mut authenticated = false;
        let mut cancelled = None;
        loop {
            match self.bridge.recv().await? {
                Reaction::Finished { success, message } => {
                    tracing::info!(operation, success, "Operation finished");
                    return Ok(match cancelled {
                        Some(e) => Outcome::Cancelled(e),
                        None => Outcome::Finished(Completion { success, message }),
                    });
                }
                Reaction::AuthRequest { domain } => {
                    if credentials == Credentials::Forbidden {
                        return Err(Error::protocol(format!(
                            "unexpected credential request during {operation}"
                        )));
                    }
                    if authenticated {
                        return Err(Error::protocol(format!(
                            "second credential request during {operation}"
                        )));
                    }
                    authenticated = true;
                    cancelled = self.authenticate(&domain).await?;
                }
                other => self.dispatch(other).await?,
            }
        }
    }

    /// Collect a username and then a password, and send both back.
    ///
    /// Returns the cancellation to report once the operation finishes, if
    /// either prompt was dismissed.
    async fn authenticate(&mut self, domain: &str) -> Result<Option<Error>> {
        tracing::info!(domain, "Worker requested credentials");

        let username_prompt = TextPrompt::new(format!("Username at {domain}")).sticky();
        let Some(username) = self.host.prompt_text(&username_prompt).await? else {
            return self.abandon_authentication(domain, "username").await;
        };

        let password_prompt = TextPrompt::new(format!("Password for {username} at {domain}")).sticky();
        let Some(password) = self.host.prompt_secret(&password_prompt).await? else {
            return self.abandon_authentication(domain, "password").await;
        };

        self.bridge
            .send(Impulse::InputBoxResponse {
                response: Some(username),
            })
            .await?;
        self.bridge
            .send(Impulse::InputBoxResponse {
                response: Some(password),
            })
            .await?;
        tracing::debug!(domain, "Credentials sent");
        Ok(None)
    }

    /// Tell the worker no credentials are coming.
    async fn abandon_authentication(&mut self, domain: &str, field: &str) -> Result<Option<Error>> {
        tracing::info!(domain, field, "Credential prompt dismissed");
        self.bridge
            .send(Impulse::InputBoxResponse { response: None })
            .await?;
        Ok(Some(Error::PromptCancelled(format!("{field} for {domain}"))))
    }

    async fn dispatch(&mut self, reaction: Reaction) -> Result<()> {
        match reaction {
            Reaction::Status { message } => {
                tracing::debug!(status = ?message, "Worker status");
                self.host.notify(Notification::Status(message));
            }
            Reaction::InfoMessage { message } => {
                tracing::info!(%message, "Worker info");
                self.host.notify(Notification::Info(message));
            }
            Reaction::ErrorMessage { message } => {
                tracing::warn!(%message, "Worker error");
                self.host.notify(Notification::Error(message));
            }
            Reaction::ConsoleLog { message } => {
                tracing::debug!(target: "icie::worker", "{}", message);
                self.host.notify(Notification::ConsoleLog(message));
            }
            Reaction::ConsoleError { message } => {
                tracing::warn!(target: "icie::worker", "{}", message);
                self.host.notify(Notification::ConsoleError(message));
            }
            Reaction::ProgressStart { id, title } => {
                tracing::debug!(%id, ?title, "Progress started");
                self.host.notify(Notification::ProgressStart { id, title });
            }
            Reaction::ProgressUpdate {
                id,
                increment,
                message,
            } => {
                tracing::trace!(%id, ?increment, "Progress update");
                self.host.notify(Notification::ProgressUpdate {
                    id,
                    increment,
                    message,
                });
            }
            Reaction::ProgressEnd { id } => {
                tracing::debug!(%id, "Progress ended");
                self.host.notify(Notification::ProgressEnd { id });
            }
            Reaction::QuickPick { items } => {
                tracing::debug!(items = items.len(), "Worker asked for a choice");
                let response = self.host.quick_pick(&items).await?;
                self.bridge
                    .send(Impulse::QuickPickResponse { response })
                    .await?;
            }
            Reaction::InputBox {
                prompt,
                placeholder,
                password,
                ignore_focus_out,
            } => {
                tracing::debug!(?prompt, password, "Worker asked for input");
                let request = TextPrompt {
                    prompt,
                    placeholder,
                    ignore_focus_out,
                };
                let response = if password {
                    self.host.prompt_secret(&request).await?
                } else {
                    self.host.prompt_text(&request).await?
                };
                self.bridge
                    .send(Impulse::InputBoxResponse { response })
                    .await?;
            }
            Reaction::SaveAll => {
                self.host.flush_open_documents().await?;
                self.bridge.send(Impulse::SavedAll).await?;
            }
            Reaction::OpenFolder {
                path,
                in_new_window,
            } => {
                tracing::debug!(path = %path.display(), in_new_window, "Opening folder");
                self.host.open_folder(&path, in_new_window).await?;
            }
            Reaction::OpenEditor { path, row, column } => {
                tracing::debug!(path = %path.display(), row, column, "Opening editor");
                self.host
                    .open_editor(&path, Position { row, column })
                    .await?;
            }
            Reaction::AuthRequest { domain } => {
                return Err(Error::protocol(format!(
                    "credential request for {domain} outside of an operation"
                )));
            }
            Reaction::Finished { success, .. } => {
                tracing::warn!(success, "Unexpected finished reaction");
            }
        }
        Ok(())
    }
}
