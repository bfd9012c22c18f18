//! Worker subprocess ownership and the bidirectional message channel.
//!
//! Flow:
//! 1. Spawn the worker binary (no arguments, stdio piped)
//! 2. Start a reader task decoding Reactions from stdout
//! 3. Reactions are pushed one at a time onto a bounded channel; the reader
//!    does not decode further bytes until the previous Reaction was accepted
//! 4. Impulses are written to stdin in `send` order

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::bridge::codec::JsonCodec;
use crate::bridge::protocol::{Impulse, Reaction};
use crate::error::{Error, Result};

/// Reactions decoded but not yet consumed by the orchestrator.
const REACTION_BUFFER: usize = 64;

/// How long `shutdown` waits for the worker to exit after stdin is closed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

type ImpulseWriter = FramedWrite<Box<dyn AsyncWrite + Send + Unpin>, JsonCodec<Impulse>>;

/// Extension point for different worker launch strategies.
pub trait WorkerSpawner: Send + Sync {
    fn spawn(&self) -> std::io::Result<Child>;
}

/// Launches a worker executable by path, with no arguments.
#[derive(Debug, Clone)]
pub struct BinarySpawner {
    program: PathBuf,
}

impl BinarySpawner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl WorkerSpawner for BinarySpawner {
    fn spawn(&self) -> std::io::Result<Child> {
        Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
    }
}

/// Exclusive owner of one worker connection.
pub struct WorkerBridge {
    writer: ImpulseWriter,
    reactions: mpsc::Receiver<Result<Reaction>>,
    reader_task: JoinHandle<()>,
    child: Option<Child>,
    /// Set once the inbound stream failed to decode.
    poisoned: bool,
}

impl WorkerBridge {
    /// Spawn the worker and connect to its stdio.
    pub fn spawn(spawner: &dyn WorkerSpawner) -> Result<Self> {
        tracing::info!("Spawning worker subprocess");
        let mut child = spawner
            .spawn()
            .map_err(|e| Error::Spawn(format!("spawner failed: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Spawn("stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Spawn("stdout not captured".to_string()))?;

        tracing::debug!(pid = child.id(), "Worker started");
        let mut bridge = Self::from_pipes(stdout, stdin);
        bridge.child = Some(child);
        Ok(bridge)
    }

    /// Connect to a worker over arbitrary pipes. The bridge does not own a
    /// process handle in this mode; termination is detected from the pipes.
    pub fn from_pipes<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let writer: Box<dyn AsyncWrite + Send + Unpin> = Box::new(writer);
        let framed_reader = FramedRead::new(reader, JsonCodec::<Reaction>::new());
        let (tx, rx) = mpsc::channel(REACTION_BUFFER);
        let reader_task = tokio::spawn(run_reader(framed_reader, tx));

        Self {
            writer: FramedWrite::new(writer, JsonCodec::new()),
            reactions: rx,
            reader_task,
            child: None,
            poisoned: false,
        }
    }

    /// Write one Impulse as a single JSON line.
    pub async fn send(&mut self, impulse: Impulse) -> Result<()> {
        if self.poisoned {
            return Err(Error::protocol("worker output is corrupt, connection unusable"));
        }
        if let Some(child) = self.child.as_mut()
            && let Some(status) = child
                .try_wait()
                .map_err(|e| Error::io("failed to poll worker process", e))?
        {
            tracing::warn!(%status, tag = impulse.tag(), "Worker exited, dropping impulse");
            return Err(Error::WorkerTerminated);
        }

        tracing::debug!(tag = impulse.tag(), "Sending impulse");
        self.writer.send(impulse).await.inspect_err(|e| {
            tracing::error!(error = %e, "Failed to write impulse");
        })
    }

    /// Next Reaction in arrival order.
    ///
    /// Output the worker produced before exiting is still delivered; once it
    /// is drained this fails with [`Error::WorkerTerminated`].
    pub async fn recv(&mut self) -> Result<Reaction> {
        if self.poisoned {
            return Err(Error::protocol("worker output is corrupt, connection unusable"));
        }
        let next = self.reactions.recv().await;
        self.accept(next)
    }

    /// Like [`recv`](Self::recv) but returns `Ok(None)` instead of waiting.
    pub fn try_recv(&mut self) -> Result<Option<Reaction>> {
        if self.poisoned {
            return Err(Error::protocol("worker output is corrupt, connection unusable"));
        }
        match self.reactions.try_recv() {
            Ok(item) => self.accept(Some(item)).map(Some),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(Error::WorkerTerminated),
        }
    }

    fn accept(&mut self, next: Option<Result<Reaction>>) -> Result<Reaction> {
        match next {
            Some(Ok(reaction)) => Ok(reaction),
            Some(Err(e)) => {
                if matches!(e, Error::Protocol(_)) {
                    self.poisoned = true;
                }
                Err(e)
            }
            None => Err(Error::WorkerTerminated),
        }
    }

    /// Wait for the worker process to exit. No-op error for pipe-only bridges.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        let child = self
            .child
            .as_mut()
            .ok_or_else(|| Error::Spawn("bridge has no process handle".to_string()))?;
        child
            .wait()
            .await
            .map_err(|e| Error::io("failed to wait for worker", e))
    }

    /// Close the worker's stdin and give it a grace period to exit.
    pub async fn shutdown(mut self) -> Result<()> {
        tracing::info!("Shutting down worker");
        if let Err(e) = self.writer.close().await {
            tracing::debug!(error = %e, "Worker stdin already closed");
        }

        if let Some(mut child) = self.child.take() {
            match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
                Ok(Ok(status)) => tracing::debug!(%status, "Worker exited"),
                Ok(Err(e)) => return Err(Error::io("failed to wait for worker", e)),
                Err(_) => {
                    tracing::warn!("Worker did not exit in time, killing");
                    child
                        .kill()
                        .await
                        .map_err(|e| Error::io("failed to kill worker", e))?;
                }
            }
        }
        self.reader_task.abort();
        Ok(())
    }
}

impl Drop for WorkerBridge {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

async fn run_reader<R>(
    mut reader: FramedRead<R, JsonCodec<Reaction>>,
    tx: mpsc::Sender<Result<Reaction>>,
) where
    R: AsyncRead + Unpin,
{
    loop {
        match reader.next().await {
            Some(Ok(reaction)) => {
                tracing::debug!(tag = reaction.tag(), "Reaction received");
                if tx.send(Ok(reaction)).await.is_err() {
                    break;
                }
            }
            Some(Err(e)) => {
                tracing::error!(error = %e, "Worker output stream error");
                let _ = tx.send(Err(e)).await;
                break;
            }
            None => {
                tracing::debug!("Worker output closed");
                break;
            }
        }
    }
    tracing::debug!("Reaction reader task exiting");
}
