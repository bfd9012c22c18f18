//! Client side of the worker connection.
//!
//! # Architecture
//!
//! - **codec**: self-delimiting JSON framing (push decoder and tokio codec)
//! - **protocol**: Impulse / Reaction message types
//! - **process**: worker subprocess ownership and the Reaction channel

pub mod codec;
pub mod process;
pub mod protocol;

pub use codec::{FrameDecoder, JsonCodec};
pub use process::{BinarySpawner, WorkerBridge, WorkerSpawner};
pub use protocol::{Impulse, QuickPickItem, Reaction};
