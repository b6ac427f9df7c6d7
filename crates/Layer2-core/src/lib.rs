//! koderunner-core: Core runtime for KodeRunner
//!
//! Layer2 - runnables, dispatch and the channel protocol
//!
//! # Modules
//!
//! - `runnable`: Runnable trait, registry, builtins and manifest discovery
//! - `dispatcher`: language → highest-priority runnable
//! - `protocol`: endpoints, payloads and the per-channel state machine
//! - `channel`: transport-agnostic outbound channel handles
//! - `runner`: `KodeRunner`, the service every channel shares
//!
//! # Example
//!
//! ```ignore
//! use koderunner_core::{ChannelHandle, ChannelSession, Endpoint, KodeRunner};
//!
//! let runner = KodeRunner::start(config).await;
//! let (handle, outbound) = ChannelHandle::new(Endpoint::Pms);
//! let mut session = ChannelSession::open(runner.clone(), handle);
//!
//! session.handle_text(r#"{"Project_Name":"demo","Project_Build_Systems":"python",
//!     "Main_File":"main.py","Run_On_Build":"True"}"#).await?;
//! ```

pub mod channel;
pub mod dispatcher;
pub mod protocol;
pub mod runnable;
pub mod runner;
pub mod settings;

pub use channel::{ChannelHandle, ChannelId, Outbound};
pub use dispatcher::BuildDispatcher;
pub use protocol::{
    BuildAck, BuildRequest, ChannelHub, ChannelSession, ChannelState, CloseReason, Endpoint,
    FileIdentity, StopAck, StopRequest, PROTOCOL_VERSION,
};
pub use runnable::{
    BuiltinPackage, CommandRunnable, ManifestPackage, RunContext, Runnable, RunnableLoader,
    RunnableManifest, RunnablePackage, RunnableRegistry, SharedRegistry,
};
pub use runner::KodeRunner;
pub use settings::BuildSettings;
