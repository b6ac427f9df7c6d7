//! # koderunner-task
//!
//! Process sessions for KodeRunner.
//! Every build or run command becomes a session in a shared table.
//!
//! ## Features
//!
//! - Shell command spawning with piped stdin/stdout/stderr
//! - **Live output streaming** per session and across the whole table
//! - Line input routed to running programs
//! - Process-group kill of everything the server started

pub mod output;
pub mod session;
pub mod state;
pub mod table;

pub use output::{OutputEvent, OutputStream, Utf8Chunker};
pub use session::{ProcessSession, SessionCommand, SessionId, SpawnedSession};
pub use state::SessionState;
pub use table::{KillReport, SessionTable};
