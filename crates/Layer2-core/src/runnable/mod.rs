//! # Runnables
//!
//! A runnable knows how to build and/or run projects for one language.
//!
//! ```text
//! RunnableLoader ──► RunnablePackage::register ──► RunnableRegistry
//!   (builtins,                                      │ language → [(priority, runnable)]
//!    Runnables/*/runnable.json)                     ▼
//!                                 SharedRegistry (Arc snapshot, replace-then-publish)
//!                                                   │
//!                                  BuildDispatcher::dispatch(language, settings)
//! ```
//!
//! Within a language, the highest priority wins; equal priorities resolve to
//! the one registered first.

mod builtin;
mod command;
mod discovery;
mod registry;
mod shared;
mod traits;

pub use builtin::BuiltinPackage;
pub use command::CommandRunnable;
pub use discovery::{ManifestPackage, RunnableLoader, RunnableManifest, MANIFEST_FILE};
pub use registry::{Registration, RunnableRegistry};
pub use shared::SharedRegistry;
pub use traits::{RunContext, Runnable, RunnablePackage};
