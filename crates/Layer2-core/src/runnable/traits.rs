//! Runnable traits - handler and package interfaces

use super::registry::RunnableRegistry;
use crate::settings::BuildSettings;
use async_trait::async_trait;
use koderunner_foundation::{Result, ShellConfig};
use koderunner_task::SessionTable;
use std::sync::Arc;

/// Shared resources every runnable executes against
#[derive(Clone)]
pub struct RunContext {
    /// Table every spawned process is registered in
    pub sessions: Arc<SessionTable>,

    /// Interpreter used for command strings
    pub shell: ShellConfig,
}

impl RunContext {
    pub fn new(sessions: Arc<SessionTable>, shell: ShellConfig) -> Self {
        Self { sessions, shell }
    }
}

/// A build/run handler for one language
#[async_trait]
pub trait Runnable: Send + Sync {
    /// Handler name (e.g. `"dotnet"`)
    fn name(&self) -> &str;

    /// Language / build system identifier it is registered under
    fn language(&self) -> &str;

    /// Higher wins at dispatch
    fn priority(&self) -> i32 {
        0
    }

    fn description(&self) -> &str {
        ""
    }

    /// Build and optionally run the project described by `settings`.
    ///
    /// Output goes to `settings.back_channel`. Errors propagate to the
    /// dispatcher's caller.
    async fn execute(&self, ctx: &RunContext, settings: &BuildSettings) -> Result<()>;
}

/// A unit of runnables with one registration entry point.
///
/// The loader calls `register` once per discovered package. A package that
/// fails leaves nothing behind in the registry.
pub trait RunnablePackage: Send + Sync {
    fn name(&self) -> &str;

    fn register(&self, registry: &mut RunnableRegistry) -> Result<()>;
}
