//! Build dispatcher - language → runnable → execute

use crate::runnable::{RunContext, SharedRegistry};
use crate::settings::BuildSettings;
use koderunner_foundation::{Error, Result};
use std::sync::Arc;
use tracing::info;

pub struct BuildDispatcher {
    registry: Arc<SharedRegistry>,
    context: RunContext,
}

impl BuildDispatcher {
    pub fn new(registry: Arc<SharedRegistry>, context: RunContext) -> Self {
        Self { registry, context }
    }

    pub fn registry(&self) -> &Arc<SharedRegistry> {
        &self.registry
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Run the highest-priority runnable for `language`.
    ///
    /// Fails with `NotFound` when nothing is registered; errors from the
    /// runnable are returned as-is.
    pub async fn dispatch(&self, language: &str, settings: &BuildSettings) -> Result<()> {
        let runnable = self.registry.snapshot().resolve(language)?;
        info!(
            "Dispatching {} to runnable {} (priority {})",
            language,
            runnable.name(),
            runnable.priority()
        );
        runnable.execute(&self.context, settings).await
    }

    /// Run every runnable for `language`, highest priority first. Stops at the
    /// first error. Returns how many ran.
    ///
    /// Library API for embedders; the channel protocol only uses
    /// [`dispatch`](Self::dispatch).
    pub async fn dispatch_all(&self, language: &str, settings: &BuildSettings) -> Result<usize> {
        let snapshot = self.registry.snapshot();
        let mut ran = 0;
        for runnable in snapshot.resolve_all(language) {
            info!("Dispatching {} to runnable {} (all)", language, runnable.name());
            runnable.execute(&self.context, settings).await?;
            ran += 1;
        }

        if ran == 0 {
            return Err(Error::NotFound(language.to_string()));
        }
        Ok(ran)
    }
}
