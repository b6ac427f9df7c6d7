//! KodeRunner - the service shared by every channel

use crate::dispatcher::BuildDispatcher;
use crate::protocol::{ChannelHub, Endpoint};
use crate::runnable::{RunContext, RunnableLoader, SharedRegistry};
use koderunner_foundation::KodeConfig;
use koderunner_task::{KillReport, SessionTable};
use std::sync::Arc;
use tracing::info;

/// Configuration, sessions, runnables and open channels in one place
pub struct KodeRunner {
    config: KodeConfig,
    sessions: Arc<SessionTable>,
    registry: Arc<SharedRegistry>,
    dispatcher: BuildDispatcher,
    hub: ChannelHub,
    loader: RunnableLoader,
}

impl KodeRunner {
    /// Builtins plus `<root>/Runnables`
    pub async fn start(config: KodeConfig) -> Arc<Self> {
        let loader = RunnableLoader::new()
            .with_builtins()
            .with_search_dir(config.runnables_dir());
        Self::with_loader(config, loader).await
    }

    pub async fn with_loader(config: KodeConfig, loader: RunnableLoader) -> Arc<Self> {
        let registry = Arc::new(SharedRegistry::new(loader.load().await));
        let sessions = Arc::new(SessionTable::new());
        let dispatcher = BuildDispatcher::new(
            Arc::clone(&registry),
            RunContext::new(Arc::clone(&sessions), config.shell.clone()),
        );

        Arc::new(Self {
            config,
            sessions,
            registry,
            dispatcher,
            hub: ChannelHub::new(),
            loader,
        })
    }

    pub fn config(&self) -> &KodeConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionTable> {
        &self.sessions
    }

    pub fn registry(&self) -> &Arc<SharedRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &BuildDispatcher {
        &self.dispatcher
    }

    pub fn hub(&self) -> &ChannelHub {
        &self.hub
    }

    /// Rediscover runnables and publish them. Returns the registration count.
    pub async fn reload_runnables(&self) -> usize {
        self.registry.reload(&self.loader).await
    }

    /// Send `text` to every open channel on every endpoint
    pub fn notify_all(&self, text: &str) -> usize {
        Endpoint::ALL
            .into_iter()
            .map(|endpoint| self.hub.broadcast(endpoint, text))
            .sum()
    }

    pub fn stop_all(&self) -> KillReport {
        self.sessions.kill_all()
    }

    /// Tell every client, close every channel, kill every session
    pub fn shutdown(&self, notice: &str) -> KillReport {
        let notified = self.notify_all(notice);
        self.hub.close_all();
        let report = self.stop_all();
        info!(
            channels = notified,
            killed = report.killed.len(),
            "KodeRunner shut down"
        );
        report
    }
}
