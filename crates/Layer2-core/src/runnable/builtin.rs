//! Built-in runnables: C (clang), Python and .NET

use super::command::CommandRunnable;
use super::registry::RunnableRegistry;
use super::traits::{Runnable, RunnablePackage};
use koderunner_foundation::Result;
use std::sync::Arc;
use tracing::debug;

/// The compiled-in runnables
pub struct BuiltinPackage;

impl BuiltinPackage {
    pub fn runnables() -> Vec<CommandRunnable> {
        vec![
            CommandRunnable::new("c", "clang")
                .with_description("Executes C projects")
                .with_build("clang -o {output} {main_file}")
                .with_run("{output}")
                .with_banners("Building C project...", "Running program..."),
            CommandRunnable::new("python", "python")
                .with_description("Executes python projects with metadata")
                .with_run("python {main_file}"),
            CommandRunnable::new("dotnet", "csharp")
                .with_priority(1)
                .with_description("Executes dotnet projects with metadata")
                .with_build("dotnet build {project_path}")
                .with_run("dotnet run --project {project_path}"),
        ]
    }
}

impl RunnablePackage for BuiltinPackage {
    fn name(&self) -> &str {
        "builtin"
    }

    fn register(&self, registry: &mut RunnableRegistry) -> Result<()> {
        for runnable in Self::runnables() {
            let tool = runnable
                .build_template()
                .or(runnable.run_template())
                .and_then(|t| t.split_whitespace().next())
                .unwrap_or_default();
            if !tool.starts_with('{') && which::which(tool).is_err() {
                debug!("{} not found on PATH, {} builds will fail", tool, runnable.language());
            }
            registry.register(Arc::new(runnable));
        }
        Ok(())
    }
}
