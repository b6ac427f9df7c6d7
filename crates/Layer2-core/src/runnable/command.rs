//! Command runnable - build/run driven by shell command templates
//!
//! Templates may use these placeholders, each substituted shell-quoted:
//! - `{project_path}` - project directory
//! - `{main_file}` - absolute path of the entry file
//! - `{output}` - absolute path of the build artifact
//! - `{project}` - project name

use super::traits::{RunContext, Runnable};
use crate::settings::BuildSettings;
use async_trait::async_trait;
use koderunner_foundation::{markup, Error, Result};
use koderunner_task::{OutputEvent, SessionCommand, SpawnedSession};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

const BANNER_BUILD: &str = "\x1b[35m";
const BANNER_RUN: &str = "\x1b[32m";
const BANNER_RESET: &str = "\x1b[0m";

pub struct CommandRunnable {
    name: String,
    language: String,
    priority: i32,
    description: String,
    build: Option<String>,
    run: Option<String>,
    build_banner: String,
    run_banner: String,
}

impl CommandRunnable {
    pub fn new(name: impl Into<String>, language: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            build_banner: format!("Building {} project...", name),
            run_banner: "Running program...".to_string(),
            name,
            language: language.into(),
            priority: 0,
            description: String::new(),
            build: None,
            run: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_build(mut self, template: impl Into<String>) -> Self {
        self.build = Some(template.into());
        self
    }

    pub fn with_run(mut self, template: impl Into<String>) -> Self {
        self.run = Some(template.into());
        self
    }

    pub fn with_banners(mut self, build: impl Into<String>, run: impl Into<String>) -> Self {
        self.build_banner = build.into();
        self.run_banner = run.into();
        self
    }

    pub fn build_template(&self) -> Option<&str> {
        self.build.as_deref()
    }

    pub fn run_template(&self) -> Option<&str> {
        self.run.as_deref()
    }

    /// Substitute placeholders in `template`
    pub fn render(&self, template: &str, settings: &BuildSettings) -> Result<String> {
        let quote = |value: &str| -> Result<String> {
            shlex::try_quote(value)
                .map(|q| q.into_owned())
                .map_err(|e| Error::runnable(&self.name, format!("cannot quote {:?}: {}", value, e)))
        };

        let project_path = settings.project_path.to_string_lossy();
        let main_file = settings.main_file_path();
        let output = settings.output_path();

        Ok(template
            .replace("{project_path}", &quote(&project_path)?)
            .replace("{main_file}", &quote(&main_file.to_string_lossy())?)
            .replace("{output}", &quote(&output.to_string_lossy())?)
            .replace("{project}", &quote(&settings.project_name)?))
    }

    /// Spawn one phase, forward its output, return the exit code
    async fn run_phase(
        &self,
        ctx: &RunContext,
        settings: &BuildSettings,
        template: &str,
    ) -> Result<i32> {
        let command = self.render(template, settings)?;
        debug!("[{}] {}", self.name, command);

        let mut session_command = SessionCommand::new(command);
        let project_exists = tokio::fs::metadata(&settings.project_path)
            .await
            .is_ok_and(|meta| meta.is_dir());
        if project_exists {
            session_command = session_command.with_working_dir(&settings.project_path);
        }

        let SpawnedSession {
            session,
            mut output,
        } = ctx.sessions.spawn(&ctx.shell, session_command)?;

        loop {
            match output.recv().await {
                Ok(OutputEvent::Chunk { text, .. }) => {
                    settings.report(markup::translate(&text));
                }
                Ok(OutputEvent::Exited { .. }) | Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        "[{}] back-channel fell behind, {} chunk(s) dropped",
                        self.name, skipped
                    );
                }
            }
        }

        session.wait().await
    }

    fn banner(&self, settings: &BuildSettings, color: &str, text: &str) {
        settings.report(markup::translate(&format!(
            "{}{}{}\n",
            color, text, BANNER_RESET
        )));
    }
}

#[async_trait]
impl Runnable for CommandRunnable {
    fn name(&self) -> &str {
        &self.name
    }

    fn language(&self) -> &str {
        &self.language
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&self, ctx: &RunContext, settings: &BuildSettings) -> Result<()> {
        info!(
            "[{}] {} ({})",
            self.name,
            settings.project_name,
            settings.project_path.display()
        );

        // without a build step the run command is the whole job
        let Some(build) = &self.build else {
            return match &self.run {
                Some(run) => {
                    self.banner(settings, BANNER_RUN, &self.run_banner);
                    self.run_phase(ctx, settings, run).await.map(|_| ())
                }
                None => Err(Error::runnable(&self.name, "no build or run command")),
            };
        };

        self.banner(settings, BANNER_BUILD, &self.build_banner);
        let code = self.run_phase(ctx, settings, build).await?;
        if code != 0 {
            settings.report(format!("Build failed with exit code {}\n", code));
            return Err(Error::runnable(
                &self.name,
                format!("build exited with code {}", code),
            ));
        }

        if let (true, Some(run)) = (settings.run_on_build, &self.run) {
            self.banner(settings, BANNER_RUN, &self.run_banner);
            self.run_phase(ctx, settings, run).await?;
        }

        Ok(())
    }
}
