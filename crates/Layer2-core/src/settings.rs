//! Build settings handed from the protocol to a runnable

use crate::channel::ChannelHandle;
use std::path::PathBuf;

/// Everything a runnable needs to build and run one project.
/// Built per request, never shared.
#[derive(Debug, Clone, Default)]
pub struct BuildSettings {
    /// Build system / language the request was dispatched on
    pub language: String,

    pub project_name: String,

    /// `<root>/Projects/<project_name>`
    pub project_path: PathBuf,

    /// Entry file, relative to `project_path`
    pub main_file: String,

    /// Artifact name, relative to `project_path`
    pub output: String,

    /// Run the program after a successful build
    pub run_on_build: bool,

    /// Where build/run output is streamed
    pub back_channel: Option<ChannelHandle>,
}

impl BuildSettings {
    pub fn new(
        language: impl Into<String>,
        project_name: impl Into<String>,
        project_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            language: language.into(),
            project_name: project_name.into(),
            project_path: project_path.into(),
            ..Default::default()
        }
    }

    pub fn with_main_file(mut self, main_file: impl Into<String>) -> Self {
        self.main_file = main_file.into();
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_run_on_build(mut self, run: bool) -> Self {
        self.run_on_build = run;
        self
    }

    pub fn with_back_channel(mut self, channel: ChannelHandle) -> Self {
        self.back_channel = Some(channel);
        self
    }

    pub fn main_file_path(&self) -> PathBuf {
        self.project_path.join(&self.main_file)
    }

    pub fn output_path(&self) -> PathBuf {
        self.project_path.join(&self.output)
    }

    /// Send text to the back-channel if there is one that is still open
    pub fn report(&self, text: impl Into<String>) -> bool {
        match &self.back_channel {
            Some(channel) => channel.send_text(text),
            None => false,
        }
    }
}
