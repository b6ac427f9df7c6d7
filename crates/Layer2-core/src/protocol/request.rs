//! Wire payloads for `/PMS` and `/stop`

use crate::settings::BuildSettings;
use koderunner_foundation::{Error, KodeConfig, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

pub const STOP_MESSAGE: &str = "All processes stopped";

/// `/PMS` request. Values are strings on the wire, including `Run_On_Build`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BuildRequest {
    #[serde(rename = "Project_Name", default)]
    pub project_name: Option<String>,

    #[serde(rename = "Main_File", default)]
    pub main_file: Option<String>,

    #[serde(rename = "Project_Build_Systems", default)]
    pub build_system: Option<String>,

    #[serde(rename = "Project_Output", default)]
    pub output: Option<String>,

    #[serde(rename = "Run_On_Build", default)]
    pub run_on_build: Option<String>,
}

impl BuildRequest {
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::MalformedRequest(format!("build request: {}", e)))
    }

    /// Only the exact string `"True"` enables running
    pub fn run_on_build(&self) -> bool {
        self.run_on_build.as_deref() == Some("True")
    }

    pub fn build_system(&self) -> Result<&str> {
        self.build_system
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::MalformedRequest("Project_Build_Systems is missing".into()))
    }

    pub fn project_name(&self) -> Result<&str> {
        let name = self
            .project_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::MalformedRequest("Project_Name is missing".into()))?;

        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(name),
            _ => Err(Error::MalformedRequest(format!(
                "Project_Name {:?} is not a plain directory name",
                name
            ))),
        }
    }

    /// Settings for dispatch, rooted at the configured projects directory
    pub fn to_settings(&self, config: &KodeConfig) -> Result<BuildSettings> {
        let language = self.build_system()?;
        let project = self.project_name()?;

        Ok(BuildSettings::new(language, project, config.project_dir(project))
            .with_main_file(self.main_file.as_deref().unwrap_or_default().trim())
            .with_output(self.output.as_deref().unwrap_or_default().trim())
            .with_run_on_build(self.run_on_build()))
    }
}

/// Reply to a `/PMS` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BuildAck {
    Completed {
        project: String,
        build_system: String,
    },
    Error {
        kind: String,
        message: String,
    },
}

impl BuildAck {
    pub fn completed(settings: &BuildSettings) -> Self {
        Self::Completed {
            project: settings.project_name.clone(),
            build_system: settings.language.clone(),
        }
    }

    pub fn error(err: &Error) -> Self {
        Self::Error {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// `/stop` request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StopRequest {
    pub stopped: bool,
}

impl StopRequest {
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::MalformedRequest(format!("stop request: {}", e)))
    }
}

/// Reply to `{"stopped": true}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopAck {
    pub stopped: bool,
    pub message: String,
}

impl Default for StopAck {
    fn default() -> Self {
        Self {
            stopped: true,
            message: STOP_MESSAGE.to_string(),
        }
    }
}

impl StopAck {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
