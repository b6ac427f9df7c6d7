//! Runnable discovery - builtins plus manifest packages on disk
//!
//! Layout:
//!
//! ```text
//! <root>/Runnables/
//! ├── rust/runnable.json
//! └── node/runnable.json
//! ```
//!
//! A broken package is logged and skipped; it never stops the rest.

use super::builtin::BuiltinPackage;
use super::command::CommandRunnable;
use super::registry::RunnableRegistry;
use super::traits::RunnablePackage;
use koderunner_foundation::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

pub const MANIFEST_FILE: &str = "runnable.json";

// ============================================================================
// RunnableManifest
// ============================================================================

/// `runnable.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnableManifest {
    pub name: String,

    pub language: String,

    #[serde(default)]
    pub priority: i32,

    #[serde(default)]
    pub description: String,

    /// Build command template
    #[serde(default)]
    pub build: Option<String>,

    /// Run command template
    #[serde(default)]
    pub run: Option<String>,
}

impl RunnableManifest {
    pub fn parse(text: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_str(text)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("runnable name is empty".into()));
        }
        if self.language.trim().is_empty() {
            return Err(Error::Config(format!("runnable {} has no language", self.name)));
        }
        if self.build.is_none() && self.run.is_none() {
            return Err(Error::Config(format!(
                "runnable {} has neither build nor run command",
                self.name
            )));
        }
        Ok(())
    }

    pub fn to_runnable(&self) -> CommandRunnable {
        let mut runnable = CommandRunnable::new(&self.name, &self.language)
            .with_priority(self.priority)
            .with_description(&self.description);
        if let Some(build) = &self.build {
            runnable = runnable.with_build(build);
        }
        if let Some(run) = &self.run {
            runnable = runnable.with_run(run);
        }
        runnable
    }
}

// ============================================================================
// ManifestPackage
// ============================================================================

/// A package directory holding a `runnable.json`
#[derive(Debug, Clone)]
pub struct ManifestPackage {
    pub manifest: RunnableManifest,
    pub path: PathBuf,
}

impl ManifestPackage {
    pub async fn from_dir(dir: &Path) -> Result<Self> {
        let text = fs::read_to_string(dir.join(MANIFEST_FILE)).await?;
        let manifest = RunnableManifest::parse(&text)?;
        Ok(Self {
            manifest,
            path: dir.to_path_buf(),
        })
    }
}

impl RunnablePackage for ManifestPackage {
    fn name(&self) -> &str {
        &self.manifest.name
    }

    fn register(&self, registry: &mut RunnableRegistry) -> Result<()> {
        registry.register(Arc::new(self.manifest.to_runnable()));
        Ok(())
    }
}

// ============================================================================
// RunnableLoader
// ============================================================================

/// Builds fresh registries from compiled-in packages and a search directory
#[derive(Default)]
pub struct RunnableLoader {
    packages: Vec<Arc<dyn RunnablePackage>>,
    search_dir: Option<PathBuf>,
}

impl RunnableLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins(self) -> Self {
        self.with_package(Arc::new(BuiltinPackage))
    }

    pub fn with_package(mut self, package: Arc<dyn RunnablePackage>) -> Self {
        self.packages.push(package);
        self
    }

    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dir = Some(dir.into());
        self
    }

    pub fn search_dir(&self) -> Option<&Path> {
        self.search_dir.as_deref()
    }

    /// Scan the search directory for manifest packages (sorted by directory name)
    pub async fn discover(&self) -> Vec<ManifestPackage> {
        let Some(dir) = &self.search_dir else {
            return Vec::new();
        };
        if !dir.is_dir() {
            debug!("Runnable directory {:?} does not exist", dir);
            return Vec::new();
        }

        match scan_directory(dir).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Failed to scan runnable directory {:?}: {}", dir, e);
                Vec::new()
            }
        }
    }

    /// Register every package into a fresh registry
    pub async fn load(&self) -> RunnableRegistry {
        let mut registry = RunnableRegistry::new();

        let discovered = self.discover().await;
        let packages = self
            .packages
            .iter()
            .map(|p| p.as_ref())
            .chain(discovered.iter().map(|p| p as &dyn RunnablePackage));

        for package in packages {
            // a package either registers everything or nothing
            let mut scratch = RunnableRegistry::new();
            match package.register(&mut scratch) {
                Ok(()) => registry.absorb(scratch),
                Err(e) => warn!("Skipping runnable package {}: {}", package.name(), e),
            }
        }

        info!("Loaded {} runnable(s)", registry.len());
        for line in registry.describe() {
            info!("  {}", line);
        }
        registry
    }
}

async fn scan_directory(dir: &Path) -> Result<Vec<ManifestPackage>> {
    let mut dirs = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_dir() && path.join(MANIFEST_FILE).is_file() {
            dirs.push(path);
        }
    }
    dirs.sort();

    let mut packages = Vec::new();
    for path in dirs {
        match ManifestPackage::from_dir(&path).await {
            Ok(package) => {
                debug!("Discovered runnable {} at {:?}", package.manifest.name, path);
                packages.push(package);
            }
            Err(e) => warn!("Invalid runnable package {:?}: {}", path, e),
        }
    }
    Ok(packages)
}
