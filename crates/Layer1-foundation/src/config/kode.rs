//! KodeRunner config
//!
//! Load order: defaults -> `<root>/koderunner.toml` -> `.env` / process environment.
//! CLI flags are applied by the binary on top of the result.

use super::ShellConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::{Host, Url};

/// Config file name, looked up inside the root directory
pub const CONFIG_FILE: &str = "koderunner.toml";

/// Listener URL used when nothing else is configured
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000/";

// ============================================================================
// Working directories
// ============================================================================

/// Names of the working directories below the root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkDirs {
    pub projects: String,
    pub builds: String,
    pub temp: String,
    pub output: String,
    pub logs: String,
    pub runnables: String,
}

impl Default for WorkDirs {
    fn default() -> Self {
        Self {
            projects: "Projects".to_string(),
            builds: "Builds".to_string(),
            temp: "Temp".to_string(),
            output: "Output".to_string(),
            logs: "Logs".to_string(),
            runnables: "Runnables".to_string(),
        }
    }
}

impl WorkDirs {
    fn all(&self) -> [&str; 6] {
        [
            &self.projects,
            &self.builds,
            &self.temp,
            &self.output,
            &self.logs,
            &self.runnables,
        ]
    }
}

// ============================================================================
// KodeConfig
// ============================================================================

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct KodeConfig {
    /// Root of the persisted layout (projects, logs, runnables, web UI)
    pub root_dir: PathBuf,

    /// Working directory names
    pub dirs: WorkDirs,

    /// Static web UI directory; `<root>/wwwroot` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_root: Option<PathBuf>,

    /// Listener URL, e.g. `http://localhost:5000/`
    pub server_url: String,

    /// Port override for `server_url`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_port: Option<u16>,

    /// Interpreter for command strings
    pub shell: ShellConfig,
}

impl Default for KodeConfig {
    fn default() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_root(cwd.join("koderunner"))
    }
}

impl KodeConfig {
    /// Defaults rooted at `root_dir`
    pub fn with_root(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            dirs: WorkDirs::default(),
            html_root: None,
            server_url: DEFAULT_SERVER_URL.to_string(),
            server_port: None,
            shell: ShellConfig::default(),
        }
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// Load the full configuration.
    ///
    /// `root` wins over `KODERUNNER_ROOT`, which wins over `<cwd>/koderunner`.
    pub fn load(root: Option<PathBuf>) -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "Loaded .env");
        }

        let root = root
            .or_else(|| std::env::var_os("KODERUNNER_ROOT").map(PathBuf::from))
            .unwrap_or_else(|| Self::default().root_dir);

        let mut config = Self::load_file(&root)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Defaults merged with `<root>/koderunner.toml` when it exists
    pub fn load_file(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: KodeConfig = toml::from_str(&content)?;
            info!(path = %path.display(), "Loaded config file");
            config
        } else {
            Self::default()
        };
        // the file lives inside the root, so it cannot move it
        config.root_dir = root.to_path_buf();
        Ok(config)
    }

    /// Apply environment overrides through `get`
    pub fn apply_env<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = get("ServerURL").filter(|v| !v.trim().is_empty()) {
            self.server_url = url.trim().to_string();
        }
        if let Some(port) = get("ServerPort").and_then(|v| v.trim().parse::<u16>().ok()) {
            self.server_port = Some(port);
        }
        if let Some(html) = get("HTMLRoot").filter(|v| !v.trim().is_empty()) {
            self.html_root = Some(PathBuf::from(html.trim()));
        }
    }

    // ========================================================================
    // Paths
    // ========================================================================

    pub fn projects_dir(&self) -> PathBuf {
        self.root_dir.join(&self.dirs.projects)
    }

    /// `<root>/<projects>/<name>`
    pub fn project_dir(&self, name: &str) -> PathBuf {
        self.projects_dir().join(name)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root_dir.join(&self.dirs.logs)
    }

    pub fn runnables_dir(&self) -> PathBuf {
        self.root_dir.join(&self.dirs.runnables)
    }

    pub fn html_dir(&self) -> PathBuf {
        self.html_root
            .clone()
            .unwrap_or_else(|| self.root_dir.join("wwwroot"))
    }

    /// Create the root and every working directory if absent
    pub fn ensure_layout(&self) -> Result<()> {
        for dir in self.dirs.all() {
            let path = self.root_dir.join(dir);
            if !path.exists() {
                std::fs::create_dir_all(&path)?;
                debug!(path = %path.display(), "Created directory");
            }
        }
        Ok(())
    }

    // ========================================================================
    // Listener
    // ========================================================================

    /// Socket address derived from `server_url` and `server_port`
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let raw = self.server_url.trim();
        // `+` and `*` are listener wildcards, not URL hosts
        let normalized = raw
            .replacen("://+", "://0.0.0.0", 1)
            .replacen("://*", "://0.0.0.0", 1);

        let url = Url::parse(&normalized)
            .map_err(|e| Error::Config(format!("Invalid server URL {}: {}", raw, e)))?;
        let port = self
            .server_port
            .or_else(|| url.port_or_known_default())
            .ok_or_else(|| Error::Config(format!("No port in server URL: {}", raw)))?;

        let ip = match url.host() {
            Some(Host::Ipv4(ip)) => IpAddr::V4(ip),
            Some(Host::Ipv6(ip)) => IpAddr::V6(ip),
            Some(Host::Domain("localhost")) => IpAddr::V4(Ipv4Addr::LOCALHOST),
            Some(Host::Domain(name)) => {
                return (name, port)
                    .to_socket_addrs()?
                    .next()
                    .ok_or_else(|| Error::Config(format!("Cannot resolve host: {}", name)))
            }
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        Ok(SocketAddr::new(ip, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = KodeConfig::with_root("/srv/kode");
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.project_dir("demo"), PathBuf::from("/srv/kode/Projects/demo"));
        assert_eq!(config.runnables_dir(), PathBuf::from("/srv/kode/Runnables"));
        assert_eq!(config.html_dir(), PathBuf::from("/srv/kode/wwwroot"));
    }

    #[test]
    fn test_bind_addr() {
        let mut config = KodeConfig::with_root("/tmp");
        assert_eq!(config.bind_addr().unwrap(), "127.0.0.1:5000".parse().unwrap());

        config.server_url = "http://+:8080/".into();
        assert_eq!(config.bind_addr().unwrap(), "0.0.0.0:8080".parse().unwrap());

        config.server_port = Some(9000);
        assert_eq!(config.bind_addr().unwrap().port(), 9000);

        config.server_url = "http://localhost:notaport/".into();
        assert!(matches!(config.bind_addr(), Err(Error::Config(_))));
    }

    #[test]
    fn test_bind_addr_url_forms() {
        let mut config = KodeConfig::with_root("/tmp");

        config.server_url = "http://[::1]/".into();
        assert_eq!(config.bind_addr().unwrap(), "[::1]:80".parse().unwrap());

        config.server_url = "http://user@localhost:5000/".into();
        assert_eq!(config.bind_addr().unwrap(), "127.0.0.1:5000".parse().unwrap());

        config.server_url = "https://*/".into();
        assert_eq!(config.bind_addr().unwrap(), "0.0.0.0:443".parse().unwrap());

        config.server_url = "http://10.0.0.7:8081".into();
        assert_eq!(config.bind_addr().unwrap(), "10.0.0.7:8081".parse().unwrap());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("ServerURL", "http://0.0.0.0:7000/"),
            ("ServerPort", "7001"),
            ("HTMLRoot", "/var/www"),
        ]
        .into_iter()
        .collect();

        let mut config = KodeConfig::with_root("/tmp");
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.server_url, "http://0.0.0.0:7000/");
        assert_eq!(config.server_port, Some(7001));
        assert_eq!(config.html_dir(), PathBuf::from("/var/www"));
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = KodeConfig::with_root("/tmp");
        config.apply_env(|_| Some(String::new()));
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.server_port, None);
    }

    #[test]
    fn test_load_file_and_layout() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "server_url = \"http://localhost:6000/\"\n[dirs]\nprojects = \"Code\"\n",
        )
        .unwrap();

        let config = KodeConfig::load_file(dir.path()).unwrap();
        assert_eq!(config.root_dir, dir.path());
        assert_eq!(config.dirs.projects, "Code");
        assert_eq!(config.dirs.logs, "Logs");
        assert_eq!(config.bind_addr().unwrap().port(), 6000);

        config.ensure_layout().unwrap();
        assert!(dir.path().join("Code").is_dir());
        assert!(dir.path().join("Runnables").is_dir());
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "server_url = [").unwrap();
        assert!(matches!(KodeConfig::load_file(dir.path()), Err(Error::Config(_))));
    }
}
