//! # koderunner-foundation
//!
//! Foundation layer for KodeRunner:
//! - Error: the crate-wide error taxonomy
//! - Config: server address, working directory layout, shell
//! - Markup: terminal escape codes to client markup
//!
//! ## Layout
//!
//! ```text
//! <root>/
//! ├── Projects/<project>/<file>   source written by the /code endpoint
//! ├── Builds/ Temp/ Output/
//! ├── Logs/<date>.log             daily server log
//! ├── Runnables/<pkg>/runnable.json
//! └── wwwroot/                    static web UI
//! ```

pub mod config;
pub mod error;
pub mod markup;

pub use config::{KodeConfig, ShellConfig, WorkDirs, CONFIG_FILE, DEFAULT_SERVER_URL};
pub use error::{Error, Result};
