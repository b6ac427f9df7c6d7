//! Configuration
//!
//! - `KodeConfig`: server address, working directory layout, shell
//! - `ShellConfig`: interpreter used to run command strings

mod kode;
mod shell;

pub use kode::{KodeConfig, WorkDirs, CONFIG_FILE, DEFAULT_SERVER_URL};
pub use shell::ShellConfig;
