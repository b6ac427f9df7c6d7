//! Shell configuration

use serde::{Deserialize, Serialize};

/// Interpreter that command strings are handed to (`<program> <arg> "<command>"`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Interpreter executable
    pub program: String,

    /// Flag that makes the interpreter run the next argument as a command
    pub arg: String,
}

impl ShellConfig {
    pub fn new(program: impl Into<String>, arg: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            arg: arg.into(),
        }
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        if cfg!(windows) {
            Self::new("cmd", "/C")
        } else {
            Self::new("sh", "-c")
        }
    }
}
