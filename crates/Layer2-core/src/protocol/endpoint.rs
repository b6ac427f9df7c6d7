//! Endpoints

use serde::Serialize;

/// Channel purpose, fixed by the path the client connected to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Endpoint {
    /// Source submission
    Code,

    /// Build request ("project management service")
    Pms,

    /// Interactive input to running programs
    TermInput,

    /// Kill every running program
    Stop,
}

impl Endpoint {
    pub const ALL: [Endpoint; 4] = [
        Endpoint::Code,
        Endpoint::Pms,
        Endpoint::TermInput,
        Endpoint::Stop,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Code => "/code",
            Endpoint::Pms => "/PMS",
            Endpoint::TermInput => "/terminput",
            Endpoint::Stop => "/stop",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.path() == path)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}
