use crate::debugger::BreakpointId;
use crate::script::ScriptError;
use std::io;

/// Result type for debugger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the breakpoint store, command registry and front end.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Operation referenced a breakpoint that does not exist
    #[error("'{0}' is not a currently valid breakpoint ID.")]
    NotFound(BreakpointId),

    /// Breakpoint specification could not be parsed or resolved
    #[error("invalid breakpoint specification: {0}")]
    InvalidSpec(String),

    /// A scripted command entry raised while running
    #[error("breakpoint {breakpoint} command #{index} failed: {message}")]
    ScriptFault {
        breakpoint: BreakpointId,
        index: usize,
        message: String,
    },

    /// Script run from the front end, outside any command list
    #[error("script error: {0}")]
    Script(#[from] ScriptError),

    /// Malformed command line
    #[error("{0}")]
    Usage(String),

    /// No target image has been loaded
    #[error("invalid target, create a target using the 'target create' command")]
    NoTarget,

    /// Command needs a live process
    #[error("invalid process")]
    NoProcess,

    /// Process control failure
    #[error("process error: {0}")]
    Process(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn usage(msg: impl Into<String>) -> Self {
        Error::Usage(msg.into())
    }
}
