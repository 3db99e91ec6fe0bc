//! Scripting host for scripted breakpoint commands.
//!
//! Scripted entries receive the stopped frame, the breakpoint location that
//! was hit, and the session dictionary. They answer whether the debugger
//! should stay stopped.

mod engine;
mod session;

use crate::debugger::{BreakpointLocation, Frame};

pub use engine::{JsScriptHost, ScriptFn};
pub use session::SessionDict;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("no script function named '{0}'")]
    UnknownFunction(String),

    #[error("{0}")]
    Raised(String),
}

/// Arguments every scripted entry is invoked with.
pub struct ScriptArgs<'a> {
    pub frame: &'a Frame,
    pub bp_loc: &'a BreakpointLocation,
    pub session: &'a mut SessionDict,
}

pub trait ScriptHost: Send {
    /// Run inline source. `Ok(false)` asks the debugger not to stop.
    fn eval(&mut self, source: &str, args: ScriptArgs<'_>) -> Result<bool, ScriptError>;

    /// Call a registered function by name.
    fn call(&mut self, function: &str, args: ScriptArgs<'_>) -> Result<bool, ScriptError>;

    fn has_function(&self, name: &str) -> bool;
}
