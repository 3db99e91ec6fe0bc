mod breakpoints;
mod commands;
mod context;
mod dispatcher;
mod registry;
mod session;
mod stepping;

pub use breakpoints::{
    Breakpoint, BreakpointId, BreakpointLocation, BreakpointSpec, BreakpointStore, LocationId,
    LocationState,
};
pub(crate) use breakpoints::base_name;
pub use commands::{AttachMode, CommandEntry, CommandList, ScriptHandle};
pub use context::DebugContext;
pub use dispatcher::{DispatchReport, Dispatcher, EntryExecutor, NativeOutcome};
pub use registry::CommandRegistry;
pub use session::{InferiorEvent, InferiorSession, ProcessState};
pub use stepping::{ContinuePolicy, StopDisposition};

use std::collections::BTreeMap;
use std::fmt;

/// A stack frame of the stopped inferior thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub index: u32,
    pub module: String,
    pub function: String,
    pub file: String,
    pub line: u32,
    pub address: u64,
    pub locals: BTreeMap<String, String>,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frame #{}: {:#018x} {}`{} at {}:{}",
            self.index,
            self.address,
            self.module,
            self.function,
            base_name(&self.file),
            self.line
        )
    }
}

/// Everything a command entry may look at while the inferior is stopped.
#[derive(Debug, Clone)]
pub struct StopContext {
    pub thread_id: u32,
    pub frame: Frame,
    /// Location that triggered this dispatch, hit count already bumped.
    pub location: BreakpointLocation,
}
