use crate::debugger::{AttachMode, BreakpointId, BreakpointSpec};

/// One logical line of a command file, after continuation joining.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub text: String,
    pub phys_start: usize,
    pub phys_end: usize,
}

/// Language of the entries added by `breakpoint command add`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Command,
    Script,
}

/// Body source for `breakpoint command add`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandBody {
    OneLiner(String),
    Function(String),
    /// Lines follow until `DONE`.
    Pending,
}

/// A parsed front-end command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    TargetCreate {
        path: String,
    },
    BreakpointSet {
        spec: BreakpointSpec,
        commands: Vec<String>,
        strict: bool,
    },
    BreakpointList {
        full: bool,
    },
    /// No ids deletes everything.
    BreakpointDelete {
        ids: Vec<BreakpointId>,
    },
    CommandAdd {
        ids: Vec<BreakpointId>,
        dialect: Dialect,
        body: CommandBody,
        mode: AttachMode,
        stop_on_error: bool,
    },
    CommandList {
        ids: Vec<BreakpointId>,
    },
    CommandDelete {
        ids: Vec<BreakpointId>,
    },
    Run,
    Continue,
    ProcessStatus,
    ProcessKill,
    Backtrace,
    ThreadList,
    FrameVariable {
        names: Vec<String>,
    },
    Script {
        source: String,
    },
    Help,
    Quit,
}
