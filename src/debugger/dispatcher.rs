//! Runs a breakpoint's command list when one of its locations is hit.

use super::breakpoints::BreakpointId;
use super::commands::{CommandEntry, ScriptHandle};
use super::registry::CommandRegistry;
use super::stepping::{ContinuePolicy, StopDisposition};
use super::StopContext;
use crate::error::Error;
use log::{debug, error, warn};

/// Result of running one native command entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeOutcome {
    pub output: String,
    pub succeeded: bool,
    /// The command asked the process to continue.
    pub resume: bool,
}

impl NativeOutcome {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            succeeded: true,
            resume: false,
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            succeeded: false,
            resume: false,
        }
    }

    pub fn resume(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            succeeded: true,
            resume: true,
        }
    }
}

/// Runs individual entries on behalf of the dispatcher.
pub trait EntryExecutor {
    fn run_native(&mut self, text: &str, stop: &StopContext) -> NativeOutcome;

    /// `Ok(false)` asks for the stop to be suppressed; `Err` is a script fault.
    fn run_script(&mut self, handle: &ScriptHandle, stop: &StopContext) -> Result<bool, String>;
}

#[derive(Debug)]
pub struct DispatchReport {
    pub breakpoint: BreakpointId,
    /// Entries that ran to completion, in order.
    pub executed: Vec<usize>,
    pub output: String,
    pub resume_requested: bool,
    /// A scripted entry returned false.
    pub auto_continue: bool,
    /// A native entry failed and the list was cut short.
    pub aborted: bool,
    pub fault: Option<Error>,
}

impl DispatchReport {
    fn new(breakpoint: BreakpointId) -> Self {
        Self {
            breakpoint,
            executed: Vec::new(),
            output: String::new(),
            resume_requested: false,
            auto_continue: false,
            aborted: false,
            fault: None,
        }
    }

    pub fn disposition(&self) -> StopDisposition {
        if self.resume_requested || self.auto_continue {
            StopDisposition::Resume
        } else {
            StopDisposition::Stop
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Dispatcher {
    pub policy: ContinuePolicy,
    /// Applies to every list, in addition to each list's own flag.
    pub stop_on_error: bool,
}

impl Dispatcher {
    pub fn new(policy: ContinuePolicy) -> Self {
        Self {
            policy,
            stop_on_error: false,
        }
    }

    pub fn dispatch<E: EntryExecutor + ?Sized>(
        &self,
        registry: &CommandRegistry,
        stop: &StopContext,
        exec: &mut E,
    ) -> DispatchReport {
        let bp = stop.location.id.breakpoint;
        let mut report = DispatchReport::new(bp);

        let Some(list) = registry.snapshot(bp) else {
            return report;
        };
        debug!(
            "Dispatching {} command(s) for location {}",
            list.len(),
            stop.location.id
        );

        for (index, entry) in list.entries().iter().enumerate() {
            match entry {
                CommandEntry::Native(text) => {
                    let outcome = exec.run_native(text, stop);
                    report.output.push_str(&outcome.output);
                    if outcome.resume {
                        report.resume_requested = true;
                    }
                    if !outcome.succeeded {
                        if list.stop_on_error || self.stop_on_error {
                            warn!(
                                "Breakpoint {} command #{} failed, skipping the rest",
                                bp, index
                            );
                            report.aborted = true;
                            break;
                        }
                    } else {
                        report.executed.push(index);
                    }
                    if outcome.resume && self.policy == ContinuePolicy::Immediate {
                        break;
                    }
                }
                CommandEntry::Scripted(handle) => match exec.run_script(handle, stop) {
                    Ok(should_stop) => {
                        report.executed.push(index);
                        if !should_stop {
                            report.auto_continue = true;
                        }
                    }
                    Err(message) => {
                        error!(
                            "Breakpoint {} command #{} raised: {}",
                            bp, index, message
                        );
                        report.fault = Some(Error::ScriptFault {
                            breakpoint: bp,
                            index,
                            message,
                        });
                        break;
                    }
                },
            }
        }
        report
    }
}
