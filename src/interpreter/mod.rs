//! Native command interpreter.
//!
//! Runs front-end command lines against a [`DebugContext`], drives the
//! inferior through [`run_to_stop`], and executes native entries of
//! breakpoint command lists while the inferior is stopped.

use crate::config::DebuggerConfig;
use crate::debugger::{
    base_name, AttachMode, BreakpointId, CommandEntry, CommandList, DebugContext, EntryExecutor,
    Frame, InferiorEvent, LocationId, NativeOutcome, ProcessState, ScriptHandle, StopContext,
    StopDisposition,
};
use crate::error::{Error, Result};
use crate::executor::{run_to_stop, StopHandler};
use crate::parser::{self, Command, CommandBody, Dialect};
use log::{debug, info};
use std::fs;
use std::path::Path;

const HELP: &str = "\
Debugger commands:
  target create <image.json>
  breakpoint set (-l <line> [-f <file>] | -n <name> | -r <regex> | -p <regex>) [-f <file>]... [-C <cmd>]... [--exact] [--strict]
  breakpoint list [-f]
  breakpoint delete [<id>...]
  breakpoint command add [-s command|script] [-o <text> | -F <function>] [--append] [-e <bool>] <id>...
  breakpoint command list <id>...
  breakpoint command delete <id>...
  run | process launch
  continue | process continue
  process status | process kill
  bt | thread backtrace | thread list
  frame variable [<name>...]
  script <source>
  help | quit
";

/// Body lines being collected for `breakpoint command add` until `DONE`.
#[derive(Debug)]
struct PendingBody {
    ids: Vec<BreakpointId>,
    dialect: Dialect,
    mode: AttachMode,
    stop_on_error: bool,
    lines: Vec<String>,
}

pub struct Interpreter {
    ctx: DebugContext,
    pending: Option<PendingBody>,
    /// Set while a breakpoint's command list is running.
    dispatching: bool,
    stop_output: String,
    quit: bool,
}

impl Interpreter {
    pub fn new(config: DebuggerConfig) -> Self {
        Self::with_context(DebugContext::new(config))
    }

    pub fn with_context(ctx: DebugContext) -> Self {
        Self {
            ctx,
            pending: None,
            dispatching: false,
            stop_output: String::new(),
            quit: false,
        }
    }

    pub fn context(&self) -> &DebugContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut DebugContext {
        &mut self.ctx
    }

    /// `quit` was entered.
    pub fn is_quit(&self) -> bool {
        self.quit
    }

    /// A multi-line command body is being read.
    pub fn awaiting_body(&self) -> bool {
        self.pending.is_some()
    }

    /// Run one line and render errors the way the prompt shows them.
    pub fn feed_line(&mut self, line: &str) -> String {
        match self.execute(line) {
            Ok(out) => out,
            Err(e) => format!("error: {}\n", e),
        }
    }

    /// Run every command of a command file.
    pub fn source_file(&mut self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        info!("Reading commands from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let physical: Vec<&str> = contents.lines().collect();
        Ok(self.run_lines(&physical))
    }

    /// Run already-split lines, joining continuations and skipping comments.
    pub fn run_lines(&mut self, physical: &[&str]) -> String {
        let mut out = String::new();
        for line in parser::preprocess_lines(physical) {
            if self.quit {
                break;
            }
            debug!("line {}: {}", line.phys_start + 1, line.text);
            out.push_str(&self.feed_line(&line.text));
        }
        out
    }

    pub fn execute(&mut self, line: &str) -> Result<String> {
        if self.pending.is_some() {
            return self.collect_body_line(line);
        }
        if parser::is_comment(line) {
            return Ok(String::new());
        }
        let command = parser::parse_command(line)?;
        self.run_command(command)
    }

    fn run_command(&mut self, command: Command) -> Result<String> {
        match command {
            Command::TargetCreate { path } => {
                self.ctx.load_target(&path)?;
                Ok(format!("Current executable set to '{}'.\n", path))
            }
            Command::BreakpointSet {
                spec,
                commands,
                strict,
            } => {
                let list = CommandList::from_entries(
                    commands.into_iter().map(CommandEntry::Native).collect(),
                );
                let id = self.ctx.create_breakpoint_with_commands(spec, list, strict)?;
                Ok(self.describe_new_breakpoint(id))
            }
            Command::BreakpointList { full } => Ok(self.list_breakpoints(full)),
            Command::BreakpointDelete { ids } => self.delete_breakpoints(&ids),
            Command::CommandAdd {
                ids,
                dialect,
                body,
                mode,
                stop_on_error,
            } => self.add_commands(ids, dialect, body, mode, stop_on_error),
            Command::CommandList { ids } => self.list_commands(&ids),
            Command::CommandDelete { ids } => {
                if ids.is_empty() {
                    return Err(Error::usage("'breakpoint command delete' needs breakpoint ids"));
                }
                for id in &ids {
                    if !self.ctx.store().contains(*id) {
                        return Err(Error::NotFound(*id));
                    }
                }
                for id in ids {
                    self.ctx.delete_commands(id)?;
                }
                Ok(String::new())
            }
            Command::Run => self.run_process(),
            Command::Continue => self.continue_process(),
            Command::ProcessStatus => self.process_status(),
            Command::ProcessKill => {
                let pid = self.ctx.process().map(|p| p.pid()).ok_or(Error::NoProcess)?;
                if !self.ctx.kill_process() {
                    return Err(Error::NoProcess);
                }
                Ok(format!("Process {} exited with status = 9\n", pid))
            }
            Command::Backtrace => {
                let (thread_id, frame, locations) = self.current_stop()?;
                Ok(format!(
                    "* thread #{}, stop reason = {}\n  * {}\n",
                    thread_id,
                    stop_reason(&locations),
                    frame
                ))
            }
            Command::ThreadList => {
                let (thread_id, frame, locations) = self.current_stop()?;
                let pid = self.ctx.process().map(|p| p.pid()).ok_or(Error::NoProcess)?;
                Ok(format!(
                    "Process {} stopped\n* thread #{}: tid = {}, {}, stop reason = {}\n",
                    pid,
                    thread_id,
                    thread_id,
                    frame_summary(&frame),
                    stop_reason(&locations)
                ))
            }
            Command::FrameVariable { names } => {
                let (_, frame, _) = self.current_stop()?;
                frame_variables(&frame, &names)
            }
            Command::Script { source } => {
                let stop = self.current_stop_context()?;
                self.ctx.run_script(&ScriptHandle::Source(source), &stop)?;
                Ok(String::new())
            }
            Command::Help => Ok(HELP.to_string()),
            Command::Quit => {
                self.ctx.kill_process();
                self.quit = true;
                Ok(String::new())
            }
        }
    }

    // ---- breakpoints ------------------------------------------------------

    fn describe_new_breakpoint(&self, id: BreakpointId) -> String {
        let Some(bp) = self.ctx.store().find(id) else {
            return String::new();
        };
        match bp.locations() {
            [] => format!(
                "Breakpoint {}: no locations (pending).\nWARNING:  Unable to resolve breakpoint to any actual locations.\n",
                id
            ),
            [loc] => format!(
                "Breakpoint {}: where = {}`{} + {} at {}:{}, address = {:#018x}\n",
                id,
                loc.module,
                loc.function,
                loc.offset,
                base_name(&loc.file),
                loc.line,
                loc.address
            ),
            locs => format!("Breakpoint {}: {} locations.\n", id, locs.len()),
        }
    }

    fn list_breakpoints(&self, full: bool) -> String {
        let store = self.ctx.store();
        if store.is_empty() {
            return "No breakpoints currently set.\n".to_string();
        }
        let mut out = String::from("Current breakpoints:\n");
        for bp in store.iter() {
            out.push_str(&format!(
                "{}: {}, locations = {}",
                bp.id,
                bp.spec,
                bp.locations().len()
            ));
            let resolved = store.resolved_locations(bp.id).map_or(0, |l| l.len());
            if resolved > 0 {
                out.push_str(&format!(", resolved = {}", resolved));
            }
            out.push_str(&format!(", hit count = {}\n", bp.hit_count()));
            for loc in bp.locations() {
                out.push_str(&format!("  {}\n", loc));
            }
            if full {
                if let Ok(Some(list)) = self.ctx.command_list(bp.id) {
                    out.push_str(&list.render());
                }
            }
            out.push('\n');
        }
        out
    }

    fn delete_breakpoints(&mut self, ids: &[BreakpointId]) -> Result<String> {
        if ids.is_empty() {
            let count = self.ctx.delete_all_breakpoints();
            return Ok(if count == 0 {
                "No breakpoints exist to be deleted.\n".to_string()
            } else {
                format!("All breakpoints removed. ({} breakpoints)\n", count)
            });
        }
        // Nothing is deleted unless every id is valid.
        for id in ids {
            if !self.ctx.store().contains(*id) {
                return Err(Error::NotFound(*id));
            }
        }
        for id in ids {
            self.ctx.delete_breakpoint(*id)?;
        }
        Ok(format!(
            "{} breakpoints deleted; 0 breakpoint locations disabled.\n",
            ids.len()
        ))
    }

    // ---- breakpoint commands ----------------------------------------------

    fn add_commands(
        &mut self,
        mut ids: Vec<BreakpointId>,
        dialect: Dialect,
        body: CommandBody,
        mode: AttachMode,
        stop_on_error: bool,
    ) -> Result<String> {
        if ids.is_empty() {
            // Default to the most recently created breakpoint.
            let last = self.ctx.store().ids().last().copied().ok_or_else(|| {
                Error::usage("No breakpoints exist to have commands added")
            })?;
            ids.push(last);
        }
        for id in &ids {
            if !self.ctx.store().contains(*id) {
                return Err(Error::NotFound(*id));
            }
        }

        let entry = match body {
            CommandBody::OneLiner(text) => match dialect {
                Dialect::Command => CommandEntry::native(text),
                Dialect::Script => CommandEntry::one_liner(text),
            },
            CommandBody::Function(name) => CommandEntry::function(name),
            CommandBody::Pending => {
                if self.dispatching {
                    return Err(Error::usage(
                        "multi-line command bodies cannot be entered from a breakpoint command",
                    ));
                }
                self.pending = Some(PendingBody {
                    ids,
                    dialect,
                    mode,
                    stop_on_error,
                    lines: Vec::new(),
                });
                return Ok(match dialect {
                    Dialect::Command => {
                        "Enter your debugger command(s).  Type 'DONE' to end.\n".to_string()
                    }
                    Dialect::Script => {
                        "Enter your script command(s).  Type 'DONE' to end.\n".to_string()
                    }
                });
            }
        };

        let list = CommandList::from_entries(vec![entry]).with_stop_on_error(stop_on_error);
        self.ctx.attach_commands(&ids, &list, mode)?;
        Ok(String::new())
    }

    fn collect_body_line(&mut self, line: &str) -> Result<String> {
        if line.trim() != "DONE" {
            if let Some(pending) = self.pending.as_mut() {
                pending.lines.push(line.trim().to_string());
            }
            return Ok(String::new());
        }
        let Some(pending) = self.pending.take() else {
            return Ok(String::new());
        };

        let entries = match pending.dialect {
            Dialect::Command => pending
                .lines
                .into_iter()
                .filter(|l| !parser::is_comment(l))
                .map(CommandEntry::Native)
                .collect(),
            Dialect::Script => {
                let source = pending.lines.join("\n");
                if source.trim().is_empty() {
                    Vec::new()
                } else {
                    vec![CommandEntry::one_liner(source)]
                }
            }
        };
        let list = CommandList::from_entries(entries).with_stop_on_error(pending.stop_on_error);
        self.ctx.attach_commands(&pending.ids, &list, pending.mode)?;
        Ok(String::new())
    }

    fn list_commands(&self, ids: &[BreakpointId]) -> Result<String> {
        if ids.is_empty() {
            return Err(Error::usage("'breakpoint command list' needs breakpoint ids"));
        }
        let mut out = String::new();
        for id in ids {
            match self.ctx.command_list(*id)? {
                Some(list) => {
                    out.push_str(&format!("Breakpoint {}:\n", id));
                    out.push_str(&list.render());
                }
                None => out.push_str(&format!(
                    "Breakpoint {} does not have an associated command.\n",
                    id
                )),
            }
        }
        Ok(out)
    }

    // ---- process ----------------------------------------------------------

    fn run_process(&mut self) -> Result<String> {
        let pid = self.ctx.launch()?;
        let out = format!("Process {} launched\n", pid);
        self.run_until_stop(out)
    }

    fn continue_process(&mut self) -> Result<String> {
        let pid = self.ctx.process().map(|p| p.pid()).ok_or(Error::NoProcess)?;
        self.ctx.resume()?;
        let out = format!("Process {} resuming\n", pid);
        self.run_until_stop(out)
    }

    fn run_until_stop(&mut self, mut out: String) -> Result<String> {
        self.stop_output.clear();
        let state = run_to_stop(self);
        out.push_str(&std::mem::take(&mut self.stop_output));

        match state? {
            ProcessState::Stopped => out.push_str(&self.describe_stop()),
            ProcessState::Exited(status) => {
                let pid = self.ctx.last_exit().map(|(pid, _)| pid).unwrap_or_default();
                out.push_str(&format!("Process {} exited with status = {}\n", pid, status));
            }
            ProcessState::Running => {}
        }
        Ok(out)
    }

    fn process_status(&self) -> Result<String> {
        if let Some(process) = self.ctx.process() {
            if process.state() == ProcessState::Stopped {
                return Ok(self.describe_stop());
            }
            return Ok(format!("Process {} is running\n", process.pid()));
        }
        match self.ctx.last_exit() {
            Some((pid, status)) => Ok(format!("Process {} exited with status = {}\n", pid, status)),
            None => Err(Error::NoProcess),
        }
    }

    fn describe_stop(&self) -> String {
        let (Some(process), Some(stop)) = (self.ctx.process(), self.ctx.last_stop()) else {
            return String::new();
        };
        format!(
            "Process {} stopped\n* thread #{}, stop reason = {}\n    {}\n",
            process.pid(),
            stop.thread_id,
            stop_reason(&stop.locations),
            stop.frame
        )
    }

    fn current_stop(&self) -> Result<(u32, Frame, Vec<LocationId>)> {
        if !self.ctx.process_alive() {
            return Err(Error::NoProcess);
        }
        let stop = self
            .ctx
            .last_stop()
            .ok_or_else(|| Error::Process("process is not stopped".to_string()))?;
        Ok((stop.thread_id, stop.frame.clone(), stop.locations.clone()))
    }

    fn current_stop_context(&self) -> Result<StopContext> {
        let (thread_id, frame, locations) = self.current_stop()?;
        let location = locations
            .iter()
            .find_map(|id| self.ctx.store().location(*id))
            .cloned()
            .ok_or_else(|| {
                Error::Process("no breakpoint location for the current stop".to_string())
            })?;
        Ok(StopContext {
            thread_id,
            frame,
            location,
        })
    }
}

fn stop_reason(locations: &[LocationId]) -> String {
    let ids: Vec<String> = locations.iter().map(LocationId::to_string).collect();
    format!("breakpoint {}", ids.join(" "))
}

fn frame_summary(frame: &Frame) -> String {
    format!(
        "{:#018x} {}`{} at {}:{}",
        frame.address,
        frame.module,
        frame.function,
        base_name(&frame.file),
        frame.line
    )
}

fn frame_variables(frame: &Frame, names: &[String]) -> Result<String> {
    let mut out = String::new();
    if names.is_empty() {
        for (name, value) in &frame.locals {
            out.push_str(&format!("{} = {}\n", name, value));
        }
        return Ok(out);
    }
    for name in names {
        let value = frame.locals.get(name).ok_or_else(|| {
            Error::usage(format!("no variable named '{}' found in this frame", name))
        })?;
        out.push_str(&format!("{} = {}\n", name, value));
    }
    Ok(out)
}

impl EntryExecutor for Interpreter {
    fn run_native(&mut self, text: &str, _stop: &StopContext) -> NativeOutcome {
        let command = match parser::parse_command(text) {
            Ok(command) => command,
            Err(e) => return NativeOutcome::failed(format!("error: {}\n", e)),
        };
        match command {
            Command::Continue => {
                let pid = self.ctx.process().map(|p| p.pid()).unwrap_or_default();
                NativeOutcome::resume(format!("Process {} resuming\n", pid))
            }
            Command::Run | Command::ProcessKill | Command::TargetCreate { .. } | Command::Quit => {
                NativeOutcome::failed(format!(
                    "error: '{}' is not allowed while running breakpoint commands\n",
                    text
                ))
            }
            other => match self.run_command(other) {
                Ok(out) => NativeOutcome::ok(out),
                Err(e) => NativeOutcome::failed(format!("error: {}\n", e)),
            },
        }
    }

    fn run_script(
        &mut self,
        handle: &ScriptHandle,
        stop: &StopContext,
    ) -> std::result::Result<bool, String> {
        self.ctx.run_script(handle, stop).map_err(|e| e.to_string())
    }
}

impl StopHandler for Interpreter {
    fn next_event(&mut self) -> Result<InferiorEvent> {
        self.ctx.wait_event()
    }

    fn resume(&mut self) -> Result<()> {
        self.ctx.resume()
    }

    fn on_module_loaded(&mut self, module: &str) -> Result<()> {
        self.ctx.module_loaded(module);
        Ok(())
    }

    /// Every breakpoint at the address runs its list, in id order. The
    /// process goes on only if every one of them asks to continue.
    fn on_stop(&mut self, thread_id: u32, frame: Frame) -> Result<StopDisposition> {
        let stops = self.ctx.record_stop(thread_id, frame);
        if stops.is_empty() {
            debug!("Trap with no live breakpoint location, resuming");
            return Ok(StopDisposition::Resume);
        }

        let registry = self.ctx.registry();
        let dispatcher = self.ctx.dispatcher();
        let mut disposition = StopDisposition::Resume;

        self.dispatching = true;
        for stop in &stops {
            let report = dispatcher.dispatch(&registry, stop, self);
            self.stop_output.push_str(&report.output);
            if let Some(fault) = &report.fault {
                self.stop_output.push_str(&format!("error: {}\n", fault));
            }
            if report.disposition() == StopDisposition::Stop {
                disposition = StopDisposition::Stop;
            }
        }
        self.dispatching = false;

        Ok(disposition)
    }

    fn on_exit(&mut self, status: i32) {
        self.ctx.process_exited(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_without_target() {
        let mut interp = Interpreter::new(DebuggerConfig::default());
        assert!(interp.feed_line("run").starts_with("error: invalid target"));
        assert_eq!(interp.feed_line("breakpoint list"), "No breakpoints currently set.\n");
        assert_eq!(
            interp.feed_line("breakpoint delete"),
            "No breakpoints exist to be deleted.\n"
        );
        assert_eq!(
            interp.feed_line("breakpoint command list 7"),
            "error: '7' is not a currently valid breakpoint ID.\n"
        );
    }

    #[test]
    fn test_pending_body_collects_until_done() {
        let mut interp = Interpreter::new(DebuggerConfig::default());
        interp
            .context_mut()
            .create_breakpoint(crate::debugger::BreakpointSpec::Symbol { name: "main".into() }, false)
            .unwrap();

        let prompt = interp.feed_line("breakpoint command add 1");
        assert!(prompt.starts_with("Enter your debugger command(s)."));
        assert!(interp.awaiting_body());
        interp.feed_line("bt");
        interp.feed_line("thread list");
        interp.feed_line("DONE");
        assert!(!interp.awaiting_body());

        let list = interp.context().command_list(BreakpointId(1)).unwrap().unwrap();
        assert_eq!(list.native_commands(), vec!["bt", "thread list"]);
    }

    #[test]
    fn test_quit() {
        let mut interp = Interpreter::new(DebuggerConfig::default());
        interp.feed_line("quit");
        assert!(interp.is_quit());
    }
}
