use super::breakpoints::{BreakpointId, BreakpointSpec, BreakpointStore, LocationId, LocationState};
use super::commands::{AttachMode, CommandList, ScriptHandle};
use super::dispatcher::Dispatcher;
use super::registry::CommandRegistry;
use super::session::{InferiorEvent, InferiorSession, ProcessState};
use super::{Frame, StopContext};
use crate::config::DebuggerConfig;
use crate::error::{Error, Result};
use crate::script::{JsScriptHost, ScriptArgs, ScriptError, ScriptHost, SessionDict};
use crate::target::{resolve, ProgramImage, ResolvedSite};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;

/// The last reported stop of the inferior.
#[derive(Debug, Clone)]
pub struct StopInfo {
    pub thread_id: u32,
    pub frame: Frame,
    pub locations: Vec<LocationId>,
}

/// Owns the breakpoint store, the command registry, the target and the process.
pub struct DebugContext {
    config: DebuggerConfig,
    target: Option<Arc<ProgramImage>>,
    store: BreakpointStore,
    registry: Arc<CommandRegistry>,
    dispatcher: Dispatcher,
    process: Option<InferiorSession>,
    last_exit: Option<(u32, i32)>,
    last_stop: Option<StopInfo>,
    loaded_modules: Vec<String>,
    script_host: Box<dyn ScriptHost>,
    session: SessionDict,
    next_pid: u32,
}

impl DebugContext {
    pub fn new(config: DebuggerConfig) -> Self {
        Self::with_script_host(config, Box::new(JsScriptHost::new()))
    }

    pub fn with_script_host(config: DebuggerConfig, script_host: Box<dyn ScriptHost>) -> Self {
        let dispatcher = Dispatcher {
            policy: config.continue_policy,
            stop_on_error: config.stop_on_command_error,
        };
        Self {
            config,
            target: None,
            store: BreakpointStore::new(),
            registry: Arc::new(CommandRegistry::new()),
            dispatcher,
            process: None,
            last_exit: None,
            last_stop: None,
            loaded_modules: Vec::new(),
            script_host,
            session: SessionDict::new(),
            next_pid: 1,
        }
    }

    pub fn config(&self) -> &DebuggerConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher
    }

    pub fn store(&self) -> &BreakpointStore {
        &self.store
    }

    /// Shared handle on the registry, usable while the context is mutably borrowed.
    pub fn registry(&self) -> Arc<CommandRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn session(&self) -> &SessionDict {
        &self.session
    }

    pub fn target(&self) -> Option<&ProgramImage> {
        self.target.as_deref()
    }

    // ---- target -----------------------------------------------------------

    pub fn load_target(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let image = ProgramImage::load(path)?;
        self.set_target(image);
        Ok(())
    }

    /// Replace the target. Existing breakpoints are resolved against it.
    pub fn set_target(&mut self, image: ProgramImage) {
        self.kill_process();
        info!("Current executable set to '{}'", image.name);
        self.loaded_modules = image.preloaded().map(|m| m.name.clone()).collect();
        self.target = Some(Arc::new(image));

        for id in self.store.ids() {
            let Some(bp) = self.store.find(id) else { continue };
            let spec = bp.spec.clone();
            for module in self.loaded_modules.clone() {
                self.add_sites_in(id, &spec, &module);
            }
        }
    }

    fn resolve_in(&self, spec: &BreakpointSpec, module: &str) -> Result<Vec<ResolvedSite>> {
        let Some(image) = self.target.as_deref() else {
            return Ok(Vec::new());
        };
        let Some(module) = image.module(module) else {
            return Ok(Vec::new());
        };
        resolve(spec, module, image.default_file())
    }

    fn add_sites_in(&mut self, id: BreakpointId, spec: &BreakpointSpec, module: &str) {
        match self.resolve_in(spec, module) {
            Ok(sites) if !sites.is_empty() => {
                if let Err(e) = self.store.add_locations(id, sites) {
                    warn!("Breakpoint {}: {}", id, e);
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Breakpoint {}: {}", id, e),
        }
    }

    // ---- breakpoints ------------------------------------------------------

    /// Create a breakpoint and resolve it against every module known so far.
    ///
    /// A spec that cannot be resolved still yields a breakpoint with no
    /// locations, unless `strict` (or the `strict-breakpoints` setting) asks
    /// for `InvalidSpec` instead.
    pub fn create_breakpoint(&mut self, spec: BreakpointSpec, strict: bool) -> Result<BreakpointId> {
        let strict = strict || self.config.strict_breakpoints;
        let spec = match spec {
            BreakpointSpec::FileLine {
                file: None,
                line,
                exact,
            } => {
                let default = self.target().and_then(|t| t.default_file()).ok_or_else(|| {
                    Error::InvalidSpec("no file given and no default source file".to_string())
                })?;
                BreakpointSpec::FileLine {
                    file: Some(default.to_string()),
                    line,
                    exact,
                }
            }
            other => other,
        };

        let mut sites = Vec::new();
        let mut problem = None;
        for module in &self.loaded_modules {
            match self.resolve_in(&spec, module) {
                Ok(found) => sites.extend(found),
                Err(e) => {
                    problem = Some(e);
                    break;
                }
            }
        }
        if problem.is_none() && sites.is_empty() {
            problem = Some(Error::InvalidSpec(format!("{} matched no locations", spec)));
        }
        if let Some(e) = problem {
            if strict {
                return Err(e);
            }
            warn!("{} (breakpoint stays pending)", e);
        }

        let id = self.store.create(spec);
        self.store.add_locations(id, sites)?;
        if self.process_alive() {
            for module in self.loaded_modules.clone() {
                self.store.set_module_state(&module, LocationState::Resolved);
            }
        }
        self.sync_sites();
        Ok(id)
    }

    /// Create a breakpoint and attach `commands` to it in one step.
    pub fn create_breakpoint_with_commands(
        &mut self,
        spec: BreakpointSpec,
        commands: CommandList,
        strict: bool,
    ) -> Result<BreakpointId> {
        let id = self.create_breakpoint(spec, strict)?;
        if !commands.is_empty() {
            self.registry
                .attach(&self.store, &[id], &commands, AttachMode::Replace)?;
        }
        Ok(id)
    }

    /// Deleting a breakpoint drops its command list too.
    pub fn delete_breakpoint(&mut self, id: BreakpointId) -> Result<()> {
        self.store.delete(id)?;
        self.registry.remove_breakpoint(id);
        self.sync_sites();
        Ok(())
    }

    pub fn delete_all_breakpoints(&mut self) -> usize {
        let count = self.store.delete_all();
        self.registry.clear();
        self.sync_sites();
        count
    }

    // ---- commands ---------------------------------------------------------

    pub fn attach_commands(
        &mut self,
        ids: &[BreakpointId],
        list: &CommandList,
        mode: AttachMode,
    ) -> Result<()> {
        for entry in list.entries() {
            if let super::CommandEntry::Scripted(ScriptHandle::Function(name)) = entry {
                if !self.script_host.has_function(name) {
                    warn!("Script function '{}' is not defined yet", name);
                }
            }
        }
        self.registry.attach(&self.store, ids, list, mode)
    }

    pub fn command_list(&self, id: BreakpointId) -> Result<Option<Arc<CommandList>>> {
        self.registry.list(&self.store, id)
    }

    pub fn delete_commands(&mut self, id: BreakpointId) -> Result<bool> {
        self.registry.delete(&self.store, id)
    }

    pub fn run_script(
        &mut self,
        handle: &ScriptHandle,
        stop: &StopContext,
    ) -> std::result::Result<bool, ScriptError> {
        let args = ScriptArgs {
            frame: &stop.frame,
            bp_loc: &stop.location,
            session: &mut self.session,
        };
        match handle {
            ScriptHandle::Source(src) => self.script_host.eval(src, args),
            ScriptHandle::Function(name) => self.script_host.call(name, args),
        }
    }

    // ---- process ----------------------------------------------------------

    pub fn process(&self) -> Option<&InferiorSession> {
        self.process.as_ref()
    }

    pub fn process_alive(&self) -> bool {
        self.process.as_ref().is_some_and(InferiorSession::is_alive)
    }

    pub fn last_exit(&self) -> Option<(u32, i32)> {
        self.last_exit
    }

    pub fn last_stop(&self) -> Option<&StopInfo> {
        self.last_stop.as_ref()
    }

    pub fn launch(&mut self) -> Result<u32> {
        let image = self.target.clone().ok_or(Error::NoTarget)?;
        if self.process_alive() {
            if !self.config.auto_confirm {
                return Err(Error::Process(
                    "there is a running process, kill it first or enable auto-confirm".to_string(),
                ));
            }
            self.kill_process();
        }

        self.loaded_modules = image.preloaded().map(|m| m.name.clone()).collect();
        self.store.unresolve_all();
        for module in self.loaded_modules.clone() {
            self.store.set_module_state(&module, LocationState::Resolved);
        }

        let pid = self.next_pid;
        self.next_pid += 1;
        self.last_stop = None;
        self.process = Some(InferiorSession::launch(pid, image, self.store.site_addresses())?);
        Ok(pid)
    }

    pub fn kill_process(&mut self) -> bool {
        match self.process.take() {
            Some(mut process) => {
                let alive = process.is_alive();
                process.kill();
                if alive {
                    self.last_exit = Some((process.pid(), 9));
                }
                self.last_stop = None;
                alive
            }
            None => false,
        }
    }

    pub fn wait_event(&mut self) -> Result<InferiorEvent> {
        let timeout = self.config.stop_timeout();
        let process = self.process.as_mut().ok_or(Error::NoProcess)?;
        process.wait_event(timeout)
    }

    pub fn resume(&mut self) -> Result<()> {
        let process = self.process.as_mut().ok_or(Error::NoProcess)?;
        if process.state() != ProcessState::Stopped {
            return Err(Error::Process("process is not stopped".to_string()));
        }
        self.last_stop = None;
        process.resume()
    }

    /// A module was loaded in the live process: find new locations in it.
    pub fn module_loaded(&mut self, module: &str) {
        if !self.loaded_modules.iter().any(|m| m == module) {
            self.loaded_modules.push(module.to_string());
        }
        for id in self.store.ids() {
            let Some(bp) = self.store.find(id) else { continue };
            let spec = bp.spec.clone();
            self.add_sites_in(id, &spec, module);
        }
        self.store.set_module_state(module, LocationState::Resolved);
        self.sync_sites();
    }

    /// Count the hit on every location at the frame's address.
    pub fn record_stop(&mut self, thread_id: u32, frame: Frame) -> Vec<StopContext> {
        let ids = self.store.locations_at(frame.address);
        let mut stops = Vec::with_capacity(ids.len());
        for id in &ids {
            if self.store.record_hit(*id).is_err() {
                continue;
            }
            if let Some(location) = self.store.location(*id) {
                stops.push(StopContext {
                    thread_id,
                    frame: frame.clone(),
                    location: location.clone(),
                });
            }
        }
        self.last_stop = Some(StopInfo {
            thread_id,
            frame,
            locations: ids,
        });
        stops
    }

    pub fn process_exited(&mut self, status: i32) {
        if let Some(process) = self.process.take() {
            self.last_exit = Some((process.pid(), status));
        }
        self.last_stop = None;
    }

    fn sync_sites(&self) {
        if let Some(process) = &self.process {
            process.set_sites(self.store.site_addresses());
        }
    }
}

impl Drop for DebugContext {
    fn drop(&mut self) {
        self.kill_process();
    }
}
