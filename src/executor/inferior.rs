//! The simulated debuggee. Replays a program image's trace on its own thread
//! and blocks at every trap site until the controller says to go on.

use crate::debugger::{Frame, InferiorEvent};
use crate::target::{ProgramImage, TraceStep};
use log::{debug, warn};
use std::collections::BTreeSet;
use std::io;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};

/// Addresses the inferior traps on; shared with the controller.
pub type SiteTable = Arc<RwLock<BTreeSet<u64>>>;

pub const MAIN_THREAD_ID: u32 = 1;

/// Messages the controller sends to a stopped inferior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferiorCommand {
    Resume,
    Kill,
}

struct Inferior {
    image: Arc<ProgramImage>,
    sites: SiteTable,
    events: Sender<InferiorEvent>,
    commands: Receiver<InferiorCommand>,
    loaded: Vec<String>,
}

pub fn spawn(
    image: Arc<ProgramImage>,
    sites: SiteTable,
    events: Sender<InferiorEvent>,
    commands: Receiver<InferiorCommand>,
) -> io::Result<JoinHandle<()>> {
    let loaded = image.preloaded().map(|m| m.name.clone()).collect();
    let inferior = Inferior {
        image,
        sites,
        events,
        commands,
        loaded,
    };
    thread::Builder::new()
        .name("inferior".to_string())
        .spawn(move || inferior.run())
}

impl Inferior {
    fn run(mut self) {
        debug!("Inferior started ({} trace steps)", self.image.trace.len());
        let image = Arc::clone(&self.image);

        for step in &image.trace {
            match step {
                TraceStep::Exec {
                    function,
                    line,
                    locals,
                } => {
                    let Some((module, func)) = image.find_function(function, &self.loaded) else {
                        warn!("Trace executes unknown function '{}', skipping", function);
                        continue;
                    };
                    let Some(address) = func.line_address(*line) else {
                        warn!("Line {} is outside '{}', skipping", line, function);
                        continue;
                    };
                    if !self.is_site(address) {
                        continue;
                    }
                    let frame = Frame {
                        index: 0,
                        module: module.name.clone(),
                        function: func.name.clone(),
                        file: func.file.clone(),
                        line: *line,
                        address,
                        locals: locals.clone(),
                    };
                    let stopped = InferiorEvent::Stopped {
                        thread_id: MAIN_THREAD_ID,
                        frame,
                    };
                    if !self.report(stopped) {
                        return;
                    }
                }
                TraceStep::Load { module } => {
                    self.loaded.push(module.clone());
                    let loaded = InferiorEvent::ModuleLoaded {
                        module: module.clone(),
                    };
                    if !self.report(loaded) {
                        return;
                    }
                }
                TraceStep::Exit { status } => {
                    self.exit(*status);
                    return;
                }
            }
        }
        self.exit(0);
    }

    fn is_site(&self, address: u64) -> bool {
        self.sites
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&address)
    }

    /// Send `event` and wait for the verdict. `false` means stop running.
    fn report(&self, event: InferiorEvent) -> bool {
        if self.events.send(event).is_err() {
            return false;
        }
        match self.commands.recv() {
            Ok(InferiorCommand::Resume) => true,
            Ok(InferiorCommand::Kill) | Err(_) => {
                debug!("Inferior killed");
                false
            }
        }
    }

    fn exit(&self, status: i32) {
        debug!("Inferior exiting with status {}", status);
        let _ = self.events.send(InferiorEvent::Exited { status });
    }
}
