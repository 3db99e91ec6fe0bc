//! Controller-side handle on a running inferior.

use super::Frame;
use crate::error::{Error, Result};
use crate::executor::inferior::{self, InferiorCommand, SiteTable};
use crate::target::ProgramImage;
use log::{debug, info};
use std::collections::BTreeSet;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::JoinHandle;
use std::time::Duration;

/// Events the inferior reports while the controller waits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferiorEvent {
    Stopped { thread_id: u32, frame: Frame },
    ModuleLoaded { module: String },
    Exited { status: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Stopped,
    Exited(i32),
}

pub struct InferiorSession {
    pid: u32,
    state: ProcessState,
    sites: SiteTable,
    events: Receiver<InferiorEvent>,
    commands: Sender<InferiorCommand>,
    handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for InferiorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferiorSession")
            .field("pid", &self.pid)
            .field("state", &self.state)
            .finish()
    }
}

impl InferiorSession {
    /// Start the inferior with `sites` already armed.
    pub fn launch(pid: u32, image: Arc<ProgramImage>, sites: BTreeSet<u64>) -> Result<Self> {
        let sites: SiteTable = Arc::new(RwLock::new(sites));
        let (event_tx, event_rx) = channel();
        let (command_tx, command_rx) = channel();

        let handle = inferior::spawn(image, Arc::clone(&sites), event_tx, command_rx)?;
        info!("Process {} launched", pid);

        Ok(Self {
            pid,
            state: ProcessState::Running,
            sites,
            events: event_rx,
            commands: command_tx,
            handle: Some(handle),
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn is_alive(&self) -> bool {
        !matches!(self.state, ProcessState::Exited(_))
    }

    pub fn set_sites(&self, sites: BTreeSet<u64>) {
        *self.sites.write().unwrap_or_else(PoisonError::into_inner) = sites;
    }

    /// Block until the inferior reports something. `None` waits forever.
    pub fn wait_event(&mut self, timeout: Option<Duration>) -> Result<InferiorEvent> {
        let event = match timeout {
            Some(t) => self.events.recv_timeout(t).map_err(|e| match e {
                RecvTimeoutError::Timeout => {
                    Error::Process(format!("no stop event within {} ms", t.as_millis()))
                }
                RecvTimeoutError::Disconnected => {
                    Error::Process("inferior went away".to_string())
                }
            })?,
            None => self
                .events
                .recv()
                .map_err(|_| Error::Process("inferior went away".to_string()))?,
        };

        self.state = match &event {
            InferiorEvent::Exited { status } => {
                info!("Process {} exited with status = {}", self.pid, status);
                self.join();
                ProcessState::Exited(*status)
            }
            _ => ProcessState::Stopped,
        };
        Ok(event)
    }

    pub fn resume(&mut self) -> Result<()> {
        if self.state != ProcessState::Stopped {
            return Err(Error::Process(format!(
                "process {} is not stopped",
                self.pid
            )));
        }
        self.commands
            .send(InferiorCommand::Resume)
            .map_err(|_| Error::Process("inferior went away".to_string()))?;
        self.state = ProcessState::Running;
        Ok(())
    }

    pub fn kill(&mut self) {
        if self.is_alive() {
            debug!("Killing process {}", self.pid);
            let _ = self.commands.send(InferiorCommand::Kill);
            self.state = ProcessState::Exited(9);
        }
        self.join();
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for InferiorSession {
    fn drop(&mut self) {
        self.kill();
    }
}
