use crate::debugger::{Frame, InferiorEvent, ProcessState, StopDisposition};
use crate::error::Result;
use log::debug;

/// Controller side of the stop loop.
pub trait StopHandler {
    fn next_event(&mut self) -> Result<InferiorEvent>;

    fn resume(&mut self) -> Result<()>;

    /// New code is available; resolve pending breakpoints against it.
    fn on_module_loaded(&mut self, module: &str) -> Result<()>;

    /// Count hits and run breakpoint commands for a trap.
    fn on_stop(&mut self, thread_id: u32, frame: Frame) -> Result<StopDisposition>;

    fn on_exit(&mut self, status: i32);
}

/// Let the inferior run until a stop is to be reported or it exits.
///
/// The inferior must already be running (just launched or just resumed).
pub fn run_to_stop<H: StopHandler + ?Sized>(handler: &mut H) -> Result<ProcessState> {
    loop {
        match handler.next_event()? {
            InferiorEvent::ModuleLoaded { module } => {
                debug!("Module loaded: {}", module);
                handler.on_module_loaded(&module)?;
                handler.resume()?;
            }
            InferiorEvent::Stopped { thread_id, frame } => {
                match handler.on_stop(thread_id, frame)? {
                    StopDisposition::Stop => return Ok(ProcessState::Stopped),
                    StopDisposition::Resume => handler.resume()?,
                }
            }
            InferiorEvent::Exited { status } => {
                handler.on_exit(status);
                return Ok(ProcessState::Exited(status));
            }
        }
    }
}
