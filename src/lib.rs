//! Breakpoint command lists for a small source-level debugger.
//!
//! Breakpoints live in a [`debugger::BreakpointStore`]; each may carry an
//! ordered list of native or scripted commands held by the
//! [`debugger::CommandRegistry`]. When the simulated inferior stops at a
//! location, the [`debugger::Dispatcher`] runs that breakpoint's list.

pub mod config;
pub mod debugger;
pub mod error;
pub mod executor;
pub mod interpreter;
pub mod parser;
pub mod script;
pub mod target;

pub use config::DebuggerConfig;
pub use error::{Error, Result};
pub use interpreter::Interpreter;
