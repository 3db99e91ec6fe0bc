pub mod inferior;
mod runner;

pub use inferior::{InferiorCommand, SiteTable, MAIN_THREAD_ID};
pub use runner::{run_to_stop, StopHandler};
