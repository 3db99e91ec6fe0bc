use serde::{Deserialize, Serialize};

/// When a `continue` issued from inside a command list takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContinuePolicy {
    /// Finish the whole list, then resume.
    #[default]
    AfterList,
    /// Skip the rest of the list and resume right away.
    Immediate,
}

/// What the controller does after a stop has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopDisposition {
    /// Report the stop to the user.
    Stop,
    /// Resume the inferior without reporting.
    Resume,
}
