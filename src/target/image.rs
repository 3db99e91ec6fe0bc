use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Size of one line-table slot; consecutive lines of a function are this far apart.
pub const LINE_STRIDE: u64 = 4;

/// A debuggee program: its modules plus the execution trace the inferior replays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramImage {
    pub name: String,
    pub modules: Vec<Module>,
    #[serde(default)]
    pub trace: Vec<TraceStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    /// Loaded at launch (the executable); otherwise loaded by a trace `load` step.
    #[serde(default = "default_preload")]
    pub preload: bool,
    #[serde(default)]
    pub sources: Vec<SourceFile>,
    #[serde(default)]
    pub functions: Vec<Function>,
}

fn default_preload() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    #[serde(default)]
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    pub address: u64,
}

impl Function {
    pub fn covers(&self, line: u32) -> bool {
        line >= self.start_line && line <= self.end_line
    }

    /// Address of `line`, if the function covers it.
    pub fn line_address(&self, line: u32) -> Option<u64> {
        if self.covers(line) {
            Some(self.address + u64::from(line - self.start_line) * LINE_STRIDE)
        } else {
            None
        }
    }
}

/// One step of the simulated execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TraceStep {
    Exec {
        function: String,
        line: u32,
        #[serde(default)]
        locals: BTreeMap<String, String>,
    },
    Load {
        module: String,
    },
    Exit {
        status: i32,
    },
}

impl ProgramImage {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn preloaded(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter().filter(|m| m.preload)
    }

    /// Find a function by name among the given loaded modules.
    pub fn find_function<'a>(
        &'a self,
        name: &str,
        loaded: &[String],
    ) -> Option<(&'a Module, &'a Function)> {
        self.modules
            .iter()
            .filter(|m| loaded.iter().any(|l| l == &m.name))
            .find_map(|m| m.functions.iter().find(|f| f.name == name).map(|f| (m, f)))
    }

    /// Path of the file defining `main`, used when a file/line spec names no file.
    pub fn default_file(&self) -> Option<&str> {
        self.modules
            .iter()
            .flat_map(|m| m.functions.iter())
            .find(|f| f.name == "main")
            .map(|f| f.file.as_str())
    }
}
