mod image;
mod resolver;

pub use image::{Function, Module, ProgramImage, SourceFile, TraceStep, LINE_STRIDE};
pub use resolver::{path_matches, resolve, ResolvedSite};
