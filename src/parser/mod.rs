mod commands;
mod preprocessor;
mod types;

pub use commands::{is_comment, parse_command, parse_ids, tokenize};
pub use preprocessor::{join_continued_lines, preprocess_lines};
pub use types::{Command, CommandBody, CommandLine, Dialect};
