use super::types::{Command, CommandBody, Dialect};
use crate::debugger::{AttachMode, BreakpointId, BreakpointSpec};
use crate::error::{Error, Result};

/// Split a command line into words, honoring shell-style quotes.
pub fn tokenize(line: &str) -> Result<Vec<String>> {
    shlex::split(line).ok_or_else(|| Error::usage(format!("unbalanced quotes in '{}'", line)))
}

/// Check if line is a comment or blank
pub fn is_comment(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Parse one front-end command line.
pub fn parse_command(line: &str) -> Result<Command> {
    let words = tokenize(line)?;
    let mut args = Args::new(&words);

    let Some(head) = args.next_word() else {
        return Err(Error::usage("empty command"));
    };

    match head {
        "breakpoint" | "br" => parse_breakpoint(&mut args),
        "target" => match args.next_word() {
            Some("create") => {
                let path = args
                    .next_word()
                    .ok_or_else(|| Error::usage("'target create' needs a path"))?;
                args.finish()?;
                Ok(Command::TargetCreate {
                    path: path.to_string(),
                })
            }
            other => Err(unknown_sub("target", other)),
        },
        "run" | "r" => args.finish().map(|_| Command::Run),
        "continue" | "c" => args.finish().map(|_| Command::Continue),
        "process" => {
            let cmd = match args.next_word() {
                Some("launch") => Command::Run,
                Some("continue") => Command::Continue,
                Some("status") => Command::ProcessStatus,
                Some("kill") => Command::ProcessKill,
                other => return Err(unknown_sub("process", other)),
            };
            args.finish()?;
            Ok(cmd)
        }
        "bt" => args.finish().map(|_| Command::Backtrace),
        "thread" => {
            let cmd = match args.next_word() {
                Some("backtrace") => Command::Backtrace,
                Some("list") => Command::ThreadList,
                other => return Err(unknown_sub("thread", other)),
            };
            args.finish()?;
            Ok(cmd)
        }
        "frame" => match args.next_word() {
            Some("variable") => {
                let names = args
                    .rest()
                    .into_iter()
                    .filter(|w| !w.starts_with('-'))
                    .map(str::to_string)
                    .collect();
                Ok(Command::FrameVariable { names })
            }
            other => Err(unknown_sub("frame", other)),
        },
        "script" => {
            // Keep the source verbatim, quotes included.
            let source = match line.trim_start().strip_prefix("script") {
                Some(rest) => rest.trim().to_string(),
                None => args.rest().join(" "),
            };
            if source.is_empty() {
                return Err(Error::usage("'script' needs source text"));
            }
            Ok(Command::Script { source })
        }
        "help" | "?" => Ok(Command::Help),
        "quit" | "q" | "exit" => Ok(Command::Quit),
        other => Err(Error::usage(format!("'{}' is not a valid command.", other))),
    }
}

fn unknown_sub(head: &str, sub: Option<&str>) -> Error {
    match sub {
        Some(s) => Error::usage(format!("'{} {}' is not a valid command.", head, s)),
        None => Error::usage(format!("'{}' needs a subcommand", head)),
    }
}

fn parse_breakpoint(args: &mut Args<'_>) -> Result<Command> {
    match args.next_word() {
        Some("set") => parse_breakpoint_set(args),
        Some("list") => {
            let mut full = false;
            while let Some(word) = args.next_word() {
                match word {
                    "-f" | "--full" => full = true,
                    other => return Err(Error::usage(format!("unknown option '{}'", other))),
                }
            }
            Ok(Command::BreakpointList { full })
        }
        Some("delete") => Ok(Command::BreakpointDelete {
            ids: parse_ids(&args.rest())?,
        }),
        Some("command") => parse_breakpoint_command(args),
        other => Err(unknown_sub("breakpoint", other)),
    }
}

fn parse_breakpoint_set(args: &mut Args<'_>) -> Result<Command> {
    let mut files = Vec::new();
    let mut line = None;
    let mut name = None;
    let mut func_regex = None;
    let mut source_regex = None;
    let mut commands = Vec::new();
    let mut exact = false;
    let mut strict = false;

    while let Some(word) = args.next_word() {
        match word {
            "-f" | "--file" => files.push(args.value(word)?.to_string()),
            "-l" | "--line" => {
                let value = args.value(word)?;
                line = Some(
                    value
                        .parse::<u32>()
                        .map_err(|_| Error::usage(format!("invalid line number '{}'", value)))?,
                );
            }
            "-n" | "--name" => name = Some(args.value(word)?.to_string()),
            "-r" | "--func-regex" => func_regex = Some(args.value(word)?.to_string()),
            "-p" | "--source-pattern-regexp" => source_regex = Some(args.value(word)?.to_string()),
            "-C" | "--command" => commands.push(args.value(word)?.to_string()),
            "--exact" => exact = true,
            "--strict" => strict = true,
            other => return Err(Error::usage(format!("unknown option '{}'", other))),
        }
    }

    let spec = match (line, name, func_regex, source_regex) {
        (Some(_), _, _, _) if files.len() > 1 => {
            return Err(Error::usage("-l takes at most one -f"))
        }
        (Some(line), None, None, None) => BreakpointSpec::FileLine {
            file: files.pop(),
            line,
            exact,
        },
        (None, Some(name), None, None) => BreakpointSpec::Symbol { name },
        (None, None, Some(pattern), None) => BreakpointSpec::Regex { pattern, files },
        (None, None, None, Some(pattern)) => BreakpointSpec::SourceRegex { pattern, files },
        _ => {
            return Err(Error::usage(
                "'breakpoint set' needs exactly one of -l, -n, -r or -p",
            ))
        }
    };

    Ok(Command::BreakpointSet {
        spec,
        commands,
        strict,
    })
}

fn parse_breakpoint_command(args: &mut Args<'_>) -> Result<Command> {
    match args.next_word() {
        Some("add") => {
            let mut dialect = Dialect::Command;
            let mut one_liner = None;
            let mut function = None;
            let mut mode = AttachMode::Replace;
            let mut stop_on_error = false;
            let mut ids = Vec::new();

            while let Some(word) = args.next_word() {
                match word {
                    "-s" | "--script-type" => {
                        dialect = match args.value(word)? {
                            "command" => Dialect::Command,
                            "script" => Dialect::Script,
                            other => {
                                return Err(Error::usage(format!(
                                    "invalid script type '{}' (expected command or script)",
                                    other
                                )))
                            }
                        }
                    }
                    "-o" | "--one-liner" => one_liner = Some(args.value(word)?.to_string()),
                    "-F" | "--function" => function = Some(args.value(word)?.to_string()),
                    "-e" | "--stop-on-error" => {
                        stop_on_error = match args.value(word)? {
                            "true" | "1" | "yes" => true,
                            "false" | "0" | "no" => false,
                            other => {
                                return Err(Error::usage(format!("invalid boolean '{}'", other)))
                            }
                        }
                    }
                    "--append" => mode = AttachMode::Append,
                    id => ids.push(id),
                }
            }

            let body = match (one_liner, function) {
                (Some(_), Some(_)) => {
                    return Err(Error::usage("-o and -F cannot be used together"))
                }
                (Some(text), None) => CommandBody::OneLiner(text),
                (None, Some(name)) => {
                    dialect = Dialect::Script;
                    CommandBody::Function(name)
                }
                (None, None) => CommandBody::Pending,
            };

            Ok(Command::CommandAdd {
                ids: parse_ids(&ids)?,
                dialect,
                body,
                mode,
                stop_on_error,
            })
        }
        Some("list") => Ok(Command::CommandList {
            ids: parse_ids(&args.rest())?,
        }),
        Some("delete") => Ok(Command::CommandDelete {
            ids: parse_ids(&args.rest())?,
        }),
        other => Err(unknown_sub("breakpoint command", other)),
    }
}

/// Parse breakpoint ids. Location ids such as `2.1` are rejected.
pub fn parse_ids(words: &[&str]) -> Result<Vec<BreakpointId>> {
    words
        .iter()
        .map(|w| {
            if w.contains('.') {
                return Err(Error::usage(format!(
                    "'{}' is a breakpoint location ID; these commands take breakpoint IDs.",
                    w
                )));
            }
            w.parse::<u32>()
                .map(BreakpointId)
                .map_err(|_| Error::usage(format!("'{}' is not a valid breakpoint ID.", w)))
        })
        .collect()
}

/// Cursor over the words of a command line.
struct Args<'a> {
    words: &'a [String],
    pos: usize,
}

impl<'a> Args<'a> {
    fn new(words: &'a [String]) -> Self {
        Self { words, pos: 0 }
    }

    fn next_word(&mut self) -> Option<&'a str> {
        let word = self.words.get(self.pos)?;
        self.pos += 1;
        Some(word.as_str())
    }

    fn value(&mut self, option: &str) -> Result<&'a str> {
        self.next_word()
            .ok_or_else(|| Error::usage(format!("option '{}' needs a value", option)))
    }

    fn rest(&mut self) -> Vec<&'a str> {
        let rest = self.words[self.pos..].iter().map(String::as_str).collect();
        self.pos = self.words.len();
        rest
    }

    fn finish(&mut self) -> Result<()> {
        match self.next_word() {
            None => Ok(()),
            Some(extra) => Err(Error::usage(format!("unexpected argument '{}'", extra))),
        }
    }
}
