use std::fmt;

/// A script callable: either inline JavaScript source or a registered function name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptHandle {
    Source(String),
    Function(String),
}

impl fmt::Display for ScriptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptHandle::Source(src) => write!(f, "{}", src),
            ScriptHandle::Function(name) => write!(f, "{}(frame, bp_loc, session)", name),
        }
    }
}

/// One entry of a breakpoint's command list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEntry {
    /// Text for the native command interpreter
    Native(String),
    /// Callable in the embedded JavaScript engine
    Scripted(ScriptHandle),
}

impl CommandEntry {
    pub fn native(text: impl Into<String>) -> Self {
        CommandEntry::Native(text.into())
    }

    pub fn one_liner(source: impl Into<String>) -> Self {
        CommandEntry::Scripted(ScriptHandle::Source(source.into()))
    }

    pub fn function(name: impl Into<String>) -> Self {
        CommandEntry::Scripted(ScriptHandle::Function(name.into()))
    }

    pub fn is_scripted(&self) -> bool {
        matches!(self, CommandEntry::Scripted(_))
    }
}

/// How `attach` treats a list that is already installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttachMode {
    #[default]
    Replace,
    Append,
}

/// Ordered commands run when a breakpoint is hit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandList {
    entries: Vec<CommandEntry>,
    /// Abort the rest of the list when a native entry reports an error.
    pub stop_on_error: bool,
}

impl CommandList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<CommandEntry>) -> Self {
        Self {
            entries,
            stop_on_error: false,
        }
    }

    pub fn with_stop_on_error(mut self, stop_on_error: bool) -> Self {
        self.stop_on_error = stop_on_error;
        self
    }

    pub fn push(&mut self, entry: CommandEntry) {
        self.entries.push(entry);
    }

    /// Append `other`'s entries. The stop-on-error flag becomes `other`'s, so
    /// `--append -e false` clears a flag set by an earlier add.
    pub fn extend(&mut self, other: &CommandList) {
        self.entries.extend(other.entries.iter().cloned());
        self.stop_on_error = other.stop_on_error;
    }

    pub fn entries(&self) -> &[CommandEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Native entries as plain strings, in order.
    pub fn native_commands(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                CommandEntry::Native(text) => Some(text.as_str()),
                CommandEntry::Scripted(_) => None,
            })
            .collect()
    }

    /// Text shown by `breakpoint command list`.
    pub fn render(&self) -> String {
        let scripted = self.entries.iter().filter(|e| e.is_scripted()).count();
        let header = if scripted == 0 {
            "Breakpoint commands:"
        } else if scripted == self.entries.len() {
            "Breakpoint commands (script):"
        } else {
            "Breakpoint commands (mixed):"
        };
        let mixed = scripted != 0 && scripted != self.entries.len();

        let mut out = format!("    {}\n", header);
        for entry in &self.entries {
            match entry {
                CommandEntry::Native(text) => out.push_str(&format!("      {}\n", text)),
                CommandEntry::Scripted(handle) if mixed => {
                    out.push_str(&format!("      [script] {}\n", handle))
                }
                CommandEntry::Scripted(handle) => out.push_str(&format!("      {}\n", handle)),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_native() {
        let list = CommandList::from_entries(vec![CommandEntry::native(
            "frame variable --show-types --scope",
        )]);
        let text = list.render();
        assert!(text.contains("Breakpoint commands:"));
        assert!(text.contains("frame variable --show-types --scope"));
    }

    #[test]
    fn test_render_function() {
        let list = CommandList::from_entries(vec![CommandEntry::function("bktptcmd.function")]);
        let text = list.render();
        assert!(text.contains("Breakpoint commands (script):"));
        assert!(text.contains("bktptcmd.function(frame, bp_loc, session)"));
    }

    #[test]
    fn test_extend_keeps_order() {
        let mut list = CommandList::from_entries(vec![CommandEntry::native("bt")]);
        list.extend(&CommandList::from_entries(vec![
            CommandEntry::native("thread list"),
            CommandEntry::one_liner("return false"),
        ]));
        assert_eq!(list.native_commands(), vec!["bt", "thread list"]);
        assert_eq!(list.len(), 3);
        assert!(list.render().contains("[script] return false"));
    }

    #[test]
    fn test_extend_takes_the_appended_flag() {
        let mut list = CommandList::from_entries(vec![CommandEntry::native("bt")])
            .with_stop_on_error(true);
        list.extend(&CommandList::from_entries(vec![CommandEntry::native("thread list")]));
        assert!(!list.stop_on_error);

        list.extend(
            &CommandList::from_entries(vec![CommandEntry::native("continue")])
                .with_stop_on_error(true),
        );
        assert!(list.stop_on_error);
        assert_eq!(list.len(), 3);
    }
}
