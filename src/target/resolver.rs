//! Maps breakpoint specifications onto code in a loaded module.

use super::image::{Function, Module};
use crate::debugger::BreakpointSpec;
use crate::error::{Error, Result};
use regex::Regex;

/// A concrete place a breakpoint specification matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSite {
    pub module: String,
    pub function: String,
    pub offset: u64,
    pub file: String,
    pub line: u32,
    pub address: u64,
}

impl ResolvedSite {
    fn at(module: &Module, function: &Function, line: u32) -> Option<Self> {
        let address = function.line_address(line)?;
        Some(Self {
            module: module.name.clone(),
            function: function.name.clone(),
            offset: address - function.address,
            file: function.file.clone(),
            line,
            address,
        })
    }
}

/// Does the user-supplied `requested` path name `candidate`?
///
/// Relative paths match as a trailing run of path components, with any
/// leading `./` dropped; absolute paths must match exactly.
pub fn path_matches(requested: &str, candidate: &str) -> bool {
    fn components(p: &str) -> Vec<&str> {
        p.split('/').filter(|c| !c.is_empty() && *c != ".").collect()
    }

    let want = components(requested);
    let have = components(candidate);
    if want.is_empty() {
        return false;
    }
    if requested.starts_with('/') {
        return want == have;
    }
    have.ends_with(&want)
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::InvalidSpec(format!("'{}': {}", pattern, e)))
}

fn file_allowed(files: &[String], path: &str) -> bool {
    files.is_empty() || files.iter().any(|f| path_matches(f, path))
}

/// Resolve `spec` against one module. `default_file` stands in for a missing file name.
pub fn resolve(
    spec: &BreakpointSpec,
    module: &Module,
    default_file: Option<&str>,
) -> Result<Vec<ResolvedSite>> {
    let sites = match spec {
        BreakpointSpec::FileLine { file, line, exact } => {
            let Some(file) = file.as_deref().or(default_file) else {
                return Err(Error::InvalidSpec(
                    "no file given and no default source file".to_string(),
                ));
            };
            resolve_file_line(module, file, *line, *exact)
        }
        BreakpointSpec::Symbol { name } => module
            .functions
            .iter()
            .filter(|f| &f.name == name)
            .filter_map(|f| ResolvedSite::at(module, f, f.start_line))
            .collect(),
        BreakpointSpec::Regex { pattern, files } => {
            let re = compile(pattern)?;
            module
                .functions
                .iter()
                .filter(|f| re.is_match(&f.name) && file_allowed(files, &f.file))
                .filter_map(|f| ResolvedSite::at(module, f, f.start_line))
                .collect()
        }
        BreakpointSpec::SourceRegex { pattern, files } => {
            let re = compile(pattern)?;
            let mut out = Vec::new();
            for source in &module.sources {
                let wanted = if files.is_empty() {
                    default_file.is_some_and(|d| d == source.path)
                } else {
                    file_allowed(files, &source.path)
                };
                if !wanted {
                    continue;
                }
                for (i, text) in source.lines.iter().enumerate() {
                    if !re.is_match(text) {
                        continue;
                    }
                    let line = i as u32 + 1;
                    out.extend(
                        module
                            .functions
                            .iter()
                            .filter(|f| f.file == source.path)
                            .filter_map(|f| ResolvedSite::at(module, f, line)),
                    );
                }
            }
            out
        }
    };
    Ok(sites)
}

fn resolve_file_line(module: &Module, file: &str, line: u32, exact: bool) -> Vec<ResolvedSite> {
    let in_file: Vec<&Function> = module
        .functions
        .iter()
        .filter(|f| path_matches(file, &f.file))
        .collect();

    let direct: Vec<ResolvedSite> = in_file
        .iter()
        .filter_map(|f| ResolvedSite::at(module, f, line))
        .collect();
    if !direct.is_empty() || exact {
        return direct;
    }

    // Slide forward to the next line that has code.
    let next = in_file
        .iter()
        .filter(|f| f.start_line > line)
        .map(|f| f.start_line)
        .min();
    match next {
        Some(next_line) => in_file
            .iter()
            .filter_map(|f| ResolvedSite::at(module, f, next_line))
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::image::SourceFile;

    fn module() -> Module {
        Module {
            name: "a.out".into(),
            preload: true,
            sources: vec![SourceFile {
                path: "/work/breakpoint/breakpoint_command/a.c".into(),
                lines: vec![
                    "int a_MyFunction() {".into(),
                    "  // a is about to return 10".into(),
                    "  return 10;".into(),
                    "}".into(),
                ],
            }],
            functions: vec![
                Function {
                    name: "main".into(),
                    file: "/work/breakpoint/breakpoint_command/main.c".into(),
                    start_line: 5,
                    end_line: 20,
                    address: 0x1000,
                },
                Function {
                    name: "a_MyFunction".into(),
                    file: "/work/breakpoint/breakpoint_command/a.c".into(),
                    start_line: 1,
                    end_line: 4,
                    address: 0x2000,
                },
            ],
        }
    }

    #[test]
    fn test_relative_paths() {
        let full = "/work/breakpoint/breakpoint_command/main.c";
        assert!(path_matches("main.c", full));
        assert!(path_matches("./main.c", full));
        assert!(path_matches("breakpoint_command/main.c", full));
        assert!(path_matches("./breakpoint/breakpoint_command/main.c", full));
        assert!(!path_matches("invalid/main.c", full));
        assert!(!path_matches("./invalid/main.c", full));
        assert!(!path_matches("ain.c", full));
    }

    #[test]
    fn test_file_line_slides_forward_unless_exact() {
        let m = module();
        let spec = BreakpointSpec::FileLine {
            file: Some("main.c".into()),
            line: 2,
            exact: false,
        };
        let sites = resolve(&spec, &m, None).unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].line, 5);

        let exact = BreakpointSpec::FileLine {
            file: Some("main.c".into()),
            line: 2,
            exact: true,
        };
        assert!(resolve(&exact, &m, None).unwrap().is_empty());
    }

    #[test]
    fn test_source_regex() {
        let m = module();
        let spec = BreakpointSpec::SourceRegex {
            pattern: "is about to return [12]0".into(),
            files: vec!["a.c".into()],
        };
        let sites = resolve(&spec, &m, None).unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].address, 0x2004);
        assert_eq!(sites[0].offset, 4);
    }

    #[test]
    fn test_bad_regex_is_invalid_spec() {
        let spec = BreakpointSpec::Regex {
            pattern: "(".into(),
            files: vec![],
        };
        assert!(matches!(
            resolve(&spec, &module(), None),
            Err(Error::InvalidSpec(_))
        ));
    }
}
