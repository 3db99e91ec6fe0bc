//! JavaScript breakpoint commands, run on the boa engine, plus named Rust
//! functions for `breakpoint command add -F`.
//!
//! Inline source runs as the body of a function taking `frame`, `bp_loc` and
//! `session`:
//!
//! ```text
//! session.one_liner = "one liner was here"
//! session.where = String(bp_loc); return false
//! throw new Error("something went wrong")
//! ```
//!
//! Returning `false` asks the debugger not to stop. Writes to `session`
//! persist across commands.

use super::{ScriptArgs, ScriptError, ScriptHost};
use crate::debugger::{BreakpointLocation, Frame};
use boa_engine::{Context, JsError, Source};
use log::debug;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Signature of a function callable from a breakpoint command.
pub type ScriptFn = dyn FnMut(ScriptArgs<'_>) -> Result<bool, ScriptError> + Send;

#[derive(Default)]
pub struct JsScriptHost {
    functions: HashMap<String, Box<ScriptFn>>,
}

impl std::fmt::Debug for JsScriptHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("JsScriptHost").field("functions", &names).finish()
    }
}

impl JsScriptHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `f` under `name` (e.g. `bktptcmd.function`), replacing any previous one.
    pub fn define<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: FnMut(ScriptArgs<'_>) -> Result<bool, ScriptError> + Send + 'static,
    {
        self.functions.insert(name.into(), Box::new(f));
    }
}

impl ScriptHost for JsScriptHost {
    fn eval(&mut self, source: &str, args: ScriptArgs<'_>) -> Result<bool, ScriptError> {
        // A context per run keeps the host Send; `session` carries the state.
        let mut ctx = Context::default();
        let prelude = prelude(args.frame, args.bp_loc, &args.session.to_value());
        ctx.eval(Source::from_bytes(&prelude))
            .map_err(|e| raised(e, &mut ctx))?;

        let wrapped = format!(
            "(function (frame, bp_loc, session) {{\n{}\n}})(frame, bp_loc, session)",
            source
        );
        let result = ctx
            .eval(Source::from_bytes(&wrapped))
            .map_err(|e| raised(e, &mut ctx))?;
        let stop = result.as_boolean() != Some(false);

        let saved = ctx
            .eval(Source::from_bytes("JSON.stringify(session)"))
            .and_then(|v| v.to_string(&mut ctx))
            .map_err(|e| raised(e, &mut ctx))?
            .to_std_string_escaped();
        match serde_json::from_str::<Value>(&saved) {
            Ok(Value::Object(map)) => args.session.replace(map),
            Ok(other) => {
                return Err(ScriptError::Raised(format!(
                    "session is no longer an object: {}",
                    other
                )))
            }
            Err(e) => return Err(ScriptError::Raised(format!("unreadable session: {}", e))),
        }

        debug!("Script finished, stop = {}", stop);
        Ok(stop)
    }

    fn call(&mut self, function: &str, args: ScriptArgs<'_>) -> Result<bool, ScriptError> {
        let f = self
            .functions
            .get_mut(function)
            .ok_or_else(|| ScriptError::UnknownFunction(function.to_string()))?;
        debug!("Calling script function {}", function);
        f(args)
    }

    fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}

/// Globals `frame`, `bp_loc` and `session`. `String(x)` gives the debugger's own rendering.
fn prelude(frame: &Frame, loc: &BreakpointLocation, session: &Value) -> String {
    let frame_obj = json!({
        "index": frame.index,
        "module": frame.module,
        "function": frame.function,
        "file": frame.file,
        "line": frame.line,
        "address": frame.address,
        "locals": frame.locals,
    });
    let loc_obj = json!({
        "id": loc.id.to_string(),
        "breakpoint": loc.id.breakpoint.0,
        "index": loc.id.index,
        "address": loc.address,
        "module": loc.module,
        "function": loc.function,
        "offset": loc.offset,
        "file": loc.file,
        "line": loc.line,
        "resolved": loc.is_resolved(),
        "hit_count": loc.hit_count,
    });
    format!(
        "var frame = {};\n\
         Object.defineProperty(frame, 'toString', {{ value: function () {{ return {}; }} }});\n\
         var bp_loc = {};\n\
         Object.defineProperty(bp_loc, 'toString', {{ value: function () {{ return {}; }} }});\n\
         var session = {};\n",
        frame_obj,
        Value::String(frame.to_string()),
        loc_obj,
        Value::String(loc.to_string()),
        session
    )
}

fn raised(err: JsError, ctx: &mut Context) -> ScriptError {
    match err.try_native(ctx) {
        Ok(native) => ScriptError::Raised(native.to_string()),
        Err(_) => ScriptError::Raised(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debugger::{BreakpointId, LocationId, LocationState};
    use crate::script::SessionDict;
    use std::collections::BTreeMap;

    fn fixtures() -> (Frame, BreakpointLocation) {
        let mut locals = BTreeMap::new();
        locals.insert("argc".to_string(), "1".to_string());
        let frame = Frame {
            index: 0,
            module: "a.out".into(),
            function: "main".into(),
            file: "/src/main.c".into(),
            line: 12,
            address: 0x1010,
            locals,
        };
        let loc = BreakpointLocation {
            id: LocationId {
                breakpoint: BreakpointId(1),
                index: 1,
            },
            address: 0x1010,
            module: "a.out".into(),
            function: "main".into(),
            offset: 16,
            file: "/src/main.c".into(),
            line: 12,
            state: LocationState::Resolved,
            hit_count: 1,
        };
        (frame, loc)
    }

    fn eval(
        host: &mut JsScriptHost,
        source: &str,
        session: &mut SessionDict,
    ) -> Result<bool, ScriptError> {
        let (frame, loc) = fixtures();
        host.eval(
            source,
            ScriptArgs {
                frame: &frame,
                bp_loc: &loc,
                session,
            },
        )
    }

    #[test]
    fn test_assignment_and_statements() {
        let mut host = JsScriptHost::new();
        let mut session = SessionDict::new();
        let stop = eval(
            &mut host,
            r#"session.one_liner = "one liner; was here"; session.line = frame.line"#,
            &mut session,
        )
        .unwrap();
        assert!(stop);
        assert_eq!(session.get_str("one_liner"), Some("one liner; was here"));
        assert_eq!(session.get("line"), Some(&Value::from(12)));
    }

    #[test]
    fn test_session_persists_between_runs() {
        let mut host = JsScriptHost::new();
        let mut session = SessionDict::new();
        session.set("count", 1);
        eval(&mut host, "session.count += 1", &mut session).unwrap();
        eval(&mut host, "session.count += 1", &mut session).unwrap();
        assert_eq!(session.get("count"), Some(&Value::from(3)));
        assert_eq!(session.get_str("never"), None);
    }

    #[test]
    fn test_string_of_frame_and_location() {
        let mut host = JsScriptHost::new();
        let mut session = SessionDict::new();
        eval(
            &mut host,
            "session.frame = String(frame); session.bp_loc = `${bp_loc}`; session.local = frame.locals.argc",
            &mut session,
        )
        .unwrap();
        assert!(session.get_str("frame").unwrap().starts_with("frame #0:"));
        let loc = session.get_str("bp_loc").unwrap();
        assert!(loc.starts_with("1.1: where = a.out`main"));
        assert!(loc.ends_with("resolved, hit count = 1"));
        assert_eq!(session.get_str("local"), Some("1"));
    }

    #[test]
    fn test_return_false_and_throw() {
        let mut host = JsScriptHost::new();
        let mut session = SessionDict::new();
        assert!(!eval(&mut host, "return false; session.never = 1", &mut session).unwrap());
        assert!(session.get("never").is_none());

        let err = eval(&mut host, r#"throw new Error("boom")"#, &mut session).unwrap_err();
        assert!(matches!(&err, ScriptError::Raised(msg) if msg.contains("boom")), "{:?}", err);
        assert!(matches!(
            eval(&mut host, "session.x = nope", &mut session),
            Err(ScriptError::Raised(_))
        ));
        assert!(matches!(
            eval(&mut host, "session.x = (", &mut session),
            Err(ScriptError::Raised(_))
        ));
        // A failed run leaves the session as it was.
        assert!(session.is_empty());
    }

    #[test]
    fn test_registered_function() {
        let mut host = JsScriptHost::new();
        host.define("bktptcmd.function", |args: ScriptArgs<'_>| {
            args.session.set("bktptcmd", "function was here");
            Ok(true)
        });
        let (frame, loc) = fixtures();
        let mut session = SessionDict::new();
        let stop = host
            .call(
                "bktptcmd.function",
                ScriptArgs {
                    frame: &frame,
                    bp_loc: &loc,
                    session: &mut session,
                },
            )
            .unwrap();
        assert!(stop);
        assert_eq!(session.get_str("bktptcmd"), Some("function was here"));
        assert!(host.has_function("bktptcmd.function"));
        assert!(!host.has_function("missing"));
        assert!(matches!(
            host.call(
                "missing",
                ScriptArgs {
                    frame: &frame,
                    bp_loc: &loc,
                    session: &mut session,
                },
            ),
            Err(ScriptError::UnknownFunction(_))
        ));
    }
}
