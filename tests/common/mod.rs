#![allow(dead_code)]

use breakpoint_debugger::debugger::DebugContext;
use breakpoint_debugger::script::{JsScriptHost, ScriptArgs};
use breakpoint_debugger::target::{Function, Module, ProgramImage, SourceFile, TraceStep};
use breakpoint_debugger::{DebuggerConfig, Interpreter};
use std::collections::BTreeMap;

pub const MAIN_C: &str = "/work/breakpoint_command/main.c";
pub const A_C: &str = "/work/breakpoint_command/a.c";
pub const B_C: &str = "/work/breakpoint_command/b.c";

/// Line of `main.c` carrying the "Set break point at this line." marker.
pub const BREAK_LINE: u32 = 10;

fn source(path: &str, text: &str) -> SourceFile {
    SourceFile {
        path: path.to_string(),
        lines: text.lines().map(str::to_string).collect(),
    }
}

fn function(name: &str, file: &str, start_line: u32, end_line: u32, address: u64) -> Function {
    Function {
        name: name.to_string(),
        file: file.to_string(),
        start_line,
        end_line,
        address,
    }
}

fn exec(function: &str, line: u32, locals: &[(&str, &str)]) -> TraceStep {
    TraceStep::Exec {
        function: function.to_string(),
        line,
        locals: locals
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
    }
}

fn main_module() -> Module {
    Module {
        name: "a.out".to_string(),
        preload: true,
        sources: vec![
            source(
                MAIN_C,
                "#include <stdio.h>

int a_MyFunction();
int b_MyFunction();

int main (int argc, char const *argv[])
{
    int a = a_MyFunction();
    int b = b_MyFunction();
    printf (\"Hello world: %d\\n\", a + b); // Set break point at this line.
    return 0;
}",
            ),
            source(
                A_C,
                "int a_MyFunction()
{
    // Set a breakpoint here.
    return 10; // a_MyFunction is about to return 10
}",
            ),
            source(
                B_C,
                "int b_MyFunction()
{
    // Set a breakpoint here.
    return 20; // b_MyFunction is about to return 20
}",
            ),
        ],
        functions: vec![
            function("main", MAIN_C, 6, 12, 0x1000),
            function("a_MyFunction", A_C, 1, 5, 0x2000),
            function("b_MyFunction", B_C, 1, 5, 0x3000),
        ],
    }
}

fn main_trace() -> Vec<TraceStep> {
    vec![
        exec("main", 6, &[("argc", "1")]),
        exec("main", 8, &[("argc", "1")]),
        exec("a_MyFunction", 1, &[]),
        exec("a_MyFunction", 4, &[]),
        exec("main", 9, &[("argc", "1"), ("a", "10")]),
        exec("b_MyFunction", 1, &[]),
        exec("b_MyFunction", 4, &[]),
        exec(
            "main",
            BREAK_LINE,
            &[("argc", "1"), ("a", "10"), ("b", "20")],
        ),
        exec("main", 11, &[("argc", "1"), ("a", "10"), ("b", "20")]),
        TraceStep::Exit { status: 0 },
    ]
}

/// `main` calls `a_MyFunction` and `b_MyFunction`, all in the executable.
pub fn sample_image() -> ProgramImage {
    ProgramImage {
        name: "a.out".to_string(),
        modules: vec![main_module()],
        trace: main_trace(),
    }
}

/// Like [`sample_image`], plus `libfoo.so` loaded by the program after `main` starts.
pub fn late_load_image() -> ProgramImage {
    let foo_c = "/work/lib/foo.c";
    let lib = Module {
        name: "libfoo.so".to_string(),
        preload: false,
        sources: vec![source(foo_c, "int foo_func()\n{\n    return 1;\n}")],
        functions: vec![function("foo_func", foo_c, 1, 4, 0x9000)],
    };
    ProgramImage {
        name: "a.out".to_string(),
        modules: vec![main_module(), lib],
        trace: vec![
            exec("main", 6, &[]),
            TraceStep::Load {
                module: "libfoo.so".to_string(),
            },
            exec("foo_func", 1, &[]),
            exec("foo_func", 3, &[]),
            exec("main", 11, &[]),
            TraceStep::Exit { status: 0 },
        ],
    }
}

pub fn test_config() -> DebuggerConfig {
    DebuggerConfig {
        stop_timeout_ms: Some(5_000),
        ..DebuggerConfig::default()
    }
}

/// Script host with `bktptcmd.function` defined.
pub fn script_host() -> JsScriptHost {
    let mut host = JsScriptHost::new();
    host.define("bktptcmd.function", |args: ScriptArgs<'_>| {
        args.session.set("function", "function was here");
        Ok(true)
    });
    host
}

pub fn interpreter_with(image: ProgramImage, config: DebuggerConfig) -> Interpreter {
    let mut ctx = DebugContext::with_script_host(config, Box::new(script_host()));
    ctx.set_target(image);
    Interpreter::with_context(ctx)
}

pub fn interpreter() -> Interpreter {
    interpreter_with(sample_image(), test_config())
}

pub fn init_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}
