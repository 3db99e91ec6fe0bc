use breakpoint_debugger::{DebuggerConfig, Interpreter, Result};
use clap::Parser;
use log::{error, info, LevelFilter};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "breakpoint-debugger", about = "Source-level debugger with breakpoint command lists")]
struct Args {
    /// Program image (JSON) to load as the target
    #[arg(long)]
    target: Option<PathBuf>,

    /// Debugger settings file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read commands from this file before anything else
    #[arg(short = 's', long = "source")]
    source: Vec<PathBuf>,

    /// Run this command after the source files (repeatable)
    #[arg(short = 'o', long = "one-line")]
    one_line: Vec<String>,

    /// Exit after running the source files and one-liners
    #[arg(long)]
    batch: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match DebuggerConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: cannot read config {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => DebuggerConfig::default(),
    };
    init_logging(&config);

    let mut interp = Interpreter::new(config);
    let stdout = io::stdout();
    if let Err(e) = run(&args, &mut interp, &mut stdout.lock()) {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    if !args.batch && !interp.is_quit() {
        if let Err(e) = repl(&mut interp) {
            error!("Input error: {}", e);
            return ExitCode::FAILURE;
        }
    }

    info!("Debugger exiting");
    ExitCode::SUCCESS
}

/// Load the target, then run source files and one-liners, echoing output to `out`.
fn run(args: &Args, interp: &mut Interpreter, out: &mut impl Write) -> Result<()> {
    if let Some(target) = &args.target {
        let line = format!("target create \"{}\"", target.display());
        out.write_all(interp.feed_line(&line).as_bytes())?;
    }

    for path in &args.source {
        let text = interp.source_file(path).map_err(|e| {
            error!("Cannot source {}", path.display());
            e
        })?;
        out.write_all(text.as_bytes())?;
    }

    for line in &args.one_line {
        if interp.is_quit() {
            break;
        }
        writeln!(out, "(bdb) {}", line)?;
        out.write_all(interp.feed_line(line).as_bytes())?;
    }
    out.flush()?;
    Ok(())
}

fn init_logging(config: &DebuggerConfig) {
    let mut builder = env_logger::Builder::new();
    let fallback = config
        .log_level
        .as_deref()
        .and_then(|level| level.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Warn);
    builder.filter_level(fallback);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn repl(interp: &mut Interpreter) -> io::Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut stdout = io::stdout();

    loop {
        let prompt = if interp.awaiting_body() { "> " } else { "(bdb) " };
        write!(stdout, "{}", prompt)?;
        stdout.flush()?;

        let Some(line) = lines.next() else { break };
        let line = line?;
        stdout.write_all(interp.feed_line(&line).as_bytes())?;
        if interp.is_quit() {
            break;
        }
    }
    Ok(())
}
