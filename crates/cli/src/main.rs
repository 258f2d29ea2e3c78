//! picoc CLI: the four-form driver named in spec.md §6 -
//! `picoc file.c`, `picoc -s file.c`, `picoc -i`, `picoc -c`/`-h` - plus
//! `STACKSIZE`/`OUTFILE` environment overrides. `clap` derive mirrors the
//! teacher's `compiler/src/main.rs` flag style; argument parsing, file
//! reading, and exit-code propagation are exactly the things spec.md §1
//! carves out as "the command-line driver" rather than the core engine.

mod repl;

use clap::{CommandFactory, Parser as ClapParser};
use clap_complete::{generate, Shell};
use picoc_interp::Ctx;
use picoc_runtime::{InterpreterState, Io};
use std::fs::File;
use std::process::ExitCode;

const COPYRIGHT: &str = concat!(
    "picoc version ",
    env!("CARGO_PKG_VERSION"),
    "\n",
    "A small interpreter for a practical subset of C.\n",
);

#[derive(ClapParser)]
#[command(name = "picoc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A small interpreter for a practical subset of C", long_about = None)]
struct Cli {
    /// Source file to run. Omit with -i to start the interactive REPL.
    file: Option<String>,

    /// Remaining arguments are passed through to the interpreted program's
    /// argv (conventionally preceded by a bare `-`).
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    program_args: Vec<String>,

    /// Script mode: parse and run top-level statements, do not call `main`.
    #[arg(short = 's', long = "script")]
    script: bool,

    /// Start the interactive read-eval-print loop.
    #[arg(short = 'i', long = "interactive")]
    interactive: bool,

    /// Print copyright and exit.
    #[arg(short = 'c', long = "copyright")]
    copyright: bool,

    /// Generate a shell completion script and exit.
    #[arg(long = "completions", value_enum)]
    completions: Option<Shell>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("picoc=info".parse().unwrap()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        generate(shell, &mut Cli::command(), "picoc", &mut std::io::stdout());
        return ExitCode::SUCCESS;
    }

    if cli.copyright {
        print!("{COPYRIGHT}");
        return ExitCode::SUCCESS;
    }

    if cli.interactive || cli.file.is_none() {
        return run_interactive();
    }

    let file = cli.file.unwrap();
    run_file(&file, &cli.program_args, cli.script)
}

fn stack_size() -> u32 {
    std::env::var("STACKSIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(picoc_runtime::DEFAULT_STACK_SIZE)
}

fn io_for_run() -> picoc_runtime::PicocResult<Io> {
    let stdout: Box<dyn std::io::Write> = match std::env::var("OUTFILE") {
        Ok(path) => Box::new(File::create(&path).map_err(|e| picoc_runtime::Fatal::no_parser(format!("{path}: {e}")))?),
        Err(_) => Box::new(std::io::stdout()),
    };
    Ok(Io { stdout, stderr: Box::new(std::io::stderr()), stdin: Box::new(std::io::BufReader::new(std::io::stdin())) })
}

fn run_file(path: &str, program_args: &[String], script_mode: bool) -> ExitCode {
    match run_file_inner(path, program_args, script_mode) {
        Ok(code) => exit_code(code),
        Err(fatal) if fatal.exit_code.is_some() => exit_code(fatal.exit_code.unwrap()),
        Err(fatal) => {
            eprint!("{fatal}");
            ExitCode::from(1)
        }
    }
}

/// The interpreted program calling `exit(n)` unwinds through this `?` chain
/// the same way a genuine lex/parse/runtime error would (spec.md §9 "Model
/// as a host-side try/catch or a unique error-result type") - `run_file`
/// tells the two apart by checking `Fatal::exit_code` before printing.
fn run_file_inner(path: &str, program_args: &[String], script_mode: bool) -> picoc_runtime::PicocResult<i32> {
    let io = io_for_run()?;
    let mut ctx = Ctx::new(InterpreterState::new(stack_size(), io));
    picoc_stdlib::register_all(&mut ctx);
    picoc_interp::include_all_system_headers(&mut ctx)?;

    tracing::debug!(path, script_mode, "scanning source file");
    picoc_interp::platform_scan_file(&mut ctx, path)?;

    let code = if script_mode {
        0
    } else {
        let mut argv = vec![path.to_string()];
        argv.extend_from_slice(program_args);
        picoc_interp::call_main(&mut ctx, &argv)?
    };
    picoc_interp::cleanup(ctx);
    Ok(code)
}

fn run_interactive() -> ExitCode {
    let io = match io_for_run() {
        Ok(io) => io,
        Err(fatal) => {
            eprint!("{fatal}");
            return ExitCode::from(1);
        }
    };
    let mut ctx = Ctx::new(InterpreterState::new(stack_size(), io));
    picoc_stdlib::register_all(&mut ctx);
    if let Err(fatal) = picoc_interp::include_all_system_headers(&mut ctx) {
        eprint!("{fatal}");
        return ExitCode::from(1);
    }

    match repl::run(&mut ctx) {
        Ok(()) => ExitCode::SUCCESS,
        Err(fatal) => {
            eprint!("{fatal}");
            ExitCode::from(1)
        }
    }
}

/// `exit(n)` from interpreted code or `main`'s return value becomes the
/// process exit code, clamped to a `u8` the way a real process exit status
/// would be.
fn exit_code(n: i32) -> ExitCode {
    ExitCode::from((n & 0xff) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn stack_size_honours_stacksize_env_var() {
        // SAFETY: tests that touch process env vars must run serially
        // (enforced by `#[serial]`) so they don't race other tests reading
        // or writing the same variable.
        let orig = std::env::var("STACKSIZE").ok();
        unsafe { std::env::set_var("STACKSIZE", "131072") };
        assert_eq!(stack_size(), 131072);
        unsafe {
            match orig {
                Some(v) => std::env::set_var("STACKSIZE", v),
                None => std::env::remove_var("STACKSIZE"),
            }
        }
    }

    #[test]
    #[serial]
    fn stack_size_falls_back_to_default_when_unset_or_invalid() {
        let orig = std::env::var("STACKSIZE").ok();
        unsafe { std::env::remove_var("STACKSIZE") };
        assert_eq!(stack_size(), picoc_runtime::DEFAULT_STACK_SIZE);

        unsafe { std::env::set_var("STACKSIZE", "not-a-number") };
        assert_eq!(stack_size(), picoc_runtime::DEFAULT_STACK_SIZE);

        unsafe {
            match orig {
                Some(v) => std::env::set_var("STACKSIZE", v),
                None => std::env::remove_var("STACKSIZE"),
            }
        }
    }
}
