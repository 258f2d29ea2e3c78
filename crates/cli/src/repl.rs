//! `picoc -i`: an interactive read-eval-print loop with line editing and
//! history, grounded on spec.md §6's `ParseInteractive` entry point. This is
//! `picoc_interp::parse_interactive`'s interactive-terminal counterpart: that
//! function is a plain blocking-read fallback for piped input or embedders
//! without a line editor, while this module drives the same "read a
//! statement, parse it, print errors without killing the session" loop on
//! top of `rustyline` the way the teacher's `compiler/src/main.rs` drives
//! `clap` for its own CLI surface - a thin idiomatic wrapper around a crate
//! already declared in the workspace, rather than a hand-rolled line reader.

use picoc_interp::Ctx;
use picoc_runtime::PicocResult;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const PROMPT: &str = "picoc> ";
const CONTINUATION_PROMPT: &str = "     > ";

pub fn run(ctx: &mut Ctx) -> PicocResult<()> {
    println!("picoc {} (Ctrl-D to exit)", env!("CARGO_PKG_VERSION"));

    let mut editor = DefaultEditor::new().map_err(|e| picoc_runtime::Fatal::no_parser(format!("could not start line editor: {e}")))?;

    loop {
        let Some(buf) = read_statement(&mut editor)? else {
            println!();
            return Ok(());
        };
        if buf.trim().is_empty() {
            continue;
        }
        editor.add_history_entry(buf.as_str()).ok();

        if let Err(fatal) = picoc_interp::parse(ctx, "<stdin>", &buf) {
            if let Some(code) = fatal.exit_code {
                std::process::exit(code);
            }
            eprint!("{fatal}");
        }
    }
}

/// Reads one statement, prompting for continuation lines while the braces
/// opened so far outnumber the ones closed - the same cheap completeness
/// check `parse_interactive` uses, just interleaved with `readline` so
/// history and editing work across continuation lines too. Returns `None`
/// on Ctrl-D (end of session).
fn read_statement(editor: &mut DefaultEditor) -> PicocResult<Option<String>> {
    let mut buf = match editor.readline(PROMPT) {
        Ok(line) => line,
        Err(ReadlineError::Eof) => return Ok(None),
        Err(ReadlineError::Interrupted) => return Ok(Some(String::new())),
        Err(e) => return Err(picoc_runtime::Fatal::no_parser(format!("stdin: {e}"))),
    };

    while brace_depth(&buf) > 0 {
        match editor.readline(CONTINUATION_PROMPT) {
            Ok(more) => {
                buf.push('\n');
                buf.push_str(&more);
            }
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => break,
            Err(e) => return Err(picoc_runtime::Fatal::no_parser(format!("stdin: {e}"))),
        }
    }
    Ok(Some(buf))
}

fn brace_depth(s: &str) -> i32 {
    let mut depth = 0;
    for c in s.chars() {
        match c {
            '{' | '(' => depth += 1,
            '}' | ')' => depth -= 1,
            _ => {}
        }
    }
    depth
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brace_depth_counts_unbalanced_opens() {
        assert_eq!(brace_depth("if (x) {"), 2);
        assert_eq!(brace_depth("int x = 1;"), 0);
        assert_eq!(brace_depth("}"), -1);
    }
}
