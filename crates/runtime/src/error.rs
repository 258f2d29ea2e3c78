//! The fatal-error escape path.
//!
//! picoc's C original establishes a `setjmp` escape point before driving
//! the parser and `longjmp`s out of arbitrarily deep call stacks on any
//! lex/parse/type/runtime error. This crate has no such escape: every
//! fallible call returns `Result<T, Fatal>` and `?` does the unwinding.
//! `Fatal` itself carries everything `ProgramFail`'s decorated message did
//! (source position, the offending line, a caret) so the host-visible
//! output is unchanged even though the propagation mechanism is not.

use std::fmt;

/// A source position: 1-indexed line and column, matching picoc's
/// user-facing `file:line:col` error format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pos {
    pub line: u32,
    pub column: u32,
}

impl Pos {
    pub fn new(line: u32, column: u32) -> Self {
        Pos { line, column }
    }
}

/// Every error the interpreter can raise is fatal within a run: there is no
/// local recovery and no exception hierarchy, only this one decorated
/// message and the host-visible exit code (spec: error handling design).
#[derive(Debug, Clone)]
pub struct Fatal {
    pub file_name: String,
    pub pos: Pos,
    pub message: String,
    /// The offending source line, so the caller can render it with a caret
    /// under `pos.column` the way `ProgramFail` does.
    pub source_line: Option<String>,
    /// Set only by `exit()`: this isn't an error at all, just `?` reusing
    /// the one escape path the interpreter has to unwind out of an
    /// arbitrarily deep call stack and hand a status code back to the host.
    pub exit_code: Option<i32>,
}

impl Fatal {
    pub fn new(file_name: impl Into<String>, pos: Pos, message: impl Into<String>) -> Self {
        Fatal { file_name: file_name.into(), pos, message: message.into(), source_line: None, exit_code: None }
    }

    /// `ProgramFailNoParser`: a fatal error raised before any parse state
    /// exists (e.g. the source file couldn't be read at all).
    pub fn no_parser(message: impl Into<String>) -> Self {
        Fatal { file_name: String::new(), pos: Pos::default(), message: message.into(), source_line: None, exit_code: None }
    }

    /// The interpreted program called `exit(status)`. Carried out through
    /// the same `Result<T, Fatal>` escape every other fatal condition uses,
    /// but callers should check `exit_code` and terminate quietly rather
    /// than rendering it as an error.
    pub fn exit(status: i32) -> Self {
        Fatal { file_name: String::new(), pos: Pos::default(), message: String::new(), source_line: None, exit_code: Some(status) }
    }

    pub fn with_source_line(mut self, line: impl Into<String>) -> Self {
        self.source_line = Some(line.into());
        self
    }
}

impl fmt::Display for Fatal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.file_name.is_empty() {
            writeln!(f, "{}", self.message)?;
        } else {
            writeln!(f, "{}:{}:{}: {}", self.file_name, self.pos.line, self.pos.column, self.message)?;
        }
        if let Some(line) = &self.source_line {
            writeln!(f, "{line}")?;
            let caret_column = self.pos.column.saturating_sub(1) as usize;
            writeln!(f, "{}^", " ".repeat(caret_column))?;
        }
        Ok(())
    }
}

impl std::error::Error for Fatal {}

pub type PicocResult<T> = Result<T, Fatal>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_decorates_with_position_and_caret() {
        let err = Fatal::new("t.c", Pos::new(3, 5), "unexpected token").with_source_line("  x = y +;");
        let rendered = err.to_string();
        assert!(rendered.contains("t.c:3:5: unexpected token"));
        assert!(rendered.contains("  x = y +;"));
        assert!(rendered.lines().last().unwrap().ends_with('^'));
    }

    #[test]
    fn no_parser_errors_have_no_file_context() {
        let err = Fatal::no_parser("file not found");
        assert_eq!(err.to_string().trim(), "file not found");
    }
}
