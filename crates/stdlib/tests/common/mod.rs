//! Shared test scaffolding: a `Write`-backed sink the test can read back
//! after the interpreter has run, since `Io::stdout` is a `Box<dyn Write>`
//! and a plain `Vec<u8>` moved into one can't be inspected afterwards.

use std::io::{self, Write as _};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn new() -> Self {
        SharedBuf::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Builds a fresh `Ctx` with every built-in header registered and included,
/// stdout captured in a `SharedBuf`, stdin empty.
pub fn new_ctx() -> (picoc_interp::Ctx, SharedBuf) {
    let out = SharedBuf::new();
    let io = picoc_runtime::Io { stdout: Box::new(out.clone()), stderr: Box::new(Vec::new()), stdin: Box::new(io::empty()) };
    let mut ctx = picoc_interp::Ctx::new(picoc_runtime::InterpreterState::new(256 * 1024, io));
    picoc_stdlib::register_all(&mut ctx);
    picoc_interp::include_all_system_headers(&mut ctx).expect("registering built-in headers must not fail");
    (ctx, out)
}

/// Parses `source` and calls `main` with no arguments, returning what ended
/// up in stdout. Panics (failing the test) on any `Fatal`.
pub fn run(source: &str) -> String {
    let (mut ctx, out) = new_ctx();
    picoc_interp::parse(&mut ctx, "t.c", source).expect("parse/run failed");
    picoc_interp::call_main(&mut ctx, &["t.c".to_string()]).expect("call_main failed");
    out.contents()
}
