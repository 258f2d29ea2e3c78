//! picoc-stdlib: the nine built-in headers (`stdio`, `string`, `math`,
//! `errno`, `time`, `ctype`, `stdlib`, `unistd`, `stdbool`) the library
//! bridge can `#include` or pull in wholesale via `IncludeAllSystemHeaders`.
//!
//! Each header module exposes a single `include() -> picoc_interp::Include`
//! constructor; `register_all` is the one call site a host needs, mirroring
//! the teacher's registry-building style (`compiler/src/builtins.rs`) while
//! actually wiring real callable functions rather than metadata.

mod cstdlib;
mod ctype;
mod errno;
mod helpers;
mod math;
mod stdbool;
mod stdio;
mod string;
mod time;
mod unistd;

use picoc_interp::Ctx;

/// Register every header with `ctx`'s library registry. Headers are not
/// included (their natives aren't callable, their prelude C isn't parsed)
/// until `#include` or `IncludeAllSystemHeaders` names them - this only
/// makes them *known*.
pub fn register_all(ctx: &mut Ctx) {
    tracing::debug!("registering built-in headers");
    ctx.library.register(stdio::include());
    ctx.library.register(string::include());
    ctx.library.register(math::include());
    ctx.library.register(errno::include());
    ctx.library.register(time::include());
    ctx.library.register(ctype::include());
    ctx.library.register(cstdlib::include());
    ctx.library.register(unistd::include());
    ctx.library.register(stdbool::include());
}
