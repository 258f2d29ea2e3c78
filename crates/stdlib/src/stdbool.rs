//! `<stdbool.h>`: defines `bool`/`true`/`false` as the `#define`d macros
//! C89 code expects, matching how picoc's own header set hands them out as
//! prelude source rather than distinct types - this subset has no `_Bool`.

use picoc_interp::Include;

pub fn include() -> Include {
    Include { name: "stdbool", setup: None, functions: Vec::new(), prelude_c: Some("#define bool int\n#define true 1\n#define false 0\n") }
}
