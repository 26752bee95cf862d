//! Lower the parse tree to IR: build pass, then call resolution.

mod resolve;
mod to_ir;

pub use resolve::{find_function, resolve_calls};
pub use to_ir::{build_actor, build_body, build_unit, BuildContext};
