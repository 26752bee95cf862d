//! ZDCode compiler: builds the IR from a parsed tree, resolves calls, emits DECORATE.

mod config;
mod lower;

pub use config::{Config, ConfigError};
pub use lower::{build_actor, build_body, build_unit, find_function, resolve_calls, BuildContext};
pub use zdc_codegen_decorate::{emit, EmitOptions};
pub use zdc_syntax::{CompilationUnit, CompileError, Root};

/// Build and resolve a unit. The result is ready for `emit`.
pub fn build(root: &Root) -> Result<CompilationUnit, CompileError> {
    let mut unit = build_unit(root)?;
    resolve_calls(&mut unit)?;
    Ok(unit)
}

/// Parsed tree in, DECORATE text out. Any fault aborts the whole unit.
pub fn compile(root: &Root, config: &Config) -> Result<String, CompileError> {
    let unit = build(root)?;
    emit(&unit, &config.emit)
}

/// Same as `compile`, with the tree handed over as JSON.
pub fn compile_json(source: &str, config: &Config) -> Result<String, CompileError> {
    let root = Root::from_json(source)?;
    compile(&root, config)
}
