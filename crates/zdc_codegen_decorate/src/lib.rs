//! DECORATE codegen for ZDCode: lowers a resolved compilation unit to target text.

mod lower;
mod render;
mod writer;

use serde::{Deserialize, Serialize};
use zdc_syntax::diagnostics::CompileError;
use zdc_syntax::ir::CompilationUnit;

pub use lower::{count_states, label_name, lower_function, lower_label, Line, LineKind, Lowerer};
pub use render::{render_action, render_frame, render_literal};
pub use writer::DecorateWriter;

/// Output shape knobs; the defaults reproduce the classic ZDCode layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitOptions {
    /// Spaces per indent level.
    pub indent_width: usize,
    /// `Inventory.MaxAmount` of parameter slots. Call flags always use 1.
    pub parameter_max_amount: u32,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            indent_width: 4,
            parameter_max_amount: 1,
        }
    }
}

/// Emit the slot block and every actor, sorted by name. The unit must have been resolved;
/// an unresolved call is reported rather than guessed.
pub fn emit(unit: &CompilationUnit, options: &EmitOptions) -> Result<String, CompileError> {
    let mut writer = DecorateWriter::new(options);
    writer.write_unit(unit)?;
    let text = writer.finish();
    tracing::debug!(
        actors = unit.actors.len(),
        slots = unit.slots.len(),
        bytes = text.len(),
        "emitted DECORATE"
    );
    Ok(text)
}
