//! DECORATE text assembly: slot block, actor headers, property blocks, States blocks.

use zdc_syntax::diagnostics::CompileError;
use zdc_syntax::ir::{Actor, CompilationUnit, Slot, SlotKind};

use crate::lower::{lower_function, lower_label, Line, LineKind};
use crate::render::render_literal;
use crate::EmitOptions;

/// Writes one unit. Indent levels: 1 = actor body, 2 = labels, 3+ = states.
pub struct DecorateWriter<'o> {
    options: &'o EmitOptions,
    output: String,
}

impl<'o> DecorateWriter<'o> {
    pub fn new(options: &'o EmitOptions) -> Self {
        Self {
            options,
            output: String::new(),
        }
    }

    pub fn finish(self) -> String {
        self.output
    }

    fn indent(&mut self, level: usize) {
        for _ in 0..level * self.options.indent_width {
            self.output.push(' ');
        }
    }

    fn line(&mut self, level: usize, text: &str) {
        self.indent(level);
        self.output.push_str(text);
        self.output.push('\n');
    }

    /// Slot block first (if any), then actors by name; blocks separated by two blank lines.
    pub fn write_unit(&mut self, unit: &CompilationUnit) -> Result<(), CompileError> {
        let mut first = true;
        if !unit.slots.is_empty() {
            for slot in unit.slots.iter() {
                self.write_slot(slot);
            }
            first = false;
        }
        for actor in unit.actors_by_name() {
            if !first {
                self.output.push_str("\n\n");
            }
            self.write_actor(unit, actor)?;
            first = false;
        }
        Ok(())
    }

    fn write_slot(&mut self, slot: &Slot) {
        let max = match slot.kind {
            SlotKind::CallFlag => 1,
            SlotKind::Parameter => self.options.parameter_max_amount,
        };
        self.line(
            0,
            &format!("Actor {} : Inventory {{Inventory.MaxAmount {}}}", slot.name, max),
        );
    }

    pub fn write_actor(
        &mut self,
        unit: &CompilationUnit,
        actor: &Actor,
    ) -> Result<(), CompileError> {
        self.line(0, &format!("Actor {}", header(actor)));
        self.line(0, "{");

        let top = top_block(actor);
        for text in &top {
            if text.is_empty() {
                self.output.push('\n');
            } else {
                self.line(1, text);
            }
        }

        if actor.has_states() {
            if !top.is_empty() {
                self.output.push('\n');
            }
            self.line(1, "States {");
            let mut blocks = Vec::new();
            for f in &actor.functions {
                blocks.push(lower_function(unit, &actor.name, f)?);
            }
            for l in &actor.labels {
                blocks.push(lower_label(unit, &actor.name, l)?);
            }
            for (i, block) in blocks.iter().enumerate() {
                if i > 0 {
                    self.output.push('\n');
                }
                self.write_lines(block);
            }
            self.line(1, "}");
        }

        self.line(0, "}");
        Ok(())
    }

    fn write_lines(&mut self, lines: &[Line]) {
        for l in lines {
            match l.kind {
                LineKind::Label => self.line(2, &l.text),
                LineKind::State | LineKind::Flow => self.line(3 + l.depth, &l.text),
            }
        }
    }
}

/// `Name[ : Parent][ replaces Target][ 1234]`
fn header(actor: &Actor) -> String {
    let mut r = actor.name.clone();
    if let Some(parent) = &actor.inherit {
        r.push_str(&format!(" : {}", parent));
    }
    if let Some(target) = &actor.replace {
        r.push_str(&format!(" replaces {}", target));
    }
    if let Some(num) = actor.number {
        r.push_str(&format!(" {}", num));
    }
    r
}

/// Properties, then flags/antiflags/raw lines, groups split by an empty entry.
fn top_block(actor: &Actor) -> Vec<String> {
    let props: Vec<String> = actor
        .properties
        .iter()
        .map(|(name, value)| format!("{} {}", name, render_literal(value)))
        .collect();
    let flags: Vec<String> = actor
        .flags
        .iter()
        .map(|f| format!("+{}", f))
        .chain(actor.antiflags.iter().map(|f| format!("-{}", f)))
        .chain(actor.raw.iter().cloned())
        .collect();

    let mut out = props;
    if !out.is_empty() && !flags.is_empty() {
        out.push(String::new());
    }
    out.extend(flags);
    out
}
