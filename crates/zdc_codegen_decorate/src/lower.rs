//! Lower IR nodes to classified DECORATE lines. Jump offsets come from `Node::state_count`,
//! so every shape here must agree with it: only `LineKind::State` lines are counted.

use zdc_syntax::diagnostics::{CompileError, NodeKind, Site};
use zdc_syntax::ir::{
    body_state_count, CallSite, CompilationUnit, Conditional, Function, Label, Node, Repeat,
    WhileLoop,
};

use crate::render::{render_frame, render_literal};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    /// A state; the unit jump offsets count in.
    State,
    /// `Goto`, `Stop`, raw flow keywords.
    Flow,
    /// `Name:` declaration.
    Label,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    pub kind: LineKind,
    /// Nesting inside Repeat/If/While bodies; ignored for labels.
    pub depth: usize,
    pub text: String,
}

impl Line {
    fn state(depth: usize, text: impl Into<String>) -> Self {
        Self {
            kind: LineKind::State,
            depth,
            text: text.into(),
        }
    }

    fn flow(depth: usize, text: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Flow,
            depth,
            text: text.into(),
        }
    }

    fn label(depth: usize, name: &str) -> Self {
        Self {
            kind: LineKind::Label,
            depth,
            text: format!("{}:", name),
        }
    }
}

/// Number of state lines in `lines`.
pub fn count_states(lines: &[Line]) -> usize {
    lines.iter().filter(|l| l.kind == LineKind::State).count()
}

/// Lowering context: the unit (for call targets) and where we are, for fault context.
pub struct Lowerer<'u> {
    unit: &'u CompilationUnit,
    actor: &'u str,
    container: &'u str,
}

impl<'u> Lowerer<'u> {
    pub fn new(unit: &'u CompilationUnit, actor: &'u str, container: &'u str) -> Self {
        Self {
            unit,
            actor,
            container,
        }
    }

    pub fn lower_body(&self, nodes: &[Node], depth: usize) -> Result<Vec<Line>, CompileError> {
        let mut out = Vec::new();
        for node in nodes {
            self.lower_node(node, depth, &mut out)?;
        }
        Ok(out)
    }

    fn lower_node(
        &self,
        node: &Node,
        depth: usize,
        out: &mut Vec<Line>,
    ) -> Result<(), CompileError> {
        match node {
            Node::Frame(frame) => out.push(Line::state(depth, render_frame(frame))),
            Node::Flow(raw) => out.push(Line::flow(depth, raw.clone())),
            Node::Call(call) => self.lower_call(call, depth, out)?,
            Node::Repeat(repeat) => self.lower_repeat(repeat, depth, out)?,
            Node::If(cond) => self.lower_if(cond, depth, out)?,
            Node::While(lp) => self.lower_while(lp, depth, out)?,
        }
        Ok(())
    }

    /// Body emitted `count` times back to back; no branches.
    fn lower_repeat(
        &self,
        repeat: &Repeat,
        depth: usize,
        out: &mut Vec<Line>,
    ) -> Result<(), CompileError> {
        let body = self.lower_body(&repeat.body, depth + 1)?;
        for _ in 0..repeat.count {
            out.extend(body.iter().cloned());
        }
        Ok(())
    }

    fn lower_if(
        &self,
        cond: &Conditional,
        depth: usize,
        out: &mut Vec<Line>,
    ) -> Result<(), CompileError> {
        let inner = body_state_count(&cond.body);
        // false: skip the body, land on the pad
        out.push(Line::state(
            depth,
            format!("TNT1 A 0 A_JumpIf(!({}), {})", cond.condition, inner + 1),
        ));
        out.extend(self.lower_body(&cond.body, depth + 1)?);
        out.push(Line::state(depth, "TNT1 A 0"));
        Ok(())
    }

    fn lower_while(
        &self,
        lp: &WhileLoop,
        depth: usize,
        out: &mut Vec<Line>,
    ) -> Result<(), CompileError> {
        let inner = body_state_count(&lp.body);
        let entry = lp.id.entry_label();
        out.push(Line::label(depth, &entry));
        // false: skip body and back jump, land on the pad
        out.push(Line::state(
            depth,
            format!("TNT1 A 0 A_JumpIf(!({}), {})", lp.condition, inner + 2),
        ));
        out.extend(self.lower_body(&lp.body, depth + 1)?);
        out.push(Line::state(depth, format!("TNT1 A 0 A_Jump(255, \"{}\")", entry)));
        out.push(Line::state(depth, "TNT1 A 0"));
        Ok(())
    }

    fn lower_call(
        &self,
        call: &CallSite,
        depth: usize,
        out: &mut Vec<Line>,
    ) -> Result<(), CompileError> {
        let site = || Site::new(self.actor, Some(self.container), NodeKind::Call);
        let target = self
            .unit
            .call(call.id)
            .and_then(|record| record.target)
            .and_then(|r| self.unit.function(r))
            .ok_or_else(|| CompileError::UnresolvedFunction {
                site: site(),
                function: call.function.clone(),
            })?;
        if call.args.len() > target.params.len() {
            return Err(CompileError::ArgumentCount {
                site: site(),
                function: target.name.clone(),
                expected: target.params.len(),
                found: call.args.len(),
            });
        }

        for (param, arg) in target.params.iter().zip(&call.args) {
            out.push(Line::state(depth, format!("TNT1 A 0 A_TakeInventory(\"{}\")", param)));
            out.push(Line::state(
                depth,
                format!("TNT1 A 0 A_GiveInventory(\"{}\", {})", param, render_literal(arg)),
            ));
        }
        let flag = call.id.flag_slot();
        out.push(Line::state(depth, format!("TNT1 A 0 A_GiveInventory(\"{}\")", flag)));
        out.push(Line::flow(depth, format!("Goto {}", target.entry_label())));
        out.push(Line::label(depth, &call.id.resume_label()));
        out.push(Line::state(depth, format!("TNT1 A 0 A_TakeInventory(\"{}\")", flag)));
        Ok(())
    }
}

/// `F_<name>:`, the body, then one dispatch test per registered call.
pub fn lower_function(
    unit: &CompilationUnit,
    actor: &str,
    function: &Function,
) -> Result<Vec<Line>, CompileError> {
    let mut out = vec![Line::label(0, &function.entry_label())];
    out.extend(Lowerer::new(unit, actor, &function.name).lower_body(&function.body, 0)?);
    for id in &function.calls {
        out.push(Line::state(
            0,
            format!(
                "TNT1 A 0 A_JumpIfInventory(\"{}\", 1, \"{}\")",
                id.flag_slot(),
                id.resume_label()
            ),
        ));
    }
    Ok(out)
}

pub fn lower_label(
    unit: &CompilationUnit,
    actor: &str,
    label: &Label,
) -> Result<Vec<Line>, CompileError> {
    let mut out = vec![Line::label(0, &label_name(&label.name))];
    out.extend(Lowerer::new(unit, actor, &label.name).lower_body(&label.body, 0)?);
    Ok(out)
}

/// User labels may not shadow function entry labels.
pub fn label_name(name: &str) -> String {
    if name.starts_with("F_") {
        format!("_{}", name)
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zdc_syntax::ast::Literal;
    use zdc_syntax::ir::{CallId, CallRecord, Frame, FunctionRef, LoopId};
    use zdc_syntax::Actor;

    fn frame(letter: char) -> Node {
        Node::Frame(Frame {
            sprite: "TNT1".to_string(),
            frame: letter,
            duration: 1,
            modifiers: vec![],
            action: None,
        })
    }

    fn texts(lines: &[Line]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    fn lower(nodes: &[Node]) -> Vec<Line> {
        let unit = CompilationUnit::default();
        Lowerer::new(&unit, "Test", "Spawn")
            .lower_body(nodes, 0)
            .expect("lower")
    }

    #[test]
    fn repeat_unrolls_without_jumps() {
        let lines = lower(&[Node::Repeat(Repeat {
            count: 3,
            body: vec![frame('A')],
        })]);
        assert_eq!(texts(&lines), ["TNT1 A 1", "TNT1 A 1", "TNT1 A 1"]);
        assert!(lines.iter().all(|l| !l.text.contains("Jump")));
    }

    #[test]
    fn if_skips_body_plus_one() {
        let lines = lower(&[Node::If(Conditional {
            condition: "health < 10".to_string(),
            body: vec![frame('A'), frame('B')],
        })]);
        assert_eq!(
            texts(&lines),
            [
                "TNT1 A 0 A_JumpIf(!(health < 10), 3)",
                "TNT1 A 1",
                "TNT1 B 1",
                "TNT1 A 0"
            ]
        );
    }

    #[test]
    fn while_has_entry_guard_back_edge_and_pad() {
        let lines = lower(&[Node::While(WhileLoop {
            id: LoopId(7),
            condition: "x".to_string(),
            body: vec![frame('A')],
        })]);
        assert_eq!(
            texts(&lines),
            [
                "_WhileBlock7:",
                "TNT1 A 0 A_JumpIf(!(x), 3)",
                "TNT1 A 1",
                "TNT1 A 0 A_Jump(255, \"_WhileBlock7\")",
                "TNT1 A 0"
            ]
        );
        assert_eq!(count_states(&lines), 4);
    }

    #[test]
    fn flow_is_not_a_state() {
        let node = Node::If(Conditional {
            condition: "x".to_string(),
            body: vec![frame('A'), Node::Flow("stop".to_string())],
        });
        let lines = lower(std::slice::from_ref(&node));
        assert_eq!(count_states(&lines), node.state_count());
        assert_eq!(lines[0].text, "TNT1 A 0 A_JumpIf(!(x), 2)");
    }

    fn unit_with_function(params: &[&str]) -> CompilationUnit {
        let mut actor = Actor::new("Imp");
        actor.functions.push(Function {
            name: "Hurt".to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
            body: vec![frame('A')],
            calls: vec![CallId(0)],
        });
        CompilationUnit {
            actors: vec![actor],
            calls: vec![CallRecord {
                id: CallId(0),
                actor: 0,
                site: "Spawn".to_string(),
                function: "Hurt".to_string(),
                arg_count: 1,
                target: Some(FunctionRef {
                    actor: 0,
                    function: 0,
                }),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn call_site_assigns_params_then_jumps_and_resumes() {
        let unit = unit_with_function(&["dmg"]);
        let call = Node::Call(CallSite {
            id: CallId(0),
            function: "Hurt".to_string(),
            args: vec![Literal::Number(20.0)],
        });
        let lines = Lowerer::new(&unit, "Imp", "Spawn")
            .lower_body(std::slice::from_ref(&call), 0)
            .expect("lower");
        assert_eq!(
            texts(&lines),
            [
                "TNT1 A 0 A_TakeInventory(\"dmg\")",
                "TNT1 A 0 A_GiveInventory(\"dmg\", 20)",
                "TNT1 A 0 A_GiveInventory(\"_Call0\")",
                "Goto F_Hurt",
                "_CLabel0:",
                "TNT1 A 0 A_TakeInventory(\"_Call0\")"
            ]
        );
        assert_eq!(count_states(&lines), call.state_count());
    }

    #[test]
    fn function_appends_dispatch_table() {
        let unit = unit_with_function(&["dmg"]);
        let lines = lower_function(&unit, "Imp", &unit.actors[0].functions[0]).expect("lower");
        assert_eq!(
            texts(&lines),
            [
                "F_Hurt:",
                "TNT1 A 1",
                "TNT1 A 0 A_JumpIfInventory(\"_Call0\", 1, \"_CLabel0\")"
            ]
        );
    }

    #[test]
    fn unresolved_call_is_reported_with_site() {
        let unit = CompilationUnit::default();
        let call = Node::Call(CallSite {
            id: CallId(0),
            function: "Nope".to_string(),
            args: vec![],
        });
        let err = Lowerer::new(&unit, "Imp", "Death")
            .lower_body(&[call], 0)
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::UnresolvedFunction {
                site: Site::new("Imp", Some("Death"), NodeKind::Call),
                function: "Nope".to_string(),
            }
        );
    }

    #[test]
    fn labels_shadowing_function_prefix_are_escaped() {
        assert_eq!(label_name("F_Spawn"), "_F_Spawn");
        assert_eq!(label_name("Spawn"), "Spawn");
    }
}
