//! Build the IR from the parse tree. One pass over actors in declaration order; calls, slots
//! and loop ids are drawn from the unit registries through `BuildContext`.

use tracing::{trace, warn};
use zdc_syntax::ast::{ActionCall, ActorDecl, ActorItem, CallDecl, FramesDecl, Root, StateItem};
use zdc_syntax::diagnostics::{CompileError, NodeKind, Site};
use zdc_syntax::ir::{
    Actor, CallId, CallRecord, CallSite, CompilationUnit, Conditional, Frame, Function, Label,
    LoopId, Node, Repeat, SlotKind, SlotRegistry, WhileLoop,
};

/// Unit-wide registries plus the actor/container currently being built.
pub struct BuildContext<'u> {
    slots: &'u mut SlotRegistry,
    calls: &'u mut Vec<CallRecord>,
    loops: &'u mut u32,
    actor_index: usize,
    actor: String,
    container: String,
}

impl<'u> BuildContext<'u> {
    pub fn new(unit: &'u mut CompilationUnit, actor_index: usize, actor: &str) -> Self {
        Self {
            slots: &mut unit.slots,
            calls: &mut unit.calls,
            loops: &mut unit.loops,
            actor_index,
            actor: actor.to_string(),
            container: String::new(),
        }
    }

    fn site(&self, node: NodeKind) -> Site {
        let container = (!self.container.is_empty()).then_some(self.container.as_str());
        Site::new(self.actor.as_str(), container, node)
    }

    fn declare_slot(&mut self, name: &str, kind: SlotKind) {
        if self.slots.declare(name, kind) {
            trace!(slot = name, ?kind, "declared slot");
        }
    }

    /// Register one call: fresh id, call-table entry, flag slot.
    fn register_call(&mut self, decl: &CallDecl) -> CallSite {
        let id = CallId(self.calls.len() as u32);
        self.calls.push(CallRecord {
            id,
            actor: self.actor_index,
            site: self.container.clone(),
            function: decl.function.clone(),
            arg_count: decl.args.len(),
            target: None,
        });
        self.declare_slot(&id.flag_slot(), SlotKind::CallFlag);
        trace!(
            call = id.0,
            actor = %self.actor,
            site = %self.container,
            function = %decl.function,
            "registered call"
        );
        CallSite {
            id,
            function: decl.function.clone(),
            args: decl.args.clone(),
        }
    }

    fn next_loop(&mut self) -> LoopId {
        let id = LoopId(*self.loops);
        *self.loops += 1;
        id
    }
}

/// Build every actor; calls are left unresolved.
pub fn build_unit(root: &Root) -> Result<CompilationUnit, CompileError> {
    let mut unit = CompilationUnit::default();
    for decl in &root.actors {
        let index = unit.actors.len();
        let actor = {
            let mut cx = BuildContext::new(&mut unit, index, &decl.classname);
            build_actor(&mut cx, decl)?
        };
        unit.actors.push(actor);
    }
    tracing::debug!(
        actors = unit.actors.len(),
        calls = unit.calls.len(),
        slots = unit.slots.len(),
        loops = unit.loops,
        "built IR"
    );
    Ok(unit)
}

pub fn build_actor(cx: &mut BuildContext<'_>, decl: &ActorDecl) -> Result<Actor, CompileError> {
    if decl.classname.is_empty() {
        return Err(CompileError::malformed(cx.site(NodeKind::Actor), "actor without a class name"));
    }
    let mut actor = Actor::new(decl.classname.as_str());
    actor.inherit = decl.inherit.clone();
    actor.replace = decl.replace.clone();
    actor.number = decl.number;

    for item in &decl.body {
        match item {
            ActorItem::Property { name, value } => {
                if name.is_empty() {
                    return Err(CompileError::malformed(
                        cx.site(NodeKind::Property),
                        "property without a name",
                    ));
                }
                actor.properties.insert(name.clone(), value.clone());
            }
            ActorItem::Flag(flag) => actor.flags.push(flag.clone()),
            ActorItem::FlagCombo(raw) => actor.raw.push(raw.clone()),
            ActorItem::Unflag(flag) => actor.antiflags.push(flag.clone()),
            ActorItem::Label(l) => {
                cx.container = l.name.clone();
                if l.name.is_empty() {
                    return Err(CompileError::malformed(
                        cx.site(NodeKind::Label),
                        "label without a name",
                    ));
                }
                let body = build_body(cx, &l.body)?;
                let replaced = actor.put_label(Label {
                    name: l.name.clone(),
                    body,
                });
                if replaced {
                    warn!(
                        actor = %actor.name,
                        label = %l.name,
                        "duplicate label; last declaration wins"
                    );
                }
            }
            ActorItem::Function(f) => {
                cx.container = f.name.clone();
                if f.name.is_empty() {
                    return Err(CompileError::malformed(
                        cx.site(NodeKind::Function),
                        "function without a name",
                    ));
                }
                for param in &f.params {
                    cx.declare_slot(param, SlotKind::Parameter);
                }
                let body = build_body(cx, &f.body)?;
                let replaced = actor.put_function(Function {
                    name: f.name.clone(),
                    params: f.params.clone(),
                    body,
                    calls: Vec::new(),
                });
                if replaced {
                    warn!(
                        actor = %actor.name,
                        function = %f.name,
                        "duplicate function; last declaration wins"
                    );
                }
            }
        }
        cx.container.clear();
    }
    Ok(actor)
}

pub fn build_body(
    cx: &mut BuildContext<'_>,
    items: &[StateItem],
) -> Result<Vec<Node>, CompileError> {
    let mut out = Vec::new();
    for item in items {
        build_state(cx, item, &mut out)?;
    }
    Ok(out)
}

fn build_state(
    cx: &mut BuildContext<'_>,
    item: &StateItem,
    out: &mut Vec<Node>,
) -> Result<(), CompileError> {
    match item {
        StateItem::Frames(f) => build_frames(cx, f, out)?,
        StateItem::Call(c) => {
            if c.function.is_empty() {
                return Err(CompileError::malformed(
                    cx.site(NodeKind::Call),
                    "call without a function name",
                ));
            }
            // `*N : (F);` is N independent calls, each with its own id
            for _ in 0..c.repeats.max(1) {
                out.push(Node::Call(cx.register_call(c)));
            }
        }
        StateItem::Flow(raw) => out.push(Node::Flow(raw.clone())),
        StateItem::Repeat { count, body } => {
            let body = build_body(cx, body)?;
            out.push(Node::Repeat(Repeat { count: *count, body }));
        }
        StateItem::If { condition, body } => {
            let body = build_body(cx, body)?;
            out.push(Node::If(Conditional {
                condition: condition.clone(),
                body,
            }));
        }
        StateItem::While { condition, body } => {
            let id = cx.next_loop();
            trace!(loop_id = id.0, actor = %cx.actor, "registered while loop");
            let body = build_body(cx, body)?;
            out.push(Node::While(WhileLoop {
                id,
                condition: condition.clone(),
                body,
            }));
        }
    }
    Ok(())
}

/// One Frame per letter. With an inline action, the action goes on the last letter only and
/// every earlier letter gets duration 0, so the action fires once. A block of actions puts one
/// state per action on the last letter, only the final one keeping the declared duration.
fn build_frames(
    cx: &BuildContext<'_>,
    decl: &FramesDecl,
    out: &mut Vec<Node>,
) -> Result<(), CompileError> {
    if decl.sprite.is_empty() {
        return Err(CompileError::malformed(cx.site(NodeKind::Frame), "frame without a sprite"));
    }
    let letters: Vec<char> = decl.frames.chars().collect();
    let Some((&last, earlier)) = letters.split_last() else {
        return Err(CompileError::malformed(
            cx.site(NodeKind::Frame),
            format!("sprite {} declares no frame letters", decl.sprite),
        ));
    };
    let frame = |letter: char, duration: i32, action: Option<ActionCall>| {
        Node::Frame(Frame {
            sprite: decl.sprite.clone(),
            frame: letter,
            duration,
            modifiers: decl.modifiers.clone(),
            action,
        })
    };

    let actions = decl.action.as_ref().map(|a| a.flatten()).unwrap_or_default();
    let Some((final_action, leading)) = actions.split_last() else {
        for &letter in &letters {
            out.push(frame(letter, decl.duration, None));
        }
        return Ok(());
    };
    for &letter in earlier {
        out.push(frame(letter, 0, None));
    }
    for &action in leading {
        out.push(frame(last, 0, Some(action.clone())));
    }
    out.push(frame(last, decl.duration, Some((*final_action).clone())));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use zdc_syntax::ast::{ActionBody, FunctionDecl, LabelDecl, Literal};

    fn frames(sprite: &str, letters: &str, duration: i32, action: Option<ActionBody>) -> StateItem {
        StateItem::Frames(FramesDecl {
            sprite: sprite.to_string(),
            frames: letters.to_string(),
            duration,
            modifiers: vec![],
            action,
        })
    }

    fn action(name: &str) -> ActionBody {
        ActionBody::Action(ActionCall {
            name: name.to_string(),
            args: None,
        })
    }

    fn call(function: &str, repeats: u32) -> StateItem {
        StateItem::Call(CallDecl {
            function: function.to_string(),
            args: vec![],
            repeats,
        })
    }

    fn actor(name: &str, body: Vec<ActorItem>) -> ActorDecl {
        ActorDecl {
            classname: name.to_string(),
            body,
            ..Default::default()
        }
    }

    fn label(name: &str, body: Vec<StateItem>) -> ActorItem {
        ActorItem::Label(LabelDecl {
            name: name.to_string(),
            body,
        })
    }

    fn frame_of(node: &Node) -> &Frame {
        match node {
            Node::Frame(f) => f,
            other => panic!("expected frame, got {:?}", other),
        }
    }

    fn spawn_body(unit: &CompilationUnit) -> &[Node] {
        &unit.actors[0].labels[0].body
    }

    #[test]
    fn frames_without_action_keep_duration() {
        let root = Root {
            actors: vec![actor("Imp", vec![label("Spawn", vec![frames("TROO", "AB", 10, None)])])],
        };
        let unit = build_unit(&root).expect("build");
        let body = spawn_body(&unit);
        assert_eq!(body.len(), 2);
        assert!(body.iter().all(|n| frame_of(n).duration == 10));
    }

    #[test]
    fn action_fires_once_on_last_letter() {
        let root = Root {
            actors: vec![actor(
                "Imp",
                vec![label("See", vec![frames("TROO", "ABC", 4, Some(action("A_Chase")))])],
            )],
        };
        let unit = build_unit(&root).expect("build");
        let body = spawn_body(&unit);
        let got: Vec<_> = body
            .iter()
            .map(frame_of)
            .map(|f| (f.frame, f.duration, f.action.as_ref().map(|a| a.name.as_str())))
            .collect();
        assert_eq!(got, [('A', 0, None), ('B', 0, None), ('C', 4, Some("A_Chase"))]);
    }

    #[test]
    fn action_block_expands_on_last_letter() {
        let block = ActionBody::Block(vec![action("A_FaceTarget"), action("A_TroopAttack")]);
        let root = Root {
            actors: vec![actor(
                "Imp",
                vec![label("Melee", vec![frames("TROO", "EF", 6, Some(block))])],
            )],
        };
        let unit = build_unit(&root).expect("build");
        let got: Vec<_> = spawn_body(&unit)
            .iter()
            .map(frame_of)
            .map(|f| (f.frame, f.duration, f.action.as_ref().map(|a| a.name.as_str())))
            .collect();
        assert_eq!(
            got,
            [('E', 0, None), ('F', 0, Some("A_FaceTarget")), ('F', 6, Some("A_TroopAttack"))]
        );
    }

    #[test]
    fn empty_frame_set_is_malformed() {
        let root = Root {
            actors: vec![actor("Imp", vec![label("Spawn", vec![frames("TROO", "", 1, None)])])],
        };
        let err = build_unit(&root).unwrap_err();
        assert_eq!(
            err.site(),
            Some(&Site::new("Imp", Some("Spawn"), NodeKind::Frame))
        );
    }

    #[test]
    fn repeated_call_explodes_with_fresh_ids_and_flag_slots() {
        let root = Root {
            actors: vec![actor(
                "Imp",
                vec![label("Spawn", vec![call("Roar", 3), call("Roar", 0)])],
            )],
        };
        let unit = build_unit(&root).expect("build");
        let ids: Vec<u32> = spawn_body(&unit)
            .iter()
            .map(|n| match n {
                Node::Call(c) => c.id.0,
                other => panic!("expected call, got {:?}", other),
            })
            .collect();
        assert_eq!(ids, [0, 1, 2, 3]);
        let slots: Vec<_> = unit.slots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(slots, ["_Call0", "_Call1", "_Call2", "_Call3"]);
        assert!(unit.calls.iter().all(|c| c.site == "Spawn" && c.target.is_none()));
    }

    #[test]
    fn loop_ids_are_unit_wide() {
        let lp = || StateItem::While {
            condition: "true".to_string(),
            body: vec![frames("TNT1", "A", 1, None)],
        };
        let root = Root {
            actors: vec![
                actor("A", vec![label("Spawn", vec![lp(), lp()])]),
                actor("B", vec![label("Spawn", vec![lp()])]),
            ],
        };
        let unit = build_unit(&root).expect("build");
        let ids: Vec<u32> = unit
            .actors
            .iter()
            .flat_map(|a| &a.labels[0].body)
            .map(|n| match n {
                Node::While(w) => w.id.0,
                other => panic!("expected while, got {:?}", other),
            })
            .collect();
        assert_eq!(ids, [0, 1, 2]);
        assert_eq!(unit.loops, 3);
    }

    #[test]
    fn function_params_declared_before_body_calls() {
        let root = Root {
            actors: vec![actor(
                "Imp",
                vec![ActorItem::Function(FunctionDecl {
                    name: "Hurt".to_string(),
                    params: vec!["dmg".to_string(), "kind".to_string()],
                    body: vec![call("Other", 1)],
                })],
            )],
        };
        let unit = build_unit(&root).expect("build");
        let slots: Vec<_> = unit.slots.iter().map(|s| (s.name.as_str(), s.kind)).collect();
        assert_eq!(
            slots,
            [
                ("dmg", SlotKind::Parameter),
                ("kind", SlotKind::Parameter),
                ("_Call0", SlotKind::CallFlag)
            ]
        );
        assert_eq!(unit.calls[0].site, "Hurt");
    }

    #[test]
    fn duplicate_label_last_wins() {
        let root = Root {
            actors: vec![actor(
                "Imp",
                vec![
                    label("Spawn", vec![frames("AAAA", "A", 1, None)]),
                    label("See", vec![]),
                    label("Spawn", vec![frames("BBBB", "B", 2, None)]),
                ],
            )],
        };
        let unit = build_unit(&root).expect("build");
        let labels = &unit.actors[0].labels;
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].name, "Spawn");
        assert_eq!(frame_of(&labels[0].body[0]).sprite, "BBBB");
    }

    #[test]
    fn properties_flags_and_raw_lines() {
        let root = Root {
            actors: vec![ActorDecl {
                classname: "Imp".to_string(),
                inherit: Some("DoomImp".to_string()),
                replace: Some("DoomImp".to_string()),
                number: Some(3001),
                body: vec![
                    ActorItem::Property {
                        name: "Health".to_string(),
                        value: Literal::Number(60.0),
                    },
                    ActorItem::Property {
                        name: "Health".to_string(),
                        value: Literal::Number(90.0),
                    },
                    ActorItem::Flag("SHOOTABLE".to_string()),
                    ActorItem::Unflag("NOGRAVITY".to_string()),
                    ActorItem::FlagCombo("MONSTER".to_string()),
                ],
            }],
        };
        let unit = build_unit(&root).expect("build");
        let a = &unit.actors[0];
        assert_eq!(a.properties.get("Health"), Some(&Literal::Number(90.0)));
        assert_eq!(a.flags, ["SHOOTABLE"]);
        assert_eq!(a.antiflags, ["NOGRAVITY"]);
        assert_eq!(a.raw, ["MONSTER"]);
        assert_eq!(a.number, Some(3001));
        assert!(!a.has_states());
    }
}
