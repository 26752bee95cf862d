//! Post-build resolution: bind every live call to its target function and fill the
//! functions' call tables (dispatch order = call id order).

use std::collections::HashSet;

use tracing::{debug, trace};
use zdc_syntax::diagnostics::{CompileError, NodeKind, Site};
use zdc_syntax::ir::{CallId, CompilationUnit, FunctionRef, Node};

pub fn resolve_calls(unit: &mut CompilationUnit) -> Result<(), CompileError> {
    // only calls that are emitted; bodies replaced by a later same-named declaration
    // and `repeat 0` bodies drop out here
    let mut live = Vec::new();
    for actor in &unit.actors {
        for f in &actor.functions {
            collect_calls(&f.body, &mut live);
        }
        for l in &actor.labels {
            collect_calls(&l.body, &mut live);
        }
    }
    live.sort();

    for id in &live {
        let Some(record) = unit.call(*id) else { continue };
        let actor_name = unit.actors[record.actor].name.clone();
        let site = || Site::new(actor_name.as_str(), Some(record.site.as_str()), NodeKind::Call);

        let target = find_function(unit, record.actor, &record.function).ok_or_else(|| {
            CompileError::UnresolvedFunction {
                site: site(),
                function: record.function.clone(),
            }
        })?;
        let params = unit.function(target).map_or(0, |f| f.params.len());
        if record.arg_count > params {
            return Err(CompileError::ArgumentCount {
                site: site(),
                function: record.function.clone(),
                expected: params,
                found: record.arg_count,
            });
        }
        trace!(call = id.0, function = %record.function, owner = target.actor, "resolved call");

        unit.calls[id.0 as usize].target = Some(target);
        unit.actors[target.actor].functions[target.function].calls.push(*id);
    }
    debug!(resolved = live.len(), registered = unit.calls.len(), "resolved calls");
    Ok(())
}

fn collect_calls(nodes: &[Node], out: &mut Vec<CallId>) {
    for node in nodes {
        match node {
            Node::Call(c) => out.push(c.id),
            Node::Repeat(r) if r.count > 0 => collect_calls(&r.body, out),
            Node::Repeat(_) => {}
            Node::If(c) => collect_calls(&c.body, out),
            Node::While(w) => collect_calls(&w.body, out),
            Node::Frame(_) | Node::Flow(_) => {}
        }
    }
}

/// Look `name` up in the actor, then along its `inherit` chain. Parents are matched by
/// name anywhere in the unit; a cycle ends the walk.
pub fn find_function(unit: &CompilationUnit, actor: usize, name: &str) -> Option<FunctionRef> {
    let mut seen = HashSet::new();
    let mut current = Some(actor);
    while let Some(index) = current {
        if !seen.insert(index) {
            break;
        }
        let a = unit.actors.get(index)?;
        if let Some(function) = a.function_index(name) {
            return Some(FunctionRef {
                actor: index,
                function,
            });
        }
        current = a
            .inherit
            .as_deref()
            .and_then(|parent| unit.actors.iter().position(|p| p.name == parent));
    }
    None
}
