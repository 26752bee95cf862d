//! IR for ZDCode: built once from the parse tree, then consumed by the DECORATE emitter.
//! No mutation after resolution; state counts here drive every jump offset the emitter writes.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::ast::{ActionCall, Literal};

/// Unit-wide call id; also names the call's flag slot and resume label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallId(pub u32);

impl CallId {
    /// Global flag set while this call is waiting to be resumed.
    pub fn flag_slot(self) -> String {
        format!("_Call{}", self.0)
    }

    pub fn resume_label(self) -> String {
        format!("_CLabel{}", self.0)
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unit-wide while-loop id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoopId(pub u32);

impl LoopId {
    pub fn entry_label(self) -> String {
        format!("_WhileBlock{}", self.0)
    }
}

/// Handle to a function: actor index, then function index within that actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FunctionRef {
    pub actor: usize,
    pub function: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotKind {
    /// `_Call<id>`: set by a call site, tested by the dispatch table.
    CallFlag,
    /// Simulated argument, named after the parameter.
    Parameter,
}

/// Global inventory item used as a flag or a variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slot {
    pub name: String,
    pub kind: SlotKind,
}

/// Name-deduplicated slots in first-use order. Shared by the whole unit, so two
/// functions with a parameter of the same name share one slot.
#[derive(Clone, Debug, Default)]
pub struct SlotRegistry {
    slots: Vec<Slot>,
    index: HashMap<String, usize>,
}

impl SlotRegistry {
    /// Declare `name` unless it already exists. Returns true if a new slot was created.
    pub fn declare(&mut self, name: &str, kind: SlotKind) -> bool {
        if self.index.contains_key(name) {
            return false;
        }
        self.index.insert(name.to_string(), self.slots.len());
        self.slots.push(Slot {
            name: name.to_string(),
            kind,
        });
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// One animation-frame state.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub sprite: String,
    pub frame: char,
    pub duration: i32,
    pub modifiers: Vec<String>,
    pub action: Option<ActionCall>,
}

/// Invocation of a named function from a label or function body.
#[derive(Clone, Debug, PartialEq)]
pub struct CallSite {
    pub id: CallId,
    pub function: String,
    pub args: Vec<Literal>,
}

/// Fully unrolled repetition.
#[derive(Clone, Debug, PartialEq)]
pub struct Repeat {
    pub count: u32,
    pub body: Vec<Node>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Conditional {
    pub condition: String,
    pub body: Vec<Node>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WhileLoop {
    pub id: LoopId,
    pub condition: String,
    pub body: Vec<Node>,
}

/// Body node of a label or function.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Frame(Frame),
    /// Verbatim flow keyword; not a state.
    Flow(String),
    Call(CallSite),
    Repeat(Repeat),
    If(Conditional),
    While(WhileLoop),
}

impl Node {
    /// Number of states this node compiles to. Labels and flow keywords are not states.
    /// Must match what the emitter produces, line for line.
    pub fn state_count(&self) -> usize {
        match self {
            Node::Frame(_) => 1,
            Node::Flow(_) => 0,
            // take + give per argument, then set flag and clear flag
            Node::Call(c) => 2 * c.args.len() + 2,
            Node::Repeat(r) => r.count as usize * body_state_count(&r.body),
            // guard + landing pad
            Node::If(c) => body_state_count(&c.body) + 2,
            // guard + back jump + landing pad
            Node::While(w) => body_state_count(&w.body) + 3,
        }
    }
}

pub fn body_state_count(nodes: &[Node]) -> usize {
    nodes.iter().map(Node::state_count).sum()
}

#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub name: String,
    pub body: Vec<Node>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub name: String,
    /// Parameter names; each is also the name of its slot.
    pub params: Vec<String>,
    pub body: Vec<Node>,
    /// Calls targeting this function, in registration order. Filled by resolution.
    pub calls: Vec<CallId>,
}

impl Function {
    pub fn entry_label(&self) -> String {
        format!("F_{}", self.name)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Actor {
    pub name: String,
    pub inherit: Option<String>,
    pub replace: Option<String>,
    pub number: Option<u32>,
    /// Keyed by name: sorted on emission, last assignment wins.
    pub properties: BTreeMap<String, Literal>,
    pub flags: Vec<String>,
    pub antiflags: Vec<String>,
    pub raw: Vec<String>,
    pub labels: Vec<Label>,
    pub functions: Vec<Function>,
}

impl Actor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn function_index(&self, name: &str) -> Option<usize> {
        self.functions.iter().position(|f| f.name == name)
    }

    /// Insert a label; a same-named label is replaced in place. Returns true on replacement.
    pub fn put_label(&mut self, label: Label) -> bool {
        match self.labels.iter_mut().find(|l| l.name == label.name) {
            Some(slot) => {
                *slot = label;
                true
            }
            None => {
                self.labels.push(label);
                false
            }
        }
    }

    /// Insert a function; a same-named function is replaced in place. Returns true on replacement.
    pub fn put_function(&mut self, function: Function) -> bool {
        match self.function_index(&function.name) {
            Some(i) => {
                self.functions[i] = function;
                true
            }
            None => {
                self.functions.push(function);
                false
            }
        }
    }

    pub fn has_states(&self) -> bool {
        !self.labels.is_empty() || !self.functions.is_empty()
    }
}

/// Entry of the unit-wide call table; index = call id.
#[derive(Clone, Debug, PartialEq)]
pub struct CallRecord {
    pub id: CallId,
    /// Index of the actor whose label/function contains the call.
    pub actor: usize,
    /// Name of the label or function containing the call.
    pub site: String,
    pub function: String,
    pub arg_count: usize,
    /// Set by the resolution pass.
    pub target: Option<FunctionRef>,
}

/// Whole compilation: actors plus the three unit-wide registries.
#[derive(Clone, Debug, Default)]
pub struct CompilationUnit {
    pub slots: SlotRegistry,
    pub actors: Vec<Actor>,
    /// Global call table; `calls[i].id == CallId(i)`.
    pub calls: Vec<CallRecord>,
    /// Next while-loop id.
    pub loops: u32,
}

impl CompilationUnit {
    pub fn call(&self, id: CallId) -> Option<&CallRecord> {
        self.calls.get(id.0 as usize)
    }

    pub fn function(&self, r: FunctionRef) -> Option<&Function> {
        self.actors.get(r.actor)?.functions.get(r.function)
    }

    /// Actors ordered by name; same-named actors keep declaration order.
    pub fn actors_by_name(&self) -> Vec<&Actor> {
        let mut actors: Vec<&Actor> = self.actors.iter().collect();
        actors.sort_by(|a, b| a.name.cmp(&b.name));
        actors
    }
}
