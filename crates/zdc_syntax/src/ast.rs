//! Parse-tree types handed over by the external ZDCode parser (actors, labels, functions, states).

use serde::{Deserialize, Serialize};

use crate::diagnostics::CompileError;

/// Root of a compilation: every actor declared in the source, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Root {
    pub actors: Vec<ActorDecl>,
}

impl Root {
    /// Decode a parse tree serialized as JSON. Any tag outside the closed node set is a
    /// malformed-tree fault.
    pub fn from_json(source: &str) -> Result<Root, CompileError> {
        serde_json::from_str(source).map_err(|e| CompileError::MalformedTree {
            detail: e.to_string(),
        })
    }
}

/// Actor declaration: `%Name : Parent -> Replaced *1234 { ... };`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActorDecl {
    pub classname: String,
    #[serde(default)]
    pub inherit: Option<String>,
    #[serde(default)]
    pub replace: Option<String>,
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub body: Vec<ActorItem>,
}

/// One entry of an actor body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorItem {
    Property { name: String, value: Literal },
    Flag(String),
    /// Raw flag line passed through verbatim (e.g. `MONSTER`).
    FlagCombo(String),
    Unflag(String),
    Label(LabelDecl),
    Function(FunctionDecl),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelDecl {
    pub name: String,
    #[serde(default)]
    pub body: Vec<StateItem>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub body: Vec<StateItem>,
}

/// One entry of a label or function body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateItem {
    Frames(FramesDecl),
    Call(CallDecl),
    /// Flow keyword passed through verbatim (`stop`, `loop`, `goto Spawn`).
    Flow(String),
    Repeat {
        count: u32,
        body: Vec<StateItem>,
    },
    If {
        condition: String,
        body: Vec<StateItem>,
    },
    While {
        condition: String,
        body: Vec<StateItem>,
    },
}

/// `SPRT ABC 5 [Bright] @A_Look;`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FramesDecl {
    pub sprite: String,
    /// Frame letters; one state per character.
    pub frames: String,
    pub duration: i32,
    #[serde(default)]
    pub modifiers: Vec<String>,
    #[serde(default)]
    pub action: Option<ActionBody>,
}

/// Inline action of a frame: a single call or a `{ ... }` block of them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionBody {
    Action(ActionCall),
    Block(Vec<ActionBody>),
}

impl ActionBody {
    /// All actions in source order, nested blocks flattened.
    pub fn flatten(&self) -> Vec<&ActionCall> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into<'a>(&'a self, out: &mut Vec<&'a ActionCall>) {
        match self {
            ActionBody::Action(a) => out.push(a),
            ActionBody::Block(items) => {
                for item in items {
                    item.flatten_into(out);
                }
            }
        }
    }
}

/// `A_Name(arg, ...)`; `args: None` means the bare name without parentheses.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionCall {
    pub name: String,
    #[serde(default)]
    pub args: Option<Vec<Literal>>,
}

/// `(Func)(arg, ...);` optionally repeated: `*3 : (Func);`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallDecl {
    pub function: String,
    #[serde(default)]
    pub args: Vec<Literal>,
    #[serde(default = "one")]
    pub repeats: u32,
}

fn one() -> u32 {
    1
}

/// Tagged literal used in property values and action arguments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Number(f64),
    String(String),
    ActorVariable(String),
    CallExpr(ActionCall),
}
