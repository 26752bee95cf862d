//! Compile faults with the actor/label/node context needed to report them.
//! Every fault aborts the whole unit; formatting for users is left to the caller.

use std::fmt;
use thiserror::Error;

/// Kind of node a fault was raised on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Actor,
    Property,
    Label,
    Function,
    Frame,
    Call,
    Flow,
    Repeat,
    If,
    While,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeKind::Actor => "actor",
            NodeKind::Property => "property",
            NodeKind::Label => "label",
            NodeKind::Function => "function",
            NodeKind::Frame => "frame",
            NodeKind::Call => "call",
            NodeKind::Flow => "flow",
            NodeKind::Repeat => "repeat",
            NodeKind::If => "if",
            NodeKind::While => "while",
        };
        f.write_str(s)
    }
}

/// Where in the unit a fault happened: actor, enclosing label/function, node kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Site {
    pub actor: String,
    pub container: Option<String>,
    pub node: NodeKind,
}

impl Site {
    pub fn new(actor: impl Into<String>, container: Option<&str>, node: NodeKind) -> Self {
        Self {
            actor: actor.into(),
            container: container.map(str::to_string),
            node,
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.container {
            Some(c) => write!(f, "{} in {}::{}", self.node, self.actor, c),
            None => write!(f, "{} in {}", self.node, self.actor),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    /// Parse tree could not be decoded into the closed node set.
    #[error("malformed parse tree: {detail}")]
    MalformedTree { detail: String },

    /// A decoded node breaks the parser contract (empty frame set, empty name, ...).
    #[error("malformed {site}: {detail}")]
    MalformedNode { site: Site, detail: String },

    /// Call target missing from the actor's own and inherited function tables.
    #[error("{site}: call to unknown function `{function}`")]
    UnresolvedFunction { site: Site, function: String },

    #[error("{site}: `{function}` takes {expected} argument(s) but the call passes {found}")]
    ArgumentCount {
        site: Site,
        function: String,
        expected: usize,
        found: usize,
    },
}

impl CompileError {
    pub fn malformed(site: Site, detail: impl Into<String>) -> Self {
        CompileError::MalformedNode {
            site,
            detail: detail.into(),
        }
    }

    /// Context of the fault, when it is tied to a node.
    pub fn site(&self) -> Option<&Site> {
        match self {
            CompileError::MalformedTree { .. } => None,
            CompileError::MalformedNode { site, .. }
            | CompileError::UnresolvedFunction { site, .. }
            | CompileError::ArgumentCount { site, .. } => Some(site),
        }
    }
}
