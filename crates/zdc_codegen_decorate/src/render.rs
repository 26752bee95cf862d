//! Literal and action rendering for DECORATE argument lists.

use zdc_syntax::ast::{ActionCall, Literal};
use zdc_syntax::ir::Frame;

pub fn render_literal(lit: &Literal) -> String {
    match lit {
        Literal::Number(n) => render_number(*n),
        Literal::String(s) => quote(s),
        Literal::ActorVariable(name) => name.clone(),
        Literal::CallExpr(call) => format!("{}({})", call.name, render_args(call.args.as_deref())),
    }
}

/// Frame action: bare name when there are no arguments, `name(a, b)` otherwise.
pub fn render_action(call: &ActionCall) -> String {
    match call.args.as_deref() {
        Some(args) if !args.is_empty() => format!("{}({})", call.name, render_args(Some(args))),
        _ => call.name.clone(),
    }
}

fn render_args(args: Option<&[Literal]>) -> String {
    args.unwrap_or_default()
        .iter()
        .map(render_literal)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Integral values print without a fractional part.
fn render_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// `SPRT F 5 Bright A_Look`; sprite fit to the 4-character field.
pub fn render_frame(frame: &Frame) -> String {
    let sprite: String = frame.sprite.chars().take(4).collect();
    let mut line = format!(
        "{} {} {}",
        sprite.to_uppercase(),
        frame.frame.to_ascii_uppercase(),
        frame.duration
    );
    for m in &frame.modifiers {
        line.push(' ');
        line.push_str(m);
    }
    if let Some(action) = &frame.action {
        line.push(' ');
        line.push_str(&render_action(action));
    }
    line
}
