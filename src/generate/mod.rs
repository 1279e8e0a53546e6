// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Textual generation of concrete equations from a bound formula, plus
//! numeric evaluation of conditions.

use crate::ast;
use crate::error::{ElaborationError, SourceLocation};
use crate::heap::Heap;
use std::collections::HashMap;

/// A value bound to an iterator name (or its paired loop-counter name,
/// keyed as `$name`) for one Cartesian tuple.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingValue {
    Name(String),
    Counter(i64),
}

pub type Binding = HashMap<String, BindingValue>;

fn resolve_name(name: &str, binding: &Binding) -> Option<String> {
    match binding.get(name) {
        Some(BindingValue::Name(s)) => Some(s.clone()),
        _ => None,
    }
}

fn resolve_counter(name: &str, binding: &Binding) -> Option<i64> {
    match binding.get(&format!("${name}")) {
        Some(BindingValue::Counter(c)) => Some(*c),
        _ => None,
    }
}

fn value_form(core: &str, as_value: bool) -> String {
    if as_value {
        format!("P{core} * {core}")
    } else {
        core.to_string()
    }
}

fn format_real(f: f64) -> String {
    format!("{f}")
}

/// Concatenates an identifier's fragments. `Name` fragments pass through
/// literally (constant text); `Placeholder` fragments are mandatory
/// substitutions and fail hard if unbound.
pub fn generate_identifier(ident: &ast::Identifier, binding: &Binding) -> Result<String, ElaborationError> {
    let mut out = String::new();
    for frag in &ident.fragments {
        match frag {
            ast::IdentifierFragment::Name(n) => out.push_str(n),
            ast::IdentifierFragment::Placeholder(name) => {
                let v = resolve_name(name, binding).ok_or_else(|| ElaborationError::UnboundPlaceholder {
                    name: name.clone(),
                    location: ident.source_location.clone(),
                })?;
                out.push_str(&v);
            }
        }
    }
    Ok(out)
}

pub fn generate_index(index: &ast::Index, binding: &Binding, heap: &Heap) -> Result<String, ElaborationError> {
    let parts: Result<Vec<String>, ElaborationError> = index
        .components
        .iter()
        .map(|c| generate_expression(c, binding, true, false, heap))
        .collect();
    Ok(parts?.join("_"))
}

pub fn generate_time_offset(offset: &ast::TimeOffset, binding: &Binding) -> String {
    match offset {
        ast::TimeOffset::Integer(i) => format!("({i})"),
        ast::TimeOffset::Variable(name) => {
            let v = resolve_name(name, binding).unwrap_or_else(|| name.clone());
            format!("({v})")
        }
    }
}

pub fn generate_array(arr: &ast::Array, binding: &Binding, heap: &Heap) -> Result<String, ElaborationError> {
    let core = generate_identifier(&arr.identifier, binding)?;
    let index = generate_index(&arr.index, binding, heap)?;
    let mut s = format!("{core}_{index}");
    if let Some(offset) = &arr.time_offset {
        s.push_str(&generate_time_offset(offset, binding));
    }
    Ok(s)
}

/// `use_bindings` forces a bare single-fragment identifier operand (a
/// plain iterator-name reference used directly, not via `|name|`) to be
/// substituted — the case for index/timeOffset components and function
/// arguments.
pub fn generate_operand(
    operand: &ast::Operand,
    binding: &Binding,
    use_bindings: bool,
    as_value: bool,
    heap: &Heap,
) -> Result<String, ElaborationError> {
    match operand {
        ast::Operand::Integer(i) => Ok(i.to_string()),
        ast::Operand::Real(f) => Ok(format_real(*f)),
        ast::Operand::LoopCounter(name) => resolve_counter(name, binding).map(|c| c.to_string()).ok_or_else(|| {
            ElaborationError::UnboundPlaceholder { name: format!("${name}"), location: SourceLocation::unknown() }
        }),
        ast::Operand::Identifier(ident) => {
            if use_bindings && ident.fragments.len() == 1 {
                if let ast::IdentifierFragment::Name(n) = &ident.fragments[0] {
                    if let Some(v) = resolve_name(n, binding) {
                        return Ok(value_form(&v, as_value));
                    }
                }
            }
            let core = generate_identifier(ident, binding)?;
            Ok(value_form(&core, as_value))
        }
        ast::Operand::Array(arr) => {
            let core = generate_array(arr, binding, heap)?;
            Ok(value_form(&core, as_value))
        }
        ast::Operand::Function(func) => generate_function(func, binding, heap),
        ast::Operand::Parenthesized(inner) => {
            let s = generate_expression(inner, binding, use_bindings, as_value, heap)?;
            Ok(format!("({s})"))
        }
    }
}

pub fn generate_expression(
    expr: &ast::Expression,
    binding: &Binding,
    use_bindings: bool,
    as_value: bool,
    heap: &Heap,
) -> Result<String, ElaborationError> {
    let mut parts = Vec::with_capacity(expr.terms.len());
    for term in &expr.terms {
        match term {
            ast::Term::Operator(op) => parts.push(op.clone()),
            ast::Term::Operand(operand) => parts.push(generate_operand(operand, binding, use_bindings, as_value, heap)?),
        }
    }
    Ok(parts.join(" "))
}

pub fn generate_equation(eq: &ast::Equation, binding: &Binding, as_value: bool, heap: &Heap) -> Result<String, ElaborationError> {
    let lhs = generate_expression(&eq.lhs, binding, false, as_value, heap)?;
    let rhs = generate_expression(&eq.rhs, binding, false, as_value, heap)?;
    Ok(format!("{lhs} = {rhs}"))
}

fn generate_function(func: &ast::Function, binding: &Binding, heap: &Heap) -> Result<String, ElaborationError> {
    match func.name.as_str() {
        "sum" => {
            let inner = match &func.arguments {
                ast::FunctionArguments::Formula(f) => f,
                ast::FunctionArguments::Expressions(_) => {
                    return Err(ElaborationError::UnboundPlaceholder {
                        name: "sum".to_string(),
                        location: func.source_location.clone(),
                    })
                }
            };
            let lines = crate::elaborate::expand_sum(inner, binding, heap)?;
            if lines.is_empty() {
                Ok("0".to_string())
            } else {
                Ok(format!("0 + {}", lines.join(" + ")))
            }
        }
        "value" => {
            let exprs = match &func.arguments {
                ast::FunctionArguments::Expressions(e) => e,
                ast::FunctionArguments::Formula(_) => {
                    return Err(ElaborationError::UnboundPlaceholder {
                        name: "value".to_string(),
                        location: func.source_location.clone(),
                    })
                }
            };
            let first = exprs.first().ok_or_else(|| ElaborationError::UnboundPlaceholder {
                name: "value".to_string(),
                location: func.source_location.clone(),
            })?;
            generate_expression(first, binding, true, true, heap)
        }
        other => {
            let exprs = match &func.arguments {
                ast::FunctionArguments::Expressions(e) => e,
                ast::FunctionArguments::Formula(_) => {
                    return Err(ElaborationError::UnboundPlaceholder {
                        name: other.to_string(),
                        location: func.source_location.clone(),
                    })
                }
            };
            let args: Result<Vec<String>, ElaborationError> =
                exprs.iter().map(|e| generate_expression(e, binding, true, false, heap)).collect();
            Ok(format!("{other}({})", args?.join(", ")))
        }
    }
}

/// Evaluates a condition's expression numerically. `Ok(None)` means a
/// referenced name was absent from the heap — the caller treats this as
/// "condition false", never an error.
pub fn eval_condition(expr: &ast::Expression, binding: &Binding, heap: &Heap) -> Result<Option<bool>, ElaborationError> {
    let mut toks = Vec::with_capacity(expr.terms.len());
    for term in &expr.terms {
        match term {
            ast::Term::Operator(op) => toks.push(EvalTok::Op(op.clone())),
            ast::Term::Operand(operand) => match eval_operand(operand, binding, heap)? {
                Some(v) => toks.push(EvalTok::Num(v)),
                None => return Ok(None),
            },
        }
    }
    let mut cursor = Cursor { toks: &toks, pos: 0 };
    let value = parse_boolean(&mut cursor);
    Ok(Some(value != 0.0))
}

fn eval_operand(operand: &ast::Operand, binding: &Binding, heap: &Heap) -> Result<Option<f64>, ElaborationError> {
    match operand {
        ast::Operand::Integer(i) => Ok(Some(*i as f64)),
        ast::Operand::Real(f) => Ok(Some(*f)),
        ast::Operand::LoopCounter(name) => Ok(resolve_counter(name, binding).map(|c| c as f64)),
        ast::Operand::Identifier(ident) => {
            let name = generate_identifier(ident, binding)?;
            Ok(heap.get_scalar(&name))
        }
        ast::Operand::Array(arr) => {
            let name = generate_array(arr, binding, heap)?;
            Ok(heap.get_scalar(&name))
        }
        ast::Operand::Parenthesized(inner) => {
            let mut toks = Vec::with_capacity(inner.terms.len());
            for term in &inner.terms {
                match term {
                    ast::Term::Operator(op) => toks.push(EvalTok::Op(op.clone())),
                    ast::Term::Operand(o) => match eval_operand(o, binding, heap)? {
                        Some(v) => toks.push(EvalTok::Num(v)),
                        None => return Ok(None),
                    },
                }
            }
            let mut cursor = Cursor { toks: &toks, pos: 0 };
            Ok(Some(parse_boolean(&mut cursor)))
        }
        // Functions inside a condition are not evaluated numerically; a
        // condition referencing one simply never fires.
        ast::Operand::Function(_) => Ok(None),
    }
}

enum EvalTok {
    Num(f64),
    Op(String),
}

struct Cursor<'a> {
    toks: &'a [EvalTok],
    pos: usize,
}

impl Cursor<'_> {
    fn peek_op(&self) -> Option<&str> {
        match self.toks.get(self.pos) {
            Some(EvalTok::Op(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    fn bump(&mut self) {
        self.pos += 1;
    }
}

fn parse_boolean(c: &mut Cursor) -> f64 {
    let mut left = parse_comparison(c);
    while let Some(op) = c.peek_op() {
        let op = op.to_string();
        if op == "and" || op == "or" || op == "xor" {
            c.bump();
            let right = parse_comparison(c);
            left = match op.as_str() {
                "and" => ((left != 0.0) && (right != 0.0)) as i32 as f64,
                "or" => ((left != 0.0) || (right != 0.0)) as i32 as f64,
                "xor" => ((left != 0.0) != (right != 0.0)) as i32 as f64,
                _ => unreachable!(),
            };
        } else {
            break;
        }
    }
    left
}

fn parse_comparison(c: &mut Cursor) -> f64 {
    let left = parse_additive(c);
    if let Some(op) = c.peek_op() {
        let op = op.to_string();
        if ["<", "<=", ">", ">=", "==", "<>"].contains(&op.as_str()) {
            c.bump();
            let right = parse_additive(c);
            return match op.as_str() {
                "<" => (left < right) as i32 as f64,
                "<=" => (left <= right) as i32 as f64,
                ">" => (left > right) as i32 as f64,
                ">=" => (left >= right) as i32 as f64,
                "==" => (left == right) as i32 as f64,
                "<>" => (left != right) as i32 as f64,
                _ => unreachable!(),
            };
        }
    }
    left
}

fn parse_additive(c: &mut Cursor) -> f64 {
    let mut left = parse_multiplicative(c);
    while let Some(op) = c.peek_op() {
        if op == "+" || op == "-" {
            let op = op.to_string();
            c.bump();
            let right = parse_multiplicative(c);
            left = if op == "+" { left + right } else { left - right };
        } else {
            break;
        }
    }
    left
}

fn parse_multiplicative(c: &mut Cursor) -> f64 {
    let mut left = parse_power(c);
    while let Some(op) = c.peek_op() {
        if op == "*" || op == "/" {
            let op = op.to_string();
            c.bump();
            let right = parse_power(c);
            left = if op == "*" { left * right } else { left / right };
        } else {
            break;
        }
    }
    left
}

fn parse_power(c: &mut Cursor) -> f64 {
    let base = parse_primary(c);
    if let Some("^") = c.peek_op() {
        c.bump();
        let exp = parse_power(c);
        return base.powf(exp);
    }
    base
}

fn parse_primary(c: &mut Cursor) -> f64 {
    if let Some(op) = c.peek_op() {
        if op == "+" || op == "-" {
            let op = op.to_string();
            c.bump();
            let v = parse_power(c);
            return if op == "-" { -v } else { v };
        }
    }
    match c.toks.get(c.pos) {
        Some(EvalTok::Num(v)) => {
            c.pos += 1;
            *v
        }
        _ => 0.0,
    }
}
