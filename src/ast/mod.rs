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

//! Abstract syntax tree for MoDeL instructions
//!
//! One instruction parses to a single [`Instruction`]: an `include` has
//! already been expanded away by the reader by the time this stage sees
//! input, so only `Assignment` and `Formula` remain.

use crate::error::SourceLocation;
use serde::{Deserialize, Serialize};

/// A single top-level instruction of a program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Instruction {
    Assignment(Assignment),
    Formula(Formula),
}

/// `name[,name...] = token token ...` — stores a string list under the heap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub names: Vec<String>,
    pub values: Vec<String>,
    pub source_location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Formula {
    /// Set when the formula was tagged with one of `!pv`, `!p`, `!Pv`, `!P`.
    /// All four spellings have identical effect: emit the value-form
    /// equations first, then the plain-form equations, for every binding.
    pub price_value: bool,
    pub body: FormulaBody,
    pub condition: Option<Condition>,
    pub iterators: Vec<Iterator_>,
    pub source_location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FormulaBody {
    Equation(Equation),
    Expression(Expression),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Equation {
    pub lhs: Expression,
    pub rhs: Expression,
    pub source_location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub expression: Expression,
    pub source_location: SourceLocation,
}

/// An operand/operator sequence, kept flat (no precedence tree; the
/// generator emits operators literally, and condition evaluation applies
/// precedence over the flat token stream at evaluation time).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expression {
    pub terms: Vec<Term>,
    pub source_location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Term {
    Operator(String),
    Operand(Operand),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Operand {
    Integer(i64),
    Real(f64),
    LoopCounter(String),
    Identifier(Identifier),
    Array(Array),
    Function(Function),
    Parenthesized(Box<Expression>),
}

/// One or more [`IdentifierFragment`]s concatenated textually.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identifier {
    pub fragments: Vec<IdentifierFragment>,
    pub source_location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IdentifierFragment {
    Name(String),
    Placeholder(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Index {
    pub components: Vec<Expression>,
    pub source_location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TimeOffset {
    Integer(i64),
    Variable(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Array {
    pub identifier: Identifier,
    pub index: Index,
    pub time_offset: Option<TimeOffset>,
    pub source_location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub arguments: FunctionArguments,
    pub source_location: SourceLocation,
}

/// `sum(...)` takes a whole inner formula as its argument; every other
/// function takes a comma-separated list of expressions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FunctionArguments {
    Formula(Box<Formula>),
    Expressions(Vec<Expression>),
}

/// A bare space-delimited token list, e.g. `01 02 03`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListBase {
    pub items: Vec<String>,
    pub source_location: SourceLocation,
}

/// `base \ excluded` — excluded items are removed, order of `base` preserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct List {
    pub base: ListBase,
    pub excluded: Option<ListBase>,
    pub source_location: SourceLocation,
}

/// `name in list` or `(n1,...,nk) in (L1,...,Lk)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Iterator_ {
    pub names: Vec<String>,
    pub lists: Vec<List>,
    pub source_location: SourceLocation,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::unknown()
    }

    #[test]
    fn test_identifier_fragments_roundtrip_serde() {
        let ident = Identifier {
            fragments: vec![
                IdentifierFragment::Name("test".to_string()),
                IdentifierFragment::Placeholder("V".to_string()),
                IdentifierFragment::Name("_energy".to_string()),
            ],
            source_location: loc(),
        };
        let json = serde_json::to_string(&ident).unwrap();
        let back: Identifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back.fragments.len(), 3);
    }

    #[test]
    fn test_iterator_shape() {
        let it = Iterator_ {
            names: vec!["com".to_string(), "sec".to_string()],
            lists: vec![
                List { base: ListBase { items: vec!["01".into()], source_location: loc() }, excluded: None, source_location: loc() },
                List { base: ListBase { items: vec!["A".into()], source_location: loc() }, excluded: None, source_location: loc() },
            ],
            source_location: loc(),
        };
        assert_eq!(it.names.len(), it.lists.len());
    }
}
