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

//! Iterator binding and Cartesian expansion of a formula into concrete
//! equation text.
//!
//! A formula's iterators are expanded left-to-right, leftmost slowest:
//! the first-declared iterator is the outer loop. Within one iterator,
//! a composite `(n1,...,nk) in (L1,...,Lk)` zips its lists pairwise
//! rather than taking their product.

use crate::ast::{self, Formula, FormulaBody, Iterator_, List};
use crate::error::ElaborationError;
use crate::generate::{self, Binding, BindingValue};
use crate::heap::Heap;
use std::collections::{HashMap, HashSet};

fn expand_list(list: &List) -> Vec<String> {
    let excluded: HashSet<&str> =
        list.excluded.as_ref().map(|e| e.items.iter().map(|s| s.as_str()).collect()).unwrap_or_default();
    list.base.items.iter().filter(|s| !excluded.contains(s.as_str())).cloned().collect()
}

fn elaborate_iterator(it: &Iterator_) -> Result<Vec<Binding>, ElaborationError> {
    let lists: Vec<Vec<String>> = it.lists.iter().map(expand_list).collect();
    let lengths: Vec<usize> = lists.iter().map(|l| l.len()).collect();
    if lengths.iter().any(|&n| n != lengths[0]) {
        return Err(ElaborationError::IteratorShapeError { lengths, location: it.source_location.clone() });
    }
    let count = lengths.first().copied().unwrap_or(0);

    let mut rows = Vec::with_capacity(count);
    for position in 0..count {
        let mut binding: Binding = HashMap::new();
        for (name_idx, name) in it.names.iter().enumerate() {
            binding.insert(name.clone(), BindingValue::Name(lists[name_idx][position].clone()));
            binding.insert(format!("${name}"), BindingValue::Counter((position + 1) as i64));
        }
        rows.push(binding);
    }
    Ok(rows)
}

/// Cartesian product across a formula's declared iterators, leftmost
/// iterator varying slowest.
fn bind_all_iterators(iterators: &[Iterator_]) -> Result<Vec<Binding>, ElaborationError> {
    let mut seen = HashSet::new();
    for it in iterators {
        for name in &it.names {
            if !seen.insert(name.clone()) {
                return Err(ElaborationError::DuplicateIteratorName { name: name.clone(), location: it.source_location.clone() });
            }
        }
    }

    if iterators.is_empty() {
        return Ok(vec![HashMap::new()]);
    }

    let mut acc: Vec<Binding> = vec![HashMap::new()];
    for it in iterators {
        let rows = elaborate_iterator(it)?;
        let mut next = Vec::with_capacity(acc.len() * rows.len());
        for a in &acc {
            for r in &rows {
                let mut merged = a.clone();
                merged.extend(r.clone());
                next.push(merged);
            }
        }
        acc = next;
    }
    Ok(acc)
}

fn merge_outer(mut binding: Binding, outer: &Binding) -> Binding {
    for (k, v) in outer {
        binding.insert(k.clone(), v.clone());
    }
    binding
}

fn generate_body(body: &FormulaBody, binding: &Binding, as_value: bool, heap: &Heap) -> Result<String, ElaborationError> {
    match body {
        FormulaBody::Equation(eq) => generate::generate_equation(eq, binding, as_value, heap),
        FormulaBody::Expression(expr) => generate::generate_expression(expr, binding, false, as_value, heap),
    }
}

fn condition_holds(condition: &Option<ast::Condition>, binding: &Binding, heap: &Heap) -> Result<bool, ElaborationError> {
    match condition {
        Some(cond) => Ok(generate::eval_condition(&cond.expression, binding, heap)?.unwrap_or(false)),
        None => Ok(true),
    }
}

/// Expands a top-level formula against the current heap into one or more
/// lines of equation text. When tagged with a price-value option, every
/// qualifying binding emits its value-form line before any plain-form
/// line (not interleaved per-binding).
pub fn expand_formula(formula: &Formula, heap: &Heap) -> Result<Vec<String>, ElaborationError> {
    let outer: Binding = HashMap::new();
    let bindings = bind_all_iterators(&formula.iterators)?;

    let mut qualifying = Vec::new();
    for binding in bindings {
        let binding = merge_outer(binding, &outer);
        if condition_holds(&formula.condition, &binding, heap)? {
            qualifying.push(binding);
        }
    }

    let mut lines = Vec::new();
    if formula.price_value {
        for binding in &qualifying {
            lines.push(generate_body(&formula.body, binding, true, heap)?);
        }
        for binding in &qualifying {
            lines.push(generate_body(&formula.body, binding, false, heap)?);
        }
    } else {
        for binding in &qualifying {
            lines.push(generate_body(&formula.body, binding, false, heap)?);
        }
    }
    Ok(lines)
}

/// Expands the inner formula of a `sum(...)` against the enclosing
/// binding. Always plain-form, regardless of the inner formula's own
/// price-value tag: aggregation sums the scalar contributions, never
/// their value-form doubling.
pub fn expand_sum(formula: &Formula, outer: &Binding, heap: &Heap) -> Result<Vec<String>, ElaborationError> {
    let bindings = bind_all_iterators(&formula.iterators)?;
    let mut lines = Vec::new();
    for binding in bindings {
        let binding = merge_outer(binding, outer);
        if condition_holds(&formula.condition, &binding, heap)? {
            lines.push(generate_body(&formula.body, &binding, false, heap)?);
        }
    }
    Ok(lines)
}
