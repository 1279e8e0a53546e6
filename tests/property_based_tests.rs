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

use model_compiler::ast::Instruction;
use model_compiler::elaborate;
use model_compiler::heap::Heap;
use model_compiler::lexer::{Lexer, TokenType};
use model_compiler::parser::parse_instruction;
use proptest::prelude::*;

/// Generate valid MoDeL variable names.
fn valid_variable_name() -> impl Strategy<Value = String> {
    prop::string::string_regex(r"[a-zA-Z_][a-zA-Z0-9_]{0,20}").unwrap()
}

/// Generate a list of distinct alphanumeric list items, 1..8 long.
fn distinct_items() -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set(prop::string::string_regex(r"[A-Z0-9]{1,4}").unwrap(), 1..8)
        .prop_map(|set| set.into_iter().collect())
}

proptest! {
    /// Any valid variable name lexes to a single `Ident` token carrying
    /// that exact text.
    #[test]
    fn test_valid_variable_name_tokenizes_as_ident(name in valid_variable_name()) {
        let mut lexer = Lexer::new(&name, "test.mdl".to_string());
        let tokens = lexer.tokenize().unwrap();
        prop_assert_eq!(tokens.len(), 2); // Ident, Eof
        match &tokens[0].token_type {
            TokenType::Ident(s) => prop_assert_eq!(s, &name),
            TokenType::Keyword(_) => {} // "if"/"in" legitimately shadow identifiers
            other => prop_assert!(false, "expected Ident or Keyword, got {:?}", other),
        }
    }

    /// Excluding every other item from an iterator's list leaves exactly
    /// the un-excluded items in the compiled output, in their original
    /// order, with loop counters re-numbered from 1 over the kept set.
    #[test]
    fn test_list_exclusion_keeps_only_unexcluded_items_in_order(items in distinct_items()) {
        let excluded: Vec<String> = items.iter().step_by(2).cloned().collect();
        let excluded_set: std::collections::HashSet<&str> = excluded.iter().map(|s| s.as_str()).collect();
        let kept: Vec<&String> = items.iter().filter(|i| !excluded_set.contains(i.as_str())).collect();

        // `step_by(2)` from index 0 always takes the first item, so `excluded`
        // is never empty here and the exclusion clause is always well-formed.
        let source = format!("Q[c] = Test[$c], c in {} \\ {}", items.join(" "), excluded.join(" "));
        let instruction = parse_instruction(&source, "prop.mdl", 1).unwrap();
        let formula = match instruction {
            Instruction::Formula(f) => f,
            _ => unreachable!("RHS contains brackets, never classifies as an assignment"),
        };

        let heap = Heap::new();
        let lines = elaborate::expand_formula(&formula, &heap).unwrap();

        prop_assert_eq!(lines.len(), kept.len());
        for (position, (line, item)) in lines.iter().zip(kept.iter()).enumerate() {
            prop_assert_eq!(line, &format!("Q_{item} = Test_{}", position + 1));
        }
    }
}
