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

//! End-to-end compilation pipeline: read, parse, elaborate, generate,
//! and build the dependency graph.

use crate::ast::Instruction;
use crate::depgraph;
use crate::elaborate;
use crate::error::CompilerError;
use crate::heap::{Heap, HeapValue};
use crate::parser;
use crate::reader::Reader;
use petgraph::graph::DiGraph;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub calibration: Option<PathBuf>,
    pub verbose: bool,
    pub debug: bool,
}

#[derive(Debug, Clone)]
pub struct CompilationStats {
    pub instruction_count: usize,
    pub equation_count: usize,
    pub elapsed: Duration,
}

pub struct CompilationResult {
    pub equations: Vec<String>,
    pub graph: DiGraph<String, ()>,
    pub stats: CompilationStats,
}

/// Reads `input`, expands every instruction in order, and accumulates
/// the generated equation text. Assignments mutate the heap in place so
/// later instructions (and conditions) see their effect.
pub fn compile(input: &Path, options: &CompileOptions) -> Result<CompilationResult, CompilerError> {
    let start = Instant::now();

    let mut heap = match &options.calibration {
        Some(path) => Heap::load_calibration(path)?,
        None => Heap::new(),
    };

    let mut reader = Reader::new();
    let lines = reader.read_program(input)?;
    if options.verbose {
        println!("read {} instruction(s) from {}", lines.len(), input.display());
    }

    let mut equations = Vec::new();
    for line in &lines {
        let instruction = parser::parse_instruction(&line.text, &line.file, line.line)?;
        if options.debug {
            println!("{instruction:?}");
        }
        match instruction {
            Instruction::Assignment(assignment) => {
                for name in &assignment.names {
                    heap.set(name, HeapValue::StringList(assignment.values.clone()));
                }
            }
            Instruction::Formula(formula) => {
                equations.extend(elaborate::expand_formula(&formula, &heap)?);
            }
        }
    }

    let graph = depgraph::build_dependency_graph(&equations);

    let stats = CompilationStats { instruction_count: lines.len(), equation_count: equations.len(), elapsed: start.elapsed() };
    if options.verbose {
        println!("compiled {} equation(s) in {:?}", stats.equation_count, stats.elapsed);
    }

    Ok(CompilationResult { equations, graph, stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_compile_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.mdl");
        fs::write(&path, "|V|[com] = |V|D[com], V in Q CH, com in 01 02\n").unwrap();

        let result = compile(&path, &CompileOptions::default()).unwrap();
        assert_eq!(result.equations, vec!["Q_01 = QD_01", "Q_02 = QD_02", "CH_01 = CHD_01", "CH_02 = CHD_02"]);
        assert_eq!(result.stats.instruction_count, 1);
    }

    #[test]
    fn test_compile_assignment_then_formula() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.mdl");
        fs::write(&path, "base = Q CH\nQ[c] = QD[c], c in 01\n").unwrap();

        let result = compile(&path, &CompileOptions::default()).unwrap();
        assert_eq!(result.equations, vec!["Q_01 = QD_01"]);
    }
}
