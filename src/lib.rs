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

//! MoDeL Compiler Library
//!
//! Compiles a MoDeL program — template equations expanded over index
//! sets, with optional guards and aggregation — into a flat list of
//! concrete equation strings, plus a dependency graph over them.

pub mod ast;
pub mod depgraph;
pub mod elaborate;
pub mod error;
pub mod generate;
pub mod heap;
pub mod lexer;
pub mod parser;
pub mod pipeline;
pub mod reader;

pub use error::CompilerError;
pub use pipeline::{compile, CompilationResult, CompilationStats, CompileOptions};
