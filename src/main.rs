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

//! MoDeL Compiler CLI

use clap::{Parser, Subcommand};
use model_compiler::error::{CompilerError, ErrorReporter};
use model_compiler::pipeline::{self, CompileOptions};
use model_compiler::reader::Reader;
use model_compiler::{depgraph, parser as mdl_parser};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "model-compiler", about = "Compiler for the MoDeL equation templating language")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a program to a flat list of equations.
    Compile {
        input: PathBuf,
        #[arg(long)]
        calibration: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        graph: Option<PathBuf>,
        #[arg(long)]
        debug: bool,
        #[arg(short, long)]
        verbose: bool,
    },
    /// Parse and elaborate without writing output; reports errors only.
    Check {
        input: PathBuf,
        #[arg(long)]
        calibration: Option<PathBuf>,
    },
    /// Print the token stream for each instruction in the program.
    Tokens { input: PathBuf },
    /// Print the parsed AST for each instruction in the program.
    Ast { input: PathBuf },
}

fn main() {
    let cli = Cli::parse();
    let reporter = ErrorReporter::new(true);

    let result = match cli.command {
        Some(Command::Compile { input, calibration, output, graph, debug, verbose }) => {
            run_compile(&input, calibration, output, graph, debug, verbose)
        }
        Some(Command::Check { input, calibration }) => run_check(&input, calibration),
        Some(Command::Tokens { input }) => run_tokens(&input),
        Some(Command::Ast { input }) => run_ast(&input),
        None => run_legacy_default(),
    };

    if let Err(err) = result {
        reporter.report_error(&err);
        process::exit(1);
    }
}

/// On failure, still writes `Error\r\n<message>` to the resolved output
/// path (mirroring the legacy tool's error-file convention) before
/// propagating the error so the caller reports it and exits nonzero.
fn run_compile(
    input: &PathBuf,
    calibration: Option<PathBuf>,
    output: Option<PathBuf>,
    graph: Option<PathBuf>,
    debug: bool,
    verbose: bool,
) -> Result<(), CompilerError> {
    let output_path = output.unwrap_or_else(|| append_extension(input, "prg"));
    let graph_path = graph.unwrap_or_else(|| append_extension(input, "graphml"));

    let options = CompileOptions { calibration, debug, verbose };
    let outcome = pipeline::compile(input, &options).and_then(|result| {
        std::fs::write(&output_path, result.equations.join("\n"))?;
        let xml = depgraph::to_graphml(&result.graph)?;
        std::fs::write(&graph_path, xml)?;
        Ok(())
    });

    if let Err(err) = &outcome {
        let _ = std::fs::write(&output_path, format!("Error\r\n{err}"));
    }
    outcome
}

/// Appends `.ext` to the whole input path rather than replacing its
/// extension, matching the legacy `out.txt.prg` naming convention.
fn append_extension(path: &PathBuf, ext: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

fn run_check(input: &PathBuf, calibration: Option<PathBuf>) -> Result<(), CompilerError> {
    let options = CompileOptions { calibration, ..Default::default() };
    let result = pipeline::compile(input, &options)?;
    println!("ok: {} instruction(s), {} equation(s)", result.stats.instruction_count, result.stats.equation_count);
    Ok(())
}

fn run_tokens(input: &PathBuf) -> Result<(), CompilerError> {
    use model_compiler::lexer::Lexer;

    let mut reader = Reader::new();
    let lines = reader.read_program(input)?;
    for line in &lines {
        let mut lexer = Lexer::new(&line.text, line.file.clone());
        let tokens = lexer.tokenize()?;
        println!("{}:{}: {:?}", line.file, line.line, tokens);
    }
    Ok(())
}

fn run_ast(input: &PathBuf) -> Result<(), CompilerError> {
    let mut reader = Reader::new();
    let lines = reader.read_program(input)?;
    for line in &lines {
        let instruction = mdl_parser::parse_instruction(&line.text, &line.file, line.line)?;
        println!("{}:{}: {:#?}", line.file, line.line, instruction);
    }
    Ok(())
}

/// With no subcommand, compile `in.txt` to `out.txt.prg`, writing
/// `Error\r\n<message>` to the output file on failure rather than
/// exiting nonzero — the original command-line convention this compiler
/// descends from.
fn run_legacy_default() -> Result<(), CompilerError> {
    let input = PathBuf::from("in.txt");
    let output = PathBuf::from("out.txt.prg");
    let options = CompileOptions::default();

    match pipeline::compile(&input, &options) {
        Ok(result) => {
            std::fs::write(&output, result.equations.join("\n"))?;
            Ok(())
        }
        Err(err) => {
            std::fs::write(&output, format!("Error\r\n{err}"))?;
            Ok(())
        }
    }
}
