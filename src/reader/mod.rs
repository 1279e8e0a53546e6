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

//! Line reading and `include` expansion.
//!
//! Reads a source file into a flat list of logical instruction strings
//! (`;` comments stripped per physical line), splicing in `include`d
//! files as it goes. Self-inclusion and cycles are rejected.
//!
//! A logical instruction may span several physical lines: a line
//! continues the one accumulated so far if it is indented (a hanging
//! indent, the natural way to wrap a long iterator list or formula) or
//! if brackets opened earlier in the instruction are still unbalanced.
//! Otherwise it starts a new logical instruction. A blank line, a
//! comment-only line, or an `include` line always ends whatever
//! instruction was pending.

use crate::error::{ReaderError, SourceLocation};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// One logical instruction together with the file it originated in, so
/// parser errors can report the included file's own position.
#[derive(Debug, Clone)]
pub struct SourceLine {
    pub text: String,
    pub file: String,
    pub line: usize,
}

pub struct Reader {
    /// Absolute paths of files currently on the include stack, for cycle
    /// detection.
    stack: Vec<PathBuf>,
    visited: HashSet<PathBuf>,
}

impl Reader {
    pub fn new() -> Self {
        Self { stack: Vec::new(), visited: HashSet::new() }
    }

    /// Read `path` and fully expand any `include` directives it contains.
    pub fn read_program(&mut self, path: &Path) -> Result<Vec<SourceLine>, ReaderError> {
        let path = resolve_with_extension(path);
        self.read_file(&path)
    }

    fn read_file(&mut self, path: &Path) -> Result<Vec<SourceLine>, ReaderError> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if self.stack.contains(&canonical) {
            let cycle = self
                .stack
                .iter()
                .map(|p| p.display().to_string())
                .chain(std::iter::once(canonical.display().to_string()))
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(ReaderError::CircularInclude {
                cycle,
                location: SourceLocation::new(path.display().to_string(), 0, 0, 0),
            });
        }

        let contents = fs::read_to_string(path).map_err(|e| ReaderError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        self.stack.push(canonical.clone());
        self.visited.insert(canonical.clone());

        let dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
        let file_name = path.display().to_string();

        let mut out = Vec::new();
        let mut pending: Option<PendingInstruction> = None;

        for (idx, raw_line) in contents.lines().enumerate() {
            let line_no = idx + 1;
            let stripped = strip_comment(raw_line);
            let trimmed = stripped.trim();
            if trimmed.is_empty() {
                flush(&mut pending, &mut out, &file_name);
                continue;
            }

            if is_include_directive(trimmed) {
                flush(&mut pending, &mut out, &file_name);

                let rest = trimmed.strip_prefix("include").unwrap().trim();
                let included_path = resolve_with_extension(&dir.join(rest));
                let included_canonical =
                    included_path.canonicalize().unwrap_or_else(|_| included_path.clone());
                if included_canonical == canonical {
                    self.stack.pop();
                    return Err(ReaderError::SelfInclude {
                        location: SourceLocation::new(file_name, line_no, 1, 0),
                    });
                }
                let nested = self.read_file(&included_path)?;
                out.extend(nested);
                continue;
            }

            let continues_pending = pending
                .as_ref()
                .is_some_and(|p| p.bracket_depth > 0 || raw_line.starts_with(char::is_whitespace));

            if continues_pending {
                let p = pending.as_mut().expect("continues_pending implies pending is Some");
                p.text.push(' ');
                p.text.push_str(trimmed);
                p.bracket_depth += bracket_delta(trimmed);
            } else {
                flush(&mut pending, &mut out, &file_name);
                pending = Some(PendingInstruction {
                    text: trimmed.to_string(),
                    line: line_no,
                    bracket_depth: bracket_delta(trimmed),
                });
            }
        }
        flush(&mut pending, &mut out, &file_name);

        self.stack.pop();
        Ok(out)
    }
}

/// A logical instruction accumulated across one or more physical lines.
struct PendingInstruction {
    text: String,
    line: usize,
    bracket_depth: i32,
}

/// Pushes `pending`, if any, onto `out` as a completed `SourceLine`.
fn flush(pending: &mut Option<PendingInstruction>, out: &mut Vec<SourceLine>, file_name: &str) {
    if let Some(p) = pending.take() {
        out.push(SourceLine { text: p.text, file: file_name.to_string(), line: p.line });
    }
}

/// Net change in open-bracket depth contributed by one line: `[` and `(`
/// count `+1`, `]` and `)` count `-1`.
fn bracket_delta(line: &str) -> i32 {
    line.chars()
        .map(|c| match c {
            '[' | '(' => 1,
            ']' | ')' => -1,
            _ => 0,
        })
        .sum()
}

impl Default for Reader {
    fn default() -> Self {
        Self::new()
    }
}

fn is_include_directive(trimmed: &str) -> bool {
    trimmed == "include"
        || trimmed
            .strip_prefix("include")
            .is_some_and(|rest| rest.starts_with(char::is_whitespace))
}

/// A `;` begins a comment that runs to the end of the physical line; it
/// is stripped before any continuation-joining or `\`-exclusion scanning,
/// so the exclusion marker is only ever seen by the grammar in
/// already-comment-stripped text.
fn strip_comment(line: &str) -> &str {
    match line.find(';') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn resolve_with_extension(path: &Path) -> PathBuf {
    if path.extension().is_none() {
        path.with_extension("mdl")
    } else {
        path.to_path_buf()
    }
}
