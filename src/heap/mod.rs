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

//! The calibration heap: a name -> value map threaded through compilation.
//!
//! Seeded once from a calibration CSV, then mutated in place by `local`
//! assignments as the driver walks the program's instructions in order.

use crate::error::CompilerError;
use std::collections::HashMap;
use std::path::Path;

/// A value held in the heap. `Unknown` models a calibration row whose
/// source value was `NA`; a `StringList` is what a `local` assignment
/// stores.
#[derive(Debug, Clone, PartialEq)]
pub enum HeapValue {
    Scalar(f64),
    Unknown,
    StringList(Vec<String>),
}

#[derive(Debug, Default)]
pub struct Heap {
    values: HashMap<String, HeapValue>,
}

impl Heap {
    pub fn new() -> Self {
        Self { values: HashMap::new() }
    }

    /// Load a calibration CSV: row 1 is variable names, row 2 is a
    /// human-readable label/unit row (skipped), row 3 is values (`NA`
    /// for unknown).
    pub fn load_calibration(path: &Path) -> Result<Self, CompilerError> {
        let mut reader = csv::ReaderBuilder::new().has_headers(false).from_path(path)?;
        let mut rows = reader.records();

        let names = rows
            .next()
            .ok_or_else(|| CompilerError::Io { message: "calibration file has no header row".to_string() })??;
        let _labels = rows
            .next()
            .ok_or_else(|| CompilerError::Io { message: "calibration file has no label row".to_string() })??;
        let values = rows
            .next()
            .ok_or_else(|| CompilerError::Io { message: "calibration file has no value row".to_string() })??;

        let mut heap = Heap::new();
        for (name, value) in names.iter().zip(values.iter()) {
            let parsed = if value.trim() == "NA" {
                HeapValue::Unknown
            } else {
                match value.trim().parse::<f64>() {
                    Ok(v) => HeapValue::Scalar(v),
                    Err(_) => HeapValue::Unknown,
                }
            };
            heap.set(name, parsed);
        }
        Ok(heap)
    }

    fn normalize(name: &str) -> String {
        name.to_ascii_uppercase()
    }

    pub fn set(&mut self, name: &str, value: HeapValue) {
        self.values.insert(Self::normalize(name), value);
    }

    pub fn get(&self, name: &str) -> Option<&HeapValue> {
        self.values.get(&Self::normalize(name))
    }

    pub fn get_scalar(&self, name: &str) -> Option<f64> {
        match self.get(name) {
            Some(HeapValue::Scalar(v)) => Some(*v),
            _ => None,
        }
    }
}
