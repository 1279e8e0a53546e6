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

//! End-to-end tests for the six documented expansion scenarios.

use model_compiler::heap::{Heap, HeapValue};
use model_compiler::pipeline::{compile, CompileOptions};
use std::fs;

fn compile_source(source: &str, calibration: Option<&[(&str, f64)]>) -> Vec<String> {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("model.mdl");
    fs::write(&input_path, source).unwrap();

    let calibration_path = calibration.map(|entries| {
        let path = dir.path().join("calibration.csv");
        let names = entries.iter().map(|(n, _)| n.to_string()).collect::<Vec<_>>().join(",");
        let labels = entries.iter().map(|_| "unit".to_string()).collect::<Vec<_>>().join(",");
        let values = entries.iter().map(|(_, v)| v.to_string()).collect::<Vec<_>>().join(",");
        fs::write(&path, format!("{names}\n{labels}\n{values}\n")).unwrap();
        path
    });

    let options = CompileOptions { calibration: calibration_path, ..Default::default() };
    compile(&input_path, &options).unwrap().equations
}

#[test]
fn s1_basic_expansion() {
    let equations = compile_source("|V|[com] = |V|D[com] + |V|M[com], V in Q CH, com in 01 02", None);
    assert_eq!(
        equations,
        vec!["Q_01 = QD_01 + QM_01", "Q_02 = QD_02 + QM_02", "CH_01 = CHD_01 + CHM_01", "CH_02 = CHD_02 + CHM_02"]
    );
}

#[test]
fn s2_condition_filters_rows() {
    let equations = compile_source(
        "|V|[com] = |V|D[com] + |V|M[com] if CHD[com] > 0, V in Q, com in 01 02",
        Some(&[("CHD_01", 0.0), ("CHD_02", 15.0)]),
    );
    assert_eq!(equations, vec!["Q_02 = QD_02 + QM_02"]);
}

#[test]
fn s3_price_value_doubles_value_form_first() {
    let equations = compile_source("!pv |V|[com] = |V|D[com] + |V|M[com], V in Q, com in 02", None);
    assert_eq!(equations, vec!["PQ_02 * Q_02 = PQD_02 * QD_02 + PQM_02 * QM_02", "Q_02 = QD_02 + QM_02"]);
}

#[test]
fn s4_sum_with_inner_condition() {
    let equations = compile_source(
        "Q[s] = sum(Q[c, s] if Q[c, s] <> 0, c in 01 02 03), s in 10 11",
        Some(&[("Q_01_10", 15.0), ("Q_02_10", 0.0), ("Q_03_10", 20.0), ("Q_01_11", 15.0), ("Q_02_11", 42.0), ("Q_03_11", 20.0)]),
    );
    assert_eq!(equations, vec!["Q_10 = 0 + Q_01_10 + Q_03_10", "Q_11 = 0 + Q_01_11 + Q_02_11 + Q_03_11"]);
}

#[test]
fn s5_loop_counter_is_one_based_position() {
    let equations = compile_source("Q[c] = Test[$c] + 2 * $c, c in 04 05 06", None);
    assert_eq!(equations, vec!["Q_04 = Test_1 + 2 * 1", "Q_05 = Test_2 + 2 * 2", "Q_06 = Test_3 + 2 * 3"]);
}

#[test]
fn s6_list_exclusion_keeps_order_and_realigns_counters() {
    let equations = compile_source("Q[c] = Test[$c], c in 01 02 03 04 05 06 07 \\ 04 06", None);
    assert_eq!(
        equations,
        vec!["Q_01 = Test_1", "Q_02 = Test_2", "Q_03 = Test_3", "Q_05 = Test_4", "Q_07 = Test_5"]
    );
}

#[test]
fn heap_is_case_insensitive_and_na_is_unknown() {
    let mut heap = Heap::new();
    heap.set("chd_01", HeapValue::Unknown);
    assert!(matches!(heap.get("CHD_01"), Some(HeapValue::Unknown)));
}
