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

//! Dependency graph over generated equations, with GraphML export.
//!
//! An edge `lhs -> rhs` means the equation defining `lhs` references
//! `rhs` on its right-hand side. Only names that are themselves defined
//! by some equation's left-hand side become graph nodes; references to
//! undefined names (calibration constants, literals) are not edges.
//! Each node's weight is the full equation text, keyed for lookup and
//! GraphML `id` by its LHS name.

use crate::error::GraphError;
use petgraph::graph::{DiGraph, NodeIndex};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;

fn lhs_name(equation: &str) -> Option<&str> {
    equation.split_once(" = ").map(|(lhs, _)| lhs.trim())
}

pub fn build_dependency_graph(equations: &[String]) -> DiGraph<String, ()> {
    let mut graph = DiGraph::new();
    let mut nodes: HashMap<String, NodeIndex> = HashMap::new();

    for equation in equations {
        if let Some(name) = lhs_name(equation) {
            nodes.entry(name.to_string()).or_insert_with(|| graph.add_node(equation.clone()));
        }
    }

    let known: HashSet<String> = nodes.keys().cloned().collect();
    for equation in equations {
        let Some((lhs, rhs)) = equation.split_once(" = ") else { continue };
        let lhs_idx = nodes[lhs.trim()];
        for token in rhs.split_whitespace() {
            let cleaned: String = token.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '_').collect();
            if known.contains(&cleaned) {
                let rhs_idx = nodes[&cleaned];
                graph.update_edge(lhs_idx, rhs_idx, ());
            }
        }
    }
    graph
}

/// Serializes the dependency graph to GraphML. Each node carries a single
/// `<data key="equation">` child with the full equation text it defines.
pub fn to_graphml(graph: &DiGraph<String, ()>) -> Result<String, GraphError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    let err = |e: quick_xml::Error| GraphError::Serialization { message: e.to_string() };

    writer.write_event(Event::Start(BytesStart::new("graphml"))).map_err(err)?;
    writer
        .write_event(Event::Start(BytesStart::new("graph").with_attributes([("edgedefault", "directed")])))
        .map_err(err)?;

    for idx in graph.node_indices() {
        let equation = &graph[idx];
        let name = lhs_name(equation).unwrap_or(equation.as_str());
        let mut node = BytesStart::new("node");
        node.push_attribute(("id", name));
        writer.write_event(Event::Start(node)).map_err(err)?;

        let mut data = BytesStart::new("data");
        data.push_attribute(("key", "equation"));
        writer.write_event(Event::Start(data)).map_err(err)?;
        writer.write_event(Event::Text(BytesText::new(equation))).map_err(err)?;
        writer.write_event(Event::End(BytesEnd::new("data"))).map_err(err)?;

        writer.write_event(Event::End(BytesEnd::new("node"))).map_err(err)?;
    }

    for edge in graph.edge_indices() {
        let (src, dst) = graph.edge_endpoints(edge).expect("edge index from this graph");
        let src_name = lhs_name(&graph[src]).unwrap_or(graph[src].as_str());
        let dst_name = lhs_name(&graph[dst]).unwrap_or(graph[dst].as_str());
        let mut e = BytesStart::new("edge");
        e.push_attribute(("source", src_name));
        e.push_attribute(("target", dst_name));
        writer.write_event(Event::Empty(e)).map_err(err)?;
    }

    writer.write_event(Event::End(BytesEnd::new("graph"))).map_err(err)?;
    writer.write_event(Event::End(BytesEnd::new("graphml"))).map_err(err)?;

    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| GraphError::Serialization { message: e.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_dependency_graph_edges_only_known_names() {
        let equations = vec!["Q_01 = QD_01 + CHD_01".to_string(), "QD_01 = 5".to_string()];
        let graph = build_dependency_graph(&equations);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_to_graphml_contains_nodes_and_edges() {
        let equations = vec!["Q_01 = QD_01".to_string(), "QD_01 = 5".to_string()];
        let graph = build_dependency_graph(&equations);
        let xml = to_graphml(&graph).unwrap();
        assert!(xml.contains("<graphml>"));
        assert!(xml.contains(r#"id="Q_01""#));
        assert!(xml.contains(r#"source="Q_01""#));
        assert!(xml.contains(r#"key="equation""#));
        assert!(xml.contains("Q_01 = QD_01"));
    }
}
