use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::graph::dag::SchemaGraph;

/// Output format for graph visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Mermaid,
    Dot,
}

/// Render the schema graph. Edges are labelled with their FK columns.
pub fn visualize(graph: &SchemaGraph, format: GraphFormat) -> String {
    match format {
        GraphFormat::Mermaid => generate_mermaid(graph),
        GraphFormat::Dot => generate_dot(graph),
    }
}

fn generate_mermaid(graph: &SchemaGraph) -> String {
    let mut output = String::from("graph TD\n");

    for node in graph.graph.node_indices() {
        let name = graph.table_name(node);
        let is_source = graph
            .graph
            .edges_directed(node, Direction::Outgoing)
            .next()
            .is_none();
        if is_source {
            output.push_str(&format!("    {}([{}])\n", name, name));
        } else {
            output.push_str(&format!("    {}[{}]\n", name, name));
        }
    }

    output.push('\n');

    for edge in graph.graph.edge_references() {
        let from = graph.table_name(edge.source());
        let to = graph.table_name(edge.target());
        let label = edge.weight().source_columns.join(", ");
        output.push_str(&format!("    {} -->|{}| {}\n", from, label, to));
    }

    output
}

fn generate_dot(graph: &SchemaGraph) -> String {
    let mut output = String::from("digraph schema {\n");
    output.push_str("    rankdir=TB;\n");
    output.push_str("    node [shape=box, style=rounded];\n\n");

    for node in graph.graph.node_indices() {
        output.push_str(&format!("    \"{}\";\n", graph.table_name(node)));
    }

    output.push('\n');

    for edge in graph.graph.edge_references() {
        let from = graph.table_name(edge.source());
        let to = graph.table_name(edge.target());
        let label = edge.weight().source_columns.join(", ");
        output.push_str(&format!(
            "    \"{}\" -> \"{}\" [label=\"{}\"];\n",
            from, to, label
        ));
    }

    output.push_str("}\n");
    output
}
