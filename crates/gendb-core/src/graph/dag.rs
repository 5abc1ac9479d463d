use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

use crate::schema::types::Table;

/// A directed graph of tables linked by foreign keys.
/// Edges point from the referencing table to the referenced table (child → parent).
pub struct SchemaGraph {
    pub graph: DiGraph<String, EdgeInfo>,
    pub node_indices: HashMap<String, NodeIndex>,
}

/// The foreign key columns behind one child → parent edge.
#[derive(Debug, Clone, Default)]
pub struct EdgeInfo {
    /// FK columns in the referencing table, in declaration order.
    pub source_columns: Vec<String>,
    /// Columns they reference, positionally matched to `source_columns`.
    pub referenced_columns: Vec<String>,
}

impl SchemaGraph {
    /// Build the graph for a list of tables.
    ///
    /// Every table becomes a node. Every FK column adds an edge from its
    /// table to the referenced table; several FKs between the same pair of
    /// tables share one edge, so building is idempotent with respect to
    /// duplicate references. FKs to undeclared tables are skipped; schema
    /// validation reports those.
    pub fn build(tables: &[Table]) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for table in tables {
            if !node_indices.contains_key(&table.name) {
                let idx = graph.add_node(table.name.clone());
                node_indices.insert(table.name.clone(), idx);
            }
        }

        for table in tables {
            for column in table.foreign_key_columns() {
                let Some(fk) = &column.foreign_key else {
                    continue;
                };
                let (Some(&from_idx), Some(&to_idx)) = (
                    node_indices.get(&table.name),
                    node_indices.get(&fk.referenced_table),
                ) else {
                    continue;
                };

                let edge = match graph.find_edge(from_idx, to_idx) {
                    Some(edge) => edge,
                    None => graph.add_edge(from_idx, to_idx, EdgeInfo::default()),
                };
                let info = &mut graph[edge];
                if !info.source_columns.contains(&column.name) {
                    info.source_columns.push(column.name.clone());
                    info.referenced_columns.push(fk.referenced_column.clone());
                }
            }
        }

        Self {
            graph,
            node_indices,
        }
    }

    /// Get the table name for a node index.
    pub fn table_name(&self, idx: NodeIndex) -> &str {
        &self.graph[idx]
    }

    /// Get node index for a table name.
    pub fn node_index(&self, table_name: &str) -> Option<NodeIndex> {
        self.node_indices.get(table_name).copied()
    }

    /// Tables the given table references (its parents).
    pub fn dependencies(&self, table_name: &str) -> Vec<&str> {
        let Some(idx) = self.node_index(table_name) else {
            return Vec::new();
        };
        self.graph
            .edges(idx)
            .map(|edge| self.table_name(edge.target()))
            .collect()
    }

    pub fn table_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
