use petgraph::algo::{tarjan_scc, toposort};
use petgraph::visit::EdgeRef;

use crate::error::{GenDbError, Result};
use crate::graph::dag::SchemaGraph;

/// Result of topological sorting: the order in which tables can be created
/// and populated (referenced tables before the tables referencing them).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationOrder {
    pub tables: Vec<String>,
}

impl CreationOrder {
    pub fn position(&self, table_name: &str) -> Option<usize> {
        self.tables.iter().position(|t| t == table_name)
    }
}

/// Compute the creation order of the graph.
///
/// petgraph's toposort places the source of every edge before its target.
/// Edges run child → parent, so the raw sort lists dependants first and the
/// creation order is its reverse. A cyclic graph cannot be linearized and
/// fails with [`GenDbError::Cycle`].
pub fn creation_order(graph: &SchemaGraph) -> Result<CreationOrder> {
    let cyclic = cyclic_tables(graph);
    if !cyclic.is_empty() {
        return Err(GenDbError::Cycle {
            tables: cyclic.join(", "),
        });
    }

    match toposort(&graph.graph, None) {
        Ok(sorted) => Ok(CreationOrder {
            tables: sorted
                .iter()
                .rev()
                .map(|&idx| graph.table_name(idx).to_string())
                .collect(),
        }),
        Err(cycle) => Err(GenDbError::Cycle {
            tables: graph.table_name(cycle.node_id()).to_string(),
        }),
    }
}

/// Every table that sits on a cycle: members of strongly connected
/// components with more than one node, plus self-referencing tables.
fn cyclic_tables(graph: &SchemaGraph) -> Vec<String> {
    let mut tables = Vec::new();

    for scc in tarjan_scc(&graph.graph) {
        if scc.len() > 1 {
            let mut names: Vec<String> = scc
                .iter()
                .map(|&idx| graph.table_name(idx).to_string())
                .collect();
            names.sort();
            tables.extend(names);
        }
    }

    for edge in graph.graph.edge_references() {
        if edge.source() == edge.target() {
            let name = graph.table_name(edge.source()).to_string();
            if !tables.contains(&name) {
                tables.push(name);
            }
        }
    }

    tables
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::dag::SchemaGraph;
    use crate::schema::types::*;

    fn keyed(name: &str) -> Table {
        Table::new(name).with_column(Column::new("id", DataType::Uuid).primary_key())
    }

    fn child(name: &str, parents: &[&str]) -> Table {
        let mut table = keyed(name);
        for parent in parents {
            table.columns.push(
                Column::new(format!("{parent}_id"), DataType::Uuid).references(*parent, "id"),
            );
        }
        table
    }

    fn assert_parents_first(tables: &[Table], order: &CreationOrder) {
        for table in tables {
            let pos = order.position(&table.name).unwrap();
            for parent in table.referenced_tables() {
                let parent_pos = order.position(parent).unwrap();
                assert!(
                    parent_pos < pos,
                    "{} must come before {} in {:?}",
                    parent,
                    table.name,
                    order.tables
                );
            }
        }
    }

    #[test]
    fn test_topological_sort_simple() {
        let tables = vec![child("orders", &["users"]), keyed("users")];
        let order = creation_order(&SchemaGraph::build(&tables)).unwrap();

        assert_eq!(order.tables, vec!["users", "orders"]);
    }

    #[test]
    fn test_diamond_dependencies() {
        let tables = vec![
            child("line_items", &["orders", "products"]),
            child("orders", &["customers"]),
            child("products", &["vendors"]),
            keyed("customers"),
            keyed("vendors"),
            child("reviews", &["customers", "products"]),
        ];
        let order = creation_order(&SchemaGraph::build(&tables)).unwrap();

        assert_eq!(order.tables.len(), tables.len());
        assert_parents_first(&tables, &order);
    }

    #[test]
    fn test_order_is_deterministic() {
        let tables = vec![
            keyed("a"),
            keyed("b"),
            child("c", &["a"]),
            child("d", &["b", "c"]),
        ];
        let first = creation_order(&SchemaGraph::build(&tables)).unwrap();
        for _ in 0..5 {
            assert_eq!(creation_order(&SchemaGraph::build(&tables)).unwrap(), first);
        }
    }

    #[test]
    fn test_two_cycle_fails() {
        let tables = vec![child("a", &["b"]), child("b", &["a"])];
        let err = creation_order(&SchemaGraph::build(&tables)).unwrap_err();
        match err {
            GenDbError::Cycle { tables } => assert_eq!(tables, "a, b"),
            other => panic!("expected cycle error, got {other}"),
        }
    }

    #[test]
    fn test_self_reference_fails() {
        let tables = vec![keyed("users"), child("categories", &["categories"])];
        let err = creation_order(&SchemaGraph::build(&tables)).unwrap_err();
        assert!(matches!(err, GenDbError::Cycle { ref tables } if tables == "categories"));
    }
}
