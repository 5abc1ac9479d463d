//! # Schema Graph
//!
//! Builds the foreign key dependency graph of a data model and derives the
//! order in which its tables can be created and populated.

pub mod dag;
pub mod topo;
pub mod visualize;

pub use dag::SchemaGraph;
pub use topo::{creation_order, CreationOrder};

use crate::error::Result;
use crate::schema::types::Table;

/// Build the graph for `tables` and return their creation order.
pub fn creation_order_for(tables: &[Table]) -> Result<CreationOrder> {
    creation_order(&SchemaGraph::build(tables))
}
