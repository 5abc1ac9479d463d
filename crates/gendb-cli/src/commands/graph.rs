use anyhow::{Context, Result};

use gendb_core::dataset::read_dataset;
use gendb_core::graph::visualize::{self, GraphFormat as VizFormat};
use gendb_core::graph::{creation_order, SchemaGraph};

use crate::args::{GraphArgs, GraphFormat};

pub async fn run(args: &GraphArgs) -> Result<()> {
    let dataset = read_dataset(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;
    let graph = SchemaGraph::build(&dataset.tables);

    let format = match args.format {
        GraphFormat::Mermaid => VizFormat::Mermaid,
        GraphFormat::Dot => VizFormat::Dot,
        GraphFormat::Order => {
            let order = creation_order(&graph)?;
            for (i, table) in order.tables.iter().enumerate() {
                let parents = graph.dependencies(table);
                if parents.is_empty() {
                    println!("{:>3}. {}", i + 1, table);
                } else {
                    println!("{:>3}. {} (after {})", i + 1, table, parents.join(", "));
                }
            }
            return Ok(());
        }
    };

    println!("{}", visualize::visualize(&graph, format));
    Ok(())
}
