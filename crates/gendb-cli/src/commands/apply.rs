use anyhow::{bail, Context, Result};
use comfy_table::{Cell, Table as ComfyTable};

use gendb_core::dataset::{read_dataset, Dataset};
use gendb_core::graph::creation_order_for;
use gendb_core::store::apply::sanitize_url;
use gendb_core::store::{apply, get_all_rows, StoreConnection};

use crate::args::ApplyArgs;
use crate::commands::{load_config, resolve_db_url, spinner};

pub async fn run(args: &ApplyArgs) -> Result<()> {
    let config = load_config()?;
    let db_url = resolve_db_url(args.db.as_deref(), config.as_ref())?;

    let dataset = read_dataset(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;
    if dataset.rows_by_table.is_empty() {
        bail!(
            "{} has no rows. Run `gendb synthesize {}` first.",
            args.file.display(),
            args.file.display()
        );
    }

    apply_dataset(&dataset, &db_url).await
}

/// Ping the database, load the dataset in one transaction and print the
/// row counts read back from every table.
pub(crate) async fn apply_dataset(dataset: &Dataset, db_url: &str) -> Result<()> {
    let pb = spinner("1/2", &format!("Connecting to {}...", sanitize_url(db_url)));
    let connection = StoreConnection::connect(db_url).await?;
    connection.ping().await.context("Database did not answer")?;
    pb.finish_with_message(format!(
        "Connecting to {}... ✓ {}",
        sanitize_url(db_url),
        connection.dialect().name()
    ));

    load_and_close(connection, dataset).await
}

/// Load into `connection`, then close it whether or not the load worked.
async fn load_and_close(connection: StoreConnection, dataset: &Dataset) -> Result<()> {
    let result = load(&connection, dataset).await;
    connection.close().await;
    result
}

async fn load(connection: &StoreConnection, dataset: &Dataset) -> Result<()> {
    let pb = spinner("2/2", "Creating tables and inserting rows...");
    let log = |line: &str| pb.println(format!("  {}", line));
    let summary = apply(connection, &dataset.tables, &dataset.rows_by_table, Some(&log))
        .await
        .context("Apply failed; the transaction was rolled back")?;
    pb.finish_with_message(format!(
        "Creating tables and inserting rows... ✓ {} statements",
        summary.statements
    ));

    let order = creation_order_for(&dataset.tables)?;
    let schema = dataset.schema();
    let mut t = ComfyTable::new();
    t.set_header(vec!["Table", "Rows written", "Rows read back"]);
    for name in &order.tables {
        let Some(table) = schema.table(name) else {
            continue;
        };
        let written = dataset.rows_by_table.get(name).map_or(0, |rows| rows.len());
        let stored = get_all_rows(connection, table).await?;
        t.add_row(vec![
            Cell::new(name),
            Cell::new(written),
            Cell::new(stored.len()),
        ]);
    }
    println!("{}", t);

    eprintln!(
        "\n✓ Inserted {} rows across {} tables",
        summary.total_rows(),
        summary.tables.len()
    );
    Ok(())
}
