pub mod apply;
pub mod generate;
pub mod graph;
pub mod synthesize;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table as ComfyTable};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use gendb_core::config::{read_config, GenDbConfig};
use gendb_core::llm::ValueGenerator;
use gendb_core::{Schema, SynthesisOptions, SynthesisOutput, Synthesizer};

use crate::args::SynthesisFlags;

/// Load the optional `gendb.toml` from the working directory.
pub(crate) fn load_config() -> Result<Option<GenDbConfig>> {
    let config = read_config(Path::new("."))?;
    debug!(found = config.is_some(), "read gendb.toml");
    Ok(config)
}

/// Synthesis options: CLI flags first, then gendb.toml, then defaults.
pub(crate) fn synthesis_options(
    flags: &SynthesisFlags,
    config: Option<&GenDbConfig>,
) -> SynthesisOptions {
    let base = config
        .map(GenDbConfig::synthesis_options)
        .unwrap_or_default();
    SynthesisOptions {
        rows_per_base_table: flags.rows_per_base_table.unwrap_or(base.rows_per_base_table),
        rows_per_referenced_value: flags
            .rows_per_reference
            .unwrap_or(base.rows_per_referenced_value),
        max_batch_size: flags.batch_size.unwrap_or(base.max_batch_size),
        seed: flags.seed.or(base.seed),
        now: None,
    }
}

pub(crate) fn is_offline(flags: &SynthesisFlags, config: Option<&GenDbConfig>) -> bool {
    flags.offline || config.and_then(|c| c.llm.offline).unwrap_or(false)
}

pub(crate) fn model_override<'a>(
    flags: &'a SynthesisFlags,
    config: Option<&'a GenDbConfig>,
) -> Option<&'a str> {
    flags
        .model
        .as_deref()
        .or_else(|| config.and_then(|c| c.llm.model.as_deref()))
}

/// Resolve the database URL from the flag (or `DATABASE_URL`, which clap
/// reads for it) and then gendb.toml.
pub(crate) fn resolve_db_url(explicit: Option<&str>, config: Option<&GenDbConfig>) -> Result<String> {
    if let Some(url) = explicit {
        return Ok(url.to_string());
    }

    if let Some(url) = config.and_then(|c| c.database.url.as_deref()) {
        return Ok(url.to_string());
    }

    Err(gendb_core::GenDbError::NoDatabaseUrl.into())
}

/// A steady-ticking spinner labelled `[step]`.
pub(crate) fn spinner(step: &str, message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} [{prefix}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix(step.to_string());
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Run synthesis behind a spinner that shows each finished table.
pub(crate) async fn synthesize_with_progress<G: ValueGenerator>(
    generator: &G,
    schema: &Schema,
    business_summary: &str,
    options: SynthesisOptions,
    step: &str,
) -> Result<SynthesisOutput> {
    let pb = spinner(step, "Generating rows...");
    let log = |line: &str| pb.println(format!("  {}", line));

    let output = Synthesizer::new(generator, options)
        .synthesize(schema, business_summary, Some(&log))
        .await
        .context("Row generation failed")?;

    pb.finish_with_message(format!(
        "Generating rows... ✓ {} rows across {} tables",
        output.rows_by_table.total_rows(),
        output.rows_by_table.len()
    ));
    Ok(output)
}

/// Print every table of the data model with its columns.
pub(crate) fn print_model(schema: &Schema) {
    println!(
        "Tables: {} ({} without foreign keys)  Foreign Keys: {}",
        schema.table_count(),
        schema.source_tables().count(),
        schema.foreign_key_count()
    );
    println!();

    for table in &schema.tables {
        println!("━━━ {} ━━━", table.name);

        let mut t = ComfyTable::new();
        t.set_header(vec!["Column", "Type", "PK", "FK"]);
        for column in &table.columns {
            let fk_target = column
                .foreign_key
                .as_ref()
                .map(|fk| format!("→ {}.{}", fk.referenced_table, fk.referenced_column))
                .unwrap_or_default();
            let key = match (column.is_primary_key, column.is_auto_incrementing) {
                (true, true) => "PK (auto)",
                (true, false) => "PK",
                _ => "",
            };

            t.add_row(vec![
                Cell::new(&column.name),
                Cell::new(column.data_type.to_string()),
                Cell::new(key),
                Cell::new(&fk_target),
            ]);
        }

        println!("{}", t);
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gendb_core::config::parse_config;

    #[test]
    fn test_flags_override_config() {
        let config = parse_config("[generate]\nrows_per_base_table = 9\nbatch_size = 12\nseed = 1\n").unwrap();
        let flags = SynthesisFlags {
            batch_size: Some(4),
            ..SynthesisFlags::default()
        };

        let options = synthesis_options(&flags, Some(&config));
        assert_eq!(options.rows_per_base_table, 9);
        assert_eq!(options.max_batch_size, 4);
        assert_eq!(options.rows_per_referenced_value, 2);
        assert_eq!(options.seed, Some(1));
    }

    #[test]
    fn test_defaults_without_config() {
        let options = synthesis_options(&SynthesisFlags::default(), None);
        assert_eq!(options, SynthesisOptions::default());
    }

    #[test]
    fn test_offline_from_config() {
        let config = parse_config("[llm]\noffline = true\nmodel = \"gpt-4o\"\n").unwrap();
        let flags = SynthesisFlags::default();
        assert!(is_offline(&flags, Some(&config)));
        assert!(!is_offline(&flags, None));
        assert_eq!(model_override(&flags, Some(&config)), Some("gpt-4o"));
    }

    #[test]
    fn test_db_url_precedence() {
        let config = parse_config("[database]\nurl = \"sqlite::memory:\"\n").unwrap();
        assert_eq!(
            resolve_db_url(Some("postgres://localhost/x"), Some(&config)).unwrap(),
            "postgres://localhost/x"
        );
        assert_eq!(resolve_db_url(None, Some(&config)).unwrap(), "sqlite::memory:");
        assert!(resolve_db_url(None, None).is_err());
    }
}
