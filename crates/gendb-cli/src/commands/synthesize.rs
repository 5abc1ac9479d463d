use anyhow::{Context, Result};

use gendb_core::dataset::{read_dataset, write_dataset, Dataset};
use gendb_core::generate::FakeValueGenerator;
use gendb_core::llm::client::LlmProvider;

use crate::args::SynthesizeArgs;
use crate::commands::{
    is_offline, load_config, model_override, spinner, synthesis_options, synthesize_with_progress,
};

pub async fn run(args: &SynthesizeArgs) -> Result<()> {
    let config = load_config()?;
    let options = synthesis_options(&args.synthesis, config.as_ref());
    options.validate()?;

    let pb = spinner("1/3", &format!("Loading {}...", args.file.display()));
    let dataset = read_dataset(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;
    let schema = dataset.schema();
    pb.finish_with_message(format!(
        "Loading {}... ✓ {} tables, {} foreign keys",
        args.file.display(),
        schema.table_count(),
        schema.foreign_key_count()
    ));

    let output = if is_offline(&args.synthesis, config.as_ref()) {
        let generator = FakeValueGenerator::new(options.seed);
        synthesize_with_progress(&generator, &schema, &dataset.business_summary, options, "2/3")
            .await?
    } else {
        let provider = LlmProvider::from_env(model_override(&args.synthesis, config.as_ref()))
            .context("synthesize requires an LLM API key (or --offline)")?;
        synthesize_with_progress(&provider, &schema, &dataset.business_summary, options, "2/3")
            .await?
    };

    let path = args.output.as_deref().unwrap_or(&args.file);
    let pb = spinner("3/3", &format!("Writing to {}...", path.display()));
    let dataset = Dataset {
        rows_by_table: output.rows_by_table,
        ..dataset
    };
    write_dataset(&dataset, path)?;
    pb.finish_with_message(format!("Writing to {}... ✓", path.display()));

    eprintln!(
        "\n✓ Generated {} rows across {} tables → {}",
        dataset.rows_by_table.total_rows(),
        dataset.tables.len(),
        path.display()
    );
    eprintln!("Tokens used: {}", output.usage);
    Ok(())
}
