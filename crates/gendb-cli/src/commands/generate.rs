use anyhow::{bail, Context, Result};

use gendb_core::config::DEFAULT_TABLE_COUNT;
use gendb_core::dataset::{write_dataset, Dataset};
use gendb_core::llm::client::LlmProvider;
use gendb_core::llm::company::{generate_company, generate_data_model, suggest_company_names};

use crate::args::GenerateArgs;
use crate::commands::{
    is_offline, load_config, model_override, print_model, resolve_db_url, spinner,
    synthesis_options, synthesize_with_progress,
};

pub async fn run(args: &GenerateArgs) -> Result<()> {
    let config = load_config()?;

    if is_offline(&args.synthesis, config.as_ref()) {
        bail!(
            "generate needs an LLM to design the data model.\n\
             To fill an existing model offline, run `gendb synthesize <FILE> --offline`."
        );
    }

    // Resolve the database up front so a missing URL fails before any tokens
    // are spent.
    let db_url = if args.apply {
        Some(resolve_db_url(args.db.as_deref(), config.as_ref())?)
    } else {
        None
    };

    let provider = LlmProvider::from_env(model_override(&args.synthesis, config.as_ref()))
        .context("generate requires an LLM API key")?;
    let options = synthesis_options(&args.synthesis, config.as_ref());
    options.validate()?;
    let table_count = args
        .tables
        .or_else(|| config.as_ref().map(|c| c.table_count()))
        .unwrap_or(DEFAULT_TABLE_COUNT);

    let mut usage = 0;

    // Phase 1: Company
    let pb = spinner("1/4", "Inventing a company...");
    let (business_summary, company_name) = match (&args.summary, &args.company) {
        (Some(summary), Some(company)) => (summary.clone(), company.clone()),
        (Some(summary), None) => {
            let (names, used) = suggest_company_names(&provider, summary)
                .await
                .context("Failed to name the company")?;
            usage += used;
            // suggest_company_names never returns an empty list
            let name = names.into_iter().next().unwrap_or_default();
            (summary.clone(), name)
        }
        (None, company) => {
            let (invented, used) = generate_company(&provider)
                .await
                .context("Failed to invent a company")?;
            usage += used;
            let name = company.clone().unwrap_or(invented.company_name);
            (invented.business_summary, name)
        }
    };
    pb.finish_with_message(format!("Inventing a company... ✓ {}", company_name));
    eprintln!("\n{}\n", business_summary);

    // Phase 2: Data model
    let pb = spinner("2/4", "Designing the data model...");
    let (schema, used) = generate_data_model(&provider, &business_summary, &company_name, table_count)
        .await
        .context("Failed to design the data model")?;
    usage += used;
    pb.finish_with_message(format!(
        "Designing the data model... ✓ {} tables, {} foreign keys",
        schema.table_count(),
        schema.foreign_key_count()
    ));
    print_model(&schema);

    // Phase 3: Rows
    let output = synthesize_with_progress(&provider, &schema, &business_summary, options, "3/4").await?;
    usage += output.usage;

    // Phase 4: Output
    let pb = spinner("4/4", &format!("Writing to {}...", args.output.display()));
    let dataset = Dataset {
        business_summary,
        company_name,
        tables: schema.tables,
        rows_by_table: output.rows_by_table,
    };
    write_dataset(&dataset, &args.output)?;
    pb.finish_with_message(format!("Writing to {}... ✓", args.output.display()));

    eprintln!(
        "\n✓ Generated {} rows across {} tables for {} → {}",
        dataset.rows_by_table.total_rows(),
        dataset.tables.len(),
        dataset.company_name,
        args.output.display()
    );
    eprintln!(
        "Tokens used: {} ({} {})",
        usage,
        provider.provider_name(),
        provider.model()
    );

    if let Some(db_url) = db_url {
        super::apply::apply_dataset(&dataset, &db_url).await?;
    }

    Ok(())
}
