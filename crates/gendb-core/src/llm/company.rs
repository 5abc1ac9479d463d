//! Company ideas, name suggestions and data models, each asked of the LLM
//! as a single structured call. Every helper returns the tokens it used.

use serde::Deserialize;

use crate::error::{GenDbError, Result};
use crate::llm::client::LlmProvider;
use crate::llm::prompt;
use crate::schema::types::{Schema, Table};

const COMPANY_MAX_TOKENS: u32 = 1000;
const DATA_MODEL_MAX_TOKENS: u32 = 6000;

const ASSISTANT_SYSTEM: &str = "You are a helpful assistant for a startup studio.";
const DATA_MODEL_SYSTEM: &str = "You are a database architect designing relational schemas.";

/// A fictitious company to build a database for.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub business_summary: String,
    pub company_name: String,
}

/// Invent a startup: a short business summary plus a name.
pub async fn generate_company(provider: &LlmProvider) -> Result<(Company, u64)> {
    let (answer, usage) = provider
        .complete_json(
            ASSISTANT_SYSTEM,
            prompt::company_prompt(),
            &prompt::company_schema(),
            COMPANY_MAX_TOKENS,
        )
        .await?;

    let company: Company = serde_json::from_value(answer).map_err(|e| GenDbError::Llm {
        message: format!("LLM returned an unusable company description: {}", e),
    })?;
    Ok((company, usage))
}

/// Suggest names for a company described by `business_summary`.
pub async fn suggest_company_names(
    provider: &LlmProvider,
    business_summary: &str,
) -> Result<(Vec<String>, u64)> {
    let (answer, usage) = provider
        .complete_json(
            ASSISTANT_SYSTEM,
            &prompt::company_names_prompt(business_summary),
            &prompt::company_names_schema(),
            COMPANY_MAX_TOKENS,
        )
        .await?;

    let names: Vec<String> = answer["names"]
        .as_array()
        .map(|names| {
            names
                .iter()
                .filter_map(|n| n.as_str())
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if names.is_empty() {
        return Err(GenDbError::Llm {
            message: "LLM suggested no company names".to_string(),
        });
    }
    Ok((names, usage))
}

/// Design a data model of about `table_count` tables for the company.
///
/// The model is validated before it is returned; cycles are left for the
/// orderer to report.
pub async fn generate_data_model(
    provider: &LlmProvider,
    business_summary: &str,
    company_name: &str,
    table_count: usize,
) -> Result<(Schema, u64)> {
    let (answer, usage) = provider
        .complete_json(
            DATA_MODEL_SYSTEM,
            &prompt::data_model_prompt(company_name, business_summary, table_count),
            &prompt::data_model_schema(),
            DATA_MODEL_MAX_TOKENS,
        )
        .await?;

    let schema = schema_from_answer(answer)?;
    Ok((schema, usage))
}

fn schema_from_answer(mut answer: serde_json::Value) -> Result<Schema> {
    let tables: Vec<Table> =
        serde_json::from_value(answer["tables"].take()).map_err(|e| GenDbError::Llm {
            message: format!("LLM returned an unusable data model: {}", e),
        })?;

    if tables.is_empty() {
        return Err(GenDbError::Llm {
            message: "LLM returned a data model without tables".to_string(),
        });
    }

    let schema = Schema::new(tables);
    schema.validate()?;
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_from_structured_answer() {
        let answer = json!({
            "tables": [
                {
                    "name": "Customers",
                    "columns": [
                        { "name": "CustomerID", "isPrimaryKey": true, "type": "uuid",
                          "foreignKey": { "referencedTable": "", "referencedColumn": "" } },
                        { "name": "Email", "isPrimaryKey": false, "type": "text",
                          "foreignKey": { "referencedTable": "", "referencedColumn": "" } }
                    ]
                },
                {
                    "name": "Orders",
                    "columns": [
                        { "name": "OrderID", "isPrimaryKey": true, "type": "uuid",
                          "foreignKey": { "referencedTable": "", "referencedColumn": "" } },
                        { "name": "CustomerID", "isPrimaryKey": false, "type": "uuid",
                          "foreignKey": { "referencedTable": "Customers", "referencedColumn": "CustomerID" } },
                        { "name": "PlacedAt", "isPrimaryKey": false, "type": "datetime",
                          "foreignKey": { "referencedTable": "", "referencedColumn": "" } }
                    ]
                }
            ]
        });

        let schema = schema_from_answer(answer).unwrap();
        assert_eq!(schema.table_count(), 2);
        assert_eq!(schema.foreign_key_count(), 1);
        assert!(schema.table("Customers").unwrap().is_source());
    }

    #[test]
    fn test_unknown_reference_rejected() {
        let answer = json!({
            "tables": [{
                "name": "Orders",
                "columns": [
                    { "name": "CustomerID", "isPrimaryKey": false, "type": "uuid",
                      "foreignKey": { "referencedTable": "Customers", "referencedColumn": "CustomerID" } }
                ]
            }]
        });
        assert!(matches!(
            schema_from_answer(answer),
            Err(GenDbError::UnknownReferencedTable { .. })
        ));
    }

    #[test]
    fn test_empty_model_rejected() {
        assert!(schema_from_answer(json!({"tables": []})).is_err());
        assert!(schema_from_answer(json!({})).is_err());
    }

    #[test]
    fn test_company_deserializes_camel_case() {
        let company: Company = serde_json::from_value(json!({
            "businessSummary": "Rents out bicycles by the hour.",
            "companyName": "Pedalo"
        }))
        .unwrap();
        assert_eq!(company.company_name, "Pedalo");
    }
}
