//! # Prompt Templates
//!
//! Builds the prompts and response schemas for every LLM call gendb makes:
//! company ideas, name suggestions, the data model, and column values.

use serde_json::json;

use crate::llm::ValueRequest;
use crate::schema::types::{DataType, Table};

/// System prompt shared by every column value request.
pub fn value_system_context(business_summary: &str) -> String {
    format!(
        "You are an assistant to generate column values for a database. You work for a company described as: {}",
        business_summary
    )
}

/// Build the request for one batch of values for `table.column`.
pub fn value_request(business_summary: &str, table: &Table, column_index: usize, count: usize) -> ValueRequest {
    let column = &table.columns[column_index];
    let mut instruction = format!(
        "Generate {} values for column \"{}\" with type {} in table \"{}\".",
        count, column.name, column.data_type, table.name
    );
    if column.is_primary_key {
        instruction.push_str(" Every value must be unique.");
    }
    ValueRequest {
        system_context: value_system_context(business_summary),
        instruction,
        table: table.name.clone(),
        column: column.name.clone(),
        data_type: column.data_type,
        count,
        unique: column.is_primary_key,
        response_schema: values_schema(),
    }
}

/// `{"values": [string]}`
pub fn values_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "values": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["values"],
        "additionalProperties": false
    })
}

pub fn company_prompt() -> &'static str {
    "Generate a business idea for a tech startup. Summarise the business model in a few sentences. Also generate a suitable name for the company."
}

/// `{"businessSummary": string, "companyName": string}`
pub fn company_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "businessSummary": { "type": "string" },
            "companyName": { "type": "string" }
        },
        "required": ["businessSummary", "companyName"],
        "additionalProperties": false
    })
}

pub fn company_names_prompt(business_summary: &str) -> String {
    format!(
        "Suggest 3 potential names for a startup company based on the following summary of its business: {}. Return only the names.",
        business_summary
    )
}

/// `{"names": [string]}`
pub fn company_names_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "names": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["names"],
        "additionalProperties": false
    })
}

pub fn data_model_prompt(company_name: &str, business_summary: &str, table_count: usize) -> String {
    format!(
        "Imagine a data model for a company called {} with the following business model:\n{}\n\
         Return a list of tables and columns for the company's database, including foreign keys. \
         Aim for around {} tables. Foreign keys must not form cycles. \
         For columns without a foreign key, set referencedTable and referencedColumn to empty strings.",
        company_name, business_summary, table_count
    )
}

/// Schema for the data model answer. Mirrors the dataset file's `tables`
/// field; `foreignKey` is always present because strict structured output
/// cannot express optional objects.
pub fn data_model_schema() -> serde_json::Value {
    let types: Vec<&str> = DataType::ALL.iter().map(|t| t.as_str()).collect();
    json!({
        "type": "object",
        "properties": {
            "tables": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "columns": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "name": { "type": "string" },
                                    "isPrimaryKey": { "type": "boolean" },
                                    "type": { "type": "string", "enum": types },
                                    "foreignKey": {
                                        "type": "object",
                                        "properties": {
                                            "referencedTable": { "type": "string" },
                                            "referencedColumn": { "type": "string" }
                                        },
                                        "required": ["referencedTable", "referencedColumn"],
                                        "additionalProperties": false
                                    }
                                },
                                "required": ["name", "isPrimaryKey", "type", "foreignKey"],
                                "additionalProperties": false
                            }
                        }
                    },
                    "required": ["name", "columns"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["tables"],
        "additionalProperties": false
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::Column;

    #[test]
    fn test_value_request_labels_column() {
        let table = Table::new("Products")
            .with_column(Column::new("ProductID", DataType::Uuid).primary_key())
            .with_column(Column::new("Name", DataType::Text));

        let req = value_request("We sell socks.", &table, 1, 12);

        assert_eq!(req.table, "Products");
        assert_eq!(req.column, "Name");
        assert_eq!(req.count, 12);
        assert!(req.system_context.ends_with("We sell socks."));
        assert_eq!(
            req.instruction,
            "Generate 12 values for column \"Name\" with type text in table \"Products\"."
        );
        assert_eq!(req.response_schema["required"][0], "values");
        assert!(!req.unique);
    }

    #[test]
    fn test_key_columns_ask_for_unique_values() {
        let table = Table::new("Coupons").with_column(Column::new("Code", DataType::Text).primary_key());
        let req = value_request("We sell socks.", &table, 0, 3);
        assert!(req.unique);
        assert!(req.instruction.ends_with("Every value must be unique."));
    }

    #[test]
    fn test_data_model_schema_lists_every_type() {
        let schema = data_model_schema();
        let types = &schema["properties"]["tables"]["items"]["properties"]["columns"]["items"]
            ["properties"]["type"]["enum"];
        assert_eq!(types.as_array().unwrap().len(), DataType::ALL.len());
        assert!(types.as_array().unwrap().contains(&json!("datetime")));
    }
}
