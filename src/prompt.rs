//! Prompt text for the natural-language to SQL model.

use crate::ast::Schema;
use crate::serializer::serialize;

/// Instruction asking for a single SQLite query answering `question`.
pub fn build_prompt(question: &str, schema: &str) -> String {
    format!(
        "You are an expert SQL generator. Using the following database schema:\n\n{}\n\n\
         Convert the following natural language question into an SQLite query:\n\"{}\"\n\n\
         Only respond with the SQL query.",
        schema, question
    )
}

pub fn build_schema_prompt(question: &str, schema: &Schema) -> String {
    build_prompt(question, &serialize(schema))
}
