//! Serializer for converting a Schema back to compact DDL text.
//!
//! Used to describe the loaded schema to the text-generation model.

use crate::ast::{Column, Schema, Table};

/// Serialize a Schema to `CREATE TABLE` statements.
pub fn serialize(schema: &Schema) -> String {
    let mut output = String::new();

    for (i, table) in schema.tables.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        serialize_table(&mut output, table);
    }

    output
}

fn serialize_table(output: &mut String, table: &Table) {
    output.push_str("CREATE TABLE ");
    output.push_str(&quote_if_needed(&table.name));
    output.push_str(" (\n");

    for (i, col) in table.columns.iter().enumerate() {
        output.push_str("  ");
        serialize_column(output, col);
        if i + 1 < table.columns.len() {
            output.push(',');
        }
        output.push('\n');
    }

    output.push_str(");\n");
}

fn serialize_column(output: &mut String, col: &Column) {
    output.push_str(&quote_if_needed(&col.name));
    if !col.typ.is_empty() {
        output.push(' ');
        output.push_str(&col.typ);
    }
    if col.is_primary_key {
        output.push_str(" PRIMARY KEY");
    }
    if let Some(target) = &col.references {
        output.push_str(&format!(
            " REFERENCES {}({})",
            quote_if_needed(&target.table),
            quote_if_needed(&target.column)
        ));
    }
}

/// Double-quote an identifier unless it is a plain, non-reserved word.
pub(crate) fn quote_if_needed(name: &str) -> String {
    let plain = !name.is_empty()
        && name.chars().all(|c| c.is_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && !is_reserved(name);
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

fn is_reserved(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "all" | "and" | "as" | "between" | "by" | "case" | "check" | "create" | "default"
            | "delete" | "distinct" | "drop" | "else" | "exists" | "from" | "group"
            | "having" | "in" | "index" | "insert" | "into" | "is" | "join" | "limit"
            | "not" | "null" | "on" | "or" | "order" | "primary" | "references" | "select"
            | "set" | "table" | "then" | "to" | "union" | "unique" | "update" | "values"
            | "when" | "where"
    )
}
