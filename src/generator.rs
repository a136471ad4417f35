//! Example queries derived from a parsed schema.

use crate::ast::{Relation, Schema};
use crate::serializer::quote_if_needed;
use serde::{Deserialize, Serialize};

const EXAMPLE_LIMIT: usize = 5;

/// Alias for the related side of a self-referencing join.
const SELF_JOIN_ALIAS: &str = "parent";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleQuery {
    pub description: String,
    pub query: String,
}

/// One `SELECT *` per table, each followed by a join per outgoing relation.
///
/// Tables keep parse order and joins keep relation order. Relations sharing a
/// table pair each get their own query. Names that are not plain identifiers
/// are double-quoted in the SQL but kept as-is in descriptions.
pub fn example_queries(schema: &Schema) -> Vec<ExampleQuery> {
    let relations = schema.relations();
    let mut queries = Vec::new();

    for table in &schema.tables {
        queries.push(ExampleQuery {
            description: format!("Get all {}", table.name),
            query: format!(
                "SELECT * FROM {} LIMIT {};",
                quote_if_needed(&table.name),
                EXAMPLE_LIMIT
            ),
        });

        for rel in relations.iter().filter(|r| r.from.table == table.name) {
            queries.push(join_query(rel));
        }
    }

    queries
}

fn join_query(rel: &Relation) -> ExampleQuery {
    let source = quote_if_needed(&rel.from.table);
    let target = quote_if_needed(&rel.to.table);
    let col = quote_if_needed(&rel.from.column);
    let refcol = quote_if_needed(&rel.to.column);

    let query = if rel.from.table == rel.to.table {
        format!(
            "SELECT {source}.*, {alias}.* FROM {source} JOIN {target} AS {alias} \
             ON {source}.{col} = {alias}.{refcol} LIMIT {EXAMPLE_LIMIT};",
            alias = SELF_JOIN_ALIAS,
        )
    } else {
        format!(
            "SELECT {source}.*, {target}.* FROM {source} JOIN {target} \
             ON {source}.{col} = {target}.{refcol} LIMIT {EXAMPLE_LIMIT};"
        )
    };

    ExampleQuery {
        description: format!("Get {} with related {}", rel.from.table, rel.to.table),
        query,
    }
}
