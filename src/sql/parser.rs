//! Parser for CREATE TABLE statements.

use super::lexer::{Scanner, unquote_ident};
use crate::ast::{Column, ColumnRef, Schema, Table};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SqlParseError {
    #[error("No CREATE TABLE statements found")]
    NoTablesFound,
}

/// A bare, quoted or bracketed identifier, optionally schema-qualified.
const IDENT: &str = concat!(
    r#"(?:"[^"]+"|`[^`]+`|\[[^\]]+\]|[\w$]+)"#,
    r#"(?:\s*\.\s*(?:"[^"]+"|`[^`]+`|\[[^\]]+\]|[\w$]+))*"#,
);

static CREATE_TABLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^create\s+table\b").unwrap());

static HEADER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?is)^create\s+table\s+(?:if\s+not\s+exists\s+)?({IDENT})\s*\("
    ))
    .unwrap()
});

static REFERENCES_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?is)\breferences\s+({IDENT})\s*(?:\(([^)]*)\))?")).unwrap()
});

static PRIMARY_KEY_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)primary\s+key").unwrap());

static TABLE_PK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?is)^(?:constraint\s+{IDENT}\s+)?primary\s+key\s*\(([^)]*)\)")).unwrap()
});

static TABLE_FK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?is)^(?:constraint\s+{IDENT}\s+)?foreign\s+key\s*\(([^)]*)\)")).unwrap()
});

/// Parse every `CREATE TABLE ... ;` statement in `input`.
///
/// Statement boundaries ignore `;` inside quotes and anything inside comments.
/// Statements without a recognizable name or body are skipped. Fails only when
/// the text contains no `CREATE TABLE` statement at all.
pub fn parse_schema(input: &str) -> Result<Schema, SqlParseError> {
    let statements: Vec<String> = Scanner::new(input)
        .split_statements()
        .into_iter()
        .filter(|s| CREATE_TABLE_REGEX.is_match(s))
        .collect();
    if statements.is_empty() {
        return Err(SqlParseError::NoTablesFound);
    }

    let mut tables = Vec::with_capacity(statements.len());
    for statement in statements.iter().map(String::as_str) {
        match parse_create_table(statement) {
            Some(table) => tables.push(table),
            None => debug!(statement, "skipping CREATE TABLE without a name or column list"),
        }
    }

    fill_default_ref_columns(&mut tables);

    Ok(Schema::new(tables))
}

fn parse_create_table(statement: &str) -> Option<Table> {
    let header = HEADER_REGEX.captures(statement)?;
    let name = unquote_ident(header.get(1)?.as_str());
    if name.is_empty() {
        return None;
    }
    let body_start = header.get(0)?.end();

    let mut columns = Vec::new();
    let mut constraints = Vec::new();
    for fragment in Scanner::new(&statement[body_start..]).split_body() {
        if is_table_constraint(&fragment) {
            constraints.push(fragment);
        } else if let Some(col) = parse_column(&fragment) {
            columns.push(col);
        }
    }

    for constraint in &constraints {
        apply_table_constraint(constraint, &mut columns);
    }

    Some(Table { name, columns })
}

fn parse_column(fragment: &str) -> Option<Column> {
    let mut words = Scanner::new(fragment).split_words().into_iter();
    let name = unquote_ident(&words.next()?);
    if name.is_empty() {
        debug!(fragment, "skipping column definition without a name");
        return None;
    }
    let typ = words.next().unwrap_or_default();

    Some(Column {
        name,
        typ,
        is_primary_key: PRIMARY_KEY_REGEX.is_match(fragment),
        references: parse_references(fragment).and_then(|r| r.into_iter().next()),
    })
}

/// Target table and columns of a `REFERENCES t(a, b)` clause. A missing column
/// list yields a single empty column, filled in once all tables are known.
fn parse_references(fragment: &str) -> Option<Vec<ColumnRef>> {
    let caps = REFERENCES_REGEX.captures(fragment)?;
    let table = unquote_ident(caps.get(1)?.as_str());
    let columns = caps.get(2).map(|m| ident_list(m.as_str())).unwrap_or_default();

    let refs = if columns.is_empty() {
        vec![ColumnRef {
            table,
            column: String::new(),
        }]
    } else {
        columns
            .into_iter()
            .map(|column| ColumnRef {
                table: table.clone(),
                column,
            })
            .collect()
    };
    Some(refs)
}

fn ident_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(unquote_ident)
        .filter(|s| !s.is_empty())
        .collect()
}

fn is_table_constraint(fragment: &str) -> bool {
    let words = Scanner::new(fragment).split_words();
    let Some(first) = words.first() else {
        return false;
    };
    let head = first.split('(').next().unwrap_or_default().to_uppercase();
    let opens_group = |i: usize| words.get(i).is_some_and(|w| w.starts_with('('));

    match head.as_str() {
        "CONSTRAINT" => true,
        "PRIMARY" | "FOREIGN" => words
            .get(1)
            .is_some_and(|w| w.to_uppercase().starts_with("KEY")),
        "UNIQUE" | "CHECK" | "KEY" | "INDEX" | "FULLTEXT" | "SPATIAL" | "EXCLUDE" => {
            first.contains('(') || opens_group(1) || opens_group(2)
        }
        _ => false,
    }
}

fn apply_table_constraint(constraint: &str, columns: &mut [Column]) {
    if let Some(caps) = TABLE_PK_REGEX.captures(constraint) {
        let keys = caps.get(1).map(|m| ident_list(m.as_str())).unwrap_or_default();
        for col in columns.iter_mut().filter(|c| keys.contains(&c.name)) {
            col.is_primary_key = true;
        }
        return;
    }

    if let Some(caps) = TABLE_FK_REGEX.captures(constraint) {
        let sources = caps.get(1).map(|m| ident_list(m.as_str())).unwrap_or_default();
        let Some(targets) = parse_references(constraint) else {
            return;
        };
        let last = targets.last().cloned();
        for (i, source) in sources.iter().enumerate() {
            let Some(target) = targets.get(i).cloned().or_else(|| last.clone()) else {
                continue;
            };
            if let Some(col) = columns.iter_mut().find(|c| &c.name == source) {
                if col.references.is_none() {
                    col.references = Some(target);
                }
            }
        }
        return;
    }

    debug!(constraint, "ignoring table constraint");
}

/// `REFERENCES users` without a column list points at the target's primary key,
/// or `id` when the target is unknown or has no single primary key.
fn fill_default_ref_columns(tables: &mut [Table]) {
    let defaults: Vec<(String, String)> = tables
        .iter()
        .filter_map(|t| {
            let mut keys = t.primary_keys();
            match (keys.next(), keys.next()) {
                (Some(pk), None) => Some((t.name.clone(), pk.name.clone())),
                _ => None,
            }
        })
        .collect();

    for col in tables.iter_mut().flat_map(|t| t.columns.iter_mut()) {
        if let Some(target) = col.references.as_mut().filter(|r| r.column.is_empty()) {
            target.column = defaults
                .iter()
                .find(|(table, _)| *table == target.table)
                .map(|(_, pk)| pk.clone())
                .unwrap_or_else(|| "id".to_string());
        }
    }
}
