use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    pub tables: Vec<Table>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    /// Type token as written in the source, e.g. `VARCHAR(50)`.
    #[serde(rename = "type")]
    pub typ: String,
    pub is_primary_key: bool,
    pub references: Option<ColumnRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

/// Foreign-key edge implied by a column's `references`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub from: ColumnRef,
    pub to: ColumnRef,
}

impl Schema {
    pub fn new(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// All relations, in table order then column order.
    pub fn relations(&self) -> Vec<Relation> {
        self.tables
            .iter()
            .flat_map(|table| {
                table.columns.iter().filter_map(move |col| {
                    col.references.as_ref().map(|target| Relation {
                        from: ColumnRef {
                            table: table.name.clone(),
                            column: col.name.clone(),
                        },
                        to: target.clone(),
                    })
                })
            })
            .collect()
    }

    /// Relations whose target table was not parsed.
    pub fn unresolved_relations(&self) -> Vec<Relation> {
        self.relations()
            .into_iter()
            .filter(|r| self.table(&r.to.table).is_none())
            .collect()
    }

    /// Tables whose name contains `term`, ignoring case. An empty term matches all.
    pub fn filter_tables(&self, term: &str) -> Vec<&Table> {
        let needle = term.trim().to_lowercase();
        self.tables
            .iter()
            .filter(|t| needle.is_empty() || t.name.to_lowercase().contains(&needle))
            .collect()
    }
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_primary_key)
    }
}

impl Column {
    pub fn new(name: impl Into<String>, typ: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            typ: typ.into(),
            is_primary_key: false,
            references: None,
        }
    }

    /// Short label shown next to the column in schema listings.
    pub fn badge(&self) -> Option<String> {
        if self.is_primary_key {
            Some("Primary key".to_string())
        } else {
            self.references
                .as_ref()
                .map(|r| format!("Foreign key to {}", r.table))
        }
    }
}
