use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sqlscribe::ast::{Schema, Table};
use sqlscribe::bridge::{
    BridgeConfig, DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS, NlQueryBridge,
    OllamaClient,
};
use sqlscribe::explorer::{DEFAULT_PREVIEW_LIMIT, Explorer, Row};
use sqlscribe::generator::example_queries;
use sqlscribe::logging::init_logging;
use sqlscribe::sample::{SAMPLE_SCHEMA, SAMPLE_SCHEMA_NAME};
use sqlscribe::sql::parse_schema;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "sqlscribe")]
#[command(about = "Explore SQL schemas and turn questions into SQL", long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse CREATE TABLE statements and list tables and relations
    Parse {
        #[command(flatten)]
        source: SchemaSource,

        /// Only show tables whose name contains this text
        #[arg(short, long)]
        filter: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Suggest example queries for a schema
    Examples {
        #[command(flatten)]
        source: SchemaSource,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Ask a local model to write SQL for a question
    Ask {
        /// Natural-language question
        question: String,

        #[command(flatten)]
        source: SchemaSource,

        /// Text-generation endpoint
        #[arg(long, env = "SQLSCRIBE_OLLAMA_URL", default_value = DEFAULT_ENDPOINT)]
        endpoint: String,

        /// Model name
        #[arg(long, env = "SQLSCRIBE_MODEL", default_value = DEFAULT_MODEL)]
        model: String,

        /// Request timeout in seconds
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout: u64,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Run a read query against a SQLite database
    Run {
        /// SQL to execute
        sql: String,

        /// SQLite database file
        #[arg(long, env = "SQLSCRIBE_DB", default_value = "data.db")]
        db: PathBuf,
    },
    /// Show the first rows of the first table in a SQLite database
    Preview {
        /// SQLite database file
        #[arg(long, env = "SQLSCRIBE_DB", default_value = "data.db")]
        db: PathBuf,

        /// Maximum number of rows
        #[arg(short, long, default_value_t = DEFAULT_PREVIEW_LIMIT)]
        limit: usize,
    },
}

#[derive(Args)]
struct SchemaSource {
    /// File with CREATE TABLE statements
    #[arg(short, long, required_unless_present = "sample")]
    schema: Option<PathBuf>,

    /// Use the bundled e-commerce sample schema
    #[arg(long, conflicts_with = "schema")]
    sample: bool,
}

impl SchemaSource {
    fn load(&self) -> Result<Schema> {
        let text = match &self.schema {
            Some(path) if !self.sample => fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
            _ => SAMPLE_SCHEMA.to_string(),
        };
        let schema = parse_schema(&text).context("Failed to parse schema file")?;
        if self.sample {
            tracing::info!("loaded sample schema {}", SAMPLE_SCHEMA_NAME);
        }
        Ok(schema)
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = cli.command.execute() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

impl Commands {
    fn execute(self) -> Result<()> {
        match self {
            Commands::Parse { source, filter, json } => {
                let schema = source.load()?;
                let tables = schema.filter_tables(filter.as_deref().unwrap_or_default());
                if json {
                    let value = serde_json::json!({
                        "tables": tables,
                        "relations": schema.relations(),
                    });
                    println!("{}", serde_json::to_string_pretty(&value)?);
                } else {
                    print_schema(&schema, &tables);
                }
            }
            Commands::Examples { source, json } => {
                let queries = example_queries(&source.load()?);
                if json {
                    println!("{}", serde_json::to_string_pretty(&queries)?);
                } else {
                    for q in &queries {
                        println!("-- {}\n{}\n", q.description, q.query);
                    }
                }
            }
            Commands::Ask {
                question,
                source,
                endpoint,
                model,
                timeout,
                json,
            } => {
                let schema = source.load()?;
                let client = OllamaClient::new(BridgeConfig {
                    endpoint,
                    model,
                    timeout_secs: timeout,
                })?;
                let response = NlQueryBridge::new(client).translate_schema(&question, &schema)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&response)?);
                } else {
                    println!("{}", response.sql_query);
                    eprintln!("-- {}", response.explanation);
                }
            }
            Commands::Run { sql, db } => {
                let explorer = open_db(&db)?;
                print_rows(&explorer.run(&sql)?)?;
            }
            Commands::Preview { db, limit } => {
                let explorer = open_db(&db)?;
                let (table, rows) = explorer.preview(limit)?;
                eprintln!("-- {} ({} rows)", table, rows.len());
                print_rows(&rows)?;
            }
        }
        Ok(())
    }
}

fn open_db(path: &Path) -> Result<Explorer> {
    if !path.exists() {
        anyhow::bail!("Database {} does not exist", path.display());
    }
    Explorer::open(path).with_context(|| format!("Failed to open {}", path.display()))
}

fn print_schema(schema: &Schema, tables: &[&Table]) {
    for table in tables {
        println!("{}", table.name);
        let width = table.columns.iter().map(|c| c.name.len()).max().unwrap_or(0);
        for col in &table.columns {
            match col.badge() {
                Some(badge) => println!("  {:<width$}  {}  [{}]", col.name, col.typ, badge),
                None => println!("  {:<width$}  {}", col.name, col.typ),
            }
        }
        println!();
    }

    let relations = schema.relations();
    if !relations.is_empty() {
        println!("Relations:");
        for rel in &relations {
            let marker = if schema.table(&rel.to.table).is_none() {
                "  (unresolved)"
            } else {
                ""
            };
            println!(
                "  {}.{} -> {}.{}{}",
                rel.from.table, rel.from.column, rel.to.table, rel.to.column, marker
            );
        }
    }
}

fn print_rows(rows: &[Row]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(rows)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_schema_source_flags() {
        let cli = Cli::try_parse_from(["sqlscribe", "parse", "-s", "shop.sql", "--json"]).unwrap();
        let Commands::Parse { source, json, .. } = cli.command else {
            panic!("expected parse");
        };
        assert_eq!(source.schema, Some(PathBuf::from("shop.sql")));
        assert!(!source.sample);
        assert!(json);

        let args = ["sqlscribe", "ask", "how many orders?", "--sample"];
        let cli = Cli::try_parse_from(args).unwrap();
        let Commands::Ask { question, source, .. } = cli.command else {
            panic!("expected ask");
        };
        assert_eq!(question, "how many orders?");
        assert!(source.sample);
        assert!(source.load().unwrap().table("orders").is_some());
    }

    #[test]
    fn test_schema_source_required() {
        assert!(Cli::try_parse_from(["sqlscribe", "examples"]).is_err());
        assert!(Cli::try_parse_from(["sqlscribe", "examples", "shop.sql"]).is_err());
        assert!(
            Cli::try_parse_from(["sqlscribe", "examples", "--schema", "a.sql", "--sample"])
                .is_err()
        );
    }
}
