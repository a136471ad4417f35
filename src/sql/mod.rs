//! CREATE TABLE text to schema conversion.

mod lexer;
mod parser;

pub use parser::{SqlParseError, parse_schema};
