pub mod ast;
pub mod generator;
pub mod prompt;
pub mod sample;
pub mod serializer;
pub mod sql;

#[cfg(not(target_arch = "wasm32"))]
pub mod bridge;
#[cfg(not(target_arch = "wasm32"))]
pub mod explorer;
#[cfg(not(target_arch = "wasm32"))]
pub mod logging;

use wasm_bindgen::prelude::*;

use generator::example_queries;
use prompt::build_schema_prompt;
use sql::parse_schema;

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Parse CREATE TABLE text to a JSON schema: `{"tables": [...], "relations": [...]}`
#[wasm_bindgen(js_name = "parseSchema")]
pub fn parse_schema_json(source: &str) -> Result<String, String> {
    let schema = parse_schema(source).map_err(|e| e.to_string())?;
    let value = serde_json::json!({
        "tables": schema.tables,
        "relations": schema.relations(),
    });
    serde_json::to_string(&value).map_err(|e| e.to_string())
}

/// Example queries for CREATE TABLE text, as a JSON array of `{description, query}`
#[wasm_bindgen(js_name = "exampleQueries")]
pub fn example_queries_json(source: &str) -> Result<String, String> {
    let schema = parse_schema(source).map_err(|e| e.to_string())?;
    serde_json::to_string(&example_queries(&schema)).map_err(|e| e.to_string())
}

/// Prompt text sent to the text-generation model for a question.
#[wasm_bindgen(js_name = "buildPrompt")]
pub fn build_prompt(question: &str, source: &str) -> Result<String, String> {
    let schema = parse_schema(source).map_err(|e| e.to_string())?;
    Ok(build_schema_prompt(question, &schema))
}
