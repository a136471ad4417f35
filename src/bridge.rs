//! Natural-language to SQL via a local text-generation server.
//!
//! Speaks the Ollama `/api/generate` protocol with streaming disabled. One
//! request per question; no retry and no caching.

use crate::ast::Schema;
use crate::prompt::{build_prompt, build_schema_prompt};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_MODEL: &str = "phi";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Label attached to every generated query.
pub const EXPLANATION: &str = "Generated using local model via Ollama";

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Failed to generate SQL query: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to generate SQL query: server returned {0}")]
    Status(StatusCode),
    #[error("Failed to generate SQL query: malformed response ({0})")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NlToSqlResponse {
    pub sql_query: String,
    pub explanation: String,
}

/// Anything that turns a prompt into raw completion text.
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> Result<String, BridgeError>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Blocking client for an Ollama server.
pub struct OllamaClient {
    client: Client,
    config: BridgeConfig,
}

impl OllamaClient {
    pub fn new(config: BridgeConfig) -> Result<Self, BridgeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// Use a preconfigured HTTP client (proxies, TLS roots, ...).
    pub fn with_client(client: Client, config: BridgeConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}

impl TextGenerator for OllamaClient {
    fn generate(&self, prompt: &str) -> Result<String, BridgeError> {
        info!(
            endpoint = %self.config.endpoint,
            model = %self.config.model,
            "requesting completion"
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&GenerateRequest {
                model: &self.config.model,
                prompt,
                stream: false,
            })
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::Status(status));
        }

        let body = response.text()?;
        debug!(bytes = body.len(), "completion received");
        decode_response(&body)
    }
}

fn decode_response(body: &str) -> Result<String, BridgeError> {
    serde_json::from_str::<GenerateResponse>(body)
        .map(|r| r.response)
        .map_err(|e| BridgeError::MalformedResponse(e.to_string()))
}

pub struct NlQueryBridge<G> {
    generator: G,
}

impl<G: TextGenerator> NlQueryBridge<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    /// Ask the model for SQL answering `question` against the given schema text.
    pub fn translate(
        &self,
        question: &str,
        schema: &str,
    ) -> Result<NlToSqlResponse, BridgeError> {
        self.ask(&build_prompt(question, schema))
    }

    pub fn translate_schema(
        &self,
        question: &str,
        schema: &Schema,
    ) -> Result<NlToSqlResponse, BridgeError> {
        self.ask(&build_schema_prompt(question, schema))
    }

    fn ask(&self, prompt: &str) -> Result<NlToSqlResponse, BridgeError> {
        let raw = self.generator.generate(prompt)?;
        Ok(NlToSqlResponse {
            sql_query: strip_code_fence(&raw),
            explanation: EXPLANATION.to_string(),
        })
    }
}

/// Trim the completion and drop a surrounding markdown code fence, if any.
fn strip_code_fence(raw: &str) -> String {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix("```sql")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    inner.strip_suffix("```").unwrap_or(inner).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::SAMPLE_SCHEMA;
    use crate::sql::parse_schema;
    use std::cell::RefCell;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    struct MockGenerator {
        reply: Result<String, StatusCode>,
        prompts: RefCell<Vec<String>>,
    }

    impl MockGenerator {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl TextGenerator for MockGenerator {
        fn generate(&self, prompt: &str) -> Result<String, BridgeError> {
            self.prompts.borrow_mut().push(prompt.to_string());
            self.reply.clone().map_err(BridgeError::Status)
        }
    }

    #[test]
    fn test_translate_trims_response() {
        let generator = MockGenerator::replying("\n  SELECT COUNT(*) FROM users;  \n");
        let bridge = NlQueryBridge::new(generator);
        let result = bridge
            .translate("how many users?", "CREATE TABLE users (id INT);")
            .unwrap();
        assert_eq!(result.sql_query, "SELECT COUNT(*) FROM users;");
        assert_eq!(result.explanation, EXPLANATION);
    }

    #[test]
    fn test_translate_strips_code_fence() {
        let bridge = NlQueryBridge::new(MockGenerator::replying("```sql\nSELECT 1;\n```"));
        let result = bridge.translate("one", "").unwrap();
        assert_eq!(result.sql_query, "SELECT 1;");
    }

    #[test]
    fn test_translate_schema_sends_ddl() {
        let schema = parse_schema(SAMPLE_SCHEMA).unwrap();
        let bridge = NlQueryBridge::new(MockGenerator::replying("SELECT * FROM customers;"));
        bridge.translate_schema("list customers", &schema).unwrap();

        let prompts = bridge.generator.prompts.borrow();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("CREATE TABLE order_items ("));
        assert!(prompts[0].contains("order_id UUID REFERENCES orders(order_id)"));
        assert!(prompts[0].contains("\"list customers\""));
    }

    #[test]
    fn test_translate_propagates_failure() {
        let bridge = NlQueryBridge::new(MockGenerator {
            reply: Err(StatusCode::INTERNAL_SERVER_ERROR),
            prompts: RefCell::new(Vec::new()),
        });
        let err = bridge.translate("q", "").unwrap_err();
        assert!(matches!(err, BridgeError::Status(StatusCode::INTERNAL_SERVER_ERROR)));
    }

    #[test]
    fn test_decode_response() {
        assert_eq!(
            decode_response(r#"{"model":"phi","response":"SELECT 1;","done":true}"#).unwrap(),
            "SELECT 1;"
        );
        assert!(matches!(
            decode_response(r#"{"error":"model not found"}"#),
            Err(BridgeError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_config_defaults() {
        let config: BridgeConfig = serde_json::from_str(r#"{"model":"llama3"}"#).unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.model, "llama3");
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    /// Serve one HTTP request, returning the request body through the join handle.
    fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
            }
            let mut request_body = vec![0; content_length];
            reader.read_exact(&mut request_body).unwrap();

            let mut stream = stream;
            write!(
                stream,
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\
                 Connection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            )
            .unwrap();
            stream.flush().unwrap();

            String::from_utf8(request_body).unwrap()
        });

        (format!("http://{}/api/generate", addr), handle)
    }

    fn local_client(endpoint: String) -> OllamaClient {
        let http = Client::builder().no_proxy().build().unwrap();
        OllamaClient::with_client(
            http,
            BridgeConfig {
                endpoint,
                ..BridgeConfig::default()
            },
        )
    }

    #[test]
    fn test_ollama_client_round_trip() {
        let (endpoint, server) = serve_once("HTTP/1.1 200 OK", r#"{"response":" SELECT 1; "}"#);
        let client = local_client(endpoint);

        let reply = client.generate("prompt text").unwrap();
        assert_eq!(reply, " SELECT 1; ");

        let sent: serde_json::Value = serde_json::from_str(&server.join().unwrap()).unwrap();
        assert_eq!(sent["model"], DEFAULT_MODEL);
        assert_eq!(sent["prompt"], "prompt text");
        assert_eq!(sent["stream"], false);
    }

    #[test]
    fn test_ollama_client_error_status() {
        let (endpoint, server) = serve_once("HTTP/1.1 404 Not Found", r#"{"error":"not found"}"#);
        let client = local_client(endpoint);

        let err = client.generate("prompt").unwrap_err();
        assert!(matches!(err, BridgeError::Status(StatusCode::NOT_FOUND)));
        server.join().unwrap();
    }
}
