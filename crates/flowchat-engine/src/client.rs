use std::time::Duration;

use anyhow::{Context, Result};
use flowchat_contracts::flow::FlowRequest;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};

use crate::config::FlowConfig;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Result of one `/run` call. `response` is always JSON: transport and
/// decode failures come back as `{"error": "..."}`.
#[derive(Debug, Clone)]
pub struct FlowExchange {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub payload: Value,
    pub status: Option<u16>,
    pub response: Value,
}

impl FlowExchange {
    pub fn is_error(&self) -> bool {
        self.response
            .as_object()
            .map(|obj| obj.contains_key("error"))
            .unwrap_or(false)
    }
}

/// Blocking client for a single flow endpoint. No retries; without a
/// configured timeout a hung call blocks the caller.
#[derive(Debug, Clone)]
pub struct FlowClient {
    url: String,
    http: HttpClient,
}

impl FlowClient {
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("failed to build flow HTTP client")?;
        Ok(Self {
            url: url.into(),
            http,
        })
    }

    pub fn from_config(config: &FlowConfig) -> Result<Self> {
        Self::new(config.run_url(), config.timeout)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn run(&self, request: &FlowRequest) -> Value {
        self.execute(request).response
    }

    pub fn execute(&self, request: &FlowRequest) -> FlowExchange {
        let payload = request.payload();
        let mut headers = vec![(CONTENT_TYPE.to_string(), JSON_CONTENT_TYPE.to_string())];
        let mut builder = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .json(&payload);
        if let Some(token) = request.bearer_token() {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
            builder = builder.bearer_auth(token);
        }

        let (status, response) = match builder.send() {
            Ok(response) => {
                let status = response.status().as_u16();
                let parsed = match response.text() {
                    Ok(body) => decode_body(&body),
                    Err(err) => json!({
                        "error": format!("Failed to read response body: {err}"),
                    }),
                };
                (Some(status), parsed)
            }
            Err(err) => {
                let err = anyhow::Error::new(err)
                    .context(format!("POST {} did not complete", self.url));
                (
                    None,
                    json!({ "error": format!("Flow request failed: {}", error_chain_text(&err)) }),
                )
            }
        };

        FlowExchange {
            url: self.url.clone(),
            headers,
            payload,
            status,
            response,
        }
    }
}

/// Parses the body whatever the HTTP status; a non-JSON body becomes the
/// decode-error sentinel.
fn decode_body(body: &str) -> Value {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(err) => json!({ "error": format!("Failed to decode JSON response: {err}") }),
    }
}

fn error_chain_text(err: &anyhow::Error) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts.last().map(|existing| existing == trimmed).unwrap_or(false) {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return err.to_string();
    }
    parts.join(" | caused by: ")
}
