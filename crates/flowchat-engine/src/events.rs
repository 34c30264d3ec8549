use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use flowchat_contracts::chat::ChatTurn;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::client::FlowExchange;
use crate::config::FlowConfig;

pub const REDACTED: &str = "<redacted>";

/// Everything the session log records. Serialized with a `type` tag next to
/// the `session_id` and `ts` stamp of [`LogLine`].
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SessionEvent<'a> {
    SessionStarted {
        url: String,
        tweak_components: Vec<&'a str>,
        image_component: &'a str,
        authenticated: bool,
    },
    TurnAppended {
        index: usize,
        turn: &'a ChatTurn,
    },
    FlowRequest {
        url: &'a str,
        headers: Map<String, Value>,
        input_value: Option<&'a str>,
        has_image: bool,
    },
    FlowResponse {
        status: Option<u16>,
        shape: &'a str,
        response: &'a Value,
    },
    FlowError {
        status: Option<u16>,
        shape: &'a str,
        response: &'a Value,
    },
}

#[derive(Debug, Serialize)]
struct LogLine<'a> {
    session_id: &'a str,
    ts: String,
    #[serde(flatten)]
    event: SessionEvent<'a>,
}

/// JSONL diagnostics for one chat session. Bearer tokens never reach the
/// file: request headers pass through [`redact_headers`].
#[derive(Debug, Clone)]
pub struct SessionLog {
    path: PathBuf,
    session_id: String,
}

impl SessionLog {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            session_id: session_id.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn session_started(&self, config: &FlowConfig) -> Result<()> {
        self.write(SessionEvent::SessionStarted {
            url: config.run_url(),
            tweak_components: config.tweaks.keys().map(String::as_str).collect(),
            image_component: &config.image_component,
            authenticated: config.auth_token.is_some(),
        })
    }

    pub fn turn_appended(&self, index: usize, turn: &ChatTurn) -> Result<()> {
        self.write(SessionEvent::TurnAppended { index, turn })
    }

    /// Records the request and its outcome as two lines: `flow_request`,
    /// then `flow_response` or `flow_error` when the response carries an
    /// `error` key. The payload itself is not logged; an attached image
    /// shows up only as `has_image`.
    pub fn flow_exchange(
        &self,
        exchange: &FlowExchange,
        shape: &str,
        has_image: bool,
    ) -> Result<()> {
        self.write(SessionEvent::FlowRequest {
            url: &exchange.url,
            headers: redact_headers(&exchange.headers),
            input_value: exchange.payload.get("input_value").and_then(Value::as_str),
            has_image,
        })?;
        let status = exchange.status;
        let response = &exchange.response;
        self.write(if exchange.is_error() {
            SessionEvent::FlowError {
                status,
                shape,
                response,
            }
        } else {
            SessionEvent::FlowResponse {
                status,
                shape,
                response,
            }
        })
    }

    fn write(&self, event: SessionEvent<'_>) -> Result<()> {
        let line = serde_json::to_string(&LogLine {
            session_id: &self.session_id,
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            event,
        })
        .context("failed to serialize session event")?;

        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating event log dir {}", parent.display())
            })?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed opening event log {}", self.path.display()))?;
        writeln!(file, "{line}")
            .with_context(|| format!("failed writing event log {}", self.path.display()))
    }
}

pub fn redact_headers(headers: &[(String, String)]) -> Map<String, Value> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if name.eq_ignore_ascii_case("authorization") {
                REDACTED
            } else {
                value.as_str()
            };
            (name.clone(), Value::String(shown.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use chrono::DateTime;
    use flowchat_contracts::chat::{ChatTurn, ContentItem, Role};
    use flowchat_contracts::flow::Tweaks;
    use serde_json::{json, Value};

    use super::{redact_headers, SessionLog, REDACTED};
    use crate::client::FlowExchange;
    use crate::config::FlowConfig;

    fn read_lines(log: &SessionLog) -> anyhow::Result<Vec<Value>> {
        fs::read_to_string(log.path())?
            .lines()
            .map(|line| serde_json::from_str::<Value>(line).map_err(anyhow::Error::from))
            .collect()
    }

    fn exchange(response: Value) -> FlowExchange {
        FlowExchange {
            url: "http://flows.local/lf/flow-1/api/v1/run/support".to_string(),
            headers: vec![
                ("content-type".to_string(), "application/json".to_string()),
                ("Authorization".to_string(), "Bearer AstraCS:secret".to_string()),
            ],
            payload: json!({"input_value": "hello", "output_type": "chat", "input_type": "chat"}),
            status: Some(200),
            response,
        }
    }

    #[test]
    fn session_started_lists_tweak_components() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let log = SessionLog::new(temp.path().join("logs").join("events.jsonl"), "s-1");
        let mut tweaks = Tweaks::new();
        tweaks.insert("Prompt-pVgGQ".to_string(), json!({}));
        tweaks.insert("ChatInput-c1hCe".to_string(), json!({}));
        let config = FlowConfig {
            api_base: "http://flows.local".to_string(),
            flow_id: "flow-1".to_string(),
            endpoint: "support".to_string(),
            tweaks,
            image_component: "ChatInput-c1hCe".to_string(),
            auth_token: None,
            timeout: Some(Duration::from_secs(5)),
        };

        log.session_started(&config)?;

        let lines = read_lines(&log)?;
        assert_eq!(lines.len(), 1);
        let row = &lines[0];
        assert_eq!(row["type"], "session_started");
        assert_eq!(row["session_id"], "s-1");
        assert_eq!(row["url"], "http://flows.local/lf/flow-1/api/v1/run/support");
        assert_eq!(row["tweak_components"], json!(["Prompt-pVgGQ", "ChatInput-c1hCe"]));
        assert_eq!(row["authenticated"], false);
        DateTime::parse_from_rfc3339(row["ts"].as_str().unwrap_or_default())?;
        Ok(())
    }

    #[test]
    fn turn_appended_carries_tagged_content() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let log = SessionLog::new(temp.path().join("events.jsonl"), "s-1");
        let turn = ChatTurn::new(
            Role::Assistant,
            vec![ContentItem::text("hi"), ContentItem::image("https://cdn/x.png")],
        )?;

        log.turn_appended(0, &ChatTurn::user("hello"))?;
        log.turn_appended(1, &turn)?;

        let lines = read_lines(&log)?;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["type"], "turn_appended");
        assert_eq!(lines[1]["index"], 1);
        assert_eq!(lines[1]["turn"]["role"], "assistant");
        assert_eq!(
            lines[1]["turn"]["content"][1],
            json!({"kind": "image", "value": "https://cdn/x.png"})
        );
        Ok(())
    }

    #[test]
    fn flow_exchange_redacts_token_and_tags_outcome() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let log = SessionLog::new(temp.path().join("events.jsonl"), "s-1");

        log.flow_exchange(&exchange(json!({"outputs": []})), "unrecognized", false)?;
        log.flow_exchange(
            &exchange(json!({"error": "Failed to decode JSON response: eof"})),
            "error",
            true,
        )?;

        let raw = fs::read_to_string(log.path())?;
        assert!(!raw.contains("AstraCS:secret"));
        let lines = read_lines(&log)?;
        let types = lines
            .iter()
            .map(|row| row["type"].as_str().unwrap_or_default())
            .collect::<Vec<&str>>();
        assert_eq!(
            types,
            vec!["flow_request", "flow_response", "flow_request", "flow_error"]
        );
        assert_eq!(lines[0]["headers"]["Authorization"], REDACTED);
        assert_eq!(lines[0]["input_value"], "hello");
        assert_eq!(lines[2]["has_image"], true);
        assert_eq!(lines[3]["shape"], "error");
        assert_eq!(lines[3]["status"], 200);
        Ok(())
    }

    #[test]
    fn unwritable_log_reports_its_path() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        fs::create_dir(&path)?;
        let log = SessionLog::new(&path, "s-1");

        let err = log
            .turn_appended(0, &ChatTurn::user("hello"))
            .err()
            .map(|err| format!("{err:#}"))
            .unwrap_or_default();

        assert!(err.contains("event log"), "unexpected error: {err}");
        assert!(err.contains("events.jsonl"), "unexpected error: {err}");
        Ok(())
    }

    #[test]
    fn only_authorization_is_redacted() {
        let headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("authorization".to_string(), "Bearer secret".to_string()),
        ];
        let shown = redact_headers(&headers);
        assert_eq!(shown["Content-Type"], "application/json");
        assert_eq!(shown["authorization"], REDACTED);
    }
}
