use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};

/// Per-component overrides keyed by flow component id, in declaration order.
pub type Tweaks = IndexMap<String, Value>;

pub const DEFAULT_IO_TYPE: &str = "chat";

#[derive(Debug, Clone, PartialEq)]
pub struct FlowRequest {
    pub message: String,
    pub output_type: String,
    pub input_type: String,
    pub tweaks: Option<Tweaks>,
    pub auth_token: Option<String>,
}

#[derive(Serialize)]
struct FlowPayload<'a> {
    input_value: &'a str,
    output_type: &'a str,
    input_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tweaks: Option<&'a Tweaks>,
}

impl FlowRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            output_type: DEFAULT_IO_TYPE.to_string(),
            input_type: DEFAULT_IO_TYPE.to_string(),
            tweaks: None,
            auth_token: None,
        }
    }

    pub fn with_tweaks(mut self, tweaks: Tweaks) -> Self {
        self.tweaks = Some(tweaks);
        self
    }

    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }

    /// Token to send as `Authorization: Bearer`, if any. A blank token is
    /// treated as absent and the request goes out unauthenticated; any other
    /// token is sent as given.
    pub fn bearer_token(&self) -> Option<&str> {
        self.auth_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
    }

    /// JSON body for `/run/{endpoint}`. `tweaks` is left out when empty.
    pub fn payload(&self) -> Value {
        let payload = FlowPayload {
            input_value: &self.message,
            output_type: &self.output_type,
            input_type: &self.input_type,
            tweaks: self.tweaks.as_ref().filter(|tweaks| !tweaks.is_empty()),
        };
        serde_json::to_value(payload).unwrap_or_else(|_| json!({}))
    }
}

pub fn flow_run_url(api_base: &str, flow_id: &str, endpoint: &str) -> String {
    format!(
        "{}/lf/{}/api/v1/run/{}",
        api_base.trim().trim_end_matches('/'),
        flow_id.trim(),
        endpoint.trim()
    )
}

/// Copies `tweaks` and points `component`'s override at an image data URI.
/// Any existing override for that component is replaced, not merged.
pub fn with_image_tweak(tweaks: &Tweaks, component: &str, data_uri: &str) -> Tweaks {
    let mut next = tweaks.clone();
    next.insert(component.to_string(), json!({ "image": data_uri }));
    next
}
