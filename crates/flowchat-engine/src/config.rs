use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use flowchat_contracts::flow::{flow_run_url, Tweaks};

pub const DEFAULT_API_BASE: &str = "https://api.langflow.astra.datastax.com";
pub const DEFAULT_IMAGE_COMPONENT: &str = "ChatInput";

pub const ENV_API_BASE: &str = "FLOWCHAT_API_BASE";
pub const ENV_FLOW_ID: &str = "FLOWCHAT_FLOW_ID";
pub const ENV_ENDPOINT: &str = "FLOWCHAT_ENDPOINT";
pub const ENV_TWEAKS: &str = "FLOWCHAT_TWEAKS";
pub const ENV_IMAGE_COMPONENT: &str = "FLOWCHAT_IMAGE_COMPONENT";
pub const ENV_TIMEOUT_SECS: &str = "FLOWCHAT_TIMEOUT_SECS";
pub const ENV_TOKEN: &str = "FLOWCHAT_TOKEN";
pub const ENV_ASTRA_TOKEN: &str = "ASTRA_APPLICATION_TOKEN";

#[derive(Debug, Clone, PartialEq)]
pub struct FlowConfig {
    pub api_base: String,
    pub flow_id: String,
    pub endpoint: String,
    pub tweaks: Tweaks,
    /// Component whose tweak receives `{"image": <data uri>}` on upload.
    pub image_component: String,
    pub auth_token: Option<String>,
    pub timeout: Option<Duration>,
}

/// Values given on the command line. Each one wins over its environment
/// variable.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_base: Option<String>,
    pub flow_id: Option<String>,
    pub endpoint: Option<String>,
    pub tweaks: Option<String>,
    pub image_component: Option<String>,
    pub auth_token: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl FlowConfig {
    /// Loads `.env` from the working directory (if any), then resolves
    /// against the process environment.
    pub fn from_env(overrides: ConfigOverrides) -> Result<Self> {
        dotenv::dotenv().ok();
        Self::resolve(overrides, non_empty_env)
    }

    pub fn resolve(
        overrides: ConfigOverrides,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let pick = |given: Option<String>, key: &str| {
            given
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .or_else(|| lookup(key))
        };

        let api_base = pick(overrides.api_base, ENV_API_BASE)
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let Some(flow_id) = pick(overrides.flow_id, ENV_FLOW_ID) else {
            bail!("flow id is not configured (set {ENV_FLOW_ID} or pass --flow-id)");
        };
        let Some(endpoint) = pick(overrides.endpoint, ENV_ENDPOINT) else {
            bail!("flow endpoint is not configured (set {ENV_ENDPOINT} or pass --endpoint)");
        };
        let tweaks = match pick(overrides.tweaks, ENV_TWEAKS) {
            Some(raw) => parse_tweaks(&raw)?,
            None => Tweaks::new(),
        };
        let image_component = pick(overrides.image_component, ENV_IMAGE_COMPONENT)
            .unwrap_or_else(|| default_image_component(&tweaks));
        let auth_token =
            pick(overrides.auth_token, ENV_TOKEN).or_else(|| lookup(ENV_ASTRA_TOKEN));
        let timeout_secs = match overrides.timeout_secs {
            Some(secs) => Some(secs),
            None => lookup(ENV_TIMEOUT_SECS)
                .map(|raw| {
                    raw.parse::<u64>().with_context(|| {
                        format!("{ENV_TIMEOUT_SECS} must be whole seconds, got '{raw}'")
                    })
                })
                .transpose()?,
        };

        Ok(Self {
            api_base,
            flow_id,
            endpoint,
            tweaks,
            image_component,
            auth_token,
            timeout: timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        })
    }

    pub fn run_url(&self) -> String {
        flow_run_url(&self.api_base, &self.flow_id, &self.endpoint)
    }
}

/// Accepts either an inline JSON object or a path to a file holding one.
pub fn parse_tweaks(raw: &str) -> Result<Tweaks> {
    let trimmed = raw.trim();
    let text = if trimmed.starts_with('{') {
        trimmed.to_string()
    } else {
        let path = Path::new(trimmed);
        fs::read_to_string(path)
            .with_context(|| format!("failed reading tweaks file {}", path.display()))?
    };
    let tweaks: Tweaks = serde_json::from_str(&text)
        .context("tweaks must be a JSON object keyed by component id")?;
    if let Some((component, _)) = tweaks.iter().find(|(_, overrides)| !overrides.is_object()) {
        bail!("tweak for component '{component}' must be a JSON object");
    }
    Ok(tweaks)
}

fn default_image_component(tweaks: &Tweaks) -> String {
    tweaks
        .keys()
        .find(|component| component.starts_with(DEFAULT_IMAGE_COMPONENT))
        .cloned()
        .unwrap_or_else(|| DEFAULT_IMAGE_COMPONENT.to_string())
}

pub fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
