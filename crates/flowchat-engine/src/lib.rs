pub mod client;
pub mod config;
pub mod events;
pub mod image_encoder;
pub mod render;
pub mod session;

#[cfg(test)]
mod test_support;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flowchat_contracts::chat::{ChatTurn, ContentItem, Role};
use flowchat_contracts::flow::{normalize_response, with_image_tweak, FlowRequest};

pub use client::{FlowClient, FlowExchange};
pub use config::{ConfigOverrides, FlowConfig};
pub use events::SessionLog;
pub use session::ChatSession;

/// One chat session against a configured flow: owns the turn list, the HTTP
/// client and the optional event log.
pub struct FlowChat {
    config: FlowConfig,
    client: FlowClient,
    session: ChatSession,
    events: Option<SessionLog>,
}

/// The assistant turn appended by [`FlowChat::submit`]. `log_error` holds
/// the first event log failure of the submission; the turns are appended
/// regardless.
#[derive(Debug)]
pub struct SubmitOutcome {
    pub reply: ChatTurn,
    pub log_error: Option<anyhow::Error>,
}

impl FlowChat {
    pub fn new(config: FlowConfig, events_path: Option<&Path>) -> Result<Self> {
        let client = FlowClient::from_config(&config)?;
        let session = ChatSession::new();
        let events = events_path.map(|path| SessionLog::new(path, session.id()));
        if let Some(log) = &events {
            log.session_started(&config)?;
        }
        Ok(Self {
            config,
            client,
            session,
            events,
        })
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn events_path(&self) -> Option<PathBuf> {
        self.events.as_ref().map(|log| log.path().to_path_buf())
    }

    /// Sends one user message (plus an optional jpg/png upload) and appends
    /// both the user turn and the assistant reply.
    ///
    /// Only an unreadable attachment is returned as `Err`, and then nothing
    /// is appended. Flow failures become an assistant turn holding an error
    /// item; event log failures are reported in the outcome.
    pub fn submit(&mut self, prompt: &str, attachment: Option<&Path>) -> Result<SubmitOutcome> {
        let image_uri = attachment
            .map(|path| {
                image_encoder::encode_image_file(path)
                    .with_context(|| format!("could not attach {}", path.display()))
            })
            .transpose()?;

        let mut log_error = None;
        let mut user_content = vec![ContentItem::text(prompt)];
        if let Some(uri) = image_uri.as_deref() {
            user_content.push(ContentItem::image(uri));
        }
        self.append_turn(ChatTurn::new(Role::User, user_content)?, &mut log_error);

        let tweaks = match image_uri.as_deref() {
            Some(uri) => with_image_tweak(&self.config.tweaks, &self.config.image_component, uri),
            None => self.config.tweaks.clone(),
        };
        let request = FlowRequest::new(prompt)
            .with_tweaks(tweaks)
            .with_auth_token(self.config.auth_token.clone());

        let exchange = self.client.execute(&request);
        let normalized = normalize_response(&exchange.response);
        self.record(&mut log_error, |log| {
            log.flow_exchange(&exchange, normalized.shape, image_uri.is_some())
        });

        let reply = ChatTurn::new(Role::Assistant, normalized.items)?;
        let reply = self.append_turn(reply, &mut log_error).clone();
        Ok(SubmitOutcome { reply, log_error })
    }

    fn append_turn(
        &mut self,
        turn: ChatTurn,
        log_error: &mut Option<anyhow::Error>,
    ) -> &ChatTurn {
        let index = self.session.len();
        self.record(log_error, |log| log.turn_appended(index, &turn));
        self.session.append(turn)
    }

    fn record(
        &self,
        log_error: &mut Option<anyhow::Error>,
        write: impl FnOnce(&SessionLog) -> Result<()>,
    ) {
        let Some(log) = &self.events else {
            return;
        };
        if let Err(err) = write(log) {
            log_error.get_or_insert(err);
        }
    }
}
