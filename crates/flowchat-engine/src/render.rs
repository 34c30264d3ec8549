use std::io::Write;

use anyhow::Result;
use flowchat_contracts::chat::{ChatTurn, ContentItem, Role};

use crate::session::ChatSession;

/// Sink for drawing chat turns. Text goes through the markdown path, images
/// through the image path.
pub trait TurnRenderer {
    fn begin_turn(&mut self, role: Role) -> Result<()>;
    fn markdown(&mut self, text: &str) -> Result<()>;
    fn image(&mut self, reference: &str) -> Result<()>;
    fn error(&mut self, message: &str) -> Result<()>;
    fn end_turn(&mut self) -> Result<()> {
        Ok(())
    }
}

pub fn render_turn(turn: &ChatTurn, renderer: &mut dyn TurnRenderer) -> Result<()> {
    renderer.begin_turn(turn.role())?;
    for item in turn.content() {
        match item {
            ContentItem::Text(text) => renderer.markdown(text)?,
            ContentItem::Image(reference) => renderer.image(reference)?,
            ContentItem::Error(message) => renderer.error(message)?,
        }
    }
    renderer.end_turn()
}

/// Redraws every turn in insertion order. Rendering never touches the
/// session, so drawing twice produces the same output.
pub fn render_session(session: &ChatSession, renderer: &mut dyn TurnRenderer) -> Result<()> {
    for turn in session.turns() {
        render_turn(turn, renderer)?;
    }
    Ok(())
}

pub struct TerminalRenderer<W: Write> {
    out: W,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TurnRenderer for TerminalRenderer<W> {
    fn begin_turn(&mut self, role: Role) -> Result<()> {
        writeln!(self.out, "{}:", role.as_str())?;
        Ok(())
    }

    fn markdown(&mut self, text: &str) -> Result<()> {
        for line in text.lines() {
            writeln!(self.out, "  {line}")?;
        }
        Ok(())
    }

    fn image(&mut self, reference: &str) -> Result<()> {
        writeln!(self.out, "  {}", describe_image_reference(reference))?;
        Ok(())
    }

    fn error(&mut self, message: &str) -> Result<()> {
        writeln!(self.out, "  Error: {message}")?;
        Ok(())
    }

    fn end_turn(&mut self) -> Result<()> {
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

/// One-line placeholder for an image: inline data URIs are summarised by
/// mime type and decoded size, anything else is shown as given.
pub fn describe_image_reference(reference: &str) -> String {
    let trimmed = reference.trim();
    if let Some(rest) = trimmed.strip_prefix("data:") {
        if let Some((mime, payload)) = rest.split_once(";base64,") {
            let padding = payload.chars().rev().take_while(|ch| *ch == '=').count();
            let bytes = (payload.len() / 4 * 3).saturating_sub(padding);
            let mime = if mime.is_empty() { "image" } else { mime };
            return format!("[image: {mime}, {bytes} bytes]");
        }
    }
    format!("[image] {trimmed}")
}
