use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One displayable unit of a chat turn.
///
/// `Image` holds whatever reference the flow handed back (URL, path or a
/// `data:` URI). `Error` is what the normalizer produces when it cannot find
/// a displayable message, so a turn always has something to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ContentItem {
    Text(String),
    Image(String),
    Error(String),
}

impl ContentItem {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn image(value: impl Into<String>) -> Self {
        Self::Image(value.into())
    }

    pub fn error(value: impl Into<String>) -> Self {
        Self::Error(value.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// A single user or assistant turn. Content is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    role: Role,
    content: Vec<ContentItem>,
}

impl ChatTurn {
    pub fn new(role: Role, content: Vec<ContentItem>) -> anyhow::Result<Self> {
        if content.is_empty() {
            anyhow::bail!("{} turn must carry at least one content item", role.as_str());
        }
        Ok(Self { role, content })
    }

    pub fn user(prompt: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentItem::Text(prompt.into())],
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &[ContentItem] {
        self.content.as_slice()
    }

    pub fn has_error(&self) -> bool {
        self.content.iter().any(ContentItem::is_error)
    }
}
