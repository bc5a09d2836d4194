use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct ChatId(pub u32);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum ModelChoice {
    #[default]
    #[serde(rename = "claude")]
    Claude,
    #[serde(rename = "chatgpt")]
    ChatGpt,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported model: {0}")]
pub struct UnsupportedModel(pub String);

impl ModelChoice {
    pub fn all() -> Vec<ModelChoice> {
        vec![ModelChoice::Claude, ModelChoice::ChatGpt]
    }

    /// Identifier used by the completion backend and the settings file
    pub fn id(&self) -> &'static str {
        match self {
            ModelChoice::Claude => "claude",
            ModelChoice::ChatGpt => "chatgpt",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ModelChoice::Claude => "Claude",
            ModelChoice::ChatGpt => "ChatGPT",
        }
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ModelChoice {
    type Err = UnsupportedModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claude" => Ok(ModelChoice::Claude),
            "chatgpt" => Ok(ModelChoice::ChatGpt),
            other => Err(UnsupportedModel(other.to_string())),
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Message {
    pub content: String,
    pub is_user: bool,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_user: true,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_user: false,
        }
    }
}

/// A chat session. The transcript is append-only.
#[derive(Clone, PartialEq, Debug)]
pub struct Chat {
    pub id: ChatId,
    pub title: String,
    messages: Vec<Message>,
}

impl Chat {
    pub fn new(id: ChatId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            messages: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }
}
