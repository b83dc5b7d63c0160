//! Outbound replies.

use serde::{Deserialize, Serialize};

/// An RGB color for embed replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub const LIME: Self = Self(0x00FF00);
    pub const RED: Self = Self(0xFF0000);
    pub const GOLD: Self = Self(0xFFD700);
    pub const DEEP_SKY_BLUE: Self = Self(0x00BFFF);
    pub const BLUE: Self = Self(0x0000FF);
}

/// A message the bot sends back to a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum Reply {
    /// Plain text.
    Text(String),
    /// A rich embed with a leading emoji.
    Embed {
        description: String,
        color: Color,
        emoji: Option<String>,
    },
}

impl Reply {
    pub const SUCCESS_EMOJI: &'static str = "✅";
    pub const ERROR_EMOJI: &'static str = "❌";
    pub const WARNING_EMOJI: &'static str = "⚠️";
    pub const INFO_EMOJI: &'static str = "ℹ️";
    pub const QUESTION_EMOJI: &'static str = "❓";

    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    pub fn success(description: impl Into<String>) -> Self {
        Self::embed(description, Color::LIME, Self::SUCCESS_EMOJI)
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self::embed(description, Color::RED, Self::ERROR_EMOJI)
    }

    pub fn warning(description: impl Into<String>) -> Self {
        Self::embed(description, Color::GOLD, Self::WARNING_EMOJI)
    }

    pub fn info(description: impl Into<String>) -> Self {
        Self::embed(description, Color::DEEP_SKY_BLUE, Self::INFO_EMOJI)
    }

    /// A prompt that expects an answer from the reader.
    pub fn question(description: impl Into<String>) -> Self {
        Self::embed(description, Color::BLUE, Self::QUESTION_EMOJI)
    }

    fn embed(description: impl Into<String>, color: Color, emoji: &str) -> Self {
        Self::Embed {
            description: description.into(),
            color,
            emoji: Some(emoji.to_string()),
        }
    }

    /// Renders the reply as plain text, the way a text-only gateway shows it.
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Embed {
                description,
                emoji: Some(emoji),
                ..
            } => format!("{emoji} {description}"),
            Self::Embed { description, .. } => description.clone(),
        }
    }
}

impl From<String> for Reply {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Reply {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        assert_eq!(Reply::text("Pong!").render(), "Pong!");
        assert_eq!(Reply::error("nope").render(), "❌ nope");
        assert_eq!(Reply::success("done").render(), "✅ done");
    }

    #[test]
    fn test_embed_colors() {
        match Reply::warning("careful") {
            Reply::Embed { color, .. } => assert_eq!(color, Color::GOLD),
            other => panic!("unexpected reply {other:?}"),
        }
    }
}
