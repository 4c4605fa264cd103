use serde::Serialize;

use crate::common::colours;

/// Message sent back to the channel an event came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colour: Option<u32>,
    /// Only visible to the invoking user where the platform supports it.
    pub ephemeral: bool,
}

impl Reply {
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            colour: None,
            ephemeral: false,
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self::plain(content).colour(colours::BRIGHT_GREEN)
    }

    pub fn info(content: impl Into<String>) -> Self {
        Self::plain(content).colour(colours::LIGHT_BLUE)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::plain(content).colour(colours::RED)
    }

    pub fn colour(mut self, colour: u32) -> Self {
        self.colour = Some(colour);
        self
    }

    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }
}
