//! Seams to the hosting chat platform and the language model.

use async_trait::async_trait;

use crate::catalog::EmojiId;
use crate::event::MessageEvent;

/// Platform calls the bot needs.
#[async_trait]
pub trait ReactionHost: Send + Sync {
    /// Attach (`enabled = true`) or detach a reaction on a message.
    async fn set_reaction(
        &self,
        message_id: &str,
        emoji: EmojiId,
        enabled: bool,
    ) -> anyhow::Result<()>;

    /// Send a plain-text answer into the chat the event came from.
    async fn reply(&self, event: &MessageEvent, text: &str) -> anyhow::Result<()>;
}

/// Free-text emotion judgement by an external model.
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    async fn classify(&self, text: &str, system_prompt: &str) -> anyhow::Result<String>;
}
