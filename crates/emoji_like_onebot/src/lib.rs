//! OneBot v11 adapter: turns WebSocket events into [`emoji_like_core::MessageEvent`]s
//! and implements [`emoji_like_core::ReactionHost`] on top of the action API.

pub mod client;
pub mod event;

pub use client::OneBotClient;
pub use event::{Action, OneBotEvent};
