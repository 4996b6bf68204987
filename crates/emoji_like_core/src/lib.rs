pub mod allow_list;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod cooldown;
pub mod event;
pub mod host;
pub mod plugin;
pub mod policy;

pub use allow_list::AllowListStore;
pub use catalog::{EmojiId, EmotionTable, IconCatalog};
pub use commands::Command;
pub use config::{config_handle, ConfigHandle, EmojiLikeConfig, ReactionConfig};
pub use cooldown::{CooldownCheck, CooldownTracker};
pub use event::{MessageEvent, Segment};
pub use host::{ReactionHost, SentimentClassifier};
pub use plugin::{EmojiLike, PluginSettings, Timings};
pub use policy::{Gate, ReactionPolicy};

/// Whether later handlers should still see an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    Continue,
    Stop,
}
