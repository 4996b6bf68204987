use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::allow_list::AllowListStore;
use crate::catalog::{EmojiId, EmotionTable, IconCatalog, MONKEY};
use crate::commands::{help_text, Command};
use crate::config::{ConfigHandle, EmojiLikeConfig, ReactionConfig};
use crate::cooldown::{CooldownCheck, CooldownTracker};
use crate::event::MessageEvent;
use crate::host::{ReactionHost, SentimentClassifier};
use crate::policy::{Gate, ReactionPolicy, Sender};
use crate::Propagation;

/// Upper bound for `/fill`.
pub const MAX_FILL: i64 = 20;
/// Upper bound for `/boom` when used by non-administrators.
pub const MAX_BOOM_NON_ADMIN: i64 = 10;

/// Fixed pauses of the command flows.
#[derive(Debug, Clone)]
pub struct Timings {
    /// Between the two notices sent to a newly enrolled `/fill` user.
    pub enrol_notice_delay: Duration,
    /// After each 🐵 detach in `/boom`.
    pub boom_release_delay: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            enrol_notice_delay: Duration::from_secs(5),
            boom_release_delay: Duration::from_millis(500),
        }
    }
}

/// Static settings taken from the top-level config.
#[derive(Debug, Clone)]
pub struct PluginSettings {
    pub admins: HashSet<String>,
    pub command_prefix: String,
    pub allow_list_path: PathBuf,
}

impl From<&EmojiLikeConfig> for PluginSettings {
    fn from(cfg: &EmojiLikeConfig) -> Self {
        Self {
            admins: cfg.admins.iter().map(|a| a.trim().to_string()).collect(),
            command_prefix: cfg.command_prefix.clone(),
            allow_list_path: cfg.allow_list_path(),
        }
    }
}

pub fn clamp_fill_count(requested: i64) -> usize {
    requested.clamp(0, MAX_FILL) as usize
}

pub fn clamp_boom_count(requested: i64, is_admin: bool) -> i64 {
    let count = requested.max(0);
    if is_admin {
        count
    } else {
        count.min(MAX_BOOM_NON_ADMIN)
    }
}

/// The reaction bot: routes events to commands or to the reaction policy.
pub struct EmojiLike {
    settings: PluginSettings,
    config: ConfigHandle,
    allow_list: AllowListStore,
    cooldown: CooldownTracker,
    policy: ReactionPolicy,
    catalog: IconCatalog,
    timings: Timings,
    host: Arc<dyn ReactionHost>,
    classifier: Arc<dyn SentimentClassifier>,
    rng: Mutex<StdRng>,
}

impl EmojiLike {
    pub fn new(
        settings: PluginSettings,
        config: ConfigHandle,
        host: Arc<dyn ReactionHost>,
        classifier: Arc<dyn SentimentClassifier>,
    ) -> Self {
        let allow_list = AllowListStore::load(settings.allow_list_path.clone(), config.clone());
        let cooldown = CooldownTracker::new(config.load().boom_cooldown());
        Self {
            settings,
            config,
            allow_list,
            cooldown,
            policy: ReactionPolicy::default(),
            catalog: IconCatalog::default(),
            timings: Timings::default(),
            host,
            classifier,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_emotions(mut self, emotions: EmotionTable) -> Self {
        self.policy = ReactionPolicy::new(emotions);
        self
    }

    pub fn with_catalog(mut self, catalog: IconCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    pub fn allow_list(&self) -> &AllowListStore {
        &self.allow_list
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    pub fn cooldown(&self) -> &CooldownTracker {
        &self.cooldown
    }

    pub fn is_admin(&self, user: &str) -> bool {
        self.settings.admins.contains(user.trim())
    }

    /// Entry point for every inbound message.
    pub async fn handle(&self, event: &MessageEvent) -> Propagation {
        match Command::parse(&self.settings.command_prefix, &event.plain_text()) {
            Some(Ok(command)) => self.run_command(command, event).await,
            Some(Err(e)) => {
                self.say(event, &e.to_string()).await;
                Propagation::Stop
            }
            None if event.is_group() => self.on_group_message(event).await,
            None => Propagation::Continue,
        }
    }

    /// Reaction policy for an ordinary group message.
    pub async fn on_group_message(&self, event: &MessageEvent) -> Propagation {
        let config = self.config.load_full();
        let sender = Sender {
            is_admin: self.is_admin(&event.sender_id),
            allow_listed: self.allow_list.contains(&event.sender_id),
            has_content: !event.segments.is_empty(),
            starts_with_at: event.starts_with_at(),
        };
        let draw: f64 = self.rng().gen();

        match self.policy.gate(sender, &config, draw) {
            Gate::Pass => Propagation::Continue,
            Gate::Swallow => Propagation::Stop,
            Gate::React { emoji, then } => {
                self.react(&event.message_id, emoji).await;
                then
            }
            Gate::Classify { at_mention } => {
                let text = event.plain_text();
                if text.is_empty() {
                    return Propagation::Continue;
                }
                let answer = self
                    .policy
                    .judge_emotion(self.classifier.as_ref(), &text)
                    .await;
                let picked = self.policy.icon_for(&answer, &mut *self.rng());
                match picked {
                    Some(emoji) => self.react(&event.message_id, emoji).await,
                    None => tracing::debug!("No emotion label in answer '{}'", answer),
                }
                if at_mention {
                    Propagation::Continue
                } else {
                    Propagation::Stop
                }
            }
        }
    }

    async fn run_command(&self, command: Command, event: &MessageEvent) -> Propagation {
        if command.requires_admin() && !self.is_admin(&event.sender_id) {
            self.say(event, "权限不足，该指令仅限管理员使用。").await;
            return Propagation::Stop;
        }
        match command {
            Command::Fill { count } => self.fill(event, count).await,
            Command::Boom { count } => self.boom(event, count).await,
            Command::AddList { id } => self.add_list(event, id).await,
            Command::ShowList => {
                self.say(event, &format!("贴猴列表：{}", self.render_list())).await
            }
            Command::DeleteList { target } => self.delete_list(event, target).await,
            Command::SetBoomCd { seconds } => self.set_boom_cd(event, seconds).await,
            Command::Help => {
                let cd = self.cooldown.window().as_secs();
                self.say(event, &help_text(cd)).await
            }
        }
        Propagation::Stop
    }

    async fn fill(&self, event: &MessageEvent, count: Option<i64>) {
        let Some(target) = self.reply_target(event).await else {
            return;
        };
        let sender = event.sender_id.trim();

        if !self.is_admin(sender) {
            self.allow_list.add(sender);
            self.say(event, "扣1给你贴").await;
            tokio::time::sleep(self.timings.enrol_notice_delay).await;
            self.say(event, &format!("已将用户 {} 添加到贴猴列表", sender))
                .await;
            return;
        }

        let config = self.config.load_full();
        let count = clamp_fill_count(count.unwrap_or(config.default_emoji_num));
        let icons = self.catalog.sample(count, &mut *self.rng());
        let interval = config.time_interval();
        tracing::info!("Filling message {} with {} reactions", target, icons.len());
        for emoji in icons {
            self.react(&target, emoji).await;
            tokio::time::sleep(interval).await;
        }
    }

    async fn boom(&self, event: &MessageEvent, count: i64) {
        let sender = event.sender_id.trim();
        if let CooldownCheck::Cooling { remaining } = self.cooldown.check(sender) {
            self.say(
                event,
                &format!(
                    "爆破猴冷却中，请等待 {:.1} 秒后重试。",
                    remaining.as_secs_f64()
                ),
            )
            .await;
            return;
        }

        let Some(target) = self.reply_target(event).await else {
            return;
        };
        let count = clamp_boom_count(count, self.is_admin(sender));
        self.cooldown.record(sender);

        let interval = self.config.load().time_interval();
        tracing::info!("Boom started on message {}, rounds: {}", target, count);
        for _ in 0..count {
            self.toggle(&target, MONKEY, true).await;
            tokio::time::sleep(interval).await;
            self.toggle(&target, MONKEY, false).await;
            tokio::time::sleep(self.timings.boom_release_delay).await;
        }
        tracing::info!("Boom finished, {} rounds", count);
    }

    async fn add_list(&self, event: &MessageEvent, id: Option<String>) {
        let Some(id) = id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) else {
            self.say(event, "请指定要加入的id。").await;
            return;
        };
        self.allow_list.add(&id);
        self.say(event, &format!("已将 {} 加入贴猴列表。", id)).await;
    }

    async fn delete_list(&self, event: &MessageEvent, target: Option<String>) {
        let reply = match target.as_deref().map(str::trim) {
            None | Some("") => "请指定要删除的id，或用 ALL 清空列表。".to_string(),
            Some("ALL") => {
                self.allow_list.clear();
                "已清空贴猴列表。".to_string()
            }
            Some(id) => {
                if self.allow_list.remove(id) {
                    format!("已删除 {}。当前贴猴列表：{}", id, self.render_list())
                } else {
                    format!("{} 不在贴猴列表中。当前贴猴列表：{}", id, self.render_list())
                }
            }
        };
        self.say(event, &reply).await;
    }

    async fn set_boom_cd(&self, event: &MessageEvent, seconds: Option<i64>) {
        let Some(seconds) = seconds else {
            self.say(event, "用法：/set_boom_cd [秒]").await;
            return;
        };
        if seconds <= 0 {
            self.say(event, "CD时间必须大于0秒").await;
            return;
        }
        let seconds = seconds as u64;
        self.cooldown.set_window(Duration::from_secs(seconds));
        self.config.rcu(|cfg| ReactionConfig {
            boom_cd_secs: seconds,
            ..ReactionConfig::clone(cfg)
        });
        tracing::info!("Boom cooldown set to {}s", seconds);
        self.say(event, &format!("爆破猴CD时间已设置为 {} 秒", seconds))
            .await;
    }

    /// Quoted message id, or a user-facing complaint when there is none.
    async fn reply_target(&self, event: &MessageEvent) -> Option<String> {
        match event.reply_target() {
            None => {
                self.say(event, "请回复一条消息").await;
                None
            }
            Some("") => {
                self.say(event, "无法获取回复消息ID").await;
                None
            }
            Some(id) => Some(id.to_string()),
        }
    }

    async fn react(&self, message_id: &str, emoji: EmojiId) {
        self.toggle(message_id, emoji, true).await;
    }

    async fn toggle(&self, message_id: &str, emoji: EmojiId, enabled: bool) {
        if let Err(e) = self.host.set_reaction(message_id, emoji, enabled).await {
            tracing::warn!(
                "Failed to {} reaction {} on {}: {:#}",
                if enabled { "set" } else { "clear" },
                emoji,
                message_id,
                e
            );
        }
    }

    async fn say(&self, event: &MessageEvent, text: &str) {
        if let Err(e) = self.host.reply(event, text).await {
            tracing::warn!("Failed to send reply: {:#}", e);
        }
    }

    fn render_list(&self) -> String {
        let ids = self.allow_list.snapshot();
        if ids.is_empty() {
            "（空）".to_string()
        } else {
            format!("[{}]", ids.join(", "))
        }
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_clamp() {
        assert_eq!(clamp_fill_count(999), 20);
        assert_eq!(clamp_fill_count(-3), 0);
        assert_eq!(clamp_fill_count(7), 7);
    }

    #[test]
    fn test_boom_clamp() {
        assert_eq!(clamp_boom_count(50, false), 10);
        assert_eq!(clamp_boom_count(50, true), 50);
        assert_eq!(clamp_boom_count(-1, false), 0);
    }
}
