//! Decides whether an ordinary group message gets a reaction.
//!
//! The decision runs in two stages. [`ReactionPolicy::gate`] is a pure
//! function of the sender, the config and one uniform draw; it either settles
//! the outcome or asks for a sentiment classification. The classification
//! answer is then mapped to an icon by [`ReactionPolicy::icon_for`].

use rand::Rng;

use crate::catalog::{EmojiId, EmotionTable, HEART_FACE, MONKEY, QUESTION_MARK, UNKNOWN_EMOTION};
use crate::config::ReactionConfig;
use crate::host::SentimentClassifier;
use crate::Propagation;

/// What the sender/probability stage decided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gate {
    /// No reaction; later handlers still see the event.
    Pass,
    /// No reaction, but the event is consumed.
    Swallow,
    /// React right away.
    React { emoji: EmojiId, then: Propagation },
    /// Ask the classifier; `at_mention` decides propagation afterwards.
    Classify { at_mention: bool },
}

/// Facts about one message needed by [`ReactionPolicy::gate`].
#[derive(Debug, Clone, Copy)]
pub struct Sender {
    pub is_admin: bool,
    pub allow_listed: bool,
    pub has_content: bool,
    pub starts_with_at: bool,
}

/// Icon for an allow-listed sender in list-only mode, from the same draw that
/// passed the probability gate: < 0.1 heart, < 0.2 question mark, else monkey.
pub fn list_mode_icon(draw: f64) -> EmojiId {
    if draw < 0.1 {
        HEART_FACE
    } else if draw < 0.2 {
        QUESTION_MARK
    } else {
        MONKEY
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReactionPolicy {
    emotions: EmotionTable,
}

impl ReactionPolicy {
    pub fn new(emotions: EmotionTable) -> Self {
        Self { emotions }
    }

    pub fn gate(&self, sender: Sender, config: &ReactionConfig, draw: f64) -> Gate {
        if sender.is_admin {
            return Gate::Pass;
        }

        if config.only_list_mode {
            if !sender.allow_listed || draw > config.at_analysis_prob {
                return Gate::Pass;
            }
            return Gate::React {
                emoji: list_mode_icon(draw),
                then: Propagation::Stop,
            };
        }

        if sender.allow_listed {
            if draw > config.at_analysis_prob {
                return Gate::Swallow;
            }
            return Gate::React {
                emoji: MONKEY,
                then: Propagation::Stop,
            };
        }

        if !sender.has_content {
            return Gate::Pass;
        }
        let threshold = if sender.starts_with_at {
            config.at_analysis_prob
        } else {
            config.normal_analysis_prob
        };
        if draw > threshold {
            return Gate::Pass;
        }
        Gate::Classify {
            at_mention: sender.starts_with_at,
        }
    }

    /// System prompt listing the labels the model may answer with.
    pub fn system_prompt(&self) -> String {
        let labels = self
            .emotions
            .labels()
            .map(|l| format!("'{}'", l))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "你是一个情感分析专家，请根据给定的文本判断其情感倾向，并给出相应的一个最符合的情感标签，可选标签有：[{}]",
            labels
        )
    }

    /// Ask the classifier for a label. Failures degrade to [`UNKNOWN_EMOTION`].
    pub async fn judge_emotion(&self, classifier: &dyn SentimentClassifier, text: &str) -> String {
        match classifier.classify(text, &self.system_prompt()).await {
            Ok(answer) => answer.trim().to_string(),
            Err(e) => {
                tracing::error!("Sentiment classification failed: {:#}", e);
                UNKNOWN_EMOTION.to_string()
            }
        }
    }

    pub fn icon_for<R: Rng + ?Sized>(&self, answer: &str, rng: &mut R) -> Option<EmojiId> {
        self.emotions.pick(answer, rng)
    }
}
