//! Property-based tests for the reaction rules.
//!
//! Uses proptest to check that the gating, clamping and icon selection rules
//! hold for every probability setting and draw, not just hand-picked ones.

use emoji_like_core::catalog::{EmojiId, HEART_FACE, MONKEY, QUESTION_MARK};
use emoji_like_core::plugin::{clamp_boom_count, clamp_fill_count};
use emoji_like_core::policy::{list_mode_icon, Gate, ReactionPolicy, Sender};
use emoji_like_core::{EmotionTable, IconCatalog, Propagation, ReactionConfig};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

// ============================================================================
// Strategies
// ============================================================================

fn arb_config() -> impl Strategy<Value = ReactionConfig> {
    (0.0f64..=1.0, 0.0f64..=1.0, any::<bool>()).prop_map(|(normal, at, only_list)| {
        ReactionConfig {
            normal_analysis_prob: normal,
            at_analysis_prob: at,
            only_list_mode: only_list,
            ..Default::default()
        }
    })
}

fn arb_sender() -> impl Strategy<Value = Sender> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(is_admin, allow_listed, has_content, starts_with_at)| Sender {
            is_admin,
            allow_listed,
            has_content,
            starts_with_at,
        },
    )
}

proptest! {
    /// In list-only mode an unlisted sender is never reacted to.
    #[test]
    fn list_mode_unlisted_always_passes(
        cfg in arb_config(),
        sender in arb_sender(),
        draw in 0.0f64..1.0,
    ) {
        let cfg = ReactionConfig { only_list_mode: true, ..cfg };
        let sender = Sender { allow_listed: false, ..sender };
        prop_assert_eq!(ReactionPolicy::default().gate(sender, &cfg, draw), Gate::Pass);
    }

    /// Administrators are never reacted to in any mode.
    #[test]
    fn admins_always_pass(cfg in arb_config(), sender in arb_sender(), draw in 0.0f64..1.0) {
        let sender = Sender { is_admin: true, ..sender };
        prop_assert_eq!(ReactionPolicy::default().gate(sender, &cfg, draw), Gate::Pass);
    }

    /// Any direct reaction uses one of the three fixed icons and stops propagation.
    #[test]
    fn direct_reactions_use_fixed_icons(cfg in arb_config(), sender in arb_sender(), draw in 0.0f64..1.0) {
        if let Gate::React { emoji, then } = ReactionPolicy::default().gate(sender, &cfg, draw) {
            prop_assert!([HEART_FACE, QUESTION_MARK, MONKEY].contains(&emoji));
            prop_assert_eq!(then, Propagation::Stop);
            prop_assert!(draw <= cfg.at_analysis_prob);
        }
    }

    /// Classification is only requested for unlisted senders in open mode.
    #[test]
    fn classify_only_in_open_mode(cfg in arb_config(), sender in arb_sender(), draw in 0.0f64..1.0) {
        if let Gate::Classify { at_mention } = ReactionPolicy::default().gate(sender, &cfg, draw) {
            prop_assert!(!cfg.only_list_mode);
            prop_assert!(!sender.allow_listed);
            prop_assert!(!sender.is_admin);
            prop_assert_eq!(at_mention, sender.starts_with_at);
        }
    }

    #[test]
    fn list_mode_icon_is_tiered(draw in 0.0f64..1.0) {
        let icon = list_mode_icon(draw);
        let expected = if draw < 0.1 { HEART_FACE } else if draw < 0.2 { QUESTION_MARK } else { MONKEY };
        prop_assert_eq!(icon, expected);
    }

    #[test]
    fn fill_count_is_bounded(requested in any::<i64>()) {
        prop_assert!(clamp_fill_count(requested) <= 20);
    }

    #[test]
    fn boom_count_for_non_admins_is_bounded(requested in any::<i64>()) {
        let n = clamp_boom_count(requested, false);
        prop_assert!((0..=10).contains(&n));
    }

    /// Sampling never repeats an icon and never exceeds the request.
    #[test]
    fn catalog_sample_is_distinct(count in 0usize..400, seed in any::<u64>()) {
        let catalog = IconCatalog::qq_default();
        let mut rng = StdRng::seed_from_u64(seed);
        let picked = catalog.sample(count, &mut rng);
        prop_assert_eq!(picked.len(), count.min(catalog.len()));
        let unique: HashSet<EmojiId> = picked.iter().copied().collect();
        prop_assert_eq!(unique.len(), picked.len());
    }

    /// The picked icon always belongs to the first label found in the answer.
    #[test]
    fn picked_icon_belongs_to_matched_label(
        label_idx in 0usize..14,
        prefix in "[a-z ]{0,8}",
        suffix in "[a-z ]{0,8}",
        seed in any::<u64>(),
    ) {
        let table = EmotionTable::qq_default();
        let label = table.labels().nth(label_idx).unwrap().to_string();
        let answer = format!("{}{}{}", prefix, label, suffix);
        let mut rng = StdRng::seed_from_u64(seed);
        let icon = table.pick(&answer, &mut rng).unwrap();
        prop_assert!(table.candidates(&label).unwrap().contains(&icon));
    }
}
