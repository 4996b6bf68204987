//! Static reaction tables: emotion label → candidate faces, and the full
//! bulk-fill icon list.
//!
//! QQ distinguishes two reaction namespaces. System faces (type 1) are
//! addressed by a small integer and sent as a JSON number; emoji (type 2)
//! are addressed by their Unicode code point and sent as a JSON string.

use anyhow::{ensure, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Serialize, Serializer};
use std::fmt;

/// A reaction icon the host can attach to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EmojiId {
    /// QQ system face, numeric id.
    Face(u32),
    /// Unicode emoji, identified by code point.
    Emoji(u32),
}

impl fmt::Display for EmojiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmojiId::Face(id) => write!(f, "{}", id),
            EmojiId::Emoji(cp) => match char::from_u32(*cp) {
                Some(ch) => write!(f, "{}({})", cp, ch),
                None => write!(f, "{}", cp),
            },
        }
    }
}

impl Serialize for EmojiId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EmojiId::Face(id) => serializer.serialize_u32(*id),
            EmojiId::Emoji(cp) => serializer.collect_str(cp),
        }
    }
}

/// ❤ face, the rare tier in list-only mode.
pub const HEART_FACE: EmojiId = EmojiId::Face(66);
/// ❔
pub const QUESTION_MARK: EmojiId = EmojiId::Emoji(10068);
/// 🐵, the default reaction for allow-listed senders and the "boom" icon.
pub const MONKEY: EmojiId = EmojiId::Emoji(128053);

/// Fallback label used when the classifier could not be reached.
pub const UNKNOWN_EMOTION: &str = "其他";

const QQ_EMOTIONS: &[(&str, &[u32])] = &[
    ("开心", &[2, 74, 109, 272, 295, 305, 318, 319, 324, 339]),
    ("得意", &[4, 16, 28, 29, 99, 101, 178, 269, 270, 277, 283, 299, 307, 336, 426]),
    ("害羞", &[6, 20, 21]),
    ("难过", &[5, 34, 35, 36, 37, 173, 264, 265, 267, 425]),
    ("纠结", &[106, 176, 262, 263, 270]),
    ("生气", &[11, 26, 31, 105]),
    ("惊讶", &[3, 325]),
    ("疑惑", &[32, 268]),
    ("恳求", &[111, 353]),
    ("可怕", &[1, 286]),
    ("尴尬", &[100, 306, 342, 344, 347]),
    ("无语", &[46, 97, 181, 271, 281, 284, 287, 312, 352, 357, 427]),
    ("恶心", &[19, 59, 323]),
    ("无聊", &[8, 25, 285, 293]),
];

const FILL_FACES: &[u32] = &[
    4, 5, 8, 9, 10, 12, 14, 16, 21, 23, 24, 25, 26, 27, 28, 29, 30, 32, 33, 34, 38, 39, 41, 42, 43,
    49, 53, 60, 63, 66, 74, 75, 76, 78, 79, 85, 89, 96, 97, 98, 99, 100, 101, 102, 103, 104, 106,
    109, 111, 116, 118, 120, 122, 123, 124, 125, 129, 144, 147, 171, 173, 174, 175, 176, 179, 180,
    181, 182, 183, 201, 203, 212, 214, 219, 222, 227, 232, 240, 243, 246, 262, 264, 265, 266, 267,
    268, 269, 270, 271, 272, 273, 277, 278, 281, 282, 284, 285, 287, 289, 290, 293, 294, 297, 298,
    299, 305, 306, 307, 314, 315, 318, 319, 320, 322, 324, 326,
];

const FILL_EMOJI: &[u32] = &[
    9728, 9749, 9786, 10024, 10060, 10068, 127801, 127817, 127822, 127827, 127836, 127838, 127847,
    127866, 127867, 127881, 128027, 128046, 128051, 128053, 128074, 128076, 128077, 128079, 128089,
    128102, 128104, 128147, 128157, 128164, 128166, 128168, 128170, 128235, 128293, 128513, 128514,
    128516, 128522, 128524, 128527, 128530, 128531, 128532, 128536, 128538, 128540, 128541, 128557,
    128560, 128563,
];

/// Ordered emotion label → candidate icons mapping.
///
/// Declaration order matters: when a classifier answer contains several
/// labels, the first declared one wins.
#[derive(Debug, Clone)]
pub struct EmotionTable {
    entries: Vec<(String, Vec<EmojiId>)>,
}

impl EmotionTable {
    /// Build a table from explicit entries. Every label needs at least one icon.
    pub fn new<L, I>(entries: impl IntoIterator<Item = (L, I)>) -> Result<Self>
    where
        L: Into<String>,
        I: IntoIterator<Item = EmojiId>,
    {
        let entries: Vec<(String, Vec<EmojiId>)> = entries
            .into_iter()
            .map(|(label, icons)| (label.into(), icons.into_iter().collect()))
            .collect();
        for (label, icons) in &entries {
            ensure!(!label.is_empty(), "emotion label must not be empty");
            ensure!(!icons.is_empty(), "emotion '{}' has no candidate icons", label);
        }
        Ok(Self { entries })
    }

    /// The QQ face table the bot ships with.
    pub fn qq_default() -> Self {
        Self {
            entries: QQ_EMOTIONS
                .iter()
                .map(|(label, ids)| {
                    (label.to_string(), ids.iter().copied().map(EmojiId::Face).collect())
                })
                .collect(),
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(label, _)| label.as_str())
    }

    pub fn candidates(&self, label: &str) -> Option<&[EmojiId]> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, icons)| icons.as_slice())
    }

    /// First declared label that occurs as a substring of `answer`.
    pub fn match_label(&self, answer: &str) -> Option<(&str, &[EmojiId])> {
        self.entries
            .iter()
            .find(|(label, _)| answer.contains(label.as_str()))
            .map(|(label, icons)| (label.as_str(), icons.as_slice()))
    }

    /// Match `answer` and draw one icon uniformly from the matched label.
    pub fn pick<R: Rng + ?Sized>(&self, answer: &str, rng: &mut R) -> Option<EmojiId> {
        self.match_label(answer)
            .and_then(|(_, icons)| icons.choose(rng).copied())
    }
}

impl Default for EmotionTable {
    fn default() -> Self {
        Self::qq_default()
    }
}

/// Flat list of icons used by the bulk "fill" command.
#[derive(Debug, Clone)]
pub struct IconCatalog {
    icons: Vec<EmojiId>,
}

impl IconCatalog {
    pub fn new(icons: Vec<EmojiId>) -> Self {
        Self { icons }
    }

    /// System faces first, then emoji, as listed by the QQ reaction docs.
    pub fn qq_default() -> Self {
        let icons = FILL_FACES
            .iter()
            .copied()
            .map(EmojiId::Face)
            .chain(FILL_EMOJI.iter().copied().map(EmojiId::Emoji))
            .collect();
        Self { icons }
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }

    pub fn icons(&self) -> &[EmojiId] {
        &self.icons
    }

    /// Draw up to `count` distinct icons without replacement.
    pub fn sample<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<EmojiId> {
        self.icons
            .choose_multiple(rng, count.min(self.icons.len()))
            .copied()
            .collect()
    }
}

impl Default for IconCatalog {
    fn default() -> Self {
        Self::qq_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_emoji_id_serializes_by_namespace() {
        assert_eq!(serde_json::to_string(&EmojiId::Face(66)).unwrap(), "66");
        assert_eq!(serde_json::to_string(&MONKEY).unwrap(), "\"128053\"");
    }

    #[test]
    fn test_display_shows_glyph_for_emoji() {
        assert_eq!(MONKEY.to_string(), "128053(🐵)");
        assert_eq!(HEART_FACE.to_string(), "66");
    }

    #[test]
    fn test_default_table_labels_in_order() {
        let table = EmotionTable::qq_default();
        let labels: Vec<_> = table.labels().collect();
        assert_eq!(labels.len(), 14);
        assert_eq!(labels[0], "开心");
        assert_eq!(labels[13], "无聊");
        assert_eq!(table.candidates("害羞").unwrap(), &[EmojiId::Face(6), EmojiId::Face(20), EmojiId::Face(21)]);
    }

    #[test]
    fn test_match_prefers_declaration_order() {
        let table = EmotionTable::qq_default();
        // Both 难过 and 开心 appear; 开心 is declared first.
        let (label, _) = table.match_label("有点难过但也开心").unwrap();
        assert_eq!(label, "开心");
        assert!(table.match_label("其他").is_none());
    }

    #[test]
    fn test_pick_stays_inside_matched_set() {
        let table = EmotionTable::new([("happy", [EmojiId::Face(1), EmojiId::Face(2)])]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let icon = table.pick("I feel happy today", &mut rng).unwrap();
            assert!(matches!(icon, EmojiId::Face(1) | EmojiId::Face(2)));
        }
    }

    #[test]
    fn test_table_rejects_empty_candidates() {
        let err = EmotionTable::new([("空", Vec::<EmojiId>::new())]).unwrap_err();
        assert!(err.to_string().contains("no candidate icons"));
    }

    #[test]
    fn test_catalog_sample_is_distinct_and_bounded() {
        let catalog = IconCatalog::qq_default();
        let mut rng = StdRng::seed_from_u64(42);
        let picked = catalog.sample(20, &mut rng);
        assert_eq!(picked.len(), 20);
        let unique: HashSet<_> = picked.iter().collect();
        assert_eq!(unique.len(), 20);

        let small = IconCatalog::new(vec![MONKEY, HEART_FACE]);
        assert_eq!(small.sample(5, &mut rng).len(), 2);
    }

    #[test]
    fn test_catalog_has_no_duplicates() {
        let catalog = IconCatalog::qq_default();
        let unique: HashSet<_> = catalog.icons().iter().collect();
        assert_eq!(unique.len(), catalog.len());
        assert!(catalog.icons().contains(&MONKEY));
    }
}
