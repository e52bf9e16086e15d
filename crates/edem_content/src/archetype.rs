//! Archetype profiling.
//!
//! Two independent keyword passes over the same text: one for the mental
//! style 4-tuple, one for the archetype label. Both are deterministic; when
//! categories tie, the one listed first wins.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static RE_SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?…]+").unwrap());

// ============================================================================
// Archetype
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    Ruler,
    Warrior,
    Caregiver,
    Orphan,
    Rebel,
    Sage,
    Seeker,
}

impl Archetype {
    pub const ALL: [Archetype; 7] = [
        Archetype::Ruler,
        Archetype::Warrior,
        Archetype::Caregiver,
        Archetype::Orphan,
        Archetype::Rebel,
        Archetype::Sage,
        Archetype::Seeker,
    ];

    /// Used when no keyword matches and nothing was profiled before.
    pub const BASELINE: Archetype = Archetype::Seeker;

    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::Ruler => "ruler",
            Archetype::Warrior => "warrior",
            Archetype::Caregiver => "caregiver",
            Archetype::Orphan => "orphan",
            Archetype::Rebel => "rebel",
            Archetype::Sage => "sage",
            Archetype::Seeker => "seeker",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == s)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Archetype::Ruler => "Правитель",
            Archetype::Warrior => "Воин",
            Archetype::Caregiver => "Опекун",
            Archetype::Orphan => "Сирота",
            Archetype::Rebel => "Бунтарь",
            Archetype::Sage => "Мудрец",
            Archetype::Seeker => "Искатель",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Archetype::Ruler => "держит всё под контролем, чтобы не встретиться с бессилием",
            Archetype::Warrior => "сражается, чтобы не почувствовать уязвимость",
            Archetype::Caregiver => "заботится о других, забывая о себе",
            Archetype::Orphan => "ждёт, что его снова оставят",
            Archetype::Rebel => "ломает правила, чтобы не подчиниться",
            Archetype::Sage => "ищет понимание, чтобы не чувствовать",
            Archetype::Seeker => "ищет себя и боится остановиться",
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Archetype::Ruler => &["лидер", "контрол", "руковод", "власт", "leader", "control"],
            Archetype::Warrior => &["борюсь", "борьб", "сражаюсь", "побед", "fight", "struggle"],
            Archetype::Caregiver => &["забоч", "помога", "спасаю", "care", "help"],
            Archetype::Orphan => &["брош", "оставил", "никому не нужн", "abandon", "left me"],
            Archetype::Rebel => &["бунт", "протест", "против правил", "rebel", "break the rules"],
            Archetype::Sage => &["понять", "смысл", "знани", "understand", "meaning"],
            Archetype::Seeker => &["ищу", "путь", "свобод", "search", "journey"],
        }
    }
}

// ============================================================================
// Mental style
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Directness {
    Direct,
    Indirect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pace {
    Fast,
    Measured,
    Slow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Warm,
    Neutral,
    Tense,
    Heavy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preference {
    Body,
    Mind,
    Emotion,
    Spirit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentalStyle {
    pub directness: Directness,
    pub pace: Pace,
    pub tone: Tone,
    pub preference: Preference,
}

const DIRECT_MARKERS: &[&str] = &["я хочу", "я знаю", "нужно", "точно", "i want", "i know", "must"];
const HEDGE_MARKERS: &[&str] = &[
    "может быть",
    "наверное",
    "как будто",
    "вроде",
    "не знаю",
    "maybe",
    "perhaps",
    "kind of",
];

const TONE_BUCKETS: &[(Tone, &[&str])] = &[
    (Tone::Warm, &["люблю", "тепло", "благодар", "радость", "love", "grateful"]),
    (Tone::Tense, &["злюсь", "бесит", "тревож", "напряж", "angry", "tense"]),
    (Tone::Heavy, &["тяжело", "больно", "устал", "безнадёж", "heavy", "tired"]),
];

const PREFERENCE_BUCKETS: &[(Preference, &[&str])] = &[
    (Preference::Body, &["тело", "груд", "живот", "дыхан", "плеч", "body", "chest"]),
    (Preference::Mind, &["думаю", "мысл", "понимаю", "логик", "think", "mind"]),
    (Preference::Emotion, &["чувств", "эмоци", "ощущаю", "feel", "emotion"]),
    (Preference::Spirit, &["душ", "смысл", "вера", "верю", "бог", "soul", "faith"]),
];

/// Mean words per sentence below this is fast.
const FAST_SENTENCE_WORDS: f32 = 6.0;
/// Mean words per sentence up to this is measured.
const MEASURED_SENTENCE_WORDS: f32 = 14.0;

fn hits(text: &str, words: &[&str]) -> usize {
    words.iter().filter(|w| text.contains(*w)).count()
}

/// Index of the highest positive score; earlier entries win ties.
fn first_max(scores: impl IntoIterator<Item = usize>) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (idx, score) in scores.into_iter().enumerate() {
        if score == 0 {
            continue;
        }
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((idx, score));
        }
    }
    best.map(|(idx, _)| idx)
}

fn mean_sentence_words(text: &str) -> Option<f32> {
    let lengths: Vec<usize> = RE_SENTENCE_END
        .split(text)
        .map(|s| s.split_whitespace().count())
        .filter(|n| *n > 0)
        .collect();
    if lengths.is_empty() {
        return None;
    }
    Some(lengths.iter().sum::<usize>() as f32 / lengths.len() as f32)
}

fn pace(text: &str) -> Pace {
    match mean_sentence_words(text) {
        Some(mean) if mean < FAST_SENTENCE_WORDS => Pace::Fast,
        Some(mean) if mean <= MEASURED_SENTENCE_WORDS => Pace::Measured,
        Some(_) => Pace::Slow,
        None => Pace::Measured,
    }
}

fn mental_style(lower: &str) -> MentalStyle {
    let directness = if hits(lower, HEDGE_MARKERS) > hits(lower, DIRECT_MARKERS) {
        Directness::Indirect
    } else {
        Directness::Direct
    };
    let tone = first_max(TONE_BUCKETS.iter().map(|(_, w)| hits(lower, w)))
        .map(|i| TONE_BUCKETS[i].0)
        .unwrap_or(Tone::Neutral);
    let preference = first_max(PREFERENCE_BUCKETS.iter().map(|(_, w)| hits(lower, w)))
        .map(|i| PREFERENCE_BUCKETS[i].0)
        .unwrap_or(Preference::Emotion);
    MentalStyle {
        directness,
        pace: pace(lower),
        tone,
        preference,
    }
}

fn communication_cues(style: &MentalStyle) -> Vec<String> {
    let mut cues = Vec::new();
    cues.push(match style.directness {
        Directness::Direct => "говорить прямо",
        Directness::Indirect => "задавать мягкие вопросы",
    });
    cues.push(match style.pace {
        Pace::Fast => "короткие фразы",
        Pace::Measured => "ровный темп",
        Pace::Slow => "давать время",
    });
    match style.tone {
        Tone::Heavy => cues.push("признавать тяжесть"),
        Tone::Tense => cues.push("снижать напряжение"),
        Tone::Warm | Tone::Neutral => {}
    }
    cues.push(match style.preference {
        Preference::Body => "опираться на тело",
        Preference::Mind => "давать ясную структуру",
        Preference::Emotion => "называть чувства",
        Preference::Spirit => "говорить о смысле",
    });
    cues.into_iter().map(String::from).collect()
}

// ============================================================================
// Profiler
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeProfile {
    pub primary: Archetype,
    pub mental_style: MentalStyle,
    pub communication_cues: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ArchetypeProfiler;

impl ArchetypeProfiler {
    pub fn new() -> Self {
        Self
    }

    pub fn profile(&self, text: &str, existing: Option<Archetype>) -> ArchetypeProfile {
        let lower = text.to_lowercase();
        let mental_style = mental_style(&lower);
        let matched = first_max(Archetype::ALL.iter().map(|a| hits(&lower, a.keywords())))
            .map(|i| Archetype::ALL[i]);
        let primary = matched.or(existing).unwrap_or(Archetype::BASELINE);
        tracing::debug!(
            archetype = primary.as_str(),
            matched = matched.is_some(),
            "archetype profiled"
        );
        ArchetypeProfile {
            primary,
            communication_cues: communication_cues(&mental_style),
            mental_style,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_sets_archetype() {
        let p = ArchetypeProfiler::new().profile("Я лидер и всё держу под контролем", None);
        assert_eq!(p.primary, Archetype::Ruler);
    }

    #[test]
    fn test_existing_kept_without_match() {
        let p = ArchetypeProfiler::new().profile("просто обычный день", Some(Archetype::Orphan));
        assert_eq!(p.primary, Archetype::Orphan);
    }

    #[test]
    fn test_baseline_without_match_or_existing() {
        let p = ArchetypeProfiler::new().profile("просто обычный день", None);
        assert_eq!(p.primary, Archetype::BASELINE);
    }

    #[test]
    fn test_new_match_overrides_existing() {
        let p = ArchetypeProfiler::new().profile("я всегда борюсь", Some(Archetype::Sage));
        assert_eq!(p.primary, Archetype::Warrior);
    }

    #[test]
    fn test_tie_goes_to_first_category() {
        // one Ruler keyword, one Caregiver keyword
        let p = ArchetypeProfiler::new().profile("лидер, который помогает", None);
        assert_eq!(p.primary, Archetype::Ruler);
    }

    #[test]
    fn test_pace_from_sentence_length() {
        assert_eq!(pace("Нет. Не знаю. Устал."), Pace::Fast);
        assert_eq!(
            pace("Я долго думал о том, что со мной происходит последние месяцы."),
            Pace::Measured
        );
        assert_eq!(
            pace("Я долго думал о том что со мной происходит последние месяцы и почему каждый раз когда мне плохо я молчу"),
            Pace::Slow
        );
        assert_eq!(pace("   "), Pace::Measured);
    }

    #[test]
    fn test_style_buckets() {
        let style = mental_style("наверное, мне тяжело и больно в груди");
        assert_eq!(style.directness, Directness::Indirect);
        assert_eq!(style.tone, Tone::Heavy);
        assert_eq!(style.preference, Preference::Body);

        let style = mental_style("обычный текст");
        assert_eq!(style.directness, Directness::Direct);
        assert_eq!(style.tone, Tone::Neutral);
        assert_eq!(style.preference, Preference::Emotion);
    }

    #[test]
    fn test_profile_is_deterministic() {
        let profiler = ArchetypeProfiler::new();
        let text = "Я хочу понять смысл. Мне тревожно.";
        assert_eq!(profiler.profile(text, None), profiler.profile(text, None));
    }

    #[test]
    fn test_cues_follow_style() {
        let p = ArchetypeProfiler::new().profile("Тяжело. Устал.", None);
        assert!(p.communication_cues.contains(&"признавать тяжесть".to_string()));
        assert!(p.communication_cues.contains(&"короткие фразы".to_string()));
    }

    #[test]
    fn test_archetype_keys_parse_back() {
        for a in Archetype::ALL {
            assert_eq!(Archetype::parse(a.as_str()), Some(a));
        }
    }
}
