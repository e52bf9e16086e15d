use crate::emotion::Emotion;
use crate::pick::pick_excluding;
use rand::Rng;

/// A take-home exercise the integration stage can assign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PracticeDef {
    pub key: &'static str,
    pub instruction: &'static str,
}

const BODY_SCAN: PracticeDef = PracticeDef {
    key: "body_scan",
    instruction: "каждый вечер три минуты сканируй тело и отмечай, где живёт напряжение",
};
const FEELINGS_JOURNAL: PracticeDef = PracticeDef {
    key: "feelings_journal",
    instruction: "трижды в день записывай одно чувство и что его вызвало",
};
const UNSENT_LETTER: PracticeDef = PracticeDef {
    key: "unsent_letter",
    instruction: "напиши письмо тому, кто связан с этой болью, и не отправляй его",
};
const BOUNDARY_NO: PracticeDef = PracticeDef {
    key: "boundary_no",
    instruction: "скажи одно честное «нет» там, где обычно соглашаешься",
};
const SELF_KINDNESS: PracticeDef = PracticeDef {
    key: "self_kindness",
    instruction: "каждое утро говори себе одну добрую фразу, глядя в зеркало",
};
const REPAIR_STEP: PracticeDef = PracticeDef {
    key: "repair_step",
    instruction: "сделай один небольшой шаг, чтобы исправить то, за что винишь себя",
};
const CONTACT: PracticeDef = PracticeDef {
    key: "contact",
    instruction: "каждый день одна живая встреча или звонок, хотя бы на пять минут",
};
const GROUNDING_WALK: PracticeDef = PracticeDef {
    key: "grounding_walk",
    instruction: "ежедневная прогулка двадцать минут без телефона, замечая звуки",
};
const WORRY_WINDOW: PracticeDef = PracticeDef {
    key: "worry_window",
    instruction: "выдели пятнадцать минут в день для тревог, а вне их откладывай тревогу",
};

fn pool(emotion: Emotion) -> &'static [PracticeDef] {
    match emotion {
        Emotion::Anxiety => &[WORRY_WINDOW, BODY_SCAN, GROUNDING_WALK],
        Emotion::Fear => &[GROUNDING_WALK, BODY_SCAN, FEELINGS_JOURNAL],
        Emotion::Sadness => &[UNSENT_LETTER, FEELINGS_JOURNAL, CONTACT],
        Emotion::Anger => &[BOUNDARY_NO, BODY_SCAN, UNSENT_LETTER],
        Emotion::Shame => &[SELF_KINDNESS, FEELINGS_JOURNAL, CONTACT],
        Emotion::Guilt => &[REPAIR_STEP, UNSENT_LETTER, SELF_KINDNESS],
        Emotion::Loneliness => &[CONTACT, SELF_KINDNESS, GROUNDING_WALK],
        Emotion::Emptiness => &[BODY_SCAN, GROUNDING_WALK, FEELINGS_JOURNAL],
        Emotion::Confusion => &[FEELINGS_JOURNAL, GROUNDING_WALK, BODY_SCAN],
    }
}

#[derive(Debug, Clone, Default)]
pub struct PracticeCatalog;

impl PracticeCatalog {
    pub fn new() -> Self {
        Self
    }

    /// Look up a practice by key across every pool.
    pub fn get(&self, key: &str) -> Option<PracticeDef> {
        [
            BODY_SCAN,
            FEELINGS_JOURNAL,
            UNSENT_LETTER,
            BOUNDARY_NO,
            SELF_KINDNESS,
            REPAIR_STEP,
            CONTACT,
            GROUNDING_WALK,
            WORRY_WINDOW,
        ]
        .into_iter()
        .find(|p| p.key == key)
    }

    /// Exactly one practice, skipping keys already assigned in this session when possible.
    pub fn assign(&self, emotion: Emotion, assigned_keys: &[String]) -> PracticeDef {
        self.assign_with_rng(emotion, assigned_keys, &mut rand::thread_rng())
    }

    pub fn assign_with_rng<R: Rng + ?Sized>(
        &self,
        emotion: Emotion,
        assigned_keys: &[String],
        rng: &mut R,
    ) -> PracticeDef {
        pick_excluding(pool(emotion), |p| assigned_keys.iter().any(|k| k == p.key), rng)
            .copied()
            .unwrap_or(FEELINGS_JOURNAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_assign_skips_already_assigned() {
        let catalog = PracticeCatalog::new();
        let assigned = vec!["worry_window".to_string(), "body_scan".to_string()];
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..30 {
            let p = catalog.assign_with_rng(Emotion::Anxiety, &assigned, &mut rng);
            assert_eq!(p.key, "grounding_walk");
        }
    }

    #[test]
    fn test_assign_repeats_when_everything_was_assigned() {
        let catalog = PracticeCatalog::new();
        let assigned: Vec<String> = pool(Emotion::Guilt).iter().map(|p| p.key.to_string()).collect();
        let p = catalog.assign(Emotion::Guilt, &assigned);
        assert!(assigned.contains(&p.key.to_string()));
    }

    #[test]
    fn test_every_pooled_practice_is_resolvable() {
        let catalog = PracticeCatalog::new();
        for emotion in Emotion::ALL {
            for p in pool(emotion) {
                assert_eq!(catalog.get(p.key), Some(*p));
            }
        }
        assert!(catalog.get("unknown").is_none());
    }
}
