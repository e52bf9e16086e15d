//! Short in-session rituals, one small pool per emotion.
//!
//! Rituals already served to the user recently are excluded from the next
//! pick; when that leaves nothing, the whole pool is used again.

use crate::emotion::Emotion;
use crate::pick::pick_excluding;
use rand::Rng;

const GENERIC_RITUAL: &str = "Сделай три медленных вдоха и выдоха, считая до четырёх.";

fn pool(emotion: Emotion) -> &'static [&'static str] {
    match emotion {
        Emotion::Anxiety => &[
            "Назови пять предметов, которые видишь, и четыре звука, которые слышишь.",
            "Положи ладонь на живот и подыши так, чтобы рука поднималась.",
            "Запиши тревогу одной фразой и отложи листок до вечера.",
            "Сожми кулаки на пять секунд и медленно отпусти.",
        ],
        Emotion::Sadness => &[
            "Обними себя руками и побудь так минуту.",
            "Напиши письмо тому, что ты потерял, без отправки.",
            "Включи музыку, которая звучит как твоя грусть, и просто послушай.",
            "Умойся тёплой водой и посмотри себе в глаза.",
        ],
        Emotion::Anger => &[
            "Выдохни злость через рот пять раз, с силой.",
            "Напиши всё, что хочется сказать, и порви лист.",
            "Потопай ногами тридцать секунд, чувствуя опору.",
            "Сожми полотенце изо всех сил и отпусти.",
        ],
        Emotion::Fear => &[
            "Почувствуй стопы на полу и назови три опоры в своей жизни.",
            "Скажи вслух: «Сейчас я в безопасности» и проверь, так ли это.",
            "Нарисуй свой страх и дай ему имя.",
        ],
        Emotion::Shame => &[
            "Положи руку на сердце и скажи себе: «Со мной всё в порядке».",
            "Вспомни человека, рядом с которым тебе не стыдно, и представь его взгляд.",
            "Запиши одну вещь, за которую ты себя уважаешь.",
        ],
        Emotion::Guilt => &[
            "Раздели лист на две колонки: моя ответственность и не моя.",
            "Скажи себе: «Я сделал что мог с тем, что знал тогда».",
            "Выбери одно маленькое действие, которым можно загладить вину.",
        ],
        Emotion::Loneliness => &[
            "Напиши одно сообщение человеку, о котором давно думаешь.",
            "Выйди туда, где есть люди, и побудь среди них десять минут.",
            "Поговори с собой вслух так, как говорил бы с близким другом.",
        ],
        Emotion::Emptiness => &[
            "Возьми в руки что-то тёплое и сосредоточься на ощущении.",
            "Съешь что-нибудь медленно, замечая каждый вкус.",
            "Пройди сто шагов, считая каждый.",
        ],
        Emotion::Confusion => &[
            GENERIC_RITUAL,
            "Запиши три мысли, которые крутятся в голове, и выбери одну.",
            "Посиди две минуты в тишине, не решая ничего.",
        ],
    }
}

#[derive(Debug, Clone, Default)]
pub struct RitualSelector;

impl RitualSelector {
    pub fn new() -> Self {
        Self
    }

    /// Every ritual the selector can serve for `emotion`.
    pub fn pool(&self, emotion: Emotion) -> &'static [&'static str] {
        pool(emotion)
    }

    pub fn select(&self, emotion: Emotion, user_id: &str, recent: &[String]) -> String {
        self.select_with_rng(emotion, user_id, recent, &mut rand::thread_rng())
    }

    pub fn select_with_rng<R: Rng + ?Sized>(
        &self,
        emotion: Emotion,
        user_id: &str,
        recent: &[String],
        rng: &mut R,
    ) -> String {
        let ritual = pick_excluding(pool(emotion), |r| recent.iter().any(|seen| seen == r), rng)
            .copied()
            .unwrap_or(GENERIC_RITUAL);
        tracing::debug!(user_id, emotion = emotion.as_str(), excluded = recent.len(), "ritual selected");
        ritual.to_string()
    }
}
