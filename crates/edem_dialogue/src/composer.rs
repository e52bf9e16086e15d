//! Voice-styled reply assembly.
//!
//! Every user-facing line lives in [`Composer::phrase`] as one arm per
//! `(Phrase, Voice)` pair, so adding a phrase without all three voices does
//! not compile.

use edem_core::onboarding;
use edem_core::{Locale, Mode, Step, Voice};

/// Longest stretch of the user's own words echoed back, in characters.
const MAX_ECHO_CHARS: usize = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phrase<'a> {
    AskMask,
    AskTrigger,
    AskPolarity,
    AskBody,
    AskOneWord,
    AskCostAgree,
    Decline,
    /// Already voice-specific: produced by the truth-cut table.
    TruthCut { text: &'a str },
    Paywall,
    ArchetypeReveal { label: &'a str, description: &'a str },
    AskShadow,
    AskTruth,
    AskIntegration,
    /// Reflect the user's words back inside a scene. No interpretation.
    ShadowMirror { echo: &'a str, scene: &'a str },
    TruthNaming { pattern: &'a str, description: Option<&'a str> },
    /// The practice is always the last sentence.
    IntegrationClose { ritual: &'a str, practice: &'a str },
    AskSelfReport,
    PracticeThanks,
    PracticeAlreadyDone,
    PracticeUnknown,
}

impl Phrase<'_> {
    /// Re-prompt for a step whose answer is missing or arrived out of order.
    pub fn prompt_for(step: Step) -> Option<Phrase<'static>> {
        let phrase = match step {
            Step::Mask => Phrase::AskMask,
            Step::Trigger => Phrase::AskTrigger,
            Step::Polarity => Phrase::AskPolarity,
            Step::Body => Phrase::AskBody,
            Step::OneWord => Phrase::AskOneWord,
            Step::CostAgree => Phrase::AskCostAgree,
            Step::Paywall => Phrase::Paywall,
            Step::Close => Phrase::Decline,
            Step::Shadow => Phrase::AskShadow,
            Step::Truth => Phrase::AskTruth,
            Step::Integration => Phrase::AskIntegration,
            Step::PracticeReport => Phrase::AskSelfReport,
            Step::TruthCut | Step::Archetype | Step::CrisisIntervention | Step::Error => {
                return None
            }
        };
        Some(phrase)
    }
}

/// A composed reply before it is tied to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub utterance: String,
    pub next_step: Step,
    pub buttons: Option<Vec<String>>,
    pub paywall: bool,
}

#[derive(Debug, Clone)]
pub struct Composer {
    max_chars: usize,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new(180)
    }
}

impl Composer {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Build the reply for `next_step`, then apply the demo override.
    pub fn compose(&self, next_step: Step, phrase: &Phrase<'_>, voice: Voice, mode: Mode) -> Reply {
        let mut utterance = self.phrase(phrase, voice);
        if matches!(
            next_step,
            Step::Mask
                | Step::Trigger
                | Step::Polarity
                | Step::Body
                | Step::OneWord
                | Step::CostAgree
                | Step::TruthCut
                | Step::Paywall
                | Step::Archetype
                | Step::Close
        ) {
            utterance = clip(&utterance, self.max_chars);
        }

        let mut reply = Reply {
            utterance,
            next_step,
            buttons: onboarding::buttons(next_step),
            paywall: next_step == Step::Paywall,
        };

        if mode == Mode::Demo && matches!(next_step, Step::TruthCut | Step::Truth) {
            tracing::debug!(%next_step, "demo mode, routing to paywall");
            reply.next_step = Step::Paywall;
            reply.paywall = true;
            reply.buttons = None;
        }
        reply
    }

    pub fn phrase(&self, phrase: &Phrase<'_>, voice: Voice) -> String {
        use Phrase::*;
        use Voice::*;

        match (phrase, voice) {
            (AskMask, Soft) => "Какую маску ты чаще всего носишь при других?".into(),
            (AskMask, Hard) => "Какую маску ты носишь? Одним словом или фразой.".into(),
            (AskMask, Therapist) => "Какую роль вы обычно играете в общении с другими?".into(),

            (AskTrigger, Soft) => "Что задевает тебя сильнее всего?".into(),
            (AskTrigger, Hard) => "Что тебя цепляет? Назови триггер.".into(),
            (AskTrigger, Therapist) => "Какие ситуации вызывают у вас самую сильную реакцию?".into(),

            (AskPolarity, Soft) => "Что из этого ближе всего к твоей боли?".into(),
            (AskPolarity, Hard) => "Выбирай: что это на самом деле?".into(),
            (AskPolarity, Therapist) => "Какая тема вам ближе всего? Выберите вариант.".into(),

            (AskBody, Soft) => "Где в теле ты это чувствуешь?".into(),
            (AskBody, Hard) => "Где это сидит в теле? Назови точно.".into(),
            (AskBody, Therapist) => "В какой части тела вы ощущаете это переживание?".into(),

            (AskOneWord, Soft) => "Если назвать это одним словом, какое оно?".into(),
            (AskOneWord, Hard) => "Одно слово. Какое?".into(),
            (AskOneWord, Therapist) => "Попробуйте выразить это одним словом.".into(),

            (AskCostAgree, Soft) => "Готов посмотреть на цену, которую ты за это платишь?".into(),
            (AskCostAgree, Hard) => "Готов увидеть цену? Да или нет.".into(),
            (AskCostAgree, Therapist) => "Готовы ли вы рассмотреть, чего вам это стоит?".into(),

            (Decline, Soft) => "Хорошо, не сейчас. Я буду рядом, когда захочешь вернуться.".into(),
            (Decline, Hard) => "Ладно. Вернёшься, когда будешь готов.".into(),
            (Decline, Therapist) => "Понимаю. Мы можем вернуться к этому, когда вы будете готовы.".into(),

            (TruthCut { text }, Soft | Hard | Therapist) => text.to_string(),

            (Paywall, Soft) => "Дальше начинается глубокая работа. Она ждёт тебя в полной версии.".into(),
            (Paywall, Hard) => "Дальше только в полной версии. Решай.".into(),
            (Paywall, Therapist) => "Продолжение работы доступно в полной версии программы.".into(),

            (ArchetypeReveal { label, description }, Soft) => format!(
                "Твой архетип: {}. Это тот, кто {}. Давай посмотрим, что за ним прячется.",
                label, description
            ),
            (ArchetypeReveal { label, description }, Hard) => format!(
                "Ты {}. Тот, кто {}. Рассказывай, что сейчас происходит.",
                label, description
            ),
            (ArchetypeReveal { label, description }, Therapist) => format!(
                "Ваш ведущий архетип: {}, тот, кто {}. Расскажите, что вы сейчас переживаете.",
                label, description
            ),

            (AskShadow, Soft) => "Расскажи, что сейчас происходит внутри.".into(),
            (AskShadow, Hard) => "Говори. Что происходит?".into(),
            (AskShadow, Therapist) => "Опишите, пожалуйста, что вы сейчас переживаете.".into(),

            (AskTruth, Soft) => "Что ты замечаешь, когда смотришь на это честно?".into(),
            (AskTruth, Hard) => "Посмотри честно. Что ты видишь?".into(),
            (AskTruth, Therapist) => "Что вы замечаете, когда смотрите на это прямо?".into(),

            (AskIntegration, Soft) => "Что ты готов изменить?".into(),
            (AskIntegration, Hard) => "Что будешь делать?".into(),
            (AskIntegration, Therapist) => "Какие изменения вы готовы попробовать?".into(),

            (ShadowMirror { echo, scene }, Soft) => format!(
                "Представь: {}. Ты говоришь: «{}». Побудь с этим немного.",
                scene,
                clip(echo, MAX_ECHO_CHARS)
            ),
            (ShadowMirror { echo, scene }, Hard) => format!(
                "«{}». Вот что ты сказал. Картина: {}. Не отворачивайся.",
                clip(echo, MAX_ECHO_CHARS),
                scene
            ),
            (ShadowMirror { echo, scene }, Therapist) => format!(
                "Вы говорите: «{}». Образ, который возникает: {}. Что происходит в теле?",
                clip(echo, MAX_ECHO_CHARS),
                scene
            ),

            (TruthNaming { pattern, description }, Soft) => {
                let mut text = format!("Похоже, за этим стоит {}.", pattern);
                if let Some(d) = description {
                    text.push_str(&format!(" Часть тебя {}.", d));
                }
                text.push_str(" Можно просто признать это.");
                text
            }
            (TruthNaming { pattern, description }, Hard) => {
                let mut text = format!("Назову прямо: это {}.", pattern);
                if let Some(d) = description {
                    text.push_str(&format!(" Ты тот, кто {}.", d));
                }
                text.push_str(" Признай.");
                text
            }
            (TruthNaming { pattern, description }, Therapist) => {
                let mut text = format!("Я замечаю повторяющийся паттерн: {}.", pattern);
                if let Some(d) = description {
                    text.push_str(&format!(" Ваша ведущая роль: тот, кто {}.", d));
                }
                text.push_str(" Как вам такое наблюдение?");
                text
            }

            (IntegrationClose { ritual, practice }, Soft) => format!(
                "Ты прошёл важный путь. Сейчас: {} Практика на ближайшие дни: {}.",
                ritual, practice
            ),
            (IntegrationClose { ritual, practice }, Hard) => {
                format!("Теперь действие. Прямо сейчас: {} Практика: {}.", ritual, practice)
            }
            (IntegrationClose { ritual, practice }, Therapist) => format!(
                "Чтобы закрепить результат, предлагаю упражнение: {} Домашняя практика: {}.",
                ritual, practice
            ),

            (AskSelfReport, Soft) => "Оцени, пожалуйста, как прошла практика, от 0 до 10.".into(),
            (AskSelfReport, Hard) => "Оценка от 0 до 10. Сколько?".into(),
            (AskSelfReport, Therapist) => "Оцените выполнение практики по шкале от 0 до 10.".into(),

            (PracticeThanks, Soft) => "Спасибо, что сделал это для себя. Практика отмечена.".into(),
            (PracticeThanks, Hard) => "Принято. Практика закрыта.".into(),
            (PracticeThanks, Therapist) => "Спасибо за отчёт. Практика отмечена как выполненная.".into(),

            (PracticeAlreadyDone, Soft) => "Эта практика уже отмечена. Ты молодец.".into(),
            (PracticeAlreadyDone, Hard) => "Уже отмечено. Дальше.".into(),
            (PracticeAlreadyDone, Therapist) => "Эта практика уже была отмечена ранее.".into(),

            (PracticeUnknown, Soft) => "Не нахожу такую практику в нашей сессии.".into(),
            (PracticeUnknown, Hard) => "Такой практики нет.".into(),
            (PracticeUnknown, Therapist) => "Эта практика не найдена в текущей сессии.".into(),
        }
    }

    /// Shown when a collaborator fails or the stored flow is inconsistent.
    pub fn fallback(&self, voice: Voice, locale: Locale) -> String {
        let text = match (voice, locale) {
            (Voice::Soft, Locale::Ru) => "Что-то пошло не так. Давай попробуем ещё раз чуть позже.",
            (Voice::Hard, Locale::Ru) => "Сбой. Повтори позже.",
            (Voice::Therapist, Locale::Ru) => {
                "Произошла техническая ошибка. Пожалуйста, повторите попытку позже."
            }
            (Voice::Soft, Locale::En) => "Something went wrong. Let's try again in a moment.",
            (Voice::Hard, Locale::En) => "Error. Try again later.",
            (Voice::Therapist, Locale::En) => "A technical error occurred. Please try again later.",
        };
        text.to_string()
    }
}

/// Cut to at most `max` characters, ending with an ellipsis when cut.
pub fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out = out.trim_end().to_string();
    out.push('…');
    out
}
