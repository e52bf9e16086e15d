//! Onboarding FSM: the six-step intake that ends in a "truth cut".
//!
//! `onb_1_mask → onb_2_trigger → onb_3_polarity → onb_4_body → onb_5_one_word
//! → onb_6_cost_agree → {truth_cut | close}`, and `truth_cut → {paywall | archetype}`.
//!
//! Each step advances only when its field is present. Anything else re-emits
//! the same step. Every move is checked against `TRANSITIONS`.

use crate::error::TransitionError;
use crate::session::{OnboardingData, Polarity};
use crate::{Mode, Step, TurnInput, Voice};

/// Every move the intake flow may make.
pub const TRANSITIONS: &[(Step, Step)] = &[
    (Step::Mask, Step::Trigger),
    (Step::Trigger, Step::Polarity),
    (Step::Polarity, Step::Body),
    (Step::Body, Step::OneWord),
    (Step::OneWord, Step::CostAgree),
    (Step::CostAgree, Step::TruthCut),
    (Step::CostAgree, Step::Close),
    (Step::TruthCut, Step::Paywall),
    (Step::TruthCut, Step::Archetype),
];

/// Longest one-word answer quoted into the truth cut, in characters.
const MAX_QUOTED_CHARS: usize = 40;

pub fn is_permitted(from: Step, to: Step) -> bool {
    TRANSITIONS.contains(&(from, to))
}

pub fn ensure_permitted(from: Step, to: Step) -> Result<(), TransitionError> {
    if is_permitted(from, to) {
        Ok(())
    } else {
        tracing::error!(%from, %to, "rejected transition outside the table");
        Err(TransitionError::NotPermitted { from, to })
    }
}

/// Buttons offered by a step, if it takes a discrete choice.
pub fn buttons(step: Step) -> Option<Vec<String>> {
    match step {
        Step::Polarity => Some(Polarity::ALL.iter().map(|p| p.label().to_string()).collect()),
        Step::CostAgree => Some(vec!["да".to_string(), "нет".to_string()]),
        _ => None,
    }
}

// ============================================================================
// FSM
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsmOutcome {
    /// Expected field missing or malformed; show the same step again.
    Retry(Step),
    /// Field accepted; move to the next intake step.
    Next(Step),
    /// Cost agreement declined; intake answers were discarded.
    Closed,
    /// Cost agreement accepted; truth cut synthesized and routed onward.
    TruthCut { text: String, route: Step },
}

impl FsmOutcome {
    pub fn next_step(&self) -> Step {
        match self {
            FsmOutcome::Retry(step) | FsmOutcome::Next(step) => *step,
            FsmOutcome::Closed => Step::Close,
            FsmOutcome::TruthCut { route, .. } => *route,
        }
    }

    /// The `(from, to)` moves this outcome made, starting at `from`.
    pub fn transitions(&self, from: Step) -> Vec<(Step, Step)> {
        match self {
            FsmOutcome::Retry(_) => Vec::new(),
            FsmOutcome::Next(to) => vec![(from, *to)],
            FsmOutcome::Closed => vec![(from, Step::Close)],
            FsmOutcome::TruthCut { route, .. } => {
                vec![(from, Step::TruthCut), (Step::TruthCut, *route)]
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OnboardingFsm;

impl OnboardingFsm {
    pub fn new() -> Self {
        Self
    }

    /// Apply one intake answer.
    ///
    /// `data` is only mutated when the flow moves. A decline resets it to empty.
    pub fn advance(
        &self,
        current: Step,
        input: &TurnInput,
        data: &mut OnboardingData,
        voice: Voice,
        mode: Mode,
    ) -> Result<FsmOutcome, TransitionError> {
        if !current.is_onboarding() {
            return Err(TransitionError::NotOnboarding(current));
        }
        let expected = data.expected_step();
        if expected != Some(current) {
            return Err(TransitionError::OutOfOrder { step: current, expected });
        }
        if input.step() != current {
            tracing::warn!(%current, got = %input.step(), "answer for a different step, re-prompting");
            return Ok(FsmOutcome::Retry(current));
        }

        match input {
            TurnInput::Mask { mask } => self.fill(current, filled(mask), |d, v| d.mask = Some(v), data),
            TurnInput::Trigger { trigger } => {
                self.fill(current, filled(trigger), |d, v| d.trigger = Some(v), data)
            }
            TurnInput::Polarity { polarity } => {
                let parsed = polarity.as_deref().and_then(Polarity::parse);
                self.fill(current, parsed, |d, v| d.polarity = Some(v), data)
            }
            TurnInput::Body { body } => self.fill(current, filled(body), |d, v| d.body = Some(v), data),
            TurnInput::OneWord { one_word } => {
                self.fill(current, filled(one_word), |d, v| d.one_word = Some(v), data)
            }
            TurnInput::CostAgree { cost_agree: None } => Ok(FsmOutcome::Retry(current)),
            TurnInput::CostAgree { cost_agree: Some(false) } => {
                ensure_permitted(current, Step::Close)?;
                *data = OnboardingData::default();
                tracing::info!("cost agreement declined, intake discarded");
                Ok(FsmOutcome::Closed)
            }
            TurnInput::CostAgree { cost_agree: Some(true) } => {
                let route = match mode {
                    Mode::Demo => Step::Paywall,
                    Mode::Pro => Step::Archetype,
                };
                ensure_permitted(current, Step::TruthCut)?;
                ensure_permitted(Step::TruthCut, route)?;
                data.cost_agree = Some(true);
                let text = synthesize_truth_cut(data, voice);
                tracing::info!(%route, "truth cut synthesized");
                Ok(FsmOutcome::TruthCut { text, route })
            }
            // `input.step() == current` and `current` is an intake step.
            _ => Ok(FsmOutcome::Retry(current)),
        }
    }

    fn fill<T>(
        &self,
        current: Step,
        value: Option<T>,
        set: impl FnOnce(&mut OnboardingData, T),
        data: &mut OnboardingData,
    ) -> Result<FsmOutcome, TransitionError> {
        let Some(value) = value else {
            tracing::debug!(%current, "field missing, re-prompting");
            return Ok(FsmOutcome::Retry(current));
        };
        let next = next_intake(current).ok_or(TransitionError::NotOnboarding(current))?;
        ensure_permitted(current, next)?;
        set(data, value);
        Ok(FsmOutcome::Next(next))
    }
}

fn next_intake(step: Step) -> Option<Step> {
    let idx = Step::ONBOARDING.iter().position(|s| *s == step)?;
    Step::ONBOARDING.get(idx + 1).copied()
}

fn filled(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ============================================================================
// Truth cut
// ============================================================================

fn truth_cut_template(polarity: Polarity, voice: Voice) -> &'static str {
    match (polarity, voice) {
        (Polarity::Loss, Voice::Soft) => "Кажется, под маской живёт страх потери. «{word}» — то, что ты боишься отпустить. Побудем с этим бережно.",
        (Polarity::Loss, Voice::Hard) => "Ты держишься за то, что уже уходит. «{word}» — вот что ты боишься потерять. Хватит делать вид, что это не так.",
        (Polarity::Loss, Voice::Therapist) => "Ведущая тема — утрата. Слово «{word}» указывает на то, что вам важно сохранить. Это можно исследовать.",
        (Polarity::Control, Voice::Soft) => "Твоя опора сейчас — контроль. «{word}» звучит как попытка удержать мир ровным. Можно чуть ослабить хватку.",
        (Polarity::Control, Voice::Hard) => "Ты всё контролируешь, потому что боишься хаоса. «{word}» — цена этого контроля. Посмотри на неё прямо.",
        (Polarity::Control, Voice::Therapist) => "Контроль выглядит главной защитой. «{word}» может отражать то, от чего он вас оберегает.",
        (Polarity::Rejection, Voice::Soft) => "Под этим — страх быть отвергнутым. «{word}» болит, когда тебя не выбирают. Ты не один в этом.",
        (Polarity::Rejection, Voice::Hard) => "Ты подстраиваешься, чтобы тебя не отвергли. «{word}» — вот что ты прячешь за маской. Пора перестать.",
        (Polarity::Rejection, Voice::Therapist) => "На первый план выходит тема отвержения. «{word}» может быть связано с ранним опытом непринятия.",
        (Polarity::Guilt, Voice::Soft) => "Ты несёшь вину, и, возможно, не всю свою. «{word}» — её имя. Часть этого груза можно положить.",
        (Polarity::Guilt, Voice::Hard) => "Вина управляет тобой. «{word}» — вот чем ты себя наказываешь. Реши, сколько ещё будешь платить.",
        (Polarity::Guilt, Voice::Therapist) => "Значимую роль играет чувство вины. «{word}» может описывать долг, который вы себе назначили.",
        (Polarity::Shame, Voice::Soft) => "Под маской прячется стыд. «{word}» — не правда о тебе, а старая боль. Ей можно дать место.",
        (Polarity::Shame, Voice::Hard) => "Стыд держит тебя за горло. «{word}» — не приговор, а старая рана. Пора на неё посмотреть.",
        (Polarity::Shame, Voice::Therapist) => "В центре, вероятно, переживание стыда. «{word}» может быть ядром вашего внутреннего критика.",
        (Polarity::Other, Voice::Soft) => "Корень становится виден. «{word}» — то, что просит внимания. Рассмотрим это вместе.",
        (Polarity::Other, Voice::Hard) => "Ты сам назвал суть: «{word}». Теперь не отворачивайся от неё.",
        (Polarity::Other, Voice::Therapist) => "Вы обозначили ключевое слово: «{word}». Это хорошая точка для дальнейшей работы.",
    }
}

fn truth_cut_fallback(voice: Voice) -> &'static str {
    match voice {
        Voice::Soft => "Корень становится яснее. Давай продолжим бережно.",
        Voice::Hard => "Корень уже виден. Продолжаем.",
        Voice::Therapist => "Суть начинает проясняться. Предлагаю продолжить.",
    }
}

/// Short interpretation quoting the user's one-word answer.
///
/// Pure lookup on `(polarity, voice)`; falls back to a generic line when
/// either polarity or the one word is missing.
pub fn synthesize_truth_cut(data: &OnboardingData, voice: Voice) -> String {
    match (data.polarity, data.one_word.as_deref().map(str::trim)) {
        (Some(polarity), Some(word)) if !word.is_empty() => {
            let word: String = word.chars().take(MAX_QUOTED_CHARS).collect();
            truth_cut_template(polarity, voice).replace("{word}", &word)
        }
        _ => truth_cut_fallback(voice).to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
