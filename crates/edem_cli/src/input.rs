//! Maps a typed terminal line onto the payload of the step being answered.

use edem_core::{Polarity, Step, TurnInput};
use uuid::Uuid;

/// Prefix of the out-of-band practice report command: `/report <0-10> [note]`.
pub const REPORT_COMMAND: &str = "/report";

/// Build the turn input for `line`, given the step the session is waiting on.
///
/// Unrecognized answers become `None` fields so the engine can re-prompt.
pub fn parse_line(step: Step, line: &str, last_practice: Option<Uuid>) -> TurnInput {
    let line = line.trim();

    if let Some(rest) = line.strip_prefix(REPORT_COMMAND) {
        if let Some(practice_id) = last_practice {
            return parse_report(practice_id, rest);
        }
    }

    let text = non_empty(line);
    match step {
        Step::Mask => TurnInput::Mask { mask: text },
        Step::Trigger => TurnInput::Trigger { trigger: text },
        Step::Polarity => TurnInput::Polarity {
            polarity: polarity_choice(line),
        },
        Step::Body => TurnInput::Body { body: text },
        Step::OneWord => TurnInput::OneWord { one_word: text },
        Step::CostAgree => TurnInput::CostAgree {
            cost_agree: yes_no(line),
        },
        Step::TruthCut => TurnInput::TruthCut,
        Step::Paywall => TurnInput::Paywall,
        Step::Archetype => TurnInput::Archetype,
        Step::Close => TurnInput::Close,
        Step::Truth => TurnInput::Truth {
            text: line.to_string(),
        },
        Step::Integration => TurnInput::Integration {
            text: line.to_string(),
        },
        Step::Shadow | Step::PracticeReport | Step::CrisisIntervention | Step::Error => {
            TurnInput::Shadow {
                text: line.to_string(),
            }
        }
    }
}

fn parse_report(practice_id: Uuid, rest: &str) -> TurnInput {
    let rest = rest.trim();
    let (score, note) = match rest.split_once(char::is_whitespace) {
        Some((score, note)) => (score, non_empty(note)),
        None => (rest, None),
    };
    TurnInput::PracticeReport {
        practice_id,
        self_report: score.parse::<u8>().ok(),
        note,
    }
}

/// A button index (1-based) or a label / code.
fn polarity_choice(line: &str) -> Option<String> {
    if let Ok(idx) = line.parse::<usize>() {
        return idx
            .checked_sub(1)
            .and_then(|i| Polarity::ALL.get(i))
            .map(|p| p.label().to_string());
    }
    Polarity::parse(line).map(|p| p.label().to_string())
}

fn yes_no(line: &str) -> Option<bool> {
    match line.to_lowercase().as_str() {
        "да" | "yes" | "y" | "1" => Some(true),
        "нет" | "no" | "n" | "2" | "0" => Some(false),
        _ => None,
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}
