pub mod composer;
pub mod engine;
pub mod turn;

pub use composer::{Composer, Phrase, Reply};
pub use engine::DialogueEngine;
pub use turn::{TurnRequest, TurnResponse};
