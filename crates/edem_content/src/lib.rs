mod archetype;
mod emotion;
mod pick;
mod practice;
mod ritual;
mod scene;
pub use archetype::{
    Archetype, ArchetypeProfile, ArchetypeProfiler, Directness, MentalStyle, Pace, Preference,
    Tone,
};
pub use emotion::{Emotion, EmotionDetector, KeywordEmotionDetector};
pub use pick::pick_excluding;
pub use practice::{PracticeCatalog, PracticeDef};
pub use ritual::RitualSelector;
pub use scene::{DayPart, SceneSelector};
