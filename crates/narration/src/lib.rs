//! Read-aloud engine: recorded clips with a speech fallback, clause-by-clause
//! synthesis, and the cancellable timers everything else hangs off.
//!
//! The engine never spawns threads. The owner calls [`NarrationEngine::tick`]
//! from its event loop and backend events are drained there.

mod backend;
mod engine;
pub mod process;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod timer;
mod voice;

pub use backend::{
    AudioEvent, AudioService, ClipId, ClipState, NoAudio, NoSpeech, SpeechEvent, SpeechService,
    Utterance, UtteranceId, Voice,
};
pub use engine::{NarrationEngine, NarrationRequest, SessionConfig, Transport};
pub use timer::TimerQueue;
pub use voice::VoicePreferences;
