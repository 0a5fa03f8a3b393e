//! Platform services the engine drives.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub id: String,
    pub name: String,
    pub language: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtteranceId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClipId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub voice: Option<Voice>,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechEvent {
    Ended(UtteranceId),
    Error(UtteranceId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEvent {
    /// Enough of the clip is buffered to play through.
    Ready(ClipId),
    Ended(ClipId),
    Error(ClipId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipState {
    Loading,
    Ready,
    Playing,
    Paused,
    Ended,
    Failed,
}

/// Speech synthesizer. Completion events are best effort; callers also poll
/// `is_speaking`.
pub trait SpeechService {
    fn is_available(&self) -> bool;

    fn list_voices(&mut self) -> Vec<Voice>;

    /// Returns true once after the platform voice list changed.
    fn voices_changed(&mut self) -> bool {
        false
    }

    fn speak(&mut self, utterance: &Utterance) -> anyhow::Result<UtteranceId>;

    /// Drops the current utterance and anything queued behind it.
    fn cancel(&mut self);

    fn pause(&mut self);

    fn resume(&mut self);

    fn is_speaking(&mut self) -> bool;

    fn is_paused(&self) -> bool;

    fn set_volume(&mut self, _volume: f32) {}

    fn drain_events(&mut self) -> Vec<SpeechEvent>;
}

/// Recorded clip player.
pub trait AudioService {
    fn is_available(&self) -> bool;

    fn load(&mut self, url: &str, volume: f32) -> anyhow::Result<ClipId>;

    fn play(&mut self, clip: ClipId) -> anyhow::Result<()>;

    fn pause(&mut self, clip: ClipId);

    /// Pauses and rewinds; the clip cannot be resumed afterwards.
    fn stop(&mut self, clip: ClipId);

    fn set_volume(&mut self, clip: ClipId, volume: f32);

    fn state(&mut self, clip: ClipId) -> ClipState;

    fn drain_events(&mut self) -> Vec<AudioEvent>;
}

/// Stand-in when no synthesizer exists on the platform.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSpeech;

impl SpeechService for NoSpeech {
    fn is_available(&self) -> bool {
        false
    }

    fn list_voices(&mut self) -> Vec<Voice> {
        Vec::new()
    }

    fn speak(&mut self, _utterance: &Utterance) -> anyhow::Result<UtteranceId> {
        anyhow::bail!("speech synthesis unavailable")
    }

    fn cancel(&mut self) {}

    fn pause(&mut self) {}

    fn resume(&mut self) {}

    fn is_speaking(&mut self) -> bool {
        false
    }

    fn is_paused(&self) -> bool {
        false
    }

    fn drain_events(&mut self) -> Vec<SpeechEvent> {
        Vec::new()
    }
}

/// Stand-in when no clip player exists on the platform.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAudio;

impl AudioService for NoAudio {
    fn is_available(&self) -> bool {
        false
    }

    fn load(&mut self, url: &str, _volume: f32) -> anyhow::Result<ClipId> {
        anyhow::bail!("audio playback unavailable for {url}")
    }

    fn play(&mut self, _clip: ClipId) -> anyhow::Result<()> {
        anyhow::bail!("audio playback unavailable")
    }

    fn pause(&mut self, _clip: ClipId) {}

    fn stop(&mut self, _clip: ClipId) {}

    fn set_volume(&mut self, _clip: ClipId, _volume: f32) {}

    fn state(&mut self, _clip: ClipId) -> ClipState {
        ClipState::Failed
    }

    fn drain_events(&mut self) -> Vec<AudioEvent> {
        Vec::new()
    }
}
