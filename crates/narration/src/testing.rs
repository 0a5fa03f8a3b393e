//! Scripted in-memory backends for exercising the engine without a platform.
//!
//! Both fakes share one call log so tests can assert ordering across sources.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::backend::{
    AudioEvent, AudioService, ClipId, ClipState, SpeechEvent, SpeechService, Utterance,
    UtteranceId, Voice,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Speak(String),
    Cancel,
    Pause,
    Resume,
    SpeechVolume(f32),
    Load(String),
    Play(ClipId),
    PauseClip(ClipId),
    Stop(ClipId),
    ClipVolume(ClipId, f32),
}

#[derive(Debug)]
struct FakeState {
    calls: Vec<Call>,
    speech_available: bool,
    voices: Vec<Voice>,
    voices_changed: bool,
    next_id: u64,
    utterances: Vec<Utterance>,
    current: Option<UtteranceId>,
    paused: bool,
    speech_events: Vec<SpeechEvent>,
    audio_available: bool,
    failing_urls: HashSet<String>,
    clips: HashMap<ClipId, ClipState>,
    last_clip: Option<ClipId>,
    audio_events: Vec<AudioEvent>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            speech_available: true,
            voices: Vec::new(),
            voices_changed: false,
            next_id: 1,
            utterances: Vec::new(),
            current: None,
            paused: false,
            speech_events: Vec::new(),
            audio_available: true,
            failing_urls: HashSet::new(),
            clips: HashMap::new(),
            last_clip: None,
            audio_events: Vec::new(),
        }
    }
}

type Shared = Rc<RefCell<FakeState>>;

#[derive(Debug)]
pub struct FakeSpeech(Shared);

#[derive(Debug)]
pub struct FakeAudio(Shared);

/// Test-side view of the fakes.
#[derive(Debug, Clone)]
pub struct FakeHandle(Shared);

pub fn fake_backends() -> (FakeSpeech, FakeAudio, FakeHandle) {
    let shared = Shared::default();
    (
        FakeSpeech(shared.clone()),
        FakeAudio(shared.clone()),
        FakeHandle(shared),
    )
}

impl FakeHandle {
    pub fn calls(&self) -> Vec<Call> {
        self.0.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.0.borrow_mut().calls.clear();
    }

    /// Texts passed to the synthesizer, oldest first.
    pub fn spoken(&self) -> Vec<String> {
        self.0
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Speak(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_utterance(&self) -> Option<Utterance> {
        self.0.borrow().utterances.last().cloned()
    }

    pub fn current_utterance(&self) -> Option<UtteranceId> {
        self.0.borrow().current
    }

    /// Ends the current utterance and reports it.
    pub fn finish_utterance(&self) {
        let mut state = self.0.borrow_mut();
        if let Some(id) = state.current.take() {
            state.speech_events.push(SpeechEvent::Ended(id));
        }
    }

    /// Ends the current utterance without any end event.
    pub fn finish_utterance_silently(&self) {
        self.0.borrow_mut().current = None;
    }

    pub fn fail_utterance(&self) {
        let mut state = self.0.borrow_mut();
        if let Some(id) = state.current.take() {
            state.speech_events.push(SpeechEvent::Error(id));
        }
    }

    pub fn set_voices(&self, voices: Vec<Voice>) {
        let mut state = self.0.borrow_mut();
        state.voices = voices;
        state.voices_changed = true;
    }

    pub fn set_speech_available(&self, available: bool) {
        self.0.borrow_mut().speech_available = available;
    }

    pub fn set_audio_available(&self, available: bool) {
        self.0.borrow_mut().audio_available = available;
    }

    /// Clips loaded from `url` report an error instead of becoming ready.
    pub fn fail_url(&self, url: &str) {
        self.0.borrow_mut().failing_urls.insert(url.to_string());
    }

    pub fn last_clip(&self) -> Option<ClipId> {
        self.0.borrow().last_clip
    }

    pub fn clip_state(&self, clip: ClipId) -> ClipState {
        self.0
            .borrow()
            .clips
            .get(&clip)
            .copied()
            .unwrap_or(ClipState::Failed)
    }

    pub fn finish_clip(&self, clip: ClipId) {
        let mut state = self.0.borrow_mut();
        state.clips.insert(clip, ClipState::Ended);
        state.audio_events.push(AudioEvent::Ended(clip));
    }

    pub fn push_audio_error(&self, clip: ClipId) {
        let mut state = self.0.borrow_mut();
        state.clips.insert(clip, ClipState::Failed);
        state.audio_events.push(AudioEvent::Error(clip));
    }
}

impl SpeechService for FakeSpeech {
    fn is_available(&self) -> bool {
        self.0.borrow().speech_available
    }

    fn list_voices(&mut self) -> Vec<Voice> {
        self.0.borrow().voices.clone()
    }

    fn voices_changed(&mut self) -> bool {
        std::mem::take(&mut self.0.borrow_mut().voices_changed)
    }

    fn speak(&mut self, utterance: &Utterance) -> anyhow::Result<UtteranceId> {
        let mut state = self.0.borrow_mut();
        if !state.speech_available {
            anyhow::bail!("fake speech disabled");
        }
        let id = UtteranceId(state.next_id);
        state.next_id += 1;
        state.calls.push(Call::Speak(utterance.text.clone()));
        state.utterances.push(utterance.clone());
        state.current = Some(id);
        state.paused = false;
        Ok(id)
    }

    fn cancel(&mut self) {
        let mut state = self.0.borrow_mut();
        state.calls.push(Call::Cancel);
        state.current = None;
        state.paused = false;
    }

    fn pause(&mut self) {
        let mut state = self.0.borrow_mut();
        state.calls.push(Call::Pause);
        state.paused = state.current.is_some();
    }

    fn resume(&mut self) {
        let mut state = self.0.borrow_mut();
        state.calls.push(Call::Resume);
        state.paused = false;
    }

    fn is_speaking(&mut self) -> bool {
        self.0.borrow().current.is_some()
    }

    fn is_paused(&self) -> bool {
        self.0.borrow().paused
    }

    fn set_volume(&mut self, volume: f32) {
        self.0.borrow_mut().calls.push(Call::SpeechVolume(volume));
    }

    fn drain_events(&mut self) -> Vec<SpeechEvent> {
        std::mem::take(&mut self.0.borrow_mut().speech_events)
    }
}

impl AudioService for FakeAudio {
    fn is_available(&self) -> bool {
        self.0.borrow().audio_available
    }

    fn load(&mut self, url: &str, _volume: f32) -> anyhow::Result<ClipId> {
        let mut state = self.0.borrow_mut();
        if !state.audio_available {
            anyhow::bail!("fake audio disabled");
        }
        let clip = ClipId(state.next_id);
        state.next_id += 1;
        state.calls.push(Call::Load(url.to_string()));
        state.last_clip = Some(clip);
        if state.failing_urls.contains(url) {
            state.clips.insert(clip, ClipState::Failed);
            state.audio_events.push(AudioEvent::Error(clip));
        } else {
            state.clips.insert(clip, ClipState::Ready);
            state.audio_events.push(AudioEvent::Ready(clip));
        }
        Ok(clip)
    }

    fn play(&mut self, clip: ClipId) -> anyhow::Result<()> {
        let mut state = self.0.borrow_mut();
        state.calls.push(Call::Play(clip));
        match state.clips.get(&clip) {
            Some(ClipState::Failed) | None => anyhow::bail!("clip {clip:?} cannot play"),
            _ => {
                state.clips.insert(clip, ClipState::Playing);
                Ok(())
            }
        }
    }

    fn pause(&mut self, clip: ClipId) {
        let mut state = self.0.borrow_mut();
        state.calls.push(Call::PauseClip(clip));
        if state.clips.get(&clip) == Some(&ClipState::Playing) {
            state.clips.insert(clip, ClipState::Paused);
        }
    }

    fn stop(&mut self, clip: ClipId) {
        let mut state = self.0.borrow_mut();
        state.calls.push(Call::Stop(clip));
        if let Some(clip_state) = state.clips.get_mut(&clip)
            && !matches!(*clip_state, ClipState::Failed | ClipState::Ended)
        {
            *clip_state = ClipState::Paused;
        }
    }

    fn set_volume(&mut self, clip: ClipId, volume: f32) {
        self.0.borrow_mut().calls.push(Call::ClipVolume(clip, volume));
    }

    fn state(&mut self, clip: ClipId) -> ClipState {
        self.0
            .borrow()
            .clips
            .get(&clip)
            .copied()
            .unwrap_or(ClipState::Failed)
    }

    fn drain_events(&mut self) -> Vec<AudioEvent> {
        std::mem::take(&mut self.0.borrow_mut().audio_events)
    }
}
