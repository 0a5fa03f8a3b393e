use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use picturebook_core::{CLAUSE_DELIMITER, NarrationSettings};

use crate::backend::{
    AudioEvent, AudioService, ClipId, ClipState, NoAudio, NoSpeech, SpeechEvent, SpeechService,
    Utterance, UtteranceId, Voice,
};
use crate::timer::TimerQueue;
use crate::voice::VoicePreferences;

/// One thing to say: the script, and optionally a recording of it.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrationRequest {
    pub text: String,
    pub audio_url: Option<String>,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl NarrationRequest {
    pub fn speech(text: impl Into<String>, rate: f32, pitch: f32, volume: f32) -> Self {
        Self {
            text: text.into(),
            audio_url: None,
            rate,
            pitch,
            volume,
        }
    }

    pub fn with_audio(mut self, audio_url: Option<String>) -> Self {
        self.audio_url = audio_url.filter(|url| !url.trim().is_empty());
        self
    }
}

/// Session-scoped narration configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub voice: Option<Voice>,
    pub preferences: VoicePreferences,
    pub volume: f32,
    pub clause_pause: Duration,
    pub poll_interval: Duration,
}

impl SessionConfig {
    pub fn from_settings(settings: &NarrationSettings) -> Self {
        Self {
            voice: None,
            preferences: VoicePreferences::from_settings(settings),
            volume: settings.volume.clamp(0.0, 1.0),
            clause_pause: Duration::from_millis(settings.clause_pause_ms),
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
        }
    }
}

/// Coarse transport state, as shown on the speaker button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Idle,
    Speaking,
    SpeechPaused,
    ClipLoading,
    ClipPlaying,
    ClipPaused,
}

#[derive(Debug)]
struct Playback {
    generation: u64,
    unit: Unit,
}

#[derive(Debug)]
enum Unit {
    Speech(SpeechSequence),
    Audio(AudioClip),
}

#[derive(Debug)]
struct SpeechSequence {
    clauses: VecDeque<String>,
    current: Option<UtteranceId>,
    paused: bool,
    /// The inter-clause pause elapsed while paused.
    deferred: bool,
    rate: f32,
    pitch: f32,
    volume: f32,
}

#[derive(Debug)]
struct AudioClip {
    clip: ClipId,
    url: String,
    fallback: NarrationRequest,
    phase: ClipPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClipPhase {
    Loading,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineTimer {
    NextClause { generation: u64 },
}

/// Owns the single active playback unit and decides what the reader hears.
pub struct NarrationEngine {
    speech: Box<dyn SpeechService>,
    audio: Box<dyn AudioService>,
    config: SessionConfig,
    active: Option<Playback>,
    generation: u64,
    failed_sources: HashSet<String>,
    timers: TimerQueue<EngineTimer>,
    speaking: bool,
    last_poll: Option<Instant>,
}

impl std::fmt::Debug for NarrationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrationEngine")
            .field("config", &self.config)
            .field("active", &self.active)
            .field("failed_sources", &self.failed_sources)
            .field("speaking", &self.speaking)
            .finish_non_exhaustive()
    }
}

impl NarrationEngine {
    pub fn new(
        speech: Box<dyn SpeechService>,
        audio: Box<dyn AudioService>,
        settings: &NarrationSettings,
    ) -> Self {
        let mut engine = Self {
            speech,
            audio,
            config: SessionConfig::from_settings(settings),
            active: None,
            generation: 0,
            failed_sources: HashSet::new(),
            timers: TimerQueue::new(),
            speaking: false,
            last_poll: None,
        };
        engine.refresh_voices();
        engine
    }

    /// Engine with no backends: every narration call is a no-op.
    pub fn unsupported(settings: &NarrationSettings) -> Self {
        Self::new(Box::new(NoSpeech), Box::new(NoAudio), settings)
    }

    pub fn refresh_voices(&mut self) {
        if !self.speech.is_available() {
            self.config.voice = None;
            return;
        }
        let voices = self.speech.list_voices();
        self.config.voice = self.config.preferences.select(&voices);
        match &self.config.voice {
            Some(voice) => info!("narration voice: {} ({})", voice.name, voice.language),
            None => info!("narration voice: platform default ({} listed)", voices.len()),
        }
    }

    pub fn voice(&self) -> Option<&Voice> {
        self.config.voice.as_ref()
    }

    pub fn volume(&self) -> f32 {
        self.config.volume
    }

    pub fn can_speak(&self) -> bool {
        self.speech.is_available()
    }

    /// Polled status; refreshed by [`NarrationEngine::tick`].
    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    pub fn has_failed(&self, url: &str) -> bool {
        self.failed_sources.contains(url)
    }

    pub fn transport(&self) -> Transport {
        match self.active.as_ref().map(|p| &p.unit) {
            None => Transport::Idle,
            Some(Unit::Speech(seq)) if seq.paused => Transport::SpeechPaused,
            Some(Unit::Speech(_)) => Transport::Speaking,
            Some(Unit::Audio(clip)) => match clip.phase {
                ClipPhase::Loading => Transport::ClipLoading,
                ClipPhase::Playing => Transport::ClipPlaying,
                ClipPhase::Paused => Transport::ClipPaused,
            },
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        let volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            self.config.volume
        };
        self.config.volume = volume;
        match self.active.as_mut().map(|p| &mut p.unit) {
            Some(Unit::Speech(seq)) => {
                seq.volume = volume;
                self.speech.set_volume(volume);
            }
            Some(Unit::Audio(clip)) => {
                clip.fallback.volume = volume;
                self.audio.set_volume(clip.clip, volume);
            }
            None => {}
        }
    }

    /// Audio when the request has a working recording, otherwise synthesis.
    pub fn narrate(&mut self, request: &NarrationRequest) {
        match request.audio_url.as_deref() {
            Some(url) if !self.failed_sources.contains(url) => {
                self.play_audio(url, request.volume, request)
            }
            _ => self.speak_text(&request.text, request.rate, request.pitch, request.volume),
        }
    }

    pub fn speak_text(&mut self, text: &str, rate: f32, pitch: f32, volume: f32) {
        self.stop();
        if !self.speech.is_available() {
            debug!("speech unavailable, dropping {text:?}");
            return;
        }
        let clauses = split_clauses(text);
        if clauses.is_empty() {
            return;
        }
        self.generation += 1;
        self.active = Some(Playback {
            generation: self.generation,
            unit: Unit::Speech(SpeechSequence {
                clauses,
                current: None,
                paused: false,
                deferred: false,
                rate,
                pitch,
                volume,
            }),
        });
        self.start_next_clause();
    }

    pub fn play_audio(&mut self, url: &str, volume: f32, fallback: &NarrationRequest) {
        if self.failed_sources.contains(url) {
            debug!("audio {url} failed earlier on this page, speaking instead");
            self.speak_fallback(fallback);
            return;
        }
        self.stop();
        if !self.audio.is_available() {
            self.failed_sources.insert(url.to_string());
            self.speak_fallback(fallback);
            return;
        }
        match self.audio.load(url, volume) {
            Ok(clip) => {
                info!("loading audio {url}");
                self.generation += 1;
                self.active = Some(Playback {
                    generation: self.generation,
                    unit: Unit::Audio(AudioClip {
                        clip,
                        url: url.to_string(),
                        fallback: NarrationRequest {
                            volume,
                            ..fallback.clone()
                        },
                        phase: ClipPhase::Loading,
                    }),
                });
            }
            Err(err) => {
                warn!("audio {url} failed to load: {err:#}");
                self.failed_sources.insert(url.to_string());
                self.speak_fallback(fallback);
            }
        }
    }

    /// Speaker button: pause, resume, or start `request` when idle.
    pub fn toggle(&mut self, request: &NarrationRequest) {
        match self.transport() {
            Transport::Idle => self.narrate(request),
            Transport::Speaking => {
                self.speech.pause();
                if let Some(seq) = self.speech_sequence_mut() {
                    seq.paused = true;
                }
            }
            Transport::SpeechPaused => {
                let Some(seq) = self.speech_sequence_mut() else {
                    return;
                };
                seq.paused = false;
                let in_utterance = seq.current.is_some();
                let deferred = std::mem::take(&mut seq.deferred);
                if in_utterance {
                    self.speech.resume();
                } else if deferred {
                    self.start_next_clause();
                }
            }
            Transport::ClipLoading => self.stop(),
            Transport::ClipPlaying => {
                if let Some(clip) = self.audio_clip_mut() {
                    clip.phase = ClipPhase::Paused;
                    let id = clip.clip;
                    self.audio.pause(id);
                }
            }
            Transport::ClipPaused => {
                let Some(id) = self.audio_clip_mut().map(|clip| clip.clip) else {
                    return;
                };
                match self.audio.play(id) {
                    Ok(()) => {
                        if let Some(clip) = self.audio_clip_mut() {
                            clip.phase = ClipPhase::Playing;
                        }
                    }
                    Err(err) => {
                        warn!("audio resume failed: {err:#}");
                        self.on_audio_error(id);
                    }
                }
            }
        }
    }

    /// Stops whatever is playing and cancels pending clauses.
    pub fn stop(&mut self) {
        self.timers.cancel_all();
        if let Some(Playback {
            unit: Unit::Audio(clip),
            ..
        }) = self.active.take()
        {
            self.audio.stop(clip.clip);
        }
        if self.speech.is_available() {
            self.speech.cancel();
        }
    }

    /// Page-view boundary: stop playback and retry recordings that failed.
    pub fn begin_page(&mut self) {
        self.stop();
        self.failed_sources.clear();
    }

    pub fn tick(&mut self, now: Instant) {
        if self.speech.voices_changed() {
            self.refresh_voices();
        }
        for event in self.speech.drain_events() {
            match event {
                SpeechEvent::Ended(id) => self.on_speech_ended(id, now),
                SpeechEvent::Error(id) => self.on_speech_error(id),
            }
        }
        for event in self.audio.drain_events() {
            match event {
                AudioEvent::Ready(id) => self.on_audio_ready(id),
                AudioEvent::Ended(id) => self.on_audio_ended(id),
                AudioEvent::Error(id) => self.on_audio_error(id),
            }
        }
        while let Some(timer) = self.timers.pop_due(now) {
            match timer {
                EngineTimer::NextClause { generation } => self.on_clause_timer(generation),
            }
        }
        let poll_due = self
            .last_poll
            .is_none_or(|last| now.saturating_duration_since(last) >= self.config.poll_interval);
        if poll_due {
            self.last_poll = Some(now);
            self.poll_status(now);
        }
    }

    fn on_speech_ended(&mut self, id: UtteranceId, now: Instant) {
        let Some(playback) = self.active.as_mut() else {
            return;
        };
        let generation = playback.generation;
        let Unit::Speech(seq) = &mut playback.unit else {
            return;
        };
        if seq.current != Some(id) {
            return;
        }
        seq.current = None;
        if seq.clauses.is_empty() {
            self.active = None;
            return;
        }
        self.timers.schedule(
            now + self.config.clause_pause,
            EngineTimer::NextClause { generation },
        );
    }

    fn on_speech_error(&mut self, id: UtteranceId) {
        let current = self.speech_sequence_mut().and_then(|seq| seq.current);
        if current == Some(id) {
            warn!("speech utterance failed, dropping the rest of the script");
            self.active = None;
            self.timers.cancel_all();
        }
    }

    fn on_clause_timer(&mut self, generation: u64) {
        let Some(playback) = self.active.as_mut() else {
            return;
        };
        if playback.generation != generation {
            return;
        }
        let Unit::Speech(seq) = &mut playback.unit else {
            return;
        };
        if seq.paused {
            seq.deferred = true;
        } else {
            self.start_next_clause();
        }
    }

    fn start_next_clause(&mut self) {
        let voice = self.config.voice.clone();
        let Some(Playback {
            unit: Unit::Speech(seq),
            ..
        }) = self.active.as_mut()
        else {
            return;
        };
        let Some(text) = seq.clauses.pop_front() else {
            self.active = None;
            return;
        };
        let utterance = Utterance {
            text,
            voice,
            rate: seq.rate,
            pitch: seq.pitch,
            volume: seq.volume,
        };
        match self.speech.speak(&utterance) {
            Ok(id) => seq.current = Some(id),
            Err(err) => {
                warn!("speech failed: {err:#}");
                self.active = None;
            }
        }
    }

    fn on_audio_ready(&mut self, id: ClipId) {
        let loading = self
            .audio_clip_mut()
            .is_some_and(|clip| clip.clip == id && clip.phase == ClipPhase::Loading);
        if !loading {
            return;
        }
        match self.audio.play(id) {
            Ok(()) => {
                if let Some(clip) = self.audio_clip_mut() {
                    clip.phase = ClipPhase::Playing;
                    info!("playing audio {}", clip.url);
                }
            }
            Err(err) => {
                warn!("audio play failed: {err:#}");
                self.on_audio_error(id);
            }
        }
    }

    fn on_audio_ended(&mut self, id: ClipId) {
        if self.audio_clip_mut().is_some_and(|clip| clip.clip == id) {
            self.active = None;
            self.audio.stop(id);
        }
    }

    fn on_audio_error(&mut self, id: ClipId) {
        if !self.audio_clip_mut().is_some_and(|clip| clip.clip == id) {
            return;
        }
        let Some(Playback {
            unit: Unit::Audio(clip),
            ..
        }) = self.active.take()
        else {
            return;
        };
        warn!("audio {} failed, falling back to speech", clip.url);
        self.audio.stop(clip.clip);
        self.failed_sources.insert(clip.url);
        self.speak_fallback(&clip.fallback);
    }

    fn speak_fallback(&mut self, fallback: &NarrationRequest) {
        self.speak_text(
            &fallback.text,
            fallback.rate,
            fallback.pitch,
            fallback.volume,
        );
    }

    fn poll_status(&mut self, now: Instant) {
        let silent_end = match self.active.as_ref().map(|p| &p.unit) {
            Some(Unit::Speech(seq)) if !seq.paused => seq.current,
            _ => None,
        };
        if let Some(id) = silent_end
            && !self.speech.is_speaking()
            && !self.speech.is_paused()
        {
            debug!("utterance finished without an end event");
            self.on_speech_ended(id, now);
        }

        let playing_clip = match self.active.as_ref().map(|p| &p.unit) {
            Some(Unit::Audio(clip)) if clip.phase == ClipPhase::Playing => Some(clip.clip),
            _ => None,
        };
        if let Some(id) = playing_clip {
            match self.audio.state(id) {
                ClipState::Ended => self.on_audio_ended(id),
                ClipState::Failed => self.on_audio_error(id),
                _ => {}
            }
        }

        self.speaking = match self.active.as_ref().map(|p| &p.unit) {
            None => false,
            Some(Unit::Speech(seq)) => !seq.paused,
            Some(Unit::Audio(clip)) => {
                clip.phase == ClipPhase::Playing
                    && self.audio.state(clip.clip) == ClipState::Playing
            }
        };
    }

    fn speech_sequence_mut(&mut self) -> Option<&mut SpeechSequence> {
        match self.active.as_mut().map(|p| &mut p.unit) {
            Some(Unit::Speech(seq)) => Some(seq),
            _ => None,
        }
    }

    fn audio_clip_mut(&mut self) -> Option<&mut AudioClip> {
        match self.active.as_mut().map(|p| &mut p.unit) {
            Some(Unit::Audio(clip)) => Some(clip),
            _ => None,
        }
    }
}

impl Drop for NarrationEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn split_clauses(text: &str) -> VecDeque<String> {
    text.split(CLAUSE_DELIMITER)
        .map(str::trim)
        .filter(|clause| !clause.is_empty())
        .map(String::from)
        .collect()
}
