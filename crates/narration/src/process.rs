//! Backends that drive external programs found on `PATH`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use anyhow::Context as _;
use log::{debug, info, warn};
use picturebook_core::NarrationSettings;

use crate::backend::{
    AudioEvent, AudioService, ClipId, ClipState, NoAudio, NoSpeech, SpeechEvent, SpeechService,
    Utterance, UtteranceId, Voice,
};

const SPEECH_PROGRAMS: [&str; 2] = ["espeak-ng", "espeak"];
const AUDIO_PROGRAMS: [&str; 3] = ["ffplay", "mpv", "paplay"];
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

/// Best available backends for this machine; missing programs degrade to no-ops.
pub fn system_backends(
    settings: &NarrationSettings,
) -> (Box<dyn SpeechService>, Box<dyn AudioService>) {
    let speech: Box<dyn SpeechService> =
        match locate(settings.speech_program.as_deref(), &SPEECH_PROGRAMS) {
            Some(program) => {
                info!("speech via {}", program.display());
                Box::new(EspeakSpeech::new(program, &settings.locale_prefix))
            }
            None => {
                warn!("no speech synthesizer found; narration is silent");
                Box::new(NoSpeech)
            }
        };
    let audio: Box<dyn AudioService> =
        match locate(settings.audio_program.as_deref(), &AUDIO_PROGRAMS) {
            Some(program) => {
                info!("audio via {}", program.display());
                Box::new(CommandAudio::new(program))
            }
            None => {
                warn!("no audio player found; recordings fall back to speech");
                Box::new(NoAudio)
            }
        };
    (speech, audio)
}

fn locate(configured: Option<&str>, candidates: &[&str]) -> Option<PathBuf> {
    if let Some(configured) = configured {
        let path = Path::new(configured);
        if path.components().count() > 1 {
            return is_probably_executable(path).then(|| path.to_path_buf());
        }
        return find_on_path(configured);
    }
    candidates.iter().find_map(|name| find_on_path(name))
}

fn find_on_path(name: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&paths) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        for candidate in [dir.join(name), dir.join(format!("{name}.exe"))] {
            if is_probably_executable(&candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

fn is_probably_executable(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt as _;
        if let Ok(meta) = std::fs::metadata(path) {
            return meta.permissions().mode() & 0o111 != 0;
        }
    }

    #[cfg(not(unix))]
    {
        return true;
    }

    #[allow(unreachable_code)]
    false
}

/// Freezes or thaws a child process. Best effort: unsupported platforms
/// simply keep playing.
fn signal(child: &Child, stop: bool) -> bool {
    #[cfg(unix)]
    {
        let sig = if stop { "-STOP" } else { "-CONT" };
        let status = Command::new("kill")
            .arg(sig)
            .arg(child.id().to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(status) if status.success() => true,
            Ok(status) => {
                debug!("kill {sig} {} exited with {status}", child.id());
                false
            }
            Err(err) => {
                debug!("kill {sig} {}: {err}", child.id());
                false
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = (child, stop);
        false
    }
}

fn kill(mut child: Child) {
    // A frozen child must be thawed or some platforms keep it around.
    signal(&child, false);
    if let Err(err) = child.kill() {
        debug!("kill {}: {err}", child.id());
    }
    if let Err(err) = child.wait() {
        debug!("wait {}: {err}", child.id());
    }
}

#[derive(Debug)]
struct Running {
    id: UtteranceId,
    child: Child,
}

/// eSpeak NG (or classic eSpeak) command-line synthesizer.
#[derive(Debug)]
pub struct EspeakSpeech {
    program: PathBuf,
    locale_prefix: String,
    running: Option<Running>,
    paused: bool,
    next_id: u64,
    events: Vec<SpeechEvent>,
}

impl EspeakSpeech {
    pub fn new(program: PathBuf, locale_prefix: &str) -> Self {
        Self {
            program,
            locale_prefix: locale_prefix.trim().to_string(),
            running: None,
            paused: false,
            next_id: 1,
            events: Vec::new(),
        }
    }

    fn reap(&mut self) {
        let Some(running) = self.running.as_mut() else {
            return;
        };
        let event = match running.child.try_wait() {
            Ok(None) => return,
            Ok(Some(status)) if status.success() => SpeechEvent::Ended(running.id),
            Ok(Some(status)) => {
                warn!("{} exited with {status}", self.program.display());
                SpeechEvent::Error(running.id)
            }
            Err(err) => {
                warn!("waiting on {}: {err}", self.program.display());
                SpeechEvent::Error(running.id)
            }
        };
        self.events.push(event);
        self.running = None;
        self.paused = false;
    }
}

impl SpeechService for EspeakSpeech {
    fn is_available(&self) -> bool {
        true
    }

    fn list_voices(&mut self) -> Vec<Voice> {
        let mut cmd = Command::new(&self.program);
        if self.locale_prefix.is_empty() {
            cmd.arg("--voices");
        } else {
            cmd.arg(format!("--voices={}", self.locale_prefix));
        }
        match cmd.stdin(Stdio::null()).stderr(Stdio::null()).output() {
            Ok(output) => parse_espeak_voices(&String::from_utf8_lossy(&output.stdout)),
            Err(err) => {
                warn!("listing voices: {err}");
                Vec::new()
            }
        }
    }

    fn speak(&mut self, utterance: &Utterance) -> anyhow::Result<UtteranceId> {
        self.cancel();
        let volume = utterance.volume;
        let words_per_minute = (BASE_WORDS_PER_MINUTE * utterance.rate).clamp(80.0, 450.0);
        let pitch = (utterance.pitch * 50.0).clamp(0.0, 99.0);
        let amplitude = (volume * 100.0).clamp(0.0, 200.0);

        let mut cmd = Command::new(&self.program);
        if let Some(voice) = &utterance.voice {
            cmd.arg("-v").arg(&voice.id);
        }
        cmd.arg("-s")
            .arg(format!("{}", words_per_minute.round() as u32))
            .arg("-p")
            .arg(format!("{}", pitch.round() as u32))
            .arg("-a")
            .arg(format!("{}", amplitude.round() as u32))
            .arg("--")
            .arg(&utterance.text);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let child = cmd
            .spawn()
            .with_context(|| format!("spawn {}", self.program.display()))?;
        let id = UtteranceId(self.next_id);
        self.next_id += 1;
        self.running = Some(Running { id, child });
        Ok(id)
    }

    fn cancel(&mut self) {
        if let Some(running) = self.running.take() {
            kill(running.child);
        }
        self.paused = false;
    }

    fn pause(&mut self) {
        if let Some(running) = &self.running {
            self.paused = signal(&running.child, true);
        }
    }

    fn resume(&mut self) {
        if let Some(running) = &self.running
            && self.paused
        {
            signal(&running.child, false);
        }
        self.paused = false;
    }

    fn is_speaking(&mut self) -> bool {
        self.reap();
        self.running.is_some()
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn drain_events(&mut self) -> Vec<SpeechEvent> {
        self.reap();
        std::mem::take(&mut self.events)
    }
}

impl Drop for EspeakSpeech {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Parses the table printed by `espeak-ng --voices`.
fn parse_espeak_voices(listing: &str) -> Vec<Voice> {
    listing
        .lines()
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            let (language, gender, name) = (cols.get(1)?, cols.get(2)?, cols.get(3)?);
            let gender = match gender.rsplit('/').next() {
                Some("F") => " (female)",
                Some("M") => " (male)",
                _ => "",
            };
            Some(Voice {
                id: language.to_string(),
                name: format!("{}{gender}", name.replace('_', " ")),
                language: language.to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Player {
    Ffplay,
    Mpv,
    Paplay,
    Other,
}

impl Player {
    fn detect(program: &Path) -> Self {
        let stem = program
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match stem.as_str() {
            "ffplay" => Player::Ffplay,
            "mpv" => Player::Mpv,
            "paplay" => Player::Paplay,
            _ => Player::Other,
        }
    }

    fn args(&self, url: &str, volume: f32) -> Vec<String> {
        let percent = (volume.clamp(0.0, 1.0) * 100.0).round() as u32;
        match self {
            Player::Ffplay => vec![
                "-nodisp".to_string(),
                "-autoexit".to_string(),
                "-loglevel".to_string(),
                "quiet".to_string(),
                "-volume".to_string(),
                percent.to_string(),
                url.to_string(),
            ],
            Player::Mpv => vec![
                "--no-video".to_string(),
                "--really-quiet".to_string(),
                format!("--volume={percent}"),
                url.to_string(),
            ],
            Player::Paplay => vec![
                format!("--volume={}", (volume.clamp(0.0, 1.0) * 65536.0) as u32),
                url.to_string(),
            ],
            Player::Other => vec![url.to_string()],
        }
    }
}

#[derive(Debug)]
struct ClipSlot {
    url: String,
    volume: f32,
    child: Option<Child>,
    state: ClipState,
}

/// Plays each clip by spawning a command-line player.
#[derive(Debug)]
pub struct CommandAudio {
    program: PathBuf,
    player: Player,
    next_id: u64,
    clips: HashMap<ClipId, ClipSlot>,
    events: Vec<AudioEvent>,
}

impl CommandAudio {
    pub fn new(program: PathBuf) -> Self {
        let player = Player::detect(&program);
        Self {
            program,
            player,
            next_id: 1,
            clips: HashMap::new(),
            events: Vec::new(),
        }
    }

    fn reap(&mut self) {
        for (id, slot) in self.clips.iter_mut() {
            let Some(child) = slot.child.as_mut() else {
                continue;
            };
            let event = match child.try_wait() {
                Ok(None) => continue,
                Ok(Some(status)) if status.success() => {
                    slot.state = ClipState::Ended;
                    AudioEvent::Ended(*id)
                }
                Ok(Some(status)) => {
                    warn!("{} exited with {status} for {}", self.program.display(), slot.url);
                    slot.state = ClipState::Failed;
                    AudioEvent::Error(*id)
                }
                Err(err) => {
                    warn!("waiting on player for {}: {err}", slot.url);
                    slot.state = ClipState::Failed;
                    AudioEvent::Error(*id)
                }
            };
            slot.child = None;
            self.events.push(event);
        }
    }
}

fn is_remote(url: &str) -> bool {
    url.contains("://")
}

impl AudioService for CommandAudio {
    fn is_available(&self) -> bool {
        true
    }

    fn load(&mut self, url: &str, volume: f32) -> anyhow::Result<ClipId> {
        if !is_remote(url) && !Path::new(url).is_file() {
            anyhow::bail!("audio file not found: {url}");
        }
        if is_remote(url) && self.player == Player::Paplay {
            anyhow::bail!("paplay cannot stream {url}");
        }
        let id = ClipId(self.next_id);
        self.next_id += 1;
        self.clips.insert(
            id,
            ClipSlot {
                url: url.to_string(),
                volume,
                child: None,
                state: ClipState::Ready,
            },
        );
        // Players buffer on their own; a located file is ready to play through.
        self.events.push(AudioEvent::Ready(id));
        Ok(id)
    }

    fn play(&mut self, clip: ClipId) -> anyhow::Result<()> {
        let slot = self
            .clips
            .get_mut(&clip)
            .with_context(|| format!("unknown clip {clip:?}"))?;
        match &slot.child {
            Some(child) => {
                if slot.state == ClipState::Paused {
                    signal(child, false);
                }
            }
            None => {
                let child = Command::new(&self.program)
                    .args(self.player.args(&slot.url, slot.volume))
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .spawn()
                    .with_context(|| format!("spawn {} for {}", self.program.display(), slot.url))?;
                slot.child = Some(child);
            }
        }
        slot.state = ClipState::Playing;
        Ok(())
    }

    fn pause(&mut self, clip: ClipId) {
        if let Some(slot) = self.clips.get_mut(&clip)
            && let Some(child) = &slot.child
            && signal(child, true)
        {
            slot.state = ClipState::Paused;
        }
    }

    fn stop(&mut self, clip: ClipId) {
        if let Some(slot) = self.clips.remove(&clip)
            && let Some(child) = slot.child
        {
            kill(child);
        }
    }

    fn set_volume(&mut self, clip: ClipId, volume: f32) {
        // Players keep their start volume; the next spawn picks this up.
        if let Some(slot) = self.clips.get_mut(&clip) {
            slot.volume = volume;
        }
    }

    fn state(&mut self, clip: ClipId) -> ClipState {
        self.reap();
        self.clips
            .get(&clip)
            .map(|slot| slot.state)
            .unwrap_or(ClipState::Ended)
    }

    fn drain_events(&mut self) -> Vec<AudioEvent> {
        self.reap();
        std::mem::take(&mut self.events)
    }
}

impl Drop for CommandAudio {
    fn drop(&mut self) {
        for (_, slot) in self.clips.drain() {
            if let Some(child) = slot.child {
                kill(child);
            }
        }
    }
}
