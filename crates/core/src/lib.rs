//! Core domain types for Picturebook.

use serde::{Deserialize, Serialize};

mod catalog;
pub mod icon;

pub use catalog::Catalog;

/// Separates spoken clauses inside a narration script.
pub const CLAUSE_DELIMITER: &str = "...";

pub const MAX_COUNTED_OBJECTS: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookKind {
    Alphabet,
    Numbers,
    Shapes,
    #[default]
    Picture,
}

impl BookKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookKind::Alphabet => "alphabet",
            BookKind::Numbers => "numbers",
            BookKind::Shapes => "shapes",
            BookKind::Picture => "picture",
        }
    }

    /// Number of objects drawn (and counted) on a page.
    pub fn object_count(&self, page: &Page) -> usize {
        match self {
            BookKind::Numbers => page
                .title
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .map(|n| n.min(MAX_COUNTED_OBJECTS))
                .unwrap_or(1),
            _ => 1,
        }
    }

    /// Whether tapping the page runs a counting sequence instead of plain narration.
    pub fn counts_on_tap(&self, page: &Page) -> bool {
        matches!(self, BookKind::Numbers) && !page.is_summary() && self.object_count(page) > 1
    }

    /// Text spoken when a summary grid item is tapped.
    pub fn item_narration(&self, item: &str) -> String {
        let mut chars = item.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => format!("{}. ", c.to_ascii_uppercase()),
            _ => item.to_string(),
        }
    }
}

impl std::fmt::Display for BookKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookKind {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "alphabet" | "abc" => Ok(BookKind::Alphabet),
            "numbers" => Ok(BookKind::Numbers),
            "shapes" => Ok(BookKind::Shapes),
            "picture" => Ok(BookKind::Picture),
            _ => Err("unknown book kind"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub color: String,
    pub cover: String,
    #[serde(default)]
    pub kind: BookKind,
    #[serde(default)]
    pub hidden: bool,
    pub pages: Vec<Page>,
}

impl Book {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn summary_index(&self) -> Option<usize> {
        self.pages.iter().position(Page::is_summary)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PageKind {
    Summary { items: Vec<String> },
    Content,
}

/// Either one glyph or one glyph per counted object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Emoji {
    One(String),
    Many(Vec<String>),
}

impl Emoji {
    pub fn glyph_at(&self, index: usize) -> Option<&str> {
        match self {
            Emoji::One(glyph) => Some(glyph.as_str()),
            Emoji::Many(glyphs) if glyphs.is_empty() => None,
            Emoji::Many(glyphs) => Some(glyphs[index % glyphs.len()].as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(flatten)]
    pub kind: PageKind,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default = "default_background")]
    pub background: String,
    #[serde(default)]
    pub letter_color: Option<String>,
    #[serde(default)]
    pub speech: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub emoji: Option<Emoji>,
    #[serde(default)]
    pub image_url: Option<String>,
}

fn default_background() -> String {
    "#FFFFFF".to_string()
}

impl Page {
    pub fn is_summary(&self) -> bool {
        matches!(self.kind, PageKind::Summary { .. })
    }

    pub fn summary_items(&self) -> &[String] {
        match &self.kind {
            PageKind::Summary { items } => items,
            PageKind::Content => &[],
        }
    }

    /// Script spoken for the page: the explicit speech, or title and subtitle.
    pub fn narration_text(&self) -> String {
        if let Some(speech) = self.speech.as_deref()
            && !speech.trim().is_empty()
        {
            return speech.to_string();
        }
        match self.subtitle.as_deref().map(str::trim) {
            Some(subtitle) if !subtitle.is_empty() => format!("{}. {subtitle}", self.title),
            _ => format!("{}.", self.title),
        }
    }

    /// Leading phrase of the script, before the first clause delimiter.
    pub fn intro_phrase(&self) -> String {
        let text = self.narration_text();
        text.split(CLAUSE_DELIMITER)
            .map(str::trim)
            .find(|clause| !clause.is_empty())
            .unwrap_or_default()
            .to_string()
    }

    pub fn glyph_at(&self, index: usize) -> Option<&str> {
        self.emoji.as_ref().and_then(|emoji| emoji.glyph_at(index))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parses `#RRGGBB` or `#RGB`.
    pub fn parse_hex(value: &str) -> Option<Self> {
        let hex = value.trim().strip_prefix('#')?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            6 => Some(Rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Some(Rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub narration: NarrationSettings,
    pub gestures: GestureSettings,
    pub counting: CountingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationSettings {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub clause_pause_ms: u64,
    pub poll_interval_ms: u64,
    pub preferred_voices: Vec<String>,
    pub voice_hints: Vec<String>,
    pub locale_prefix: String,
    pub speech_program: Option<String>,
    pub audio_program: Option<String>,
}

impl Default for NarrationSettings {
    fn default() -> Self {
        Self {
            rate: 0.7,
            pitch: 1.4,
            volume: 1.0,
            clause_pause_ms: 350,
            poll_interval_ms: 100,
            preferred_voices: ["samantha", "karen", "moira", "tessa"]
                .into_iter()
                .map(String::from)
                .collect(),
            voice_hints: ["female", "girl", "child"]
                .into_iter()
                .map(String::from)
                .collect(),
            locale_prefix: "en".to_string(),
            speech_program: None,
            audio_program: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureSettings {
    pub swipe_min_px: f32,
    pub swipe_ratio: f32,
    pub tap_max_ms: u64,
    pub tap_jitter_px: f32,
    pub left_edge: f32,
    pub right_edge: f32,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            swipe_min_px: 20.0,
            swipe_ratio: 0.6,
            tap_max_ms: 300,
            tap_jitter_px: 10.0,
            left_edge: 0.15,
            right_edge: 0.85,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountingSettings {
    pub interval_ms: u64,
    pub lead_floor_ms: u64,
    pub lead_per_char_ms: u64,
}

impl Default for CountingSettings {
    fn default() -> Self {
        Self {
            interval_ms: 900,
            lead_floor_ms: 1200,
            lead_per_char_ms: 60,
        }
    }
}

impl Settings {
    pub fn normalize(&mut self) {
        self.narration.normalize();
        self.gestures.normalize();
        self.counting.normalize();
    }
}

impl NarrationSettings {
    pub fn normalize(&mut self) {
        self.rate = finite_or(self.rate, 0.7).clamp(0.1, 4.0);
        self.pitch = finite_or(self.pitch, 1.4).clamp(0.0, 2.0);
        self.volume = finite_or(self.volume, 1.0).clamp(0.0, 1.0);
        self.clause_pause_ms = self.clause_pause_ms.min(5_000);
        self.poll_interval_ms = self.poll_interval_ms.clamp(20, 1_000);
        normalize_names(&mut self.preferred_voices);
        normalize_names(&mut self.voice_hints);
        self.locale_prefix = self.locale_prefix.trim().to_ascii_lowercase();
        for program in [&mut self.speech_program, &mut self.audio_program] {
            if program.as_deref().is_some_and(|p| p.trim().is_empty()) {
                *program = None;
            }
        }
    }

    pub fn nudge_volume(&mut self, delta: f32) {
        self.volume = (self.volume + delta).clamp(0.0, 1.0);
    }
}

impl GestureSettings {
    pub fn normalize(&mut self) {
        self.swipe_min_px = finite_or(self.swipe_min_px, 20.0).max(1.0);
        self.swipe_ratio = finite_or(self.swipe_ratio, 0.6).clamp(0.05, 1.0);
        self.tap_max_ms = self.tap_max_ms.clamp(50, 2_000);
        self.tap_jitter_px = finite_or(self.tap_jitter_px, 10.0).max(0.0);
        self.left_edge = finite_or(self.left_edge, 0.15).clamp(0.0, 0.5);
        self.right_edge = finite_or(self.right_edge, 0.85).clamp(0.5, 1.0);
    }
}

impl CountingSettings {
    pub fn normalize(&mut self) {
        self.interval_ms = self.interval_ms.clamp(100, 10_000);
        self.lead_floor_ms = self.lead_floor_ms.min(10_000);
        self.lead_per_char_ms = self.lead_per_char_ms.min(1_000);
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

fn normalize_names(values: &mut Vec<String>) {
    *values = values
        .iter()
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
        .collect();
    let mut seen = std::collections::HashSet::new();
    values.retain(|v| seen.insert(v.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content_page(title: &str, subtitle: Option<&str>) -> Page {
        Page {
            kind: PageKind::Content,
            title: title.to_string(),
            subtitle: subtitle.map(String::from),
            background: default_background(),
            letter_color: None,
            speech: None,
            audio_url: None,
            emoji: None,
            image_url: None,
        }
    }

    #[test]
    fn narration_falls_back_to_title_and_subtitle() {
        let page = content_page("Bb", Some("Ball"));
        assert_eq!(page.narration_text(), "Bb. Ball");

        let page = content_page("Circle", None);
        assert_eq!(page.narration_text(), "Circle.");

        let mut page = content_page("Circle", Some("Round"));
        page.speech = Some("A circle is round".to_string());
        assert_eq!(page.narration_text(), "A circle is round");
    }

    #[test]
    fn intro_phrase_stops_at_first_delimiter() {
        let mut page = content_page("3", Some("Three"));
        page.speech = Some("Three little ducks... 1, 2, 3".to_string());
        assert_eq!(page.intro_phrase(), "Three little ducks");

        page.speech = Some("No delimiter here".to_string());
        assert_eq!(page.intro_phrase(), "No delimiter here");
    }

    #[test]
    fn numbers_count_is_parsed_and_clamped() {
        let kind = BookKind::Numbers;
        assert_eq!(kind.object_count(&content_page("3", None)), 3);
        assert_eq!(kind.object_count(&content_page("42", None)), 10);
        assert_eq!(kind.object_count(&content_page("zero", None)), 1);
        assert_eq!(kind.object_count(&content_page("0", None)), 1);
        assert!(kind.counts_on_tap(&content_page("2", None)));
        assert!(!kind.counts_on_tap(&content_page("1", None)));
        assert!(!BookKind::Picture.counts_on_tap(&content_page("5", None)));
    }

    #[test]
    fn single_letters_are_spoken_upper_case() {
        assert_eq!(BookKind::Alphabet.item_narration("q"), "Q. ");
        assert_eq!(BookKind::Numbers.item_narration("7"), "7");
        assert_eq!(BookKind::Alphabet.item_narration("Aa"), "Aa");
    }

    #[test]
    fn emoji_lists_cycle_per_object() {
        let emoji = Emoji::Many(vec!["🍎".to_string(), "🍌".to_string()]);
        assert_eq!(emoji.glyph_at(0), Some("🍎"));
        assert_eq!(emoji.glyph_at(3), Some("🍌"));
        assert_eq!(Emoji::Many(Vec::new()).glyph_at(0), None);
        assert_eq!(Emoji::One("⭐".to_string()).glyph_at(9), Some("⭐"));
    }

    #[test]
    fn book_kind_parses_strings() {
        assert_eq!("Numbers".parse::<BookKind>().unwrap(), BookKind::Numbers);
        assert_eq!(" abc ".parse::<BookKind>().unwrap(), BookKind::Alphabet);
        assert!("nope".parse::<BookKind>().is_err());
    }

    #[test]
    fn parses_hex_colors() {
        assert_eq!(Rgb::parse_hex("#E53935"), Some(Rgb(0xE5, 0x39, 0x35)));
        assert_eq!(Rgb::parse_hex("#fff"), Some(Rgb(255, 255, 255)));
        assert_eq!(Rgb::parse_hex("E53935"), None);
        assert_eq!(Rgb::parse_hex("#12"), None);
        assert_eq!(Rgb::parse_hex("#aébcd"), None);
        assert_eq!(Rgb::parse_hex("#éa"), None);
        assert_eq!(Rgb::parse_hex("#+1+2+3"), None);
    }

    #[test]
    fn settings_normalize_clamps_values() {
        let mut settings = Settings::default();
        settings.narration.volume = 3.0;
        settings.narration.rate = f32::NAN;
        settings.narration.preferred_voices =
            vec![" Karen ".to_string(), "karen".to_string(), " ".to_string()];
        settings.narration.speech_program = Some("  ".to_string());
        settings.gestures.left_edge = 0.9;
        settings.counting.interval_ms = 0;
        settings.normalize();

        assert_eq!(settings.narration.volume, 1.0);
        assert_eq!(settings.narration.rate, 0.7);
        assert_eq!(settings.narration.preferred_voices, vec!["karen".to_string()]);
        assert_eq!(settings.narration.speech_program, None);
        assert_eq!(settings.gestures.left_edge, 0.5);
        assert_eq!(settings.counting.interval_ms, 100);
    }

    #[test]
    fn nudge_volume_stays_in_range() {
        let mut narration = NarrationSettings::default();
        narration.nudge_volume(0.5);
        assert_eq!(narration.volume, 1.0);
        narration.nudge_volume(-2.0);
        assert_eq!(narration.volume, 0.0);
    }

    #[test]
    fn settings_deserialize_with_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"narration":{"volume":0.5}}"#).unwrap();
        assert_eq!(settings.narration.volume, 0.5);
        assert_eq!(settings.narration.rate, 0.7);
        assert_eq!(settings.gestures, GestureSettings::default());
    }
}
