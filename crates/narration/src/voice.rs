use picturebook_core::NarrationSettings;

use crate::backend::Voice;

/// Ordered name heuristics for picking a child-friendly voice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoicePreferences {
    pub preferred_names: Vec<String>,
    pub name_hints: Vec<String>,
    pub locale_prefix: String,
}

impl Default for VoicePreferences {
    fn default() -> Self {
        Self::from_settings(&NarrationSettings::default())
    }
}

impl VoicePreferences {
    pub fn from_settings(settings: &NarrationSettings) -> Self {
        Self {
            preferred_names: lowercase_all(&settings.preferred_voices),
            name_hints: lowercase_all(&settings.voice_hints),
            locale_prefix: settings.locale_prefix.trim().to_ascii_lowercase(),
        }
    }

    /// Picks a voice, or `None` to leave the platform default in place.
    pub fn select(&self, voices: &[Voice]) -> Option<Voice> {
        let in_locale = |v: &&Voice| self.matches_locale(v);
        voices
            .iter()
            .filter(in_locale)
            .find(|v| name_matches(v, &self.preferred_names))
            .or_else(|| {
                voices
                    .iter()
                    .filter(in_locale)
                    .find(|v| name_matches(v, &self.name_hints))
            })
            .or_else(|| voices.iter().find(in_locale))
            .cloned()
    }

    fn matches_locale(&self, voice: &Voice) -> bool {
        voice
            .language
            .trim()
            .to_ascii_lowercase()
            .replace('_', "-")
            .starts_with(&self.locale_prefix)
    }
}

fn name_matches(voice: &Voice, needles: &[String]) -> bool {
    let name = voice.name.to_ascii_lowercase();
    needles.iter().any(|needle| name.contains(needle.as_str()))
}

fn lowercase_all(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(name: &str, language: &str) -> Voice {
        Voice {
            id: name.to_ascii_lowercase(),
            name: name.to_string(),
            language: language.to_string(),
        }
    }

    #[test]
    fn prefers_named_voices_first() {
        let voices = vec![
            voice("Daniel", "en-GB"),
            voice("Female Voice 2", "en-US"),
            voice("Karen", "en-AU"),
        ];
        let picked = VoicePreferences::default().select(&voices).unwrap();
        assert_eq!(picked.name, "Karen");
    }

    #[test]
    fn named_voice_must_match_locale() {
        let voices = vec![voice("Samantha", "fr-FR"), voice("Girl", "en_US")];
        let picked = VoicePreferences::default().select(&voices).unwrap();
        assert_eq!(picked.name, "Girl");
    }

    #[test]
    fn falls_back_to_any_locale_voice() {
        let voices = vec![voice("Thomas", "fr-FR"), voice("Daniel", "en-GB")];
        let picked = VoicePreferences::default().select(&voices).unwrap();
        assert_eq!(picked.name, "Daniel");
    }

    #[test]
    fn no_locale_match_keeps_platform_default() {
        let voices = vec![voice("Thomas", "fr-FR")];
        assert_eq!(VoicePreferences::default().select(&voices), None);
        assert_eq!(VoicePreferences::default().select(&[]), None);
    }

    #[test]
    fn preferences_are_tunable() {
        let settings = NarrationSettings {
            preferred_voices: vec!["Daniel".to_string()],
            ..NarrationSettings::default()
        };
        let voices = vec![voice("Karen", "en-AU"), voice("Daniel", "en-GB")];
        let picked = VoicePreferences::from_settings(&settings)
            .select(&voices)
            .unwrap();
        assert_eq!(picked.name, "Daniel");
    }
}
