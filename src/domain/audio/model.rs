use super::language::{default_voice_for_language, LanguageCode};
use serde::{Deserialize, Serialize};

/// Speaking pace requested for a piece of audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pace {
    #[default]
    Normal,
    Slow,
    #[serde(alias = "very slow", alias = "very-slow")]
    VerySlow,
}

impl Pace {
    /// Speech-rate multiplier applied by the provider prompt
    pub fn rate_multiplier(&self) -> f32 {
        match self {
            Pace::Normal => 1.0,
            Pace::Slow => 0.85,
            Pace::VerySlow => 0.7,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Pace::Normal => "normal",
            Pace::Slow => "slow",
            Pace::VerySlow => "very_slow",
        }
    }
}

/// A named speaker in a dialogue, bound to one provider voice
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Narrator {
    pub name: String,
    pub voice: String,
}

impl Narrator {
    pub fn new(name: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            voice: voice.into(),
        }
    }
}

/// Loosely-typed speaker entry as supplied by callers and manifests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(alias = "voiceName")]
    pub voice: String,
}

/// Who speaks. The provider caps multi-speaker synthesis at two voices,
/// so a dialogue is always exactly two narrators.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NarratorConfig {
    Single { voice: String },
    Dual([Narrator; 2]),
}

impl NarratorConfig {
    pub fn single(voice: impl Into<String>) -> Self {
        NarratorConfig::Single {
            voice: voice.into(),
        }
    }

    pub fn dual(first: Narrator, second: Narrator) -> Self {
        NarratorConfig::Dual([first, second])
    }

    /// Resolve a free speaker list into a narrator configuration.
    ///
    /// More than two speakers degrades to single-narrator synthesis with the
    /// first speaker's voice; an empty list uses the language's default voice.
    pub fn from_speakers(speakers: &[SpeakerInput], language: LanguageCode) -> Self {
        match speakers {
            [] => NarratorConfig::single(default_voice_for_language(language)),
            [only] => NarratorConfig::single(only.voice.clone()),
            [first, second] => NarratorConfig::dual(
                Narrator::new(speaker_name(first, 1), first.voice.clone()),
                Narrator::new(speaker_name(second, 2), second.voice.clone()),
            ),
            [first, ..] => {
                tracing::warn!(
                    speaker_count = speakers.len(),
                    fallback_voice = %first.voice,
                    "More than two speakers requested, degrading to single-narrator synthesis"
                );
                NarratorConfig::single(first.voice.clone())
            }
        }
    }

    pub fn voices(&self) -> Vec<&str> {
        match self {
            NarratorConfig::Single { voice } => vec![voice.as_str()],
            NarratorConfig::Dual(narrators) => {
                narrators.iter().map(|n| n.voice.as_str()).collect()
            }
        }
    }

    pub fn is_dual(&self) -> bool {
        matches!(self, NarratorConfig::Dual(_))
    }
}

fn speaker_name(speaker: &SpeakerInput, position: usize) -> String {
    speaker
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Speaker {}", position))
}

/// Optional delivery hints
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct StyleHints {
    pub tone: Option<String>,
    pub pace: Pace,
}

impl StyleHints {
    /// Tone normalised for prompting and hashing; `neutral` is the same as no tone
    pub fn effective_tone(&self) -> Option<String> {
        self.tone
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty() && t != "neutral")
    }
}

/// Fully-resolved synthesis configuration; together with the text it determines the cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SynthesisConfig {
    pub narrator: NarratorConfig,
    pub style: StyleHints,
    pub language: LanguageCode,
}

impl SynthesisConfig {
    pub fn single(voice: impl Into<String>, language: LanguageCode) -> Self {
        Self {
            narrator: NarratorConfig::single(voice),
            style: StyleHints::default(),
            language,
        }
    }

    pub fn with_narrator(mut self, narrator: NarratorConfig) -> Self {
        self.narrator = narrator;
        self
    }

    pub fn with_pace(mut self, pace: Pace) -> Self {
        self.style.pace = pace;
        self
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.style.tone = Some(tone.into());
        self
    }
}

/// Immutable value describing one piece of audio to produce
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SynthesisRequest {
    pub text: String,
    pub config: SynthesisConfig,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, config: SynthesisConfig) -> Self {
        Self {
            text: text.into(),
            config,
        }
    }
}

/// Raw provider output: 16-bit mono linear PCM at the provider's fixed sample rate
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    pub samples: Vec<u8>,
    pub finish_reason: Option<String>,
}

/// Caller-facing description of audio to produce, as stored in preload manifests
/// and sent by the surrounding application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioRequest {
    pub content_id: String,
    pub text: String,
    #[serde(default)]
    pub language: Option<LanguageCode>,
    #[serde(default, alias = "voiceName")]
    pub voice: Option<String>,
    #[serde(default)]
    pub speakers: Vec<SpeakerInput>,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default, alias = "speakingSpeed")]
    pub pace: Pace,
}

impl AudioRequest {
    /// Resolve into a synthesis request once the language is known.
    /// An explicit speaker list wins over a lone `voice`.
    pub fn to_synthesis_request(&self, language: LanguageCode) -> SynthesisRequest {
        let narrator = if !self.speakers.is_empty() {
            NarratorConfig::from_speakers(&self.speakers, language)
        } else {
            match &self.voice {
                Some(voice) if !voice.trim().is_empty() => NarratorConfig::single(voice.trim()),
                _ => NarratorConfig::single(default_voice_for_language(language)),
            }
        };

        SynthesisRequest::new(
            self.text.clone(),
            SynthesisConfig {
                narrator,
                style: StyleHints {
                    tone: self.tone.clone(),
                    pace: self.pace,
                },
                language,
            },
        )
    }
}
