use lingua::{Language, LanguageDetector};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// ISO 639-1 language codes of the content we synthesize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LanguageCode {
    #[serde(rename = "en", alias = "english")]
    English,
    #[serde(rename = "es", alias = "spanish")]
    Spanish,
    #[serde(rename = "fr", alias = "french")]
    French,
    #[serde(rename = "de", alias = "german")]
    German,
    #[serde(rename = "it", alias = "italian")]
    Italian,
    #[serde(rename = "pt", alias = "portuguese")]
    Portuguese,
}

impl LanguageCode {
    /// Get the ISO 639-1 code as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageCode::English => "en",
            LanguageCode::Spanish => "es",
            LanguageCode::French => "fr",
            LanguageCode::German => "de",
            LanguageCode::Italian => "it",
            LanguageCode::Portuguese => "pt",
        }
    }

    /// Convert lingua Language to LanguageCode
    pub fn from_lingua(language: Language) -> Self {
        match language {
            Language::English => LanguageCode::English,
            Language::Spanish => LanguageCode::Spanish,
            Language::French => LanguageCode::French,
            Language::German => LanguageCode::German,
            Language::Italian => LanguageCode::Italian,
            Language::Portuguese => LanguageCode::Portuguese,
        }
    }
}

impl std::fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LanguageCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(LanguageCode::English),
            "es" | "spanish" => Ok(LanguageCode::Spanish),
            "fr" | "french" => Ok(LanguageCode::French),
            "de" | "german" => Ok(LanguageCode::German),
            "it" | "italian" => Ok(LanguageCode::Italian),
            "pt" | "portuguese" => Ok(LanguageCode::Portuguese),
            other => Err(format!("unsupported language: {}", other)),
        }
    }
}

/// Detect the language of the given text.
/// Falls back to Spanish, the platform's most common content language.
pub fn detect_language(detector: &LanguageDetector, text: &str) -> LanguageCode {
    match detector.detect_language_of(text) {
        Some(language) => LanguageCode::from_lingua(language),
        None => {
            tracing::warn!(
                text_length = text.len(),
                "Could not detect language, falling back to Spanish"
            );
            LanguageCode::Spanish
        }
    }
}

/// Prebuilt provider voice used when a request names no narrator
pub fn default_voice_for_language(language: LanguageCode) -> &'static str {
    match language {
        LanguageCode::English => "Kore",
        LanguageCode::Spanish => "Aoede",
        LanguageCode::French => "Leda",
        LanguageCode::German => "Charon",
        LanguageCode::Italian => "Callirrhoe",
        LanguageCode::Portuguese => "Puck",
    }
}

/// Check whether a voice belongs to the provider's prebuilt catalog
pub fn is_known_voice(voice: &str) -> bool {
    const PREBUILT_VOICES: &[&str] = &[
        "Zephyr", "Puck", "Charon", "Kore", "Fenrir", "Leda", "Orus", "Aoede", "Callirrhoe",
        "Autonoe", "Enceladus", "Iapetus", "Umbriel", "Algieba", "Despina", "Erinome",
        "Algenib", "Rasalgethi", "Laomedeia", "Achernar", "Alnilam", "Schedar", "Gacrux",
        "Pulcherrima", "Achird", "Zubenelgenubi", "Vindemiatrix", "Sadachbia", "Sadaltager",
        "Sulafat",
    ];

    PREBUILT_VOICES.contains(&voice)
}
