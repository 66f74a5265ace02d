use super::model::{NarratorConfig, SynthesisConfig};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static INLINE_WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\S\n]+").expect("valid regex"));

/// Content address of a synthesis outcome: `text_hash ⧺ config_hash`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub text_hash: String,
    pub config_hash: String,
}

impl CacheKey {
    pub fn compute(text: &str, config: &SynthesisConfig) -> Self {
        Self::compute_for_model(None, text, config)
    }

    /// Key that additionally pins the provider model, so switching models re-synthesizes
    pub fn compute_for_model(model: Option<&str>, text: &str, config: &SynthesisConfig) -> Self {
        let text = normalize_text(text, config.narrator.is_dual());
        Self {
            text_hash: sha256_hex(text.as_bytes()),
            config_hash: sha256_hex(canonical_config(model, config).as_bytes()),
        }
    }

    /// Short form for object paths and log lines
    pub fn short(&self) -> String {
        format!("{}-{}", &self.text_hash[..16], &self.config_hash[..16])
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.text_hash, self.config_hash)
    }
}

/// Collapse whitespace so cosmetic differences do not cause re-synthesis.
/// Dialogue scripts keep their line breaks: one line is one speaker turn.
pub fn normalize_text(text: &str, keep_lines: bool) -> String {
    if keep_lines {
        text.lines()
            .map(|line| INLINE_WHITESPACE.replace_all(line.trim(), " ").into_owned())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        WHITESPACE.replace_all(text, " ").trim().to_string()
    }
}

#[derive(Serialize)]
struct CanonicalConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    mode: &'static str,
    narrators: Vec<(&'a str, &'a str)>,
    pace: &'static str,
    tone: Option<String>,
    language: &'static str,
}

/// Stable serialisation of every field that influences the produced audio.
/// Dual narrators are sorted so swapped speaker lists address the same entry.
fn canonical_config(model: Option<&str>, config: &SynthesisConfig) -> String {
    let (mode, mut narrators) = match &config.narrator {
        NarratorConfig::Single { voice } => ("single", vec![("", voice.as_str())]),
        NarratorConfig::Dual(pair) => (
            "dual",
            pair.iter()
                .map(|n| (n.name.as_str(), n.voice.as_str()))
                .collect(),
        ),
    };
    narrators.sort();

    let canonical = CanonicalConfig {
        model,
        mode,
        narrators,
        pace: config.style.pace.as_str(),
        tone: config.style.effective_tone(),
        language: config.language.as_str(),
    };

    // Serialising a struct of strings cannot fail
    serde_json::to_string(&canonical).unwrap_or_default()
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
