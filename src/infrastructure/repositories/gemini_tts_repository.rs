use super::tts_repository::TtsRepository;
use crate::domain::audio::cache_key::normalize_text;
use crate::domain::audio::error::SynthesisError;
use crate::domain::audio::model::{Narrator, Pace, StyleHints, SynthesisResult};
use crate::infrastructure::rate_limiter::RateLimiter;
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Longest prompt sent in one request; longer single-voice text is split
const MAX_BATCH_SIZE: usize = 4000;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

static SENTENCE_END: Lazy<regex::Regex> =
    Lazy::new(|| regex::Regex::new(r"([.!?]+\s+)").expect("valid regex"));

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<TextPart>,
}

#[derive(Serialize)]
struct TextPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
    speech_config: SpeechConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    voice_config: Option<VoiceConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    multi_speaker_voice_config: Option<MultiSpeakerVoiceConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MultiSpeakerVoiceConfig {
    speaker_voice_configs: Vec<SpeakerVoiceConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeakerVoiceConfig {
    speaker: String,
    voice_config: VoiceConfig,
}

fn voice_config(voice: &str) -> VoiceConfig {
    VoiceConfig {
        prebuilt_voice_config: PrebuiltVoiceConfig {
            voice_name: voice.to_string(),
        },
    }
}

/// Gemini generative TTS implementation of TTS repository
pub struct GeminiTtsRepository {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    rate_limiter: Arc<RateLimiter>,
    quota_exhausted: AtomicBool,
}

impl GeminiTtsRepository {
    pub fn new(
        base_url: String,
        api_key: String,
        model: String,
        rate_limiter: Arc<RateLimiter>,
    ) -> Result<Self, SynthesisError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SynthesisError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            rate_limiter,
            quota_exhausted: AtomicBool::new(false),
        })
    }

    /// Set once the provider reports the daily quota as spent
    pub fn is_quota_exhausted(&self) -> bool {
        self.quota_exhausted.load(Ordering::SeqCst)
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Split text into batches that respect sentence boundaries
    /// Each batch is at most MAX_BATCH_SIZE bytes
    fn split_into_batches(text: &str) -> Vec<String> {
        if text.len() <= MAX_BATCH_SIZE {
            return vec![text.to_string()];
        }

        let mut batches = Vec::new();
        let mut current_batch = String::new();
        let mut last_end = 0;

        for mat in SENTENCE_END.find_iter(text) {
            let sentence = &text[last_end..mat.end()];
            last_end = mat.end();

            if !current_batch.is_empty() && current_batch.len() + sentence.len() > MAX_BATCH_SIZE {
                batches.push(current_batch.trim().to_string());
                current_batch = String::new();
            }

            if sentence.len() > MAX_BATCH_SIZE {
                batches.extend(split_on_char_boundaries(sentence, MAX_BATCH_SIZE));
                continue;
            }

            current_batch.push_str(sentence);
        }

        // Handle remaining text after last sentence boundary
        if last_end < text.len() {
            let remaining = &text[last_end..];

            if !current_batch.is_empty() && current_batch.len() + remaining.len() > MAX_BATCH_SIZE {
                batches.push(current_batch.trim().to_string());
                current_batch = String::new();
            }

            if remaining.len() > MAX_BATCH_SIZE {
                batches.extend(split_on_char_boundaries(remaining, MAX_BATCH_SIZE));
            } else {
                current_batch.push_str(remaining);
            }
        }

        if !current_batch.is_empty() {
            batches.push(current_batch.trim().to_string());
        }

        batches.retain(|b| !b.is_empty());
        batches
    }

    /// One provider round trip, behind the rate limiter
    async fn call_gemini(
        &self,
        prompt: String,
        speech_config: SpeechConfig,
    ) -> Result<SynthesisResult, SynthesisError> {
        if self.is_quota_exhausted() {
            return Err(SynthesisError::QuotaExceededDaily(
                "daily quota already exhausted in this process".to_string(),
            ));
        }

        self.rate_limiter.acquire().await;

        let prompt_length = prompt.len();
        tracing::info!(
            model = %self.model,
            prompt_length = prompt_length,
            multi_speaker = speech_config.multi_speaker_voice_config.is_some(),
            prompt_preview = %preview(&prompt),
            "Calling Gemini TTS API"
        );

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![TextPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO"],
                speech_config,
            },
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    model = %self.model,
                    prompt_length = prompt_length,
                    "Gemini TTS request failed"
                );
                SynthesisError::Transport(e.to_string())
            })?;

        let status = response.status();
        let retry_after_header = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| parse_retry_after(v, Utc::now()));

        let body = response
            .text()
            .await
            .map_err(|e| SynthesisError::Transport(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            let err = classify_failure(status, &body, retry_after_header);
            if err.is_fatal_for_process() {
                self.quota_exhausted.store(true, Ordering::SeqCst);
            }
            tracing::error!(
                status = status.as_u16(),
                error = %err,
                model = %self.model,
                "Gemini TTS API returned an error"
            );
            return Err(err);
        }

        let json: Value = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body_length = body.len(),
                "Gemini TTS response is not valid JSON"
            );
            SynthesisError::MalformedResponse(format!("response is not JSON: {}", e))
        })?;

        let result = extract_samples(&json)?;
        tracing::debug!(
            sample_bytes = result.samples.len(),
            finish_reason = ?result.finish_reason,
            "Gemini TTS audio received successfully"
        );

        Ok(result)
    }
}

#[async_trait]
impl TtsRepository for GeminiTtsRepository {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn synthesize_single(
        &self,
        text: &str,
        voice: &str,
        style: &StyleHints,
    ) -> Result<SynthesisResult, SynthesisError> {
        let start_time = std::time::Instant::now();
        let text = normalize_text(text, false);
        let batches = Self::split_into_batches(&text);

        tracing::info!(
            voice = voice,
            pace = style.pace.as_str(),
            batch_count = batches.len(),
            text_length = text.len(),
            "Starting single-narrator synthesis"
        );

        let mut samples = Vec::new();
        let mut finish_reason = None;
        for (index, batch) in batches.iter().enumerate() {
            let prompt = build_prompt(batch, style, None);
            let result = self
                .call_gemini(
                    prompt,
                    SpeechConfig {
                        voice_config: Some(voice_config(voice)),
                        multi_speaker_voice_config: None,
                    },
                )
                .await?;

            samples.extend(result.samples);
            finish_reason = result.finish_reason;

            tracing::info!(
                batch_index = index,
                total_sample_bytes = samples.len(),
                "Batch synthesized and merged"
            );
        }

        let duration = start_time.elapsed();
        tracing::info!(
            provider = "gemini",
            model = %self.model,
            voice = voice,
            latency_ms = duration.as_millis() as u64,
            characters_count = text.len(),
            batch_count = batches.len(),
            sample_bytes = samples.len(),
            "TTS synthesis completed"
        );

        Ok(SynthesisResult {
            samples,
            finish_reason,
        })
    }

    async fn synthesize_dual(
        &self,
        text: &str,
        narrators: &[Narrator; 2],
        style: &StyleHints,
    ) -> Result<SynthesisResult, SynthesisError> {
        let start_time = std::time::Instant::now();
        let text = normalize_text(text, true);

        tracing::info!(
            speakers = %format!("{}={}, {}={}", narrators[0].name, narrators[0].voice, narrators[1].name, narrators[1].voice),
            pace = style.pace.as_str(),
            text_length = text.len(),
            "Starting multi-narrator synthesis"
        );

        let speech_config = SpeechConfig {
            voice_config: None,
            multi_speaker_voice_config: Some(MultiSpeakerVoiceConfig {
                speaker_voice_configs: narrators
                    .iter()
                    .map(|n| SpeakerVoiceConfig {
                        speaker: n.name.clone(),
                        voice_config: voice_config(&n.voice),
                    })
                    .collect(),
            }),
        };

        let result = self
            .call_gemini(build_prompt(&text, style, Some(narrators)), speech_config)
            .await?;

        tracing::info!(
            provider = "gemini",
            model = %self.model,
            latency_ms = start_time.elapsed().as_millis() as u64,
            characters_count = text.len(),
            sample_bytes = result.samples.len(),
            "TTS synthesis completed"
        );

        Ok(result)
    }
}

/// Prefix the text with natural-language delivery directions
fn build_prompt(text: &str, style: &StyleHints, narrators: Option<&[Narrator; 2]>) -> String {
    let mut directions = Vec::new();

    if let Some([first, second]) = narrators {
        directions.push(format!(
            "Read the following conversation between {} and {}",
            first.name, second.name
        ));
    }

    match style.pace {
        Pace::Normal => {}
        Pace::Slow | Pace::VerySlow => directions.push(format!(
            "speak slowly and clearly, at {}% of normal speaking rate",
            (style.pace.rate_multiplier() * 100.0).round() as u32
        )),
    }

    if let Some(tone) = style.effective_tone() {
        directions.push(format!("use a {} tone", tone));
    }

    if directions.is_empty() {
        return text.to_string();
    }

    let mut header = directions.join("; ");
    if narrators.is_none() {
        header = format!("Say the following; {}", header);
    }
    format!("{}:\n{}", header, text)
}

/// Map a non-success provider response onto the failure taxonomy
fn classify_failure(status: StatusCode, body: &str, retry_after: Option<Duration>) -> SynthesisError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| v.pointer("/error/message"))
        .and_then(Value::as_str)
        .unwrap_or(body)
        .to_string();
    let lowered = body.to_lowercase();

    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            if ["perday", "per_day", "per day", "daily"]
                .iter()
                .any(|marker| lowered.contains(marker))
            {
                SynthesisError::QuotaExceededDaily(message)
            } else {
                SynthesisError::RateLimited {
                    message,
                    retry_after: retry_after.or_else(|| parsed.as_ref().and_then(retry_delay)),
                }
            }
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            SynthesisError::AuthenticationFailed(message)
        }
        StatusCode::BAD_REQUEST if lowered.contains("api_key_invalid") => {
            SynthesisError::AuthenticationFailed(message)
        }
        _ => SynthesisError::Provider {
            status: status.as_u16(),
            message,
        },
    }
}

/// `Retry-After` in either delta-seconds or HTTP-date form.
/// A date already in the past means no wait.
fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

/// `RetryInfo.retryDelay` (e.g. `"17s"`) from the error details
fn retry_delay(error: &Value) -> Option<Duration> {
    error
        .pointer("/error/details")?
        .as_array()?
        .iter()
        .filter_map(|d| d.get("retryDelay").and_then(Value::as_str))
        .filter_map(|d| d.trim_end_matches('s').parse::<f64>().ok())
        .find_map(|secs| Duration::try_from_secs_f64(secs).ok())
}

/// Pull the base64 PCM payload out of a generateContent response.
/// Any missing link in the chain is a malformed response, and the shape that
/// was actually received is logged.
fn extract_samples(json: &Value) -> Result<SynthesisResult, SynthesisError> {
    let candidate = json
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|c| c.first());
    let finish_reason = candidate
        .and_then(|c| c.get("finishReason"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let parts = candidate
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array);
    let inline_data = parts.and_then(|parts| parts.iter().find_map(|p| p.get("inlineData")));
    let data = inline_data
        .and_then(|d| d.get("data"))
        .and_then(Value::as_str)
        .filter(|d| !d.is_empty());

    let Some(data) = data else {
        tracing::error!(
            has_candidates = json.get("candidates").is_some(),
            has_candidate = candidate.is_some(),
            has_content = candidate.and_then(|c| c.get("content")).is_some(),
            part_count = parts.map(|p| p.len()).unwrap_or(0),
            has_inline_data = inline_data.is_some(),
            has_data = inline_data.and_then(|d| d.get("data")).is_some(),
            finish_reason = ?finish_reason,
            prompt_feedback = ?json.get("promptFeedback"),
            "Gemini TTS response is missing its audio payload"
        );
        let reason = match (&candidate, &finish_reason) {
            (None, _) => "no completion candidate".to_string(),
            (Some(_), Some(reason)) if reason != "STOP" => {
                format!("no audio payload (finish reason {})", reason)
            }
            _ => "no audio payload".to_string(),
        };
        return Err(SynthesisError::MalformedResponse(reason));
    };

    if let Some(mime) = inline_data
        .and_then(|d| d.get("mimeType"))
        .and_then(Value::as_str)
    {
        if !mime.starts_with("audio/L16") && !mime.starts_with("audio/pcm") {
            tracing::warn!(mime_type = mime, "Unexpected audio MIME type from Gemini TTS");
        }
    }

    let samples = base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| SynthesisError::MalformedResponse(format!("invalid base64 payload: {}", e)))?;

    if samples.is_empty() {
        return Err(SynthesisError::MalformedResponse(
            "empty audio payload".to_string(),
        ));
    }

    Ok(SynthesisResult {
        samples,
        finish_reason,
    })
}

fn split_on_char_boundaries(text: &str, max_bytes: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        if current.len() + ch.len_utf8() > max_bytes {
            chunks.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn preview(text: &str) -> String {
    text.chars().take(200).collect()
}
