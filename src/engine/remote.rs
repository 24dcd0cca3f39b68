use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::{ScriptEngine, ScriptOptions, SpeechEngine, SpeechOptions, TextExtractor};
use crate::audio::{processing, AudioSample};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const USER_AGENT: &str = "Newscast/0.1";

/// All three collaborator services backed by one generative-language API:
/// script generation and text extraction via text responses, speech
/// synthesis via inline base64 PCM responses.
pub struct RemoteEngine {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl RemoteEngine {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: API_BASE.to_string(),
        }
    }

    async fn generate(&self, model: &str, request: &GenerateRequest) -> Result<GenerateResponse> {
        let url = format!("{}/{}:generateContent", self.base_url, model);
        let resp = self
            .client
            .post(&url)
            .header("User-Agent", USER_AGENT)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?
            .error_for_status()?;

        let response: GenerateResponse = resp.json().await?;
        Ok(response)
    }
}

#[async_trait]
impl ScriptEngine for RemoteEngine {
    async fn write_script(&self, text: &str, options: &ScriptOptions) -> Result<String> {
        let prompt = format!(
            "You are a radio news anchor. Rewrite the following news text as a \
             natural spoken briefing of roughly {} seconds. Return only the \
             script text, with no headings or markup.\n\n{}",
            options.target_seconds, text
        );
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part::text(prompt)],
            }],
            generation_config: None,
        };

        let response = self.generate(&options.model, &request).await?;
        let script = first_text(&response)?;
        tracing::info!("Script generated: {} characters", script.len());
        Ok(script)
    }
}

#[async_trait]
impl SpeechEngine for RemoteEngine {
    async fn synthesize(&self, script: &str, options: &SpeechOptions) -> Result<AudioSample> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part::text(script.to_string())],
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: options.voice.clone(),
                        },
                    },
                }),
            }),
        };

        let response = self.generate(&options.model, &request).await?;
        let audio = first_inline_audio(&response)?;
        let bytes = BASE64
            .decode(&audio.data)
            .context("Failed to decode base64 audio payload")?;

        let sample = decode_audio_payload(&bytes, &audio.mime_type)?;
        tracing::info!(
            "Speech synthesized: {:.1}s at {}Hz",
            sample.duration_secs(),
            sample.sample_rate()
        );
        Ok(sample)
    }
}

#[async_trait]
impl TextExtractor for RemoteEngine {
    async fn extract(&self, bytes: &[u8], mime_type: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::inline(mime_type.to_string(), BASE64.encode(bytes)),
                    Part::text(
                        "Extract the raw text content of the attached document. \
                         Return only the text."
                            .to_string(),
                    ),
                ],
            }],
            generation_config: None,
        };

        let response = self.generate("gemini-2.5-flash", &request).await?;
        first_text(&response)
    }
}

/// Decode an inline audio payload. The API returns raw signed 16-bit PCM
/// with the rate encoded in the mime type (`audio/L16;codec=pcm;rate=24000`),
/// or a WAV container. Synthesized output often comes back quiet, so the
/// decoded buffer is peak-normalized before it becomes a sample.
fn decode_audio_payload(bytes: &[u8], mime_type: &str) -> Result<AudioSample> {
    let decoded = if mime_type.starts_with("audio/wav") || mime_type.starts_with("audio/x-wav") {
        AudioSample::from_wav_bytes(bytes)?
    } else {
        AudioSample::from_pcm16_le(bytes, pcm_rate_from_mime(mime_type), 1)?
    };

    let mut samples = decoded.samples().to_vec();
    processing::normalize(&mut samples);
    AudioSample::new(samples, decoded.sample_rate(), decoded.channels())
}

/// Pull `rate=N` out of a mime type, falling back to the API default.
fn pcm_rate_from_mime(mime_type: &str) -> u32 {
    mime_type
        .split(';')
        .filter_map(|p| p.trim().strip_prefix("rate="))
        .find_map(|v| v.parse().ok())
        .unwrap_or(24000)
}

fn first_text(response: &GenerateResponse) -> Result<String> {
    response
        .candidates
        .iter()
        .filter_map(|c| c.content.as_ref())
        .flat_map(|c| c.parts.iter())
        .find_map(|p| p.text.clone())
        .ok_or_else(|| anyhow::anyhow!("Response contained no text part"))
}

fn first_inline_audio(response: &GenerateResponse) -> Result<&InlineData> {
    response
        .candidates
        .iter()
        .filter_map(|c| c.content.as_ref())
        .flat_map(|c| c.parts.iter())
        .find_map(|p| p.inline_data.as_ref())
        .ok_or_else(|| anyhow::anyhow!("Response contained no audio part"))
}

// ===== Wire types =====

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            ..Default::default()
        }
    }

    fn inline(mime_type: String, data: String) -> Self {
        Self {
            inline_data: Some(InlineData { mime_type, data }),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_response() {
        let json = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "Good evening."}]}}
            ]
        }"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(first_text(&response).unwrap(), "Good evening.");
    }

    #[test]
    fn test_parse_audio_response() {
        let json = r#"{
            "candidates": [
                {"content": {"parts": [
                    {"inlineData": {"mimeType": "audio/L16;codec=pcm;rate=24000", "data": "AAAA"}}
                ]}}
            ]
        }"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        let audio = first_inline_audio(&response).unwrap();
        assert_eq!(audio.mime_type, "audio/L16;codec=pcm;rate=24000");
        assert_eq!(audio.data, "AAAA");
    }

    #[test]
    fn test_empty_response_is_an_error() {
        let response: GenerateResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(first_text(&response).is_err());
        assert!(first_inline_audio(&response).is_err());
    }

    #[test]
    fn test_pcm_rate_from_mime() {
        assert_eq!(pcm_rate_from_mime("audio/L16;codec=pcm;rate=24000"), 24000);
        assert_eq!(pcm_rate_from_mime("audio/L16; rate=16000"), 16000);
        assert_eq!(pcm_rate_from_mime("audio/L16"), 24000);
    }

    #[test]
    fn test_request_wire_shape_is_camel_case() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part::text("hi".to_string())],
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: "Kore".to_string(),
                        },
                    },
                }),
            }),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("generationConfig").is_some());
        let config = &value["generationConfig"];
        assert_eq!(config["responseModalities"][0], "AUDIO");
        assert_eq!(
            config["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
            "Kore"
        );
        // No null fields leak into the body
        assert!(value["contents"][0]["parts"][0].get("inlineData").is_none());
    }

    #[test]
    fn test_decode_pcm_payload() {
        let bytes = [0u8, 0, 0, 64]; // two samples: 0, 0.5
        let sample = decode_audio_payload(&bytes, "audio/L16;codec=pcm;rate=24000").unwrap();
        assert_eq!(sample.sample_rate(), 24000);
        assert_eq!(sample.frames(), 2);
    }

    #[test]
    fn test_decode_normalizes_quiet_payload() {
        // peak at half scale, brought up to full scale during decode
        let bytes = [0u8, 32, 0, 64]; // 0.25, 0.5
        let sample = decode_audio_payload(&bytes, "audio/L16;codec=pcm;rate=24000").unwrap();
        assert!((sample.samples()[0] - 0.5).abs() < 1e-3);
        assert!((sample.samples()[1] - 1.0).abs() < 1e-3);
    }
}
