//! HTTP transcription client.
//!
//! [`ApiTranscriber`] uploads a WAV file as a multipart form to an
//! ElevenLabs-style `/v1/speech-to-text` endpoint and extracts the `text`
//! field from the JSON response.
//!
//! The client is blocking on purpose: it is only ever called from the
//! dedicated transcription thread, which has nothing else to do while the
//! request is in flight. Cancellation cannot interrupt an in-flight request
//! (see the session module) — the configured timeout is the upper bound on
//! how long that request can hold the thread.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::config::TranscriptionConfig;

use super::{SttError, Transcriber};

// ---------------------------------------------------------------------------
// ApiTranscriber
// ---------------------------------------------------------------------------

/// Production transcription client backed by `reqwest::blocking`.
pub struct ApiTranscriber {
    http: reqwest::blocking::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    language: Option<String>,
}

/// JSON body returned by the service.
#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl ApiTranscriber {
    /// Build a client from the transcription section of the app config.
    ///
    /// # Errors
    ///
    /// Returns [`SttError::Http`] when the underlying HTTP client cannot be
    /// constructed (TLS backend initialisation).
    pub fn from_config(config: &TranscriptionConfig) -> Result<Self, SttError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SttError::Http(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: format!(
                "{}/v1/speech-to-text",
                config.base_url.trim_end_matches('/')
            ),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            language: config.language.clone(),
        })
    }

    #[cfg(test)]
    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Transcriber for ApiTranscriber {
    fn transcribe(&self, audio_path: &Path) -> Result<String, SttError> {
        let mut form = reqwest::blocking::multipart::Form::new()
            .text("model_id", self.model.clone())
            .file("file", audio_path)
            .map_err(|e| SttError::File(e.to_string()))?;
        if let Some(language) = &self.language {
            form = form.text("language_code", language.clone());
        }

        let mut request = self.http.post(self.endpoint.as_str()).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.header("xi-api-key", key.as_str());
        }

        let response = request.send().map_err(|e| SttError::Http(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SttError::Api {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        let parsed: TranscriptionResponse = response
            .json()
            .map_err(|e| SttError::InvalidResponse(e.to_string()))?;
        Ok(parsed.text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_base(base_url: &str) -> TranscriptionConfig {
        TranscriptionConfig {
            base_url: base_url.into(),
            ..TranscriptionConfig::default()
        }
    }

    #[test]
    fn endpoint_is_built_from_base_url() {
        let client = ApiTranscriber::from_config(&config_with_base("https://stt.example.com"))
            .unwrap();
        assert_eq!(client.endpoint(), "https://stt.example.com/v1/speech-to-text");
    }

    #[test]
    fn trailing_slash_in_base_url_is_tolerated() {
        let client = ApiTranscriber::from_config(&config_with_base("https://stt.example.com/"))
            .unwrap();
        assert_eq!(client.endpoint(), "https://stt.example.com/v1/speech-to-text");
    }

    #[test]
    fn missing_audio_file_is_a_file_error() {
        let client =
            ApiTranscriber::from_config(&TranscriptionConfig::default()).unwrap();
        let result = client.transcribe(Path::new("/definitely/not/here.wav"));
        assert!(matches!(result, Err(SttError::File(_))));
    }

    #[test]
    fn response_json_shape_parses() {
        let parsed: TranscriptionResponse =
            serde_json::from_str(r#"{"text": "hello world", "language_code": "en"}"#).unwrap();
        assert_eq!(parsed.text, "hello world");
    }
}
