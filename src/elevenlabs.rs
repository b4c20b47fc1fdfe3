use crate::error::AppError;
use crate::types::AppState;

use axum::http::StatusCode;
use reqwest::Url;
use tracing::{debug, error, info};

pub const API_KEY_HEADER: &str = "xi-api-key";

impl AppState {
    fn elevenlabs_key(&self) -> Result<&str, AppError> {
        self.config.elevenlabs_api_key.as_deref().ok_or_else(|| {
            error!("ElevenLabs API key not configured");
            AppError::Config("ElevenLabs API key not configured")
        })
    }

    /// Build `{base}/v1/convai/<segments..>` with each segment percent-encoded.
    fn elevenlabs_url(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.config.elevenlabs_base_url).map_err(|e| {
            error!(error=%e, "invalid ElevenLabs base url");
            AppError::Config("ElevenLabs base url is invalid")
        })?;
        url.path_segments_mut()
            .map_err(|_| AppError::Config("ElevenLabs base url is invalid"))?
            .pop_if_empty()
            .extend(["v1", "convai"])
            .extend(segments);
        Ok(url)
    }

    /// Current state of a batch calling job, as the raw JSON ElevenLabs returned.
    pub async fn get_batch_status(&self, batch_id: &str) -> Result<serde_json::Value, AppError> {
        let key = self.elevenlabs_key()?;
        let url = self.elevenlabs_url(&["batch-calling", batch_id])?;
        info!(batch_id, "fetching batch status");
        let resp = self
            .http_client
            .get(url)
            .header(API_KEY_HEADER, key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| {
                error!(error=%e, "failed to send batch status request to ElevenLabs");
                AppError::Upstream {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "Failed to reach ElevenLabs".into(),
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            error!(status=%status, body=%text, "ElevenLabs API error");
            return Err(AppError::Upstream {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: format!("ElevenLabs API error: {}", status.as_u16()),
            });
        }

        let body = resp.json::<serde_json::Value>().await.map_err(|e| {
            error!(error=%e, "failed to decode batch status from ElevenLabs");
            AppError::Upstream {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "Invalid response from ElevenLabs".into(),
            }
        })?;
        debug!("fetched batch status");
        Ok(body)
    }

    /// Start downloading a call recording. The body is left unread so it can be streamed.
    pub async fn get_conversation_audio(
        &self,
        conversation_id: &str,
    ) -> Result<reqwest::Response, AppError> {
        let key = self.elevenlabs_key()?;
        let url = self.elevenlabs_url(&["conversations", conversation_id, "audio"])?;
        info!(conversation_id, "fetching conversation audio");
        let resp = self
            .http_client
            .get(url)
            .header(API_KEY_HEADER, key)
            .send()
            .await
            .map_err(|e| {
                error!(error=%e, "failed to send audio request to ElevenLabs");
                AppError::Upstream {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "Failed to reach ElevenLabs".into(),
                }
            })?;

        let status = resp.status();
        debug!(status=%status, "ElevenLabs audio response");
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Unknown").to_string();
            let text = resp.text().await.unwrap_or_default();
            error!(status=%status, body=%text, "ElevenLabs API error");
            return Err(AppError::Upstream {
                status,
                message: format!("Failed to fetch audio from ElevenLabs: {reason}"),
            });
        }
        if resp.content_length() == Some(0) {
            error!("ElevenLabs audio response has no body");
            return Err(AppError::Upstream {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "No audio stream available.".into(),
            });
        }
        Ok(resp)
    }
}
