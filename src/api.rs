//! HTTP client for the recommendation backend.
//!
//! All endpoints are authorized with the session bearer token. Status
//! mapping: 404 becomes `NotFound` (drives defaults fallback), 400/422
//! become `Validation`, everything else non-2xx becomes `Server`;
//! transport failures become `Network`.

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::info;
use url::Url;

use crate::config::ClientConfig;
use crate::error::SwellMateError;
use crate::preferences::types::SpotPreference;
use crate::preferences::PreferenceStore;
use crate::presets::types::{NewPreset, Preset};
use crate::presets::PresetStore;
use crate::recommendations::types::{RecommendationRequest, RecommendationSet, Spot};
use crate::recommendations::RecommendationSource;

/// Authenticated client for the backend API. Cheap to clone behind an
/// `Arc`; the underlying reqwest client pools connections.
#[derive(Debug)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
    token: String,
}

impl ApiClient {
    /// Build a client against the given base URL with a per-request
    /// timeout.
    pub fn new(base_url: &str, token: String, timeout: Duration) -> Result<Self, SwellMateError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            SwellMateError::Validation(format!("Invalid API base URL '{}': {}", base_url, e))
        })?;

        let client = reqwest::Client::builder()
            .user_agent("SwellMate/1.0")
            .timeout(timeout)
            .build()
            .expect("Failed to build reqwest client");

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    pub fn from_config(config: &ClientConfig, token: String) -> Result<Self, SwellMateError> {
        Self::new(
            &config.api_base_url,
            token,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Join a path onto the base URL without clobbering its own path
    /// segments (plain `Url::join` would).
    fn endpoint(&self, path: &str) -> Result<Url, SwellMateError> {
        let raw = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&raw)
            .map_err(|e| SwellMateError::Network(format!("Invalid endpoint URL '{}': {}", raw, e)))
    }

    /// List all spots (reference data).
    pub async fn list_spots(&self) -> Result<Vec<Spot>, SwellMateError> {
        let url = self.endpoint("spots")?;
        let response = self.client.get(url).bearer_auth(&self.token).send().await?;
        read_json(response).await
    }
}

/// Map a non-success response to the matching error kind, draining the
/// body for the message.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SwellMateError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    let message = if message.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    } else {
        message
    };

    match status {
        StatusCode::NOT_FOUND => Err(SwellMateError::NotFound(message)),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            Err(SwellMateError::Validation(message))
        }
        _ => Err(SwellMateError::Server {
            status: status.as_u16(),
            message,
        }),
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, SwellMateError> {
    let response = check_status(response).await?;
    Ok(response.json::<T>().await?)
}

async fn read_unit(response: reqwest::Response) -> Result<(), SwellMateError> {
    check_status(response).await?;
    Ok(())
}

impl RecommendationSource for ApiClient {
    async fn fetch_recommendations(
        &self,
        request: RecommendationRequest,
    ) -> Result<RecommendationSet, SwellMateError> {
        info!(
            "Fetching recommendations for {} spot(s), {} day(s)",
            request.spot_ids.len(),
            request.day_offset.len()
        );
        let url = self.endpoint("recommendations")?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?;
        read_json(response).await
    }
}

impl PreferenceStore for ApiClient {
    async fn get_spot_preference(
        &self,
        user_id: i64,
        spot_id: i64,
    ) -> Result<SpotPreference, SwellMateError> {
        let url = self.endpoint(&format!("users/{}/spots/{}/preference", user_id, spot_id))?;
        let response = self.client.get(url).bearer_auth(&self.token).send().await?;
        read_json(response).await
    }

    async fn get_level_default(
        &self,
        user_id: i64,
        spot_id: i64,
    ) -> Result<SpotPreference, SwellMateError> {
        let url = self.endpoint(&format!(
            "users/{}/spots/{}/preference/level-default",
            user_id, spot_id
        ))?;
        let response = self.client.get(url).bearer_auth(&self.token).send().await?;
        read_json(response).await
    }

    async fn save_spot_preference(
        &self,
        user_id: i64,
        spot_id: i64,
        payload: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), SwellMateError> {
        info!("Saving preference for user {} spot {}", user_id, spot_id);
        let url = self.endpoint(&format!("users/{}/spots/{}/preference", user_id, spot_id))?;
        let response = self
            .client
            .put(url)
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await?;
        read_unit(response).await
    }

    async fn deactivate_spot_preference(
        &self,
        user_id: i64,
        spot_id: i64,
    ) -> Result<(), SwellMateError> {
        info!("Deactivating preference for user {} spot {}", user_id, spot_id);
        let url = self.endpoint(&format!("users/{}/spots/{}/preference", user_id, spot_id))?;
        let response = self
            .client
            .patch(url)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "is_active": false }))
            .send()
            .await?;
        read_unit(response).await
    }
}

impl PresetStore for ApiClient {
    async fn list_presets(&self, user_id: i64) -> Result<Vec<Preset>, SwellMateError> {
        let url = self.endpoint(&format!("users/{}/presets", user_id))?;
        let response = self.client.get(url).bearer_auth(&self.token).send().await?;
        read_json(response).await
    }

    async fn create_preset(
        &self,
        user_id: i64,
        preset: &NewPreset,
    ) -> Result<Preset, SwellMateError> {
        info!("Creating preset '{}' for user {}", preset.name, user_id);
        let url = self.endpoint(&format!("users/{}/presets", user_id))?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(preset)
            .send()
            .await?;
        read_json(response).await
    }

    async fn update_preset(&self, user_id: i64, preset: &Preset) -> Result<Preset, SwellMateError> {
        let url = self.endpoint(&format!("users/{}/presets/{}", user_id, preset.id))?;
        let response = self
            .client
            .put(url)
            .bearer_auth(&self.token)
            .json(preset)
            .send()
            .await?;
        read_json(response).await
    }

    async fn delete_preset(&self, user_id: i64, preset_id: i64) -> Result<(), SwellMateError> {
        info!("Deleting preset {} for user {}", preset_id, user_id);
        let url = self.endpoint(&format!("users/{}/presets/{}", user_id, preset_id))?;
        let response = self
            .client
            .delete(url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        read_unit(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_client(base: &str) -> ApiClient {
        ApiClient::new(base, "token".to_string(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_endpoint_preserves_base_path() {
        let client = make_client("https://api.example.com/v1");
        assert_eq!(
            client.endpoint("spots").unwrap().as_str(),
            "https://api.example.com/v1/spots"
        );
        // Trailing/leading slashes collapse
        let client = make_client("https://api.example.com/v1/");
        assert_eq!(
            client.endpoint("/users/3/presets").unwrap().as_str(),
            "https://api.example.com/v1/users/3/presets"
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = ApiClient::new("not a url", "t".to_string(), Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, SwellMateError::Validation(_)));
    }
}
