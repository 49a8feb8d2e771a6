//! Session facade tying the services together.
//!
//! One `SessionClient` per signed-in user. Construction opens the local
//! cache and expires wholesale-stale state; `logout` clears the cache
//! and the stored token. Foreground operations surface their failures to
//! the caller; background refresh work only reports through the event
//! channel.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Local, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::auth;
use crate::config::ClientConfig;
use crate::error::SwellMateError;
use crate::preferences::types::SpotPreference;
use crate::preferences::{PreferenceService, ResolvedPreference};
use crate::presets::types::{NewPreset, Preset};
use crate::presets::PresetService;
use crate::recommendations::cache::RecommendationCache;
use crate::recommendations::types::{RecommendationSet, Spot};
use crate::recommendations::{build_request, RecommendationSource};
use crate::refresh::{CacheEvent, RefreshCoordinator};

pub struct SessionClient {
    config: ClientConfig,
    user_id: i64,
    api: Arc<ApiClient>,
    preferences: PreferenceService<ApiClient>,
    presets: PresetService<ApiClient>,
    refresh: RefreshCoordinator<ApiClient>,
    cache_path: PathBuf,
}

impl SessionClient {
    /// Open a session with a token obtained from the auth provider. The
    /// token is stashed in the keychain for later `resume`; a keychain
    /// failure only logs (the session itself works without it).
    pub fn init(config: ClientConfig, user_id: i64, token: String) -> Result<Self, SwellMateError> {
        let cache_path = config
            .cache_db_path()
            .map_err(|e| SwellMateError::Storage(e.to_string()))?;

        let cache = RecommendationCache::new(&cache_path, config.cache_ttl_hours)?;
        if cache.purge_if_stale(Utc::now())? {
            info!("Recommendation cache expired wholesale on session start");
        }

        if let Err(e) = auth::store_session_token(&user_id.to_string(), &token) {
            warn!("Could not stash session token in keychain: {}", e);
        }

        let api = Arc::new(ApiClient::from_config(&config, token)?);
        Ok(Self {
            preferences: PreferenceService::new(api.clone(), user_id),
            presets: PresetService::new(api.clone(), user_id),
            refresh: RefreshCoordinator::new(
                api.clone(),
                cache_path.clone(),
                config.cache_ttl_hours,
                user_id,
            ),
            api,
            config,
            user_id,
            cache_path,
        })
    }

    /// Reopen a session from the token stored at the last `init`.
    pub fn resume(config: ClientConfig, user_id: i64) -> Result<Self, SwellMateError> {
        match auth::load_session_token(&user_id.to_string())? {
            Some(token) => Self::init(config, user_id, token),
            None => Err(SwellMateError::NotFound(format!(
                "No stored session for user {}",
                user_id
            ))),
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Subscribe to cache invalidation/refresh events.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.refresh.subscribe()
    }

    /// Spot reference data.
    pub async fn spots(&self) -> Result<Vec<Spot>, SwellMateError> {
        self.api.list_spots().await
    }

    // --- Preferences ---

    pub async fn resolve_spot_preference(
        &self,
        spot_id: i64,
    ) -> Result<ResolvedPreference, SwellMateError> {
        self.preferences.resolve(spot_id).await
    }

    /// Save a preference, then fan out background refreshes for every
    /// preset referencing the spot. The save's own success is what the
    /// caller sees: refresh failures arrive as events only. A failure to
    /// even list the presets skips the refresh wave with a warning.
    pub async fn save_spot_preference(
        &self,
        spot_id: i64,
        prefs: &SpotPreference,
        using_defaults: bool,
    ) -> Result<Vec<JoinHandle<()>>, SwellMateError> {
        self.preferences.save(spot_id, prefs, using_defaults).await?;

        let presets = match self.presets.list().await {
            Ok(presets) => presets,
            Err(e) => {
                warn!(
                    "Preference saved but preset scan failed, skipping refresh: {}",
                    e
                );
                return Ok(Vec::new());
            }
        };
        self.refresh.on_preference_saved(spot_id, &presets).await
    }

    // --- Presets ---

    pub async fn list_presets(&self) -> Result<Vec<Preset>, SwellMateError> {
        self.presets.list().await
    }

    pub async fn create_preset(&self, preset: NewPreset) -> Result<Preset, SwellMateError> {
        self.presets.create(preset).await
    }

    /// Update a preset and drop its cached recommendations: the cached
    /// set was computed for the old spot set / window. The next read
    /// refetches.
    pub async fn update_preset(&self, preset: Preset) -> Result<Preset, SwellMateError> {
        let updated = self.presets.update(preset).await?;
        self.invalidate_entry(updated.id).await?;
        Ok(updated)
    }

    pub async fn delete_preset(&self, preset_id: i64) -> Result<(), SwellMateError> {
        self.presets.delete(preset_id).await?;
        self.invalidate_entry(preset_id).await
    }

    pub async fn set_default_preset(&self, preset_id: i64) -> Result<Preset, SwellMateError> {
        self.presets.set_default(preset_id).await
    }

    // --- Recommendations ---

    /// Recommendations for a preset: cached when fresh, otherwise a
    /// foreground fetch that repopulates the cache. A failed cache write
    /// after a successful fetch only logs; the data is still returned.
    pub async fn recommendations_for(
        &self,
        preset: &Preset,
    ) -> Result<RecommendationSet, SwellMateError> {
        let preset_id = preset.id;
        let ttl_hours = self.config.cache_ttl_hours;

        let cache_path = self.cache_path.clone();
        let cached = tokio::task::spawn_blocking(move || {
            let cache = RecommendationCache::new(&cache_path, ttl_hours)?;
            cache.get(preset_id)
        })
        .await
        .map_err(|e| SwellMateError::Storage(format!("Cache task panicked: {}", e)))??;

        if let Some(entry) = cached {
            if !entry.is_expired(Utc::now(), ttl_hours) {
                info!("Cache hit for preset {}", preset_id);
                return Ok(entry.data);
            }
            info!("Cache entry for preset {} expired, refetching", preset_id);
        }

        let request = build_request(self.user_id, preset, Local::now().date_naive())?;
        let data = self.api.fetch_recommendations(request).await?;

        let fetched_at = Utc::now();
        let cache_path = self.cache_path.clone();
        let to_store = data.clone();
        let write = tokio::task::spawn_blocking(move || {
            let cache = RecommendationCache::new(&cache_path, ttl_hours)?;
            cache.put(preset_id, &to_store, fetched_at)
        })
        .await;
        match write {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to cache recommendations for preset {}: {}", preset_id, e),
            Err(e) => warn!("Cache task panicked for preset {}: {}", preset_id, e),
        }

        Ok(data)
    }

    // --- Lifecycle ---

    /// Close the session: drop every cached recommendation set and the
    /// stored token.
    pub fn logout(self) -> Result<(), SwellMateError> {
        let cache = RecommendationCache::new(&self.cache_path, self.config.cache_ttl_hours)?;
        cache.invalidate_all()?;
        auth::clear_session_token(&self.user_id.to_string())?;
        info!("Session for user {} closed", self.user_id);
        Ok(())
    }

    async fn invalidate_entry(&self, preset_id: i64) -> Result<(), SwellMateError> {
        let cache_path = self.cache_path.clone();
        let ttl_hours = self.config.cache_ttl_hours;
        tokio::task::spawn_blocking(move || {
            let cache = RecommendationCache::new(&cache_path, ttl_hours)?;
            cache.invalidate(preset_id)?;
            Ok::<_, SwellMateError>(())
        })
        .await
        .map_err(|e| SwellMateError::Storage(format!("Cache task panicked: {}", e)))?
    }
}
