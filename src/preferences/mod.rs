pub mod types;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::error::SwellMateError;
use self::types::{sanitize_update, SpotPreference};

/// Seam to the preference storage endpoint. `get_*` signal absence with
/// `SwellMateError::NotFound`, which drives the defaults fallback.
pub trait PreferenceStore: Send + Sync + 'static {
    fn get_spot_preference(
        &self,
        user_id: i64,
        spot_id: i64,
    ) -> impl Future<Output = Result<SpotPreference, SwellMateError>> + Send;

    /// Read-only fallback band keyed by the user's declared skill level.
    fn get_level_default(
        &self,
        user_id: i64,
        spot_id: i64,
    ) -> impl Future<Output = Result<SpotPreference, SwellMateError>> + Send;

    fn save_spot_preference(
        &self,
        user_id: i64,
        spot_id: i64,
        payload: &serde_json::Map<String, serde_json::Value>,
    ) -> impl Future<Output = Result<(), SwellMateError>> + Send;

    /// Narrow update flipping only the active flag off.
    fn deactivate_spot_preference(
        &self,
        user_id: i64,
        spot_id: i64,
    ) -> impl Future<Output = Result<(), SwellMateError>> + Send;
}

/// Where a resolved preference came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceSource {
    /// The user's own saved record.
    Saved,
    /// Server-provided level default; nothing saved yet.
    LevelDefault,
    /// Neither saved nor default available. Recoverable: the user fills
    /// the form from scratch.
    Empty,
}

impl PreferenceSource {
    /// True when the record shown is the level default, i.e. a full save
    /// (not a narrow deactivate) is required on the first edit.
    pub fn using_defaults(&self) -> bool {
        matches!(self, PreferenceSource::LevelDefault)
    }

    /// The recoverable "no defaults available" condition.
    pub fn no_defaults_available(&self) -> bool {
        matches!(self, PreferenceSource::Empty)
    }
}

/// A preference record plus the provenance callers need for save
/// semantics and form labeling.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPreference {
    pub preference: SpotPreference,
    pub source: PreferenceSource,
}

/// Preference operations for one user, with a session-scoped memo of
/// resolved records so repeated form opens don't refetch.
pub struct PreferenceService<S> {
    store: Arc<S>,
    user_id: i64,
    resolved: Mutex<HashMap<i64, ResolvedPreference>>,
}

impl<S: PreferenceStore> PreferenceService<S> {
    pub fn new(store: Arc<S>, user_id: i64) -> Self {
        Self {
            store,
            user_id,
            resolved: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the preference for a spot: saved record, else level
    /// default with the active flag forced on, else an empty active
    /// record with the `Empty` source as the "no defaults" signal.
    pub async fn resolve(&self, spot_id: i64) -> Result<ResolvedPreference, SwellMateError> {
        if let Some(hit) = self.resolved.lock().unwrap().get(&spot_id) {
            return Ok(hit.clone());
        }

        let resolved = match self.store.get_spot_preference(self.user_id, spot_id).await {
            Ok(preference) => ResolvedPreference {
                preference,
                source: PreferenceSource::Saved,
            },
            Err(e) if e.is_not_found() => {
                info!(
                    "No saved preference for spot {}, falling back to level defaults",
                    spot_id
                );
                match self.store.get_level_default(self.user_id, spot_id).await {
                    Ok(mut preference) => {
                        // Defaults are usable as-is for scoring
                        preference.is_active = true;
                        ResolvedPreference {
                            preference,
                            source: PreferenceSource::LevelDefault,
                        }
                    }
                    Err(e) if e.is_not_found() => {
                        warn!("No level defaults for spot {}, starting empty", spot_id);
                        ResolvedPreference {
                            preference: SpotPreference::default(),
                            source: PreferenceSource::Empty,
                        }
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(e) => return Err(e),
        };

        self.resolved
            .lock()
            .unwrap()
            .insert(spot_id, resolved.clone());
        Ok(resolved)
    }

    /// Persist an edit. Turning a saved record off sends only the
    /// deactivation (the backend keeps the previously saved bands for
    /// later editing); everything else is a full save, filtered through
    /// the recognized-field allow-list.
    pub async fn save(
        &self,
        spot_id: i64,
        prefs: &SpotPreference,
        using_defaults: bool,
    ) -> Result<(), SwellMateError> {
        if !prefs.is_active && !using_defaults {
            info!("Deactivating preference for spot {}", spot_id);
            self.store
                .deactivate_spot_preference(self.user_id, spot_id)
                .await?;

            // Keep the memoized bands as last-known values for editing;
            // only the flag flips.
            if let Some(entry) = self.resolved.lock().unwrap().get_mut(&spot_id) {
                entry.preference.is_active = false;
                entry.source = PreferenceSource::Saved;
            }
            return Ok(());
        }

        let value = serde_json::to_value(prefs)
            .map_err(|e| SwellMateError::Storage(format!("Failed to encode preference: {}", e)))?;
        let payload = sanitize_update(&value);

        info!("Saving preference for spot {}", spot_id);
        self.store
            .save_spot_preference(self.user_id, spot_id, &payload)
            .await?;

        self.resolved.lock().unwrap().insert(
            spot_id,
            ResolvedPreference {
                preference: prefs.clone(),
                source: PreferenceSource::Saved,
            },
        );
        Ok(())
    }

    /// Drop the session memo (e.g. after an external change is known).
    pub fn forget(&self, spot_id: i64) {
        self.resolved.lock().unwrap().remove(&spot_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct StubStore {
        saved: Mutex<HashMap<i64, SpotPreference>>,
        defaults: Mutex<HashMap<i64, SpotPreference>>,
        deactivate_calls: AtomicUsize,
        save_payloads: Mutex<Vec<serde_json::Map<String, serde_json::Value>>>,
        get_calls: AtomicUsize,
    }

    impl PreferenceStore for StubStore {
        async fn get_spot_preference(
            &self,
            _user_id: i64,
            spot_id: i64,
        ) -> Result<SpotPreference, SwellMateError> {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            self.saved
                .lock()
                .unwrap()
                .get(&spot_id)
                .cloned()
                .ok_or_else(|| SwellMateError::NotFound(format!("preference for spot {}", spot_id)))
        }

        async fn get_level_default(
            &self,
            _user_id: i64,
            spot_id: i64,
        ) -> Result<SpotPreference, SwellMateError> {
            self.defaults
                .lock()
                .unwrap()
                .get(&spot_id)
                .cloned()
                .ok_or_else(|| SwellMateError::NotFound(format!("defaults for spot {}", spot_id)))
        }

        async fn save_spot_preference(
            &self,
            _user_id: i64,
            spot_id: i64,
            payload: &serde_json::Map<String, serde_json::Value>,
        ) -> Result<(), SwellMateError> {
            self.save_payloads.lock().unwrap().push(payload.clone());
            let prefs: SpotPreference =
                serde_json::from_value(serde_json::Value::Object(payload.clone()))
                    .map_err(|e| SwellMateError::Storage(e.to_string()))?;
            self.saved.lock().unwrap().insert(spot_id, prefs);
            Ok(())
        }

        async fn deactivate_spot_preference(
            &self,
            _user_id: i64,
            spot_id: i64,
        ) -> Result<(), SwellMateError> {
            self.deactivate_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(prefs) = self.saved.lock().unwrap().get_mut(&spot_id) {
                prefs.is_active = false;
            }
            Ok(())
        }
    }

    fn band_pref(ideal: f64) -> SpotPreference {
        SpotPreference {
            wave_height_ideal: Some(ideal),
            wave_height_min: Some(ideal - 0.5),
            wave_height_max: Some(ideal + 0.5),
            ..SpotPreference::default()
        }
    }

    #[tokio::test]
    async fn test_resolve_saved_record() {
        let store = Arc::new(StubStore::default());
        store.saved.lock().unwrap().insert(4, band_pref(1.2));

        let service = PreferenceService::new(store, 1);
        let resolved = service.resolve(4).await.unwrap();
        assert_eq!(resolved.source, PreferenceSource::Saved);
        assert!(!resolved.source.using_defaults());
        assert_eq!(resolved.preference.wave_height_ideal, Some(1.2));
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_level_default() {
        let store = Arc::new(StubStore::default());
        let mut default = band_pref(2.0);
        default.is_active = false; // defaults come back inactive
        store.defaults.lock().unwrap().insert(4, default);

        let service = PreferenceService::new(store, 1);
        let resolved = service.resolve(4).await.unwrap();
        assert_eq!(resolved.source, PreferenceSource::LevelDefault);
        assert!(resolved.source.using_defaults());
        // Active flag is forced on for the defaults view
        assert!(resolved.preference.is_active);
        assert_eq!(resolved.preference.wave_height_ideal, Some(2.0));
    }

    #[tokio::test]
    async fn test_resolve_without_defaults_is_recoverable() {
        let store = Arc::new(StubStore::default());
        let service = PreferenceService::new(store, 1);

        let resolved = service.resolve(9).await.unwrap();
        assert_eq!(resolved.source, PreferenceSource::Empty);
        assert!(!resolved.source.using_defaults());
        assert!(resolved.source.no_defaults_available());
        assert!(resolved.preference.is_active);
        assert_eq!(resolved.preference, SpotPreference::default());
    }

    #[tokio::test]
    async fn test_resolve_memoizes_per_session() {
        let store = Arc::new(StubStore::default());
        store.saved.lock().unwrap().insert(4, band_pref(1.0));

        let service = PreferenceService::new(store.clone(), 1);
        service.resolve(4).await.unwrap();
        service.resolve(4).await.unwrap();
        assert_eq!(store.get_calls.load(Ordering::SeqCst), 1);

        service.forget(4);
        service.resolve(4).await.unwrap();
        assert_eq!(store.get_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_deactivating_saved_record_is_narrow() {
        let store = Arc::new(StubStore::default());
        store.saved.lock().unwrap().insert(4, band_pref(1.0));

        let service = PreferenceService::new(store.clone(), 1);
        let mut edited = band_pref(999.0); // edits must NOT be persisted
        edited.is_active = false;

        service.save(4, &edited, false).await.unwrap();
        assert_eq!(store.deactivate_calls.load(Ordering::SeqCst), 1);
        assert!(store.save_payloads.lock().unwrap().is_empty());

        // Server-side bands survive the toggle
        let saved = store.saved.lock().unwrap().get(&4).cloned().unwrap();
        assert!(!saved.is_active);
        assert_eq!(saved.wave_height_ideal, Some(1.0));
    }

    #[tokio::test]
    async fn test_inactive_save_from_defaults_is_full_save() {
        // Coming from defaults there is no saved record to preserve, so
        // the full field set is written even when inactive.
        let store = Arc::new(StubStore::default());
        let service = PreferenceService::new(store.clone(), 1);

        let mut prefs = band_pref(1.5);
        prefs.is_active = false;
        service.save(4, &prefs, true).await.unwrap();

        assert_eq!(store.deactivate_calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.save_payloads.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_save_payload_respects_allow_list() {
        let store = Arc::new(StubStore::default());
        let service = PreferenceService::new(store.clone(), 1);

        service.save(4, &band_pref(1.5), false).await.unwrap();

        let payloads = store.save_payloads.lock().unwrap();
        for key in payloads[0].keys() {
            assert!(types::PREFERENCE_FIELDS.contains(&key.as_str()));
        }
    }

    #[tokio::test]
    async fn test_save_updates_memo() {
        let store = Arc::new(StubStore::default());
        let service = PreferenceService::new(store.clone(), 1);

        service.save(4, &band_pref(1.5), false).await.unwrap();
        // Memo now answers without a store round-trip
        let resolved = service.resolve(4).await.unwrap();
        assert_eq!(resolved.source, PreferenceSource::Saved);
        assert_eq!(store.get_calls.load(Ordering::SeqCst), 0);
    }
}
