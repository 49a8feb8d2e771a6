//! Cache invalidation and background refresh after preference edits.
//!
//! A preference save on spot S makes every cached recommendation set
//! whose preset references S inconsistent. The coordinator drops those
//! entries synchronously, then refetches each preset in its own detached
//! task so one slow or failing endpoint call never blocks the save, the
//! UI thread, or another preset's refresh. Outcomes are published on a
//! broadcast channel any view can subscribe to.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Local, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::SwellMateError;
use crate::presets::types::Preset;
use crate::recommendations::cache::RecommendationCache;
use crate::recommendations::{build_request, RecommendationSource};

/// Cache lifecycle notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    /// The entry was dropped; views may show a loading indicator.
    Invalidated { preset_id: i64 },
    /// A fresh payload was written.
    Updated { preset_id: i64 },
    /// The background refetch failed; the entry stays absent and no
    /// retry is scheduled.
    Failed { preset_id: i64, error: String },
}

impl CacheEvent {
    pub fn preset_id(&self) -> i64 {
        match self {
            CacheEvent::Invalidated { preset_id }
            | CacheEvent::Updated { preset_id }
            | CacheEvent::Failed { preset_id, .. } => *preset_id,
        }
    }
}

/// Fans out invalidation and refetch work per affected preset.
///
/// Each cache operation opens its own connection against the shared
/// database, so concurrent task completions serialize there and the
/// last completed write wins. Refetches for the same preset are not
/// deduplicated: two quick saves produce two overlapping waves, as a
/// later wave's write simply replaces the earlier one's.
pub struct RefreshCoordinator<S> {
    source: Arc<S>,
    cache_path: PathBuf,
    ttl_hours: i64,
    user_id: i64,
    events: broadcast::Sender<CacheEvent>,
}

impl<S: RecommendationSource> RefreshCoordinator<S> {
    pub fn new(source: Arc<S>, cache_path: PathBuf, ttl_hours: i64, user_id: i64) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            source,
            cache_path,
            ttl_hours,
            user_id,
            events,
        }
    }

    /// Subscribe to cache events. Slow subscribers that fall behind the
    /// channel capacity miss events rather than blocking the pipeline.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    /// React to a preference save on `spot_id`: invalidate and refetch
    /// every preset in `presets` referencing the spot. No-op when none
    /// do. Returns the spawned task handles; the tasks are detached, so
    /// callers may drop the handles (tests await them).
    pub async fn on_preference_saved(
        &self,
        spot_id: i64,
        presets: &[Preset],
    ) -> Result<Vec<JoinHandle<()>>, SwellMateError> {
        let affected: Vec<Preset> = presets
            .iter()
            .filter(|p| p.references_spot(spot_id))
            .cloned()
            .collect();

        if affected.is_empty() {
            info!("No presets reference spot {}, nothing to refresh", spot_id);
            return Ok(Vec::new());
        }
        info!(
            "Preference change on spot {} affects {} preset(s)",
            spot_id,
            affected.len()
        );

        // Drop the stale entries before any refetch starts; this is a
        // cheap local write and completes before we return.
        let cache_path = self.cache_path.clone();
        let ttl_hours = self.ttl_hours;
        let ids: Vec<i64> = affected.iter().map(|p| p.id).collect();
        tokio::task::spawn_blocking(move || {
            let cache = RecommendationCache::new(&cache_path, ttl_hours)?;
            for id in ids {
                cache.invalidate(id)?;
            }
            Ok::<_, SwellMateError>(())
        })
        .await
        .map_err(|e| SwellMateError::Storage(format!("Cache task panicked: {}", e)))??;

        for preset in &affected {
            let _ = self.events.send(CacheEvent::Invalidated {
                preset_id: preset.id,
            });
        }

        Ok(affected
            .into_iter()
            .map(|preset| self.spawn_refetch(preset))
            .collect())
    }

    /// One detached refetch task for one preset. Failures are logged and
    /// published, never propagated: the triggering save already
    /// succeeded, and other presets' tasks keep running.
    fn spawn_refetch(&self, preset: Preset) -> JoinHandle<()> {
        let source = self.source.clone();
        let cache_path = self.cache_path.clone();
        let ttl_hours = self.ttl_hours;
        let user_id = self.user_id;
        let events = self.events.clone();

        tokio::spawn(async move {
            let preset_id = preset.id;
            let today = Local::now().date_naive();

            let request = match build_request(user_id, &preset, today) {
                Ok(request) => request,
                Err(e) => {
                    warn!("Cannot build refresh request for preset {}: {}", preset_id, e);
                    let _ = events.send(CacheEvent::Failed {
                        preset_id,
                        error: e.to_string(),
                    });
                    return;
                }
            };

            match source.fetch_recommendations(request).await {
                Ok(data) => {
                    let fetched_at = Utc::now();
                    let write = tokio::task::spawn_blocking(move || {
                        let cache = RecommendationCache::new(&cache_path, ttl_hours)?;
                        cache.put(preset_id, &data, fetched_at)
                    })
                    .await;

                    match write {
                        Ok(Ok(())) => {
                            info!("Refreshed recommendations for preset {}", preset_id);
                            let _ = events.send(CacheEvent::Updated { preset_id });
                        }
                        Ok(Err(e)) => {
                            warn!("Failed to cache refresh for preset {}: {}", preset_id, e);
                            let _ = events.send(CacheEvent::Failed {
                                preset_id,
                                error: e.to_string(),
                            });
                        }
                        Err(e) => {
                            warn!("Cache task panicked for preset {}: {}", preset_id, e);
                            let _ = events.send(CacheEvent::Failed {
                                preset_id,
                                error: e.to_string(),
                            });
                        }
                    }
                }
                Err(e) => {
                    warn!("Background refresh failed for preset {}: {}", preset_id, e);
                    let _ = events.send(CacheEvent::Failed {
                        preset_id,
                        error: e.to_string(),
                    });
                }
            }
        })
    }
}
