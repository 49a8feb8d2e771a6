pub mod types;

use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::SwellMateError;
use crate::timeframe;
use self::types::{DaySelectionType, NewPreset, Preset};

/// Seam to the preset storage endpoint. Implemented by `ApiClient` and
/// by in-memory stubs in tests.
pub trait PresetStore: Send + Sync + 'static {
    fn list_presets(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Vec<Preset>, SwellMateError>> + Send;

    fn create_preset(
        &self,
        user_id: i64,
        preset: &NewPreset,
    ) -> impl Future<Output = Result<Preset, SwellMateError>> + Send;

    fn update_preset(
        &self,
        user_id: i64,
        preset: &Preset,
    ) -> impl Future<Output = Result<Preset, SwellMateError>> + Send;

    fn delete_preset(
        &self,
        user_id: i64,
        preset_id: i64,
    ) -> impl Future<Output = Result<(), SwellMateError>> + Send;
}

/// Preset operations for one user: CRUD plus the client-side invariants
/// the backend does not enforce (single default, protected first preset).
pub struct PresetService<S> {
    store: Arc<S>,
    user_id: i64,
}

impl<S: PresetStore> PresetService<S> {
    pub fn new(store: Arc<S>, user_id: i64) -> Self {
        Self { store, user_id }
    }

    pub async fn list(&self) -> Result<Vec<Preset>, SwellMateError> {
        self.store.list_presets(self.user_id).await
    }

    /// Validate and create. When the new preset is marked default, other
    /// defaults are cleared afterwards (see `enforce_single_default`).
    pub async fn create(&self, preset: NewPreset) -> Result<Preset, SwellMateError> {
        validate_preset(
            &preset.name,
            &preset.spot_ids,
            preset.day_selection_type,
            &preset.day_values,
            &preset.start_time,
            &preset.end_time,
        )?;

        let created = self.store.create_preset(self.user_id, &preset).await?;
        info!("Created preset {} ('{}')", created.id, created.name);

        if created.is_default {
            self.enforce_single_default(created.id).await?;
        }
        Ok(created)
    }

    pub async fn update(&self, preset: Preset) -> Result<Preset, SwellMateError> {
        validate_preset(
            &preset.name,
            &preset.spot_ids,
            preset.day_selection_type,
            &preset.day_values,
            &preset.start_time,
            &preset.end_time,
        )?;

        let updated = self.store.update_preset(self.user_id, &preset).await?;
        if updated.is_default {
            self.enforce_single_default(updated.id).await?;
        }
        Ok(updated)
    }

    /// Delete a preset. The earliest-created preset (lowest id) is
    /// protected by convention so a user always keeps at least their
    /// original one.
    pub async fn delete(&self, preset_id: i64) -> Result<(), SwellMateError> {
        let presets = self.store.list_presets(self.user_id).await?;
        let earliest = presets.iter().map(|p| p.id).min();
        if earliest == Some(preset_id) {
            return Err(SwellMateError::Validation(
                "The original preset cannot be deleted".to_string(),
            ));
        }

        self.store.delete_preset(self.user_id, preset_id).await?;
        info!("Deleted preset {}", preset_id);
        Ok(())
    }

    /// Mark a preset as the default and clear the flag everywhere else.
    pub async fn set_default(&self, preset_id: i64) -> Result<Preset, SwellMateError> {
        let presets = self.store.list_presets(self.user_id).await?;
        let mut preset = presets
            .into_iter()
            .find(|p| p.id == preset_id)
            .ok_or_else(|| SwellMateError::NotFound(format!("Preset {} not found", preset_id)))?;

        preset.is_default = true;
        let updated = self.store.update_preset(self.user_id, &preset).await?;
        self.enforce_single_default(preset_id).await?;
        Ok(updated)
    }

    /// Clear `is_default` on every preset except `keep_id`, then re-list
    /// to verify. The backend is not assumed to enforce this atomically,
    /// so a concurrent editor can still race us; the verification pass
    /// logs when that happened.
    async fn enforce_single_default(&self, keep_id: i64) -> Result<(), SwellMateError> {
        let presets = self.store.list_presets(self.user_id).await?;
        for other in presets.iter().filter(|p| p.id != keep_id && p.is_default) {
            let mut cleared = other.clone();
            cleared.is_default = false;
            if let Err(e) = self.store.update_preset(self.user_id, &cleared).await {
                warn!("Failed to clear default flag on preset {}: {}", other.id, e);
            }
        }

        let verified = self.store.list_presets(self.user_id).await?;
        let defaults = verified.iter().filter(|p| p.is_default).count();
        if defaults > 1 {
            warn!("{} presets still marked default after enforcement", defaults);
        }
        Ok(())
    }
}

/// Reject a preset before any request is made. Surfaced to the user;
/// the operation is not attempted.
fn validate_preset(
    name: &str,
    spot_ids: &[i64],
    selection_type: DaySelectionType,
    day_values: &[u8],
    start_time: &str,
    end_time: &str,
) -> Result<(), SwellMateError> {
    if name.trim().is_empty() {
        return Err(SwellMateError::Validation("Preset name cannot be empty".to_string()));
    }
    if spot_ids.is_empty() {
        return Err(SwellMateError::Validation("Select at least one spot".to_string()));
    }
    if day_values.is_empty() {
        return Err(SwellMateError::Validation("Select at least one day".to_string()));
    }
    if selection_type == DaySelectionType::Weekdays && day_values.iter().any(|v| *v > 6) {
        return Err(SwellMateError::Validation(
            "Weekday indices must be between 0 (Sunday) and 6 (Saturday)".to_string(),
        ));
    }
    timeframe::parse_time_of_day(start_time)?;
    timeframe::parse_time_of_day(end_time)?;
    Ok(())
}
