use serde::{Deserialize, Serialize};

/// Tide phase a user can mark as ideal for a spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TidePhase {
    Low,
    Rising,
    High,
    Falling,
}

/// Per (user, spot) preference record: the condition bands the scoring
/// backend matches forecast hours against.
///
/// Wave, swell and wind axes carry a full min/ideal/max band; sea level
/// and the temperature axes only carry an ideal value. Absent fields
/// mean "no opinion" and are left to the backend's level defaults.
///
/// When `is_active` is false the record is ignored for scoring but the
/// last-saved values are kept server-side for editing, which is why
/// deactivation is a narrow update rather than a full overwrite
/// (see `PreferenceService::save`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpotPreference {
    pub is_active: bool,

    pub wave_height_min: Option<f64>,
    pub wave_height_max: Option<f64>,
    pub wave_height_ideal: Option<f64>,

    pub wave_period_min: Option<f64>,
    pub wave_period_max: Option<f64>,
    pub wave_period_ideal: Option<f64>,

    pub swell_height_min: Option<f64>,
    pub swell_height_max: Option<f64>,
    pub swell_height_ideal: Option<f64>,

    pub swell_period_min: Option<f64>,
    pub swell_period_max: Option<f64>,
    pub swell_period_ideal: Option<f64>,

    pub wind_speed_min: Option<f64>,
    pub wind_speed_max: Option<f64>,
    pub wind_speed_ideal: Option<f64>,

    pub sea_level_ideal: Option<f64>,
    pub water_temperature_ideal: Option<f64>,
    pub air_temperature_ideal: Option<f64>,

    pub preferred_wind_direction: Option<String>,
    pub preferred_swell_direction: Option<String>,
    pub ideal_tide_phase: Option<TidePhase>,
}

impl Default for SpotPreference {
    /// An empty record a user can fill from scratch: active, every band
    /// unset. Returned when neither a saved preference nor a level
    /// default exists.
    fn default() -> Self {
        Self {
            is_active: true,
            wave_height_min: None,
            wave_height_max: None,
            wave_height_ideal: None,
            wave_period_min: None,
            wave_period_max: None,
            wave_period_ideal: None,
            swell_height_min: None,
            swell_height_max: None,
            swell_height_ideal: None,
            swell_period_min: None,
            swell_period_max: None,
            swell_period_ideal: None,
            wind_speed_min: None,
            wind_speed_max: None,
            wind_speed_ideal: None,
            sea_level_ideal: None,
            water_temperature_ideal: None,
            air_temperature_ideal: None,
            preferred_wind_direction: None,
            preferred_swell_direction: None,
            ideal_tide_phase: None,
        }
    }
}

/// The recognized preference keys. Save payloads are filtered through
/// this allow-list; anything else a form hands us is dropped, not
/// forwarded.
pub const PREFERENCE_FIELDS: &[&str] = &[
    "is_active",
    "wave_height_min",
    "wave_height_max",
    "wave_height_ideal",
    "wave_period_min",
    "wave_period_max",
    "wave_period_ideal",
    "swell_height_min",
    "swell_height_max",
    "swell_height_ideal",
    "swell_period_min",
    "swell_period_max",
    "swell_period_ideal",
    "wind_speed_min",
    "wind_speed_max",
    "wind_speed_ideal",
    "sea_level_ideal",
    "water_temperature_ideal",
    "air_temperature_ideal",
    "preferred_wind_direction",
    "preferred_swell_direction",
    "ideal_tide_phase",
];

/// Filter a save payload down to the recognized field set.
pub fn sanitize_update(payload: &serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    let mut out = serde_json::Map::new();
    if let Some(object) = payload.as_object() {
        for (key, value) in object {
            if PREFERENCE_FIELDS.contains(&key.as_str()) {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty_and_active() {
        let pref = SpotPreference::default();
        assert!(pref.is_active);
        assert_eq!(pref.wave_height_ideal, None);
        assert_eq!(pref.ideal_tide_phase, None);
    }

    #[test]
    fn test_serialized_keys_are_all_recognized() {
        let pref = SpotPreference::default();
        let value = serde_json::to_value(&pref).unwrap();
        for key in value.as_object().unwrap().keys() {
            assert!(
                PREFERENCE_FIELDS.contains(&key.as_str()),
                "serialized key '{}' missing from allow-list",
                key
            );
        }
    }

    #[test]
    fn test_sanitize_drops_unrecognized_keys() {
        let payload = serde_json::json!({
            "wave_height_ideal": 1.5,
            "is_active": true,
            "suitability_score": 99,
            "admin": true,
        });

        let sanitized = sanitize_update(&payload);
        assert_eq!(sanitized.len(), 2);
        assert!(sanitized.contains_key("wave_height_ideal"));
        assert!(sanitized.contains_key("is_active"));
        assert!(!sanitized.contains_key("suitability_score"));
        assert!(!sanitized.contains_key("admin"));
    }

    #[test]
    fn test_sanitize_non_object_yields_empty() {
        assert!(sanitize_update(&serde_json::json!([1, 2, 3])).is_empty());
        assert!(sanitize_update(&serde_json::json!("nope")).is_empty());
    }

    #[test]
    fn test_tide_phase_serde_names() {
        assert_eq!(serde_json::to_string(&TidePhase::Rising).unwrap(), "\"rising\"");
        assert_eq!(
            serde_json::from_str::<TidePhase>("\"falling\"").unwrap(),
            TidePhase::Falling
        );
    }
}
