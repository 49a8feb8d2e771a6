use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A surf spot. Reference data owned by the backend; the client only
/// reads it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Spot {
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// IANA timezone name of the spot (e.g. "Pacific/Auckland").
    pub timezone: String,
}

/// Raw forecast values for one hour, echoed back by the recommendation
/// endpoint alongside the scores. Fields the forecast provider lacks for
/// a spot come back null.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ForecastConditions {
    pub wave_height_m: Option<f64>,
    pub wave_period_s: Option<f64>,
    pub swell_height_m: Option<f64>,
    pub swell_period_s: Option<f64>,
    pub wind_speed_ms: Option<f64>,
    pub wind_direction_deg: Option<f64>,
    pub sea_level_m: Option<f64>,
    pub water_temperature_c: Option<f64>,
    pub air_temperature_c: Option<f64>,
}

/// One scored forecast hour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HourlyRecommendation {
    pub timestamp: DateTime<Utc>,
    /// 0-100 fitness value, computed server-side.
    pub suitability_score: f64,
    /// Per-factor sub-scores keyed by factor name. The scoring model is
    /// opaque to the client, so keys are not enumerated here.
    pub detailed_scores: BTreeMap<String, f64>,
    pub conditions: ForecastConditions,
}

/// Scored hours for one spot on one day offset, ranked best-first by the
/// backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpotDayRecommendations {
    pub spot_id: i64,
    pub day_offset: u32,
    pub hours: Vec<HourlyRecommendation>,
}

/// The full recommendation payload for one preset fetch. The preset id
/// is not part of the payload; cache entries are keyed by it instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationSet {
    pub spots: Vec<SpotDayRecommendations>,
}

/// Request body for the recommendation endpoint. Time bounds are UTC
/// "HH:MM:SS" time-of-day strings, applied to every requested day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationRequest {
    pub user_id: i64,
    pub spot_ids: Vec<i64>,
    pub day_offset: Vec<u32>,
    pub start_time: String,
    pub end_time: String,
}
