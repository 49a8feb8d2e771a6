pub mod cache;
pub mod types;

use std::future::Future;

use chrono::NaiveDate;

use crate::error::SwellMateError;
use crate::presets::types::{DaySelectionType, Preset};
use crate::timeframe;
use self::types::{RecommendationRequest, RecommendationSet};

/// Seam to the recommendation endpoint. Implemented by `ApiClient` and
/// by stubs in tests; the endpoint must be treated as fallible and
/// possibly slow.
pub trait RecommendationSource: Send + Sync + 'static {
    fn fetch_recommendations(
        &self,
        request: RecommendationRequest,
    ) -> impl Future<Output = Result<RecommendationSet, SwellMateError>> + Send;
}

/// Translate a preset into a recommendation request. Offset selections
/// pass through unchanged; weekday selections are resolved against
/// `today` (the user's local date, passed explicitly so the translation
/// is deterministic). Time bounds are already stored as UTC.
pub fn build_request(
    user_id: i64,
    preset: &Preset,
    today: NaiveDate,
) -> Result<RecommendationRequest, SwellMateError> {
    if preset.spot_ids.is_empty() {
        return Err(SwellMateError::Validation(
            "Preset has no spots selected".to_string(),
        ));
    }

    let day_offset = match preset.day_selection_type {
        DaySelectionType::Offsets => {
            if preset.day_values.is_empty() {
                return Err(SwellMateError::Validation(
                    "Preset has no days selected".to_string(),
                ));
            }
            preset.day_values.iter().map(|&v| u32::from(v)).collect()
        }
        // weekdays_to_offsets already guarantees a non-empty result
        DaySelectionType::Weekdays => timeframe::weekdays_to_offsets(&preset.day_values, today),
    };

    Ok(RecommendationRequest {
        user_id,
        spot_ids: preset.spot_ids.clone(),
        day_offset,
        start_time: preset.start_time.clone(),
        end_time: preset.end_time.clone(),
    })
}
