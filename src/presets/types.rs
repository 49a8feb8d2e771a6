use serde::{Deserialize, Serialize};

/// How a preset's `day_values` are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaySelectionType {
    /// Concrete day offsets: 0 = today, 1 = tomorrow, ...
    Offsets,
    /// Recurring weekday indices: 0 = Sunday .. 6 = Saturday.
    Weekdays,
}

/// A saved combination of spots, day selection and time window for
/// one-click recommendation retrieval.
///
/// Time bounds are persisted as UTC "HH:MM:SS" time-of-day strings and
/// converted to local wall-clock only for display (see `timeframe`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preset {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub spot_ids: Vec<i64>,
    pub start_time: String,
    pub end_time: String,
    pub day_selection_type: DaySelectionType,
    pub day_values: Vec<u8>,
    /// At most one preset per user carries this; enforced client-side,
    /// not guaranteed atomic server-side.
    pub is_default: bool,
    pub is_active: bool,
}

impl Preset {
    pub fn references_spot(&self, spot_id: i64) -> bool {
        self.spot_ids.contains(&spot_id)
    }
}

/// Payload for creating a preset. The backend assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPreset {
    pub name: String,
    pub spot_ids: Vec<i64>,
    pub start_time: String,
    pub end_time: String,
    pub day_selection_type: DaySelectionType,
    pub day_values: Vec<u8>,
    pub is_default: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_selection_type_serde_names() {
        assert_eq!(
            serde_json::to_string(&DaySelectionType::Offsets).unwrap(),
            "\"offsets\""
        );
        assert_eq!(
            serde_json::from_str::<DaySelectionType>("\"weekdays\"").unwrap(),
            DaySelectionType::Weekdays
        );
    }

    #[test]
    fn test_preset_serde_round_trip() {
        let preset = Preset {
            id: 3,
            user_id: 11,
            name: "Dawn patrol".to_string(),
            spot_ids: vec![1, 2],
            start_time: "14:00:00".to_string(),
            end_time: "18:00:00".to_string(),
            day_selection_type: DaySelectionType::Weekdays,
            day_values: vec![0, 6],
            is_default: true,
            is_active: true,
        };

        let json = serde_json::to_string(&preset).unwrap();
        let back: Preset = serde_json::from_str(&json).unwrap();
        assert_eq!(back, preset);
    }

    #[test]
    fn test_references_spot() {
        let preset = Preset {
            id: 1,
            user_id: 1,
            name: "A".to_string(),
            spot_ids: vec![4, 9],
            start_time: "06:00:00".to_string(),
            end_time: "10:00:00".to_string(),
            day_selection_type: DaySelectionType::Offsets,
            day_values: vec![0],
            is_default: false,
            is_active: true,
        };
        assert!(preset.references_spot(9));
        assert!(!preset.references_spot(2));
    }
}
