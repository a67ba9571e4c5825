use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Season {
    pub season_id: String,
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl Season {
    /// Both bounds are inclusive.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.starts_at <= at && at <= self.ends_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn season() -> Season {
        Season {
            season_id: "s1".to_string(),
            name: "Season 1".to_string(),
            starts_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            ends_at: Utc.with_ymd_and_hms(2025, 3, 31, 23, 59, 59).unwrap(),
        }
    }

    #[test]
    fn test_contains_is_inclusive_on_both_ends() {
        let s = season();
        assert!(s.contains(s.starts_at));
        assert!(s.contains(s.ends_at));
    }

    #[test]
    fn test_contains_rejects_outside_range() {
        let s = season();
        assert!(!s.contains(Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap()));
        assert!(!s.contains(Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap()));
    }
}
