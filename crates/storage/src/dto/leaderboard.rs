use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common::{PageRequest, PageWindow};
use crate::query::{FilterSet, SortDirection, SortKey, SortOrder};

/// Raw leaderboard query string. Every field is optional and parsed leniently:
/// unparseable numbers and unknown sort keys fall back to defaults.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct LeaderboardParams {
    /// Season id, or `ALL`
    pub season: Option<String>,
    /// Organizing streamer id, or `ALL`
    pub streamer: Option<String>,
    /// Map id, or `ALL`
    pub map: Option<String>,
    /// Vehicle / competition type, or `ALL`
    pub vehicle: Option<String>,
    pub streamer_search: Option<String>,
    pub viewer_search: Option<String>,
    pub map_search: Option<String>,
    pub sort_by: Option<String>,
    /// `asc` or `desc`
    pub sort_dir: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
    /// `1`, `true` or `yes` to include bot results
    pub show_bots: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaderboardQuery {
    pub filters: FilterSet,
    pub order: SortOrder,
    pub page: PageRequest,
    pub show_bots: bool,
}

fn parse_number(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.trim().parse::<i64>().ok())
}

fn parse_flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| {
        matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

impl LeaderboardParams {
    pub fn into_query(self) -> LeaderboardQuery {
        LeaderboardQuery {
            filters: FilterSet {
                season_id: FilterSet::exact(self.season.as_deref()),
                streamer_id: FilterSet::exact(self.streamer.as_deref()),
                map_id: FilterSet::exact(self.map.as_deref()),
                vehicle_type: FilterSet::exact(self.vehicle.as_deref()),
                streamer_search: FilterSet::search(self.streamer_search.as_deref()),
                viewer_search: FilterSet::search(self.viewer_search.as_deref()),
                map_search: FilterSet::search(self.map_search.as_deref()),
            },
            order: SortOrder::resolve(self.sort_by.as_deref(), self.sort_dir.as_deref()),
            page: PageRequest::new(
                parse_number(self.page.as_deref()),
                parse_number(self.page_size.as_deref()),
            ),
            show_bots: parse_flag(self.show_bots.as_deref()),
        }
    }
}

/// Per-viewer statistics derived from the filtered result rows.
///
/// Rank statistics only consider FINISHED results; time statistics only
/// consider FINISHED results with a positive finish time. Both are `null`
/// when the viewer has no eligible sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewerStatistics {
    pub viewer_id: String,
    pub viewer_login: String,
    pub viewer_display_name: String,
    pub viewer_avatar_url: Option<String>,
    pub competitions: i64,
    pub finished: i64,
    pub dnf_count: i64,
    pub wins: i64,
    pub seconds: i64,
    pub thirds: i64,
    pub best_finish_pos: Option<i32>,
    pub worst_finish_pos: Option<i32>,
    pub avg_finish_pos: Option<f64>,
    pub p10_finish_pos: Option<i32>,
    pub p25_finish_pos: Option<i32>,
    pub p50_finish_pos: Option<i32>,
    pub p75_finish_pos: Option<i32>,
    pub p90_finish_pos: Option<i32>,
    pub best_time_ms: Option<i64>,
    pub worst_time_ms: Option<i64>,
    pub avg_time_ms: Option<f64>,
    pub p10_time_ms: Option<i64>,
    pub p25_time_ms: Option<i64>,
    pub p50_time_ms: Option<i64>,
    pub p75_time_ms: Option<i64>,
    pub p90_time_ms: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub ok: bool,
    pub page: u32,
    pub page_size: u32,
    pub total_items: i64,
    pub total_pages: u32,
    pub sort_by: SortKey,
    pub sort_dir: SortDirection,
    pub items: Vec<ViewerStatistics>,
}

impl LeaderboardResponse {
    pub fn new(window: PageWindow, order: SortOrder, items: Vec<ViewerStatistics>) -> Self {
        Self {
            ok: true,
            page: window.page,
            page_size: window.page_size,
            total_items: window.total_items,
            total_pages: window.total_pages,
            sort_by: order.key,
            sort_dir: order.direction,
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_nothing_is_given() {
        let query = LeaderboardParams::default().into_query();
        assert_eq!(query.filters, FilterSet::default());
        assert_eq!(query.order.key, SortKey::Wins);
        assert_eq!(query.order.direction, SortDirection::Desc);
        assert_eq!(query.page, PageRequest::default());
        assert!(!query.show_bots);
    }

    #[test]
    fn test_lenient_parsing() {
        let params = LeaderboardParams {
            season: Some("all".to_string()),
            streamer: Some("1001".to_string()),
            viewer_search: Some("  LapDog ".to_string()),
            sort_by: Some("p50TimeMs".to_string()),
            sort_dir: Some("sideways".to_string()),
            page: Some("two".to_string()),
            page_size: Some("500".to_string()),
            show_bots: Some("TRUE".to_string()),
            ..Default::default()
        };
        let query = params.into_query();

        assert_eq!(query.filters.season_id, None);
        assert_eq!(query.filters.streamer_id.as_deref(), Some("1001"));
        assert_eq!(query.filters.viewer_search.as_deref(), Some("lapdog"));
        assert_eq!(query.order.key, SortKey::P50TimeMs);
        assert_eq!(query.order.direction, SortDirection::Desc);
        assert_eq!(query.page.page, 1);
        assert_eq!(query.page.page_size, 200);
        assert!(query.show_bots);
    }

    #[test]
    fn test_statistics_serialize_camel_case_with_nulls() {
        let stats = ViewerStatistics {
            viewer_id: "42".to_string(),
            dnf_count: 1,
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["dnfCount"], 1);
        assert!(json["bestFinishPos"].is_null());
        assert!(json["p90TimeMs"].is_null());
    }
}
