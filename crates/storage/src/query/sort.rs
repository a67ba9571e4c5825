use std::cmp::Ordering;

use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::leaderboard::ViewerStatistics;

/// Allowlisted sort keys of the viewer leaderboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    ViewerName,
    Competitions,
    #[default]
    Wins,
    Seconds,
    Thirds,
    Finished,
    Dnf,
    BestFinishPos,
    WorstFinishPos,
    AvgFinishPos,
    P10FinishPos,
    P25FinishPos,
    P50FinishPos,
    P75FinishPos,
    P90FinishPos,
    BestTimeMs,
    WorstTimeMs,
    AvgTimeMs,
    P10TimeMs,
    P25TimeMs,
    P50TimeMs,
    P75TimeMs,
    P90TimeMs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Asc),
            "desc" | "descending" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Comparable value extracted from one aggregated viewer.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Null,
    Number(f64),
    Text(String),
}

impl SortValue {
    fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Greater,
            (_, Self::Null) => Ordering::Less,
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
        }
    }
}

fn count(value: i64) -> SortValue {
    SortValue::Number(value as f64)
}

fn optional<T: Into<f64>>(value: Option<T>) -> SortValue {
    value.map_or(SortValue::Null, |v| SortValue::Number(v.into()))
}

fn optional_ms(value: Option<i64>) -> SortValue {
    value.map_or(SortValue::Null, |v| SortValue::Number(v as f64))
}

/// How one sort key reads its value and whether that value can be null.
pub struct SortColumn {
    pub key: SortKey,
    pub name: &'static str,
    pub nullable: bool,
    pub default_direction: SortDirection,
    pub value: fn(&ViewerStatistics) -> SortValue,
}

macro_rules! sort_column {
    ($key:ident, $name:literal, $nullable:literal, $dir:ident, $value:expr) => {
        SortColumn {
            key: SortKey::$key,
            name: $name,
            nullable: $nullable,
            default_direction: SortDirection::$dir,
            value: $value,
        }
    };
}

/// Indexed by `SortKey` discriminant.
static SORT_COLUMNS: &[SortColumn] = &[
    sort_column!(ViewerName, "viewerName", false, Asc, |v| SortValue::Text(
        v.viewer_display_name.to_lowercase()
    )),
    sort_column!(Competitions, "competitions", false, Desc, |v| count(v.competitions)),
    sort_column!(Wins, "wins", false, Desc, |v| count(v.wins)),
    sort_column!(Seconds, "seconds", false, Desc, |v| count(v.seconds)),
    sort_column!(Thirds, "thirds", false, Desc, |v| count(v.thirds)),
    sort_column!(Finished, "finished", false, Desc, |v| count(v.finished)),
    sort_column!(Dnf, "dnf", false, Desc, |v| count(v.dnf_count)),
    sort_column!(BestFinishPos, "bestFinishPos", true, Desc, |v| optional(v.best_finish_pos)),
    sort_column!(WorstFinishPos, "worstFinishPos", true, Desc, |v| optional(v.worst_finish_pos)),
    sort_column!(AvgFinishPos, "avgFinishPos", true, Desc, |v| optional(v.avg_finish_pos)),
    sort_column!(P10FinishPos, "p10FinishPos", true, Desc, |v| optional(v.p10_finish_pos)),
    sort_column!(P25FinishPos, "p25FinishPos", true, Desc, |v| optional(v.p25_finish_pos)),
    sort_column!(P50FinishPos, "p50FinishPos", true, Desc, |v| optional(v.p50_finish_pos)),
    sort_column!(P75FinishPos, "p75FinishPos", true, Desc, |v| optional(v.p75_finish_pos)),
    sort_column!(P90FinishPos, "p90FinishPos", true, Desc, |v| optional(v.p90_finish_pos)),
    sort_column!(BestTimeMs, "bestTimeMs", true, Desc, |v| optional_ms(v.best_time_ms)),
    sort_column!(WorstTimeMs, "worstTimeMs", true, Desc, |v| optional_ms(v.worst_time_ms)),
    sort_column!(AvgTimeMs, "avgTimeMs", true, Desc, |v| optional(v.avg_time_ms)),
    sort_column!(P10TimeMs, "p10TimeMs", true, Desc, |v| optional_ms(v.p10_time_ms)),
    sort_column!(P25TimeMs, "p25TimeMs", true, Desc, |v| optional_ms(v.p25_time_ms)),
    sort_column!(P50TimeMs, "p50TimeMs", true, Desc, |v| optional_ms(v.p50_time_ms)),
    sort_column!(P75TimeMs, "p75TimeMs", true, Desc, |v| optional_ms(v.p75_time_ms)),
    sort_column!(P90TimeMs, "p90TimeMs", true, Desc, |v| optional_ms(v.p90_time_ms)),
];

impl SortKey {
    /// Unknown names resolve to `None`; callers fall back to [`SortKey::default`].
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        SORT_COLUMNS
            .iter()
            .find(|column| column.name.eq_ignore_ascii_case(value))
            .map(|column| column.key)
    }

    pub fn column(&self) -> &'static SortColumn {
        &SORT_COLUMNS[*self as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::resolve(None, None)
    }
}

impl SortOrder {
    pub fn resolve(sort_by: Option<&str>, sort_dir: Option<&str>) -> Self {
        let key = sort_by.and_then(SortKey::parse).unwrap_or_default();
        let direction = sort_dir
            .and_then(SortDirection::parse)
            .unwrap_or(key.column().default_direction);
        Self { key, direction }
    }

    /// Null-ness first (nulls last in both directions), then the requested
    /// value, then case-insensitive viewer identity ascending.
    pub fn compare(&self, a: &ViewerStatistics, b: &ViewerStatistics) -> Ordering {
        let column = self.key.column();
        let (va, vb) = ((column.value)(a), (column.value)(b));

        let nulls = if column.nullable {
            va.is_null().cmp(&vb.is_null())
        } else {
            Ordering::Equal
        };
        let requested = match (va.is_null() || vb.is_null(), self.direction) {
            (true, _) => Ordering::Equal,
            (false, SortDirection::Asc) => va.compare(&vb),
            (false, SortDirection::Desc) => vb.compare(&va),
        };

        nulls
            .then(requested)
            .then_with(|| tie_break(a).cmp(&tie_break(b)))
            .then_with(|| a.viewer_id.cmp(&b.viewer_id))
    }

    pub fn sort(&self, viewers: &mut [ViewerStatistics]) {
        viewers.sort_by(|a, b| self.compare(a, b));
    }
}

fn tie_break(viewer: &ViewerStatistics) -> String {
    viewer.viewer_display_name.to_lowercase()
}
