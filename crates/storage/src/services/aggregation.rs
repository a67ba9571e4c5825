//! Groups filtered result rows by viewer and derives distribution statistics.
//!
//! Percentiles use the nearest-rank estimator: for `n` ascending samples the
//! p-th percentile is the sample at 1-based position `ceil(p * n / 100)`,
//! clamped to `[1, n]`. No interpolation, ties are taken as they fall.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::{DateTime, Utc};

use crate::dto::leaderboard::ViewerStatistics;
use crate::models::ResultStatus;

/// One row of the competition × result join, as the aggregation needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub viewer_id: String,
    pub viewer_login: String,
    pub viewer_display_name: String,
    pub viewer_avatar_url: Option<String>,
    pub status: ResultStatus,
    pub finish_rank: Option<i32>,
    pub finish_time_ms: Option<i64>,
    pub started_at: DateTime<Utc>,
}

/// Sample at 1-based position `ceil(percent * n / 100)` of an ascending slice.
pub fn nearest_rank<T: Copy>(sorted: &[T], percent: u32) -> Option<T> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let position = (percent as usize * n).div_ceil(100).clamp(1, n);
    Some(sorted[position - 1])
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Percentiles<T> {
    p10: Option<T>,
    p25: Option<T>,
    p50: Option<T>,
    p75: Option<T>,
    p90: Option<T>,
}

impl<T: Copy> Percentiles<T> {
    fn of(sorted: &[T]) -> Self {
        Self {
            p10: nearest_rank(sorted, 10),
            p25: nearest_rank(sorted, 25),
            p50: nearest_rank(sorted, 50),
            p75: nearest_rank(sorted, 75),
            p90: nearest_rank(sorted, 90),
        }
    }
}

fn mean<T: Copy + Into<f64>>(values: &[T]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().map(|v| (*v).into()).sum();
    Some(sum / values.len() as f64)
}

#[derive(Debug)]
struct ViewerAccumulator {
    identity: ResultRow,
    competitions: i64,
    finished: i64,
    dnf: i64,
    placements: [i64; 3],
    ranks: Vec<i32>,
    times: Vec<i64>,
}

impl ViewerAccumulator {
    fn from_row(row: ResultRow) -> Self {
        let mut acc = Self {
            identity: row.clone(),
            competitions: 0,
            finished: 0,
            dnf: 0,
            placements: [0; 3],
            ranks: Vec::new(),
            times: Vec::new(),
        };
        acc.add(row);
        acc
    }

    fn add(&mut self, row: ResultRow) {
        self.competitions += 1;

        match row.status {
            ResultStatus::Finished => {
                self.finished += 1;
                if let Some(rank) = row.finish_rank {
                    if (1..=3).contains(&rank) {
                        self.placements[rank as usize - 1] += 1;
                    }
                    self.ranks.push(rank);
                }
                if let Some(time) = row.finish_time_ms.filter(|t| *t > 0) {
                    self.times.push(time);
                }
            }
            ResultStatus::Dnf => self.dnf += 1,
        }

        // Identity follows the most recent competition.
        if row.started_at >= self.identity.started_at {
            self.identity = row;
        }
    }

    fn finish(mut self) -> ViewerStatistics {
        self.ranks.sort_unstable();
        self.times.sort_unstable();

        let rank = Percentiles::of(&self.ranks);
        let time = Percentiles::of(&self.times);
        let identity = self.identity;

        ViewerStatistics {
            viewer_id: identity.viewer_id,
            viewer_login: identity.viewer_login,
            viewer_display_name: identity.viewer_display_name,
            viewer_avatar_url: identity.viewer_avatar_url,
            competitions: self.competitions,
            finished: self.finished,
            dnf_count: self.dnf,
            wins: self.placements[0],
            seconds: self.placements[1],
            thirds: self.placements[2],
            best_finish_pos: self.ranks.first().copied(),
            worst_finish_pos: self.ranks.last().copied(),
            avg_finish_pos: mean(&self.ranks),
            p10_finish_pos: rank.p10,
            p25_finish_pos: rank.p25,
            p50_finish_pos: rank.p50,
            p75_finish_pos: rank.p75,
            p90_finish_pos: rank.p90,
            best_time_ms: self.times.first().copied(),
            worst_time_ms: self.times.last().copied(),
            avg_time_ms: mean_ms(&self.times),
            p10_time_ms: time.p10,
            p25_time_ms: time.p25,
            p50_time_ms: time.p50,
            p75_time_ms: time.p75,
            p90_time_ms: time.p90,
        }
    }
}

fn mean_ms(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: i128 = values.iter().map(|v| i128::from(*v)).sum();
    Some(sum as f64 / values.len() as f64)
}

/// One entry per distinct viewer in `rows`, in no particular order.
pub fn aggregate_viewers(rows: impl IntoIterator<Item = ResultRow>) -> Vec<ViewerStatistics> {
    let mut viewers: HashMap<String, ViewerAccumulator> = HashMap::new();
    for row in rows {
        match viewers.entry(row.viewer_id.clone()) {
            Entry::Occupied(mut entry) => entry.get_mut().add(row),
            Entry::Vacant(entry) => {
                entry.insert(ViewerAccumulator::from_row(row));
            }
        }
    }

    viewers.into_values().map(ViewerAccumulator::finish).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(viewer: &str, status: ResultStatus, rank: i32, time: Option<i64>) -> ResultRow {
        ResultRow {
            viewer_id: viewer.to_string(),
            viewer_login: viewer.to_lowercase(),
            viewer_display_name: viewer.to_string(),
            viewer_avatar_url: None,
            status,
            finish_rank: Some(rank),
            finish_time_ms: time,
            started_at: Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    fn rank_percentiles(s: &ViewerStatistics) -> [Option<i32>; 5] {
        [
            s.p10_finish_pos,
            s.p25_finish_pos,
            s.p50_finish_pos,
            s.p75_finish_pos,
            s.p90_finish_pos,
        ]
    }

    fn time_percentiles(s: &ViewerStatistics) -> [Option<i64>; 5] {
        [
            s.p10_time_ms,
            s.p25_time_ms,
            s.p50_time_ms,
            s.p75_time_ms,
            s.p90_time_ms,
        ]
    }

    fn stats_for<'a>(all: &'a [ViewerStatistics], viewer: &str) -> &'a ViewerStatistics {
        all.iter().find(|s| s.viewer_id == viewer).unwrap()
    }

    #[test]
    fn test_nearest_rank_positions() {
        let values: Vec<i32> = (1..=10).collect();
        assert_eq!(nearest_rank(&values, 10), Some(1));
        assert_eq!(nearest_rank(&values, 25), Some(3));
        assert_eq!(nearest_rank(&values, 50), Some(5));
        assert_eq!(nearest_rank(&values, 75), Some(8));
        assert_eq!(nearest_rank(&values, 90), Some(9));
        assert_eq!(nearest_rank::<i32>(&[], 50), None);
    }

    #[test]
    fn test_exact_products_do_not_round_up() {
        // 10% of 30 is exactly position 3.
        let values: Vec<i64> = (1..=30).collect();
        assert_eq!(nearest_rank(&values, 10), Some(3));
        assert_eq!(nearest_rank(&values, 90), Some(27));
    }

    #[test]
    fn test_single_sample_fills_every_percentile() {
        let stats = aggregate_viewers(vec![row("A", ResultStatus::Finished, 4, Some(9_000))]);
        let a = &stats[0];
        assert_eq!(rank_percentiles(a), [Some(4); 5]);
        assert_eq!(time_percentiles(a), [Some(9_000); 5]);
    }

    #[test]
    fn test_percentiles_are_monotonic_with_duplicates() {
        let ranks = [3, 1, 3, 3, 7, 2, 2, 9, 1, 3, 5];
        let rows: Vec<ResultRow> = ranks
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let time = 1_000 * ((i as i64 % 4) + 1);
                row("A", ResultStatus::Finished, *r, Some(time))
            })
            .collect();
        let a = aggregate_viewers(rows).remove(0);

        let rank = rank_percentiles(&a);
        let time = time_percentiles(&a);
        assert!(rank.windows(2).all(|w| w[0] <= w[1]));
        assert!(time.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(a.best_finish_pos, Some(1));
        assert_eq!(a.worst_finish_pos, Some(9));
    }

    #[test]
    fn test_viewer_without_finishes_has_null_statistics() {
        let stats = aggregate_viewers(vec![
            row("C", ResultStatus::Dnf, 3, None),
            row("C", ResultStatus::Dnf, 5, Some(30_000)),
        ]);
        let c = &stats[0];
        assert_eq!(c.competitions, 2);
        assert_eq!(c.dnf_count, 2);
        assert_eq!(c.finished, 0);
        assert_eq!(c.wins, 0);
        assert_eq!(c.best_finish_pos, None);
        assert_eq!(c.avg_finish_pos, None);
        assert_eq!(c.p50_finish_pos, None);
        assert_eq!(c.best_time_ms, None);
        assert_eq!(c.avg_time_ms, None);
        assert_eq!(c.p90_time_ms, None);
    }

    #[test]
    fn test_placements_only_count_finishes() {
        let stats = aggregate_viewers(vec![
            row("A", ResultStatus::Finished, 1, Some(10_000)),
            row("A", ResultStatus::Finished, 2, Some(11_000)),
            row("A", ResultStatus::Dnf, 1, None),
            row("A", ResultStatus::Finished, 3, None),
        ]);
        let a = stats_for(&stats, "A");
        assert_eq!(a.wins, 1);
        assert_eq!(a.seconds, 1);
        assert_eq!(a.thirds, 1);
        assert_eq!(a.avg_finish_pos, Some(2.0));
        assert_eq!(a.avg_time_ms, Some(10_500.0));
        assert_eq!(a.worst_time_ms, Some(11_000));
    }

    #[test]
    fn test_non_positive_times_are_ignored() {
        let stats = aggregate_viewers(vec![
            row("A", ResultStatus::Finished, 2, Some(0)),
            row("A", ResultStatus::Finished, 1, Some(-5)),
        ]);
        let a = &stats[0];
        assert_eq!(a.best_finish_pos, Some(1));
        assert_eq!(a.best_time_ms, None);
    }

    #[test]
    fn test_identity_comes_from_latest_competition() {
        let mut old = row("A", ResultStatus::Finished, 1, Some(10_000));
        old.viewer_display_name = "OldName".to_string();
        let mut new = row("A", ResultStatus::Finished, 2, Some(12_000));
        new.viewer_display_name = "NewName".to_string();
        new.started_at = old.started_at + chrono::Duration::days(1);

        let stats = aggregate_viewers(vec![new, old]);
        assert_eq!(stats[0].viewer_display_name, "NewName");
    }

    #[test]
    fn test_three_viewer_race() {
        let stats = aggregate_viewers(vec![
            row("A", ResultStatus::Finished, 1, Some(10_000)),
            row("B", ResultStatus::Finished, 2, Some(12_000)),
            row("C", ResultStatus::Dnf, 3, None),
        ]);
        assert_eq!(stats.len(), 3);

        let a = stats_for(&stats, "A");
        assert_eq!((a.wins, a.best_finish_pos, a.best_time_ms), (1, Some(1), Some(10_000)));
        let b = stats_for(&stats, "B");
        assert_eq!((b.wins, b.best_finish_pos, b.best_time_ms), (0, Some(2), Some(12_000)));
        let c = stats_for(&stats, "C");
        assert_eq!((c.wins, c.best_finish_pos, c.best_time_ms, c.dnf_count), (0, None, None, 1));
    }
}
