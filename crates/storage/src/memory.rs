//! In-process [`StatsStore`] used by tests and by `DATABASE_URL=memory`.
//!
//! Mirrors the PostgreSQL behavior that matters to callers: upserts keyed the
//! same way, optional columns that can be switched off to imitate an older
//! deployment, and an uninitialized mode that reports a missing schema.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::dto::metadata::{MapSummary, StreamerSummary};
use crate::dto::submission::{DEFAULT_MAP_VERSION, ValidatedSubmission};
use crate::error::{Result, StorageError};
use crate::models::{Competition, CompetitionResult, Map, ResultStatus, Season};
use crate::query::{Column, ColumnSource, PredicateSet};
use crate::store::{BaselineScope, ResultRow, SchemaIntrospector, StatsStore, VersionMatch};

#[derive(Debug, Default)]
struct State {
    seasons: Vec<Season>,
    maps: BTreeMap<String, Map>,
    competitions: BTreeMap<Uuid, Competition>,
    by_client_id: HashMap<Uuid, Uuid>,
    results: BTreeMap<(Uuid, String), CompetitionResult>,
}

#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<State>,
    initialized: bool,
    bot_flag_column: bool,
    baseline_column: bool,
    fail_baseline_writes: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

struct JoinedRow<'a> {
    competition: &'a Competition,
    result: &'a CompetitionResult,
}

impl ColumnSource for JoinedRow<'_> {
    fn column(&self, column: Column) -> Option<&str> {
        let c = self.competition;
        let r = self.result;
        match column {
            Column::SeasonId => c.season_id.as_deref(),
            Column::StreamerId => Some(c.streamer_id.as_str()),
            Column::StreamerLogin => Some(c.streamer_login.as_str()),
            Column::StreamerDisplayName => Some(c.streamer_display_name.as_str()),
            Column::MapId => Some(c.map_id.as_str()),
            Column::MapName => Some(c.map_name.as_str()),
            Column::VehicleType => Some(c.vehicle_type.as_str()),
            Column::ViewerId => Some(r.viewer_id.as_str()),
            Column::ViewerLogin => Some(r.viewer_login.as_str()),
            Column::ViewerDisplayName => Some(r.viewer_display_name.as_str()),
        }
    }

    fn is_bot(&self) -> bool {
        self.result.is_bot
    }
}

fn poisoned<T>(_: T) -> StorageError {
    StorageError::Backend("memory store lock poisoned".to_string())
}

fn missing_column(column: &str) -> StorageError {
    StorageError::Backend(format!("column {column} does not exist"))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            initialized: true,
            bot_flag_column: true,
            baseline_column: true,
            fail_baseline_writes: false,
        }
    }

    /// A store whose tables were never created; every data access fails with
    /// [`StorageError::SchemaNotReady`].
    pub fn uninitialized() -> Self {
        Self {
            initialized: false,
            ..Self::new()
        }
    }

    pub fn with_bot_flag_column(mut self, present: bool) -> Self {
        self.bot_flag_column = present;
        self
    }

    pub fn with_baseline_column(mut self, present: bool) -> Self {
        self.baseline_column = present;
        self
    }

    /// Makes every baseline write fail, to exercise best-effort callers.
    pub fn fail_baseline_writes(mut self) -> Self {
        self.fail_baseline_writes = true;
        self
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        if !self.initialized {
            return Err(StorageError::SchemaNotReady(
                "relation \"competitions\" does not exist".to_string(),
            ));
        }
        self.state.read().map_err(poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        if !self.initialized {
            return Err(StorageError::SchemaNotReady(
                "relation \"competitions\" does not exist".to_string(),
            ));
        }
        self.state.write().map_err(poisoned)
    }

    pub fn add_season(&self, season: Season) {
        if let Ok(mut state) = self.state.write() {
            state.seasons.push(season);
        }
    }

    pub fn set_map_baseline(&self, map_id: &str, expected_time_ms: Option<i64>) {
        if let Ok(mut state) = self.state.write()
            && let Some(map) = state.maps.get_mut(map_id)
        {
            map.expected_time_ms = expected_time_ms;
        }
    }

    pub fn map(&self, map_id: &str) -> Option<Map> {
        self.state.read().ok()?.maps.get(map_id).cloned()
    }

    pub fn competition_count(&self) -> usize {
        self.state.read().map_or(0, |s| s.competitions.len())
    }

    pub fn result_count(&self) -> usize {
        self.state.read().map_or(0, |s| s.results.len())
    }

    pub fn result(&self, competition_id: Uuid, viewer_id: &str) -> Option<CompetitionResult> {
        self.state
            .read()
            .ok()?
            .results
            .get(&(competition_id, viewer_id.to_string()))
            .cloned()
    }

    /// Joined rows passing `predicates`, in (competition id, viewer id) order.
    fn matching<'a>(
        &self,
        state: &'a State,
        predicates: &PredicateSet,
    ) -> Result<Vec<JoinedRow<'a>>> {
        if predicates.excludes_bots() && !self.bot_flag_column {
            return Err(missing_column("r.is_bot"));
        }

        let rows = state
            .results
            .values()
            .filter_map(|result| {
                let competition = state.competitions.get(&result.competition_id)?;
                Some(JoinedRow {
                    competition,
                    result,
                })
            })
            .filter(|row| predicates.matches(row))
            .collect();
        Ok(rows)
    }
}

fn register_map(maps: &mut BTreeMap<String, Map>, submission: &ValidatedSubmission) {
    let version = submission.effective_map_version();
    match maps.get_mut(&submission.map_id) {
        None => {
            maps.insert(
                submission.map_id.clone(),
                Map {
                    map_id: submission.map_id.clone(),
                    map_name: submission.map_name.clone(),
                    version,
                    content_hash: submission.map_hash.clone(),
                    expected_time_ms: None,
                },
            );
        }
        Some(map) if version > map.version => {
            map.map_name = submission.map_name.clone();
            map.version = version;
            map.content_hash = submission.map_hash.clone();
        }
        Some(map) if version == map.version && map.content_hash.is_none() => {
            map.content_hash = submission.map_hash.clone();
        }
        Some(_) => {}
    }
}

fn latest_by_start<'a, K: Ord + Clone>(
    competitions: impl Iterator<Item = &'a Competition>,
    key: impl Fn(&Competition) -> K,
) -> BTreeMap<K, (&'a Competition, i64)> {
    let mut groups: BTreeMap<K, (&Competition, i64)> = BTreeMap::new();
    for competition in competitions {
        groups
            .entry(key(competition))
            .and_modify(|(latest, count)| {
                *count += 1;
                if competition.started_at > latest.started_at {
                    *latest = competition;
                }
            })
            .or_insert((competition, 1));
    }
    groups
}

#[async_trait]
impl SchemaIntrospector for MemoryStore {
    async fn column_exists(&self, table: &'static str, column: &'static str) -> Result<bool> {
        if !self.initialized {
            return Ok(false);
        }
        Ok(match (table, column) {
            ("competition_results", "is_bot") => self.bot_flag_column,
            ("maps", "expected_time_ms") => self.baseline_column,
            _ => true,
        })
    }
}

#[async_trait]
impl StatsStore for MemoryStore {
    async fn count_viewers(&self, predicates: &PredicateSet) -> Result<i64> {
        let state = self.read()?;
        let mut viewers: Vec<&str> = self
            .matching(&state, predicates)?
            .iter()
            .map(|row| row.result.viewer_id.as_str())
            .collect();
        viewers.sort_unstable();
        viewers.dedup();
        Ok(viewers.len() as i64)
    }

    async fn fetch_result_rows(&self, predicates: &PredicateSet) -> Result<Vec<ResultRow>> {
        let state = self.read()?;
        let rows = self
            .matching(&state, predicates)?
            .into_iter()
            .map(|row| ResultRow {
                viewer_id: row.result.viewer_id.clone(),
                viewer_login: row.result.viewer_login.clone(),
                viewer_display_name: row.result.viewer_display_name.clone(),
                viewer_avatar_url: row.result.viewer_avatar_url.clone(),
                status: row.result.status,
                finish_rank: Some(row.result.finish_rank),
                finish_time_ms: row.result.finish_time_ms,
                started_at: row.competition.started_at,
            })
            .collect();
        Ok(rows)
    }

    async fn list_streamers(&self) -> Result<Vec<StreamerSummary>> {
        let state = self.read()?;
        let mut streamers: Vec<_> = latest_by_start(state.competitions.values(), |c| {
            c.streamer_id.clone()
        })
        .into_iter()
        .map(|(streamer_id, (latest, competitions))| StreamerSummary {
            streamer_id,
            streamer_login: latest.streamer_login.clone(),
            streamer_display_name: latest.streamer_display_name.clone(),
            competitions,
        })
        .collect();
        streamers.sort_by(|a, b| {
            b.competitions
                .cmp(&a.competitions)
                .then_with(|| a.streamer_id.cmp(&b.streamer_id))
        });
        Ok(streamers)
    }

    async fn list_maps(&self) -> Result<Vec<MapSummary>> {
        let state = self.read()?;
        let mut maps: Vec<_> = latest_by_start(state.competitions.values(), |c| c.map_id.clone())
            .into_iter()
            .map(|(map_id, (latest, competitions))| MapSummary {
                map_id,
                map_name: latest.map_name.clone(),
                competitions,
            })
            .collect();
        maps.sort_by(|a, b| {
            b.competitions
                .cmp(&a.competitions)
                .then_with(|| a.map_id.cmp(&b.map_id))
        });
        Ok(maps)
    }

    async fn find_season_at(&self, at: DateTime<Utc>) -> Result<Option<Season>> {
        let state = self.read()?;
        Ok(state
            .seasons
            .iter()
            .filter(|season| season.contains(at))
            .min_by(|a, b| {
                a.starts_at
                    .cmp(&b.starts_at)
                    .then_with(|| a.season_id.cmp(&b.season_id))
            })
            .cloned())
    }

    async fn upsert_submission(
        &self,
        submission: &ValidatedSubmission,
        season_id: Option<&str>,
        with_bot_flag: bool,
    ) -> Result<Competition> {
        let mut state = self.write()?;
        let state = &mut *state;

        let existing = state
            .by_client_id
            .get(&submission.client_competition_id)
            .and_then(|id| state.competitions.get(id));
        if existing.is_some_and(|c| c.streamer_id != submission.streamer_id) {
            return Err(StorageError::CompetitionOwnedElsewhere(
                submission.client_competition_id,
            ));
        }
        let (competition_id, created_at) = existing
            .map(|c| (c.competition_id, c.created_at))
            .unwrap_or_else(|| (Uuid::new_v4(), Utc::now()));

        register_map(&mut state.maps, submission);

        let winner = submission.winner();
        let competition = Competition {
            competition_id,
            client_competition_id: submission.client_competition_id,
            streamer_id: submission.streamer_id.clone(),
            streamer_login: submission.streamer_login.clone(),
            streamer_display_name: submission.streamer_display_name.clone(),
            season_id: season_id.map(str::to_string),
            map_id: submission.map_id.clone(),
            map_name: submission.map_name.clone(),
            map_version: Some(submission.effective_map_version()),
            map_hash: submission.map_hash.clone(),
            vehicle_type: submission.vehicle_type.clone(),
            started_at: submission.started_at,
            ended_at: submission.ended_at,
            winner_viewer_id: winner.map(|w| w.viewer_id.clone()),
            winner_display_name: winner.map(|w| w.display_name().to_string()),
            created_at,
        };

        for result in &submission.results {
            state.results.insert(
                (competition_id, result.viewer_id.clone()),
                CompetitionResult {
                    competition_id,
                    viewer_id: result.viewer_id.clone(),
                    viewer_login: result.login().to_string(),
                    viewer_display_name: result.display_name().to_string(),
                    viewer_avatar_url: result.avatar_url.clone(),
                    is_bot: with_bot_flag && self.bot_flag_column && result.is_bot(),
                    finish_rank: result.finish_rank,
                    status: result.status,
                    finish_time_ms: result.effective_finish_time_ms(),
                    vehicle: result.vehicle.clone(),
                    distance_m: result.distance,
                    progress: result.progress,
                },
            );
        }

        state
            .by_client_id
            .insert(submission.client_competition_id, competition_id);
        state
            .competitions
            .insert(competition_id, competition.clone());

        Ok(competition)
    }

    async fn find_map(&self, map_id: &str, with_baseline: bool) -> Result<Option<Map>> {
        if with_baseline && !self.baseline_column {
            return Err(missing_column("expected_time_ms"));
        }
        let state = self.read()?;
        Ok(state.maps.get(map_id).map(|map| Map {
            expected_time_ms: map.expected_time_ms.filter(|_| with_baseline),
            ..map.clone()
        }))
    }

    async fn list_map_ids(&self) -> Result<Vec<String>> {
        Ok(self.read()?.maps.keys().cloned().collect())
    }

    async fn winning_times(&self, scope: &BaselineScope) -> Result<Vec<i64>> {
        if scope.exclude_bots && !self.bot_flag_column {
            return Err(missing_column("r.is_bot"));
        }
        let state = self.read()?;

        let in_scope = |c: &Competition| {
            c.map_id == scope.map_id
                && match &scope.version {
                    VersionMatch::Hash(hash) => c.map_hash.as_deref() == Some(hash.as_str()),
                    VersionMatch::Version(version) => {
                        c.map_version.unwrap_or(DEFAULT_MAP_VERSION) == *version
                    }
                }
        };

        let mut winners: BTreeMap<Uuid, i64> = BTreeMap::new();
        for result in state.results.values() {
            let Some(competition) = state.competitions.get(&result.competition_id) else {
                continue;
            };
            if !in_scope(competition)
                || result.status != ResultStatus::Finished
                || (scope.exclude_bots && result.is_bot)
            {
                continue;
            }
            let Some(time) = result.finish_time_ms.filter(|t| *t > 0) else {
                continue;
            };
            winners
                .entry(result.competition_id)
                .and_modify(|best| *best = (*best).min(time))
                .or_insert(time);
        }

        Ok(winners.into_values().collect())
    }

    async fn write_map_baseline(&self, map_id: &str, expected_time_ms: i64) -> Result<()> {
        if self.fail_baseline_writes {
            return Err(StorageError::Backend("baseline write rejected".to_string()));
        }
        if !self.baseline_column {
            return Err(missing_column("expected_time_ms"));
        }
        let mut state = self.write()?;
        let map = state.maps.get_mut(map_id).ok_or(StorageError::NotFound)?;
        map.expected_time_ms = Some(expected_time_ms);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::FilterSet;
    use crate::test_support::{bot, finished, submission};

    #[tokio::test]
    async fn test_bot_flag_dropped_without_column() {
        let store = MemoryStore::new().with_bot_flag_column(false);
        let race = submission("harbor", 1, None, vec![bot("bot:1", 1, 5_000)]);
        let competition = store.upsert_submission(&race, None, true).await.unwrap();
        assert!(!store.result(competition.competition_id, "bot:1").unwrap().is_bot);
    }

    #[tokio::test]
    async fn test_bot_exclusion_requires_column() {
        let store = MemoryStore::new().with_bot_flag_column(false);
        let predicates = PredicateSet::build(&FilterSet::default(), true);
        assert!(store.count_viewers(&predicates).await.is_err());
    }

    #[tokio::test]
    async fn test_other_streamer_cannot_take_over_competition() {
        let store = MemoryStore::new();
        let race = submission("harbor", 1, None, vec![finished("a", 1, 10_000)]);
        store.upsert_submission(&race, None, true).await.unwrap();

        let mut hijack = race.clone();
        hijack.streamer_id = "2002".to_string();
        hijack.map_version = Some(5);
        hijack.results = vec![finished("z", 1, 9_000)];
        let err = store.upsert_submission(&hijack, None, true).await.unwrap_err();

        assert!(matches!(
            err,
            StorageError::CompetitionOwnedElsewhere(id) if id == race.client_competition_id
        ));
        assert_eq!(store.result_count(), 1);
        assert_eq!(store.map("harbor").unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_newer_version_moves_map_forward() {
        let store = MemoryStore::new();
        for (version, hash) in [(2, Some("b")), (1, Some("a")), (3, None)] {
            store
                .upsert_submission(&submission("harbor", version, hash, vec![]), None, true)
                .await
                .unwrap();
        }
        let map = store.map("harbor").unwrap();
        assert_eq!(map.version, 3);
        assert_eq!(map.content_hash, None);
    }

    #[tokio::test]
    async fn test_same_version_fills_missing_hash() {
        let store = MemoryStore::new();
        for hash in [None, Some("abc"), Some("def")] {
            store
                .upsert_submission(&submission("harbor", 1, hash, vec![]), None, true)
                .await
                .unwrap();
        }
        assert_eq!(store.map("harbor").unwrap().content_hash.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_winning_times_take_per_competition_minimum() {
        let store = MemoryStore::new();
        let race = submission(
            "harbor",
            1,
            Some("h1"),
            vec![finished("a", 2, 12_000), finished("b", 1, 11_000), finished("c", 3, 0)],
        );
        store.upsert_submission(&race, None, true).await.unwrap();

        let scope = BaselineScope {
            map_id: "harbor".to_string(),
            version: VersionMatch::Hash("h1".to_string()),
            exclude_bots: true,
        };
        assert_eq!(store.winning_times(&scope).await.unwrap(), vec![11_000]);

        let other = BaselineScope {
            version: VersionMatch::Hash("h2".to_string()),
            ..scope
        };
        assert!(store.winning_times(&other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_uninitialized_store_reports_missing_schema() {
        let store = MemoryStore::uninitialized();
        assert!(!store.column_exists("competition_results", "is_bot").await.unwrap());
        let err = store.list_streamers().await.unwrap_err();
        assert!(err.is_schema_not_ready());
    }
}
