use crate::capability::{OptionalColumn, SchemaProbe};
use crate::dto::leaderboard::{LeaderboardQuery, LeaderboardResponse};
use crate::dto::metadata::MetadataResponse;
use crate::error::Result;
use crate::query::PredicateSet;
use crate::store::StatsStore;

use super::aggregation::aggregate_viewers;

/// Runs one leaderboard query: count, clamp the page, aggregate, sort, window.
///
/// The count and the row fetch share one predicate set, so `totalPages`
/// always describes the same population the window is cut from.
pub async fn query_leaderboard<S>(
    store: &S,
    probe: &SchemaProbe,
    query: &LeaderboardQuery,
) -> Result<LeaderboardResponse>
where
    S: StatsStore + ?Sized,
{
    let exclude_bots =
        !query.show_bots && probe.has_column(store, OptionalColumn::BotFlag).await;
    let predicates = PredicateSet::build(&query.filters, exclude_bots);

    let total_items = store.count_viewers(&predicates).await?;
    let window = query.page.resolve(total_items);

    let rows = if total_items > 0 {
        store.fetch_result_rows(&predicates).await?
    } else {
        Vec::new()
    };
    let row_count = rows.len();

    let mut viewers = aggregate_viewers(rows);
    query.order.sort(&mut viewers);
    let items: Vec<_> = viewers
        .into_iter()
        .skip(window.offset())
        .take(window.limit())
        .collect();

    tracing::debug!(
        total_items,
        row_count,
        page = window.page,
        total_pages = window.total_pages,
        sort_by = ?query.order.key,
        exclude_bots,
        "Leaderboard computed"
    );

    Ok(LeaderboardResponse::new(window, query.order, items))
}

pub async fn list_metadata<S>(store: &S) -> Result<MetadataResponse>
where
    S: StatsStore + ?Sized,
{
    let streamers = store.list_streamers().await?;
    let maps = store.list_maps().await?;
    Ok(MetadataResponse {
        ok: true,
        streamers,
        maps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::common::PageRequest;
    use crate::dto::leaderboard::LeaderboardParams;
    use crate::error::StorageError;
    use crate::memory::MemoryStore;
    use crate::test_support::{bot, dnf, finished, submission};

    fn params(pairs: &[(&str, &str)]) -> LeaderboardQuery {
        let mut params = LeaderboardParams::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "season" => params.season = value,
                "streamer" => params.streamer = value,
                "map" => params.map = value,
                "viewerSearch" => params.viewer_search = value,
                "mapSearch" => params.map_search = value,
                "sortBy" => params.sort_by = value,
                "sortDir" => params.sort_dir = value,
                "page" => params.page = value,
                "pageSize" => params.page_size = value,
                "showBots" => params.show_bots = value,
                other => panic!("unknown parameter {other}"),
            }
        }
        params.into_query()
    }

    async fn three_viewer_race() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .upsert_submission(
                &submission(
                    "harbor",
                    1,
                    None,
                    vec![finished("A", 1, 10_000), finished("B", 2, 12_000), dnf("C", 3)],
                ),
                None,
                true,
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_three_viewer_race_ranking() {
        let store = three_viewer_race().await;
        let probe = SchemaProbe::default();
        let response = query_leaderboard(&store, &probe, &params(&[("pageSize", "10")]))
            .await
            .unwrap();

        assert_eq!(response.total_items, 3);
        assert_eq!(response.page_size, 10);
        let ids: Vec<_> = response.items.iter().map(|v| v.viewer_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);

        let c = &response.items[2];
        assert_eq!(c.dnf_count, 1);
        assert_eq!(c.best_finish_pos, None);
        assert_eq!(c.best_time_ms, None);
    }

    #[tokio::test]
    async fn test_page_beyond_end_returns_last_page() {
        let store = MemoryStore::new();
        let results = (0..8)
            .map(|i| finished(&format!("v{i}"), i + 1, 10_000 + i64::from(i)))
            .collect();
        store
            .upsert_submission(&submission("harbor", 1, None, results), None, true)
            .await
            .unwrap();

        let probe = SchemaProbe::default();
        let query = params(&[("page", "5"), ("pageSize", "5")]);
        let response = query_leaderboard(&store, &probe, &query).await.unwrap();
        assert_eq!(response.total_pages, 2);
        assert_eq!(response.page, 2);
        assert_eq!(response.items.len(), 3);
    }

    #[tokio::test]
    async fn test_pages_partition_the_viewers() {
        let store = MemoryStore::new();
        for race in 0..3 {
            let results = (0..9)
                .map(|i| {
                    let viewer = format!("v{}", (i + race) % 12);
                    finished(&viewer, i + 1, 20_000 - i64::from(i))
                })
                .collect();
            store
                .upsert_submission(&submission("harbor", 1, None, results), None, true)
                .await
                .unwrap();
        }

        let probe = SchemaProbe::default();
        let mut query = params(&[("sortBy", "p50TimeMs"), ("sortDir", "asc")]);
        query.page = PageRequest::new(Some(1), Some(5));
        let first = query_leaderboard(&store, &probe, &query).await.unwrap();

        let mut seen = Vec::new();
        for page in 1..=first.total_pages {
            query.page = PageRequest::new(Some(i64::from(page)), Some(5));
            let response = query_leaderboard(&store, &probe, &query).await.unwrap();
            seen.extend(response.items.into_iter().map(|v| v.viewer_id));
        }

        assert_eq!(seen.len() as i64, first.total_items);
        let mut unique = seen.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), seen.len());
    }

    #[tokio::test]
    async fn test_bots_hidden_unless_requested() {
        let store = MemoryStore::new();
        let race = submission(
            "harbor",
            1,
            None,
            vec![bot("bot:1", 1, 5_000), finished("A", 2, 9_000)],
        );
        store
            .upsert_submission(&race, None, true)
            .await
            .unwrap();
        let probe = SchemaProbe::default();

        let hidden = query_leaderboard(&store, &probe, &params(&[])).await.unwrap();
        assert_eq!(hidden.total_items, 1);

        let shown = query_leaderboard(&store, &probe, &params(&[("showBots", "1")]))
            .await
            .unwrap();
        assert_eq!(shown.total_items, 2);
    }

    #[tokio::test]
    async fn test_bots_included_when_flag_column_missing() {
        let store = MemoryStore::new().with_bot_flag_column(false);
        let race = submission(
            "harbor",
            1,
            None,
            vec![bot("bot:1", 1, 5_000), finished("A", 2, 9_000)],
        );
        store
            .upsert_submission(&race, None, false)
            .await
            .unwrap();
        let probe = SchemaProbe::default();

        let response = query_leaderboard(&store, &probe, &params(&[])).await.unwrap();
        assert_eq!(response.total_items, 2);
    }

    #[tokio::test]
    async fn test_filters_and_search_narrow_the_population() {
        let store = three_viewer_race().await;
        store
            .upsert_submission(
                &submission("canyon", 1, None, vec![finished("D", 1, 30_000)]),
                None,
                true,
            )
            .await
            .unwrap();
        let probe = SchemaProbe::default();

        let by_map = query_leaderboard(&store, &probe, &params(&[("map", "canyon")]))
            .await
            .unwrap();
        assert_eq!(by_map.total_items, 1);

        let all = query_leaderboard(&store, &probe, &params(&[("map", "all")]))
            .await
            .unwrap();
        assert_eq!(all.total_items, 4);

        let search = query_leaderboard(&store, &probe, &params(&[("mapSearch", "HARB")]))
            .await
            .unwrap();
        assert_eq!(search.total_items, 3);

        let viewer = query_leaderboard(&store, &probe, &params(&[("viewerSearch", "b")]))
            .await
            .unwrap();
        assert_eq!(viewer.items.len(), 1);
        assert_eq!(viewer.items[0].viewer_id, "B");
    }

    #[tokio::test]
    async fn test_empty_store_returns_single_empty_page() {
        let store = MemoryStore::new();
        let probe = SchemaProbe::default();
        let response = query_leaderboard(&store, &probe, &params(&[("page", "3")]))
            .await
            .unwrap();
        assert_eq!(response.total_items, 0);
        assert_eq!(response.total_pages, 1);
        assert_eq!(response.page, 1);
        assert!(response.items.is_empty());
    }

    #[tokio::test]
    async fn test_uninitialized_store_reports_schema_not_ready() {
        let store = MemoryStore::uninitialized();
        let probe = SchemaProbe::default();
        let err = query_leaderboard(&store, &probe, &params(&[])).await.unwrap_err();
        assert!(matches!(err, StorageError::SchemaNotReady(_)));
    }

    #[tokio::test]
    async fn test_metadata_lists_streamers_and_maps() {
        let store = three_viewer_race().await;
        let metadata = list_metadata(&store).await.unwrap();
        assert!(metadata.ok);
        assert_eq!(metadata.streamers.len(), 1);
        assert_eq!(metadata.streamers[0].competitions, 1);
        assert_eq!(metadata.maps[0].map_id, "harbor");
    }
}
