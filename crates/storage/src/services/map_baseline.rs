//! Derives a map's expected finish time from historical winning times.

use serde::Serialize;
use utoipa::ToSchema;

use crate::capability::{OptionalColumn, SchemaProbe};
use crate::error::Result;
use crate::models::Map;
use crate::store::{BaselineScope, StatsStore, VersionMatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The deployment predates the baseline column.
    ColumnMissing,
    UnknownMap,
}

/// What a recompute did to the stored baseline.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BaselineOutcome {
    #[serde(rename_all = "camelCase")]
    Updated {
        expected_time_ms: i64,
        samples: usize,
        included_bots: bool,
    },
    /// Nothing usable was found; the stored value was left as it was.
    NoSamples,
    Skipped { reason: SkipReason },
    Failed { message: String },
}

impl BaselineScope {
    /// Scopes to the map's content hash when known, else to its version number.
    pub fn for_map(map: &Map, exclude_bots: bool) -> Self {
        let version = match &map.content_hash {
            Some(hash) if !hash.trim().is_empty() => VersionMatch::Hash(hash.clone()),
            _ => VersionMatch::Version(map.version),
        };
        Self {
            map_id: map.map_id.clone(),
            version,
            exclude_bots,
        }
    }
}

/// Mean of the winning times, rounded to the nearest millisecond.
pub fn average_winning_time(times: &[i64]) -> Option<i64> {
    if times.is_empty() {
        return None;
    }
    let sum: i128 = times.iter().map(|t| i128::from(*t)).sum();
    Some((sum as f64 / times.len() as f64).round() as i64)
}

/// Recomputes and stores the baseline of `map_id`.
///
/// Human winning times are preferred. When the bot flag exists and no human
/// sample is found, the recompute is retried once with bots included. The
/// stored value is only written when at least one sample exists.
pub async fn recompute_map_baseline<S>(
    store: &S,
    probe: &SchemaProbe,
    map_id: &str,
) -> Result<BaselineOutcome>
where
    S: StatsStore + ?Sized,
{
    if !probe.has_column(store, OptionalColumn::MapBaseline).await {
        tracing::debug!(map_id, "Baseline column missing, skipping recompute");
        return Ok(BaselineOutcome::Skipped {
            reason: SkipReason::ColumnMissing,
        });
    }

    let Some(map) = store.find_map(map_id, true).await? else {
        return Ok(BaselineOutcome::Skipped {
            reason: SkipReason::UnknownMap,
        });
    };

    let bot_flag = probe.has_column(store, OptionalColumn::BotFlag).await;
    let mut scope = BaselineScope::for_map(&map, bot_flag);
    let mut times = store.winning_times(&scope).await?;

    if times.is_empty() && scope.exclude_bots {
        tracing::debug!(map_id, "No human winning times, retrying with bots");
        scope.exclude_bots = false;
        times = store.winning_times(&scope).await?;
    }

    let Some(expected_time_ms) = average_winning_time(&times) else {
        tracing::info!(map_id, "No usable winning times, baseline left unchanged");
        return Ok(BaselineOutcome::NoSamples);
    };

    store.write_map_baseline(map_id, expected_time_ms).await?;
    tracing::info!(
        map_id,
        expected_time_ms,
        samples = times.len(),
        previous = ?map.expected_time_ms,
        "Map baseline updated"
    );

    Ok(BaselineOutcome::Updated {
        expected_time_ms,
        samples: times.len(),
        included_bots: !scope.exclude_bots,
    })
}
