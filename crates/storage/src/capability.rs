use std::time::Duration;

use moka::future::Cache;

use crate::store::SchemaIntrospector;

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Columns added by backward-compatible migrations that older deployments may lack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionalColumn {
    BotFlag,
    MapBaseline,
}

impl OptionalColumn {
    pub fn table(&self) -> &'static str {
        match self {
            Self::BotFlag => "competition_results",
            Self::MapBaseline => "maps",
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            Self::BotFlag => "is_bot",
            Self::MapBaseline => "expected_time_ms",
        }
    }
}

/// Memoized optional-column detection with a bounded TTL.
///
/// Introspection failures are reported as "absent" and are not cached, so the
/// next call tries again.
#[derive(Debug)]
pub struct SchemaProbe {
    entries: Cache<OptionalColumn, bool>,
}

impl Default for SchemaProbe {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl SchemaProbe {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Cache::builder().time_to_live(ttl).build(),
        }
    }

    pub async fn has_column<I>(&self, introspector: &I, column: OptionalColumn) -> bool
    where
        I: SchemaIntrospector + ?Sized,
    {
        if let Some(present) = self.entries.get(&column).await {
            return present;
        }

        match introspector
            .column_exists(column.table(), column.column())
            .await
        {
            Ok(present) => {
                tracing::debug!(
                    table = column.table(),
                    column = column.column(),
                    present,
                    "Schema probe refreshed"
                );
                self.entries.insert(column, present).await;
                present
            }
            Err(e) => {
                tracing::warn!(
                    table = column.table(),
                    column = column.column(),
                    error = %e,
                    "Schema probe failed, treating column as absent"
                );
                false
            }
        }
    }
}
