use std::sync::Arc;
use std::time::Duration;

use storage::{
    SchemaProbe, StatsStore,
    services::{AchievementEvaluator, LoggingAchievementEvaluator},
};

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::error::WebError;
use crate::middleware::auth::{ApiKeys, StreamerKeys};

#[derive(Debug, Clone, Copy)]
pub struct CacheTtl {
    pub leaderboard: Duration,
    pub metadata: Duration,
}

#[derive(Clone)]
pub struct AppState {
    store: Option<Arc<dyn StatsStore>>,
    pub probe: Arc<SchemaProbe>,
    pub cache: ResponseCache,
    pub cache_ttl: CacheTtl,
    pub achievements: Arc<dyn AchievementEvaluator>,
    pub streamer_keys: StreamerKeys,
    pub admin_keys: ApiKeys,
}

impl AppState {
    pub fn new(store: Option<Arc<dyn StatsStore>>, config: &Config) -> Self {
        Self {
            store,
            probe: Arc::new(SchemaProbe::new(config.schema_probe_ttl)),
            cache: ResponseCache::new(config.response_cache_max_entries),
            cache_ttl: CacheTtl {
                leaderboard: config.leaderboard_cache_ttl,
                metadata: config.metadata_cache_ttl,
            },
            achievements: Arc::new(LoggingAchievementEvaluator),
            streamer_keys: StreamerKeys::from_comma_separated(&config.streamer_keys),
            admin_keys: ApiKeys::from_comma_separated(&config.admin_keys),
        }
    }

    pub fn with_achievements(mut self, achievements: Arc<dyn AchievementEvaluator>) -> Self {
        self.achievements = achievements;
        self
    }

    pub fn store(&self) -> Result<&dyn StatsStore, WebError> {
        self.store.as_deref().ok_or(WebError::StoreNotConfigured)
    }
}
