use sqlx::{Postgres, QueryBuilder};

/// Case-insensitive value meaning "do not filter on this dimension".
pub const ALL_SENTINEL: &str = "ALL";

/// Upper bound on search needle length, in characters.
pub const MAX_SEARCH_CHARS: usize = 80;

/// Join every statistics query runs over. `c` is the competition, `r` the result.
pub const BASE_JOIN: &str = r#"
    FROM competitions c
    INNER JOIN competition_results r ON r.competition_id = c.competition_id
    WHERE 1=1
"#;

/// Columns that may appear as literal query text. Caller input never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    SeasonId,
    StreamerId,
    StreamerLogin,
    StreamerDisplayName,
    MapId,
    MapName,
    VehicleType,
    ViewerId,
    ViewerLogin,
    ViewerDisplayName,
}

impl Column {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::SeasonId => "c.season_id",
            Self::StreamerId => "c.streamer_id",
            Self::StreamerLogin => "c.streamer_login",
            Self::StreamerDisplayName => "c.streamer_display_name",
            Self::MapId => "c.map_id",
            Self::MapName => "c.map_name",
            Self::VehicleType => "c.vehicle_type",
            Self::ViewerId => "r.viewer_id",
            Self::ViewerLogin => "r.viewer_login",
            Self::ViewerDisplayName => "r.viewer_display_name",
        }
    }
}

const STREAMER_IDENTITY: &[Column] = &[
    Column::StreamerId,
    Column::StreamerLogin,
    Column::StreamerDisplayName,
];
const VIEWER_IDENTITY: &[Column] = &[
    Column::ViewerId,
    Column::ViewerLogin,
    Column::ViewerDisplayName,
];
const MAP_IDENTITY: &[Column] = &[Column::MapId, Column::MapName];

/// Normalized filter dimensions of a statistics query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    pub season_id: Option<String>,
    pub streamer_id: Option<String>,
    pub map_id: Option<String>,
    pub vehicle_type: Option<String>,
    pub streamer_search: Option<String>,
    pub viewer_search: Option<String>,
    pub map_search: Option<String>,
}

impl FilterSet {
    /// Exact-match value, or `None` when empty or the `ALL` sentinel.
    pub fn exact(value: Option<&str>) -> Option<String> {
        let value = value?.trim();
        if value.is_empty() || value.eq_ignore_ascii_case(ALL_SENTINEL) {
            return None;
        }
        Some(value.to_string())
    }

    /// Case-folded search needle capped at [`MAX_SEARCH_CHARS`].
    pub fn search(value: Option<&str>) -> Option<String> {
        let value = value?.trim();
        if value.is_empty() {
            return None;
        }
        Some(value.to_lowercase().chars().take(MAX_SEARCH_CHARS).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Equals { column: Column, value: String },
    /// Matches when any of `columns`, lowercased, contains `needle`.
    Contains {
        columns: &'static [Column],
        needle: String,
    },
    ExcludeBots,
}

/// Row access used to evaluate predicates outside of SQL.
pub trait ColumnSource {
    fn column(&self, column: Column) -> Option<&str>;
    fn is_bot(&self) -> bool;
}

/// Conjunction of predicates over the competition × result join.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredicateSet {
    predicates: Vec<Predicate>,
}

impl PredicateSet {
    /// Bot exclusion is only emitted when requested; callers pass `false`
    /// when the bot-flag column does not exist.
    pub fn build(filter: &FilterSet, exclude_bots: bool) -> Self {
        let mut predicates = Vec::new();

        let exact = [
            (Column::SeasonId, &filter.season_id),
            (Column::StreamerId, &filter.streamer_id),
            (Column::MapId, &filter.map_id),
            (Column::VehicleType, &filter.vehicle_type),
        ];
        for (column, value) in exact {
            if let Some(value) = value {
                predicates.push(Predicate::Equals {
                    column,
                    value: value.clone(),
                });
            }
        }

        let searches = [
            (STREAMER_IDENTITY, &filter.streamer_search),
            (VIEWER_IDENTITY, &filter.viewer_search),
            (MAP_IDENTITY, &filter.map_search),
        ];
        for (columns, needle) in searches {
            if let Some(needle) = needle {
                predicates.push(Predicate::Contains {
                    columns,
                    needle: needle.clone(),
                });
            }
        }

        if exclude_bots {
            predicates.push(Predicate::ExcludeBots);
        }

        Self { predicates }
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn excludes_bots(&self) -> bool {
        self.predicates.contains(&Predicate::ExcludeBots)
    }

    /// Appends ` AND <clause>` for every predicate; values go through `push_bind`.
    pub fn push_sql<'a>(&'a self, query: &mut QueryBuilder<'a, Postgres>) {
        for predicate in &self.predicates {
            match predicate {
                Predicate::Equals { column, value } => {
                    query.push(" AND ");
                    query.push(column.as_sql());
                    query.push(" = ");
                    query.push_bind(value.as_str());
                }
                Predicate::Contains { columns, needle } => {
                    query.push(" AND (");
                    for (i, column) in columns.iter().enumerate() {
                        if i > 0 {
                            query.push(" OR ");
                        }
                        query.push("strpos(LOWER(");
                        query.push(column.as_sql());
                        query.push("), ");
                        query.push_bind(needle.as_str());
                        query.push(") > 0");
                    }
                    query.push(")");
                }
                Predicate::ExcludeBots => {
                    query.push(" AND r.is_bot = FALSE");
                }
            }
        }
    }

    pub fn matches<R: ColumnSource + ?Sized>(&self, row: &R) -> bool {
        self.predicates.iter().all(|predicate| match predicate {
            Predicate::Equals { column, value } => row.column(*column) == Some(value.as_str()),
            Predicate::Contains { columns, needle } => columns.iter().any(|column| {
                row.column(*column)
                    .is_some_and(|text| text.to_lowercase().contains(needle.as_str()))
            }),
            Predicate::ExcludeBots => !row.is_bot(),
        })
    }
}
