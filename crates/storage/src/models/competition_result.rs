use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResultStatus {
    Finished,
    Dnf,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Finished => "FINISHED",
            Self::Dnf => "DNF",
        }
    }

    /// Anything that is not a finish counts as a DNF.
    pub fn from_db(value: &str) -> Self {
        if value.eq_ignore_ascii_case("FINISHED") {
            Self::Finished
        } else {
            Self::Dnf
        }
    }
}

/// One viewer's outcome within a competition. Unique per (competition, viewer).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompetitionResult {
    pub competition_id: Uuid,
    pub viewer_id: String,
    pub viewer_login: String,
    pub viewer_display_name: String,
    pub viewer_avatar_url: Option<String>,
    pub is_bot: bool,
    pub finish_rank: i32,
    pub status: ResultStatus,
    pub finish_time_ms: Option<i64>,
    pub vehicle: Option<String>,
    pub distance_m: Option<f64>,
    pub progress: Option<f64>,
}
