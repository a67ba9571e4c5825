use storage::{
    dto::submission::{SubmitCompetitionResponse, ValidatedSubmission},
    services::submit_competition,
};

use crate::error::WebResult;
use crate::state::AppState;

pub async fn submit(
    state: &AppState,
    submission: &ValidatedSubmission,
) -> WebResult<SubmitCompetitionResponse> {
    let store = state.store()?;
    let outcome =
        submit_competition(store, &state.probe, state.achievements.as_ref(), submission).await?;
    Ok(outcome.into())
}
