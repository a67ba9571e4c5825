pub mod competition;
pub mod competition_result;
pub mod map;
pub mod season;

pub use competition::Competition;
pub use competition_result::{CompetitionResult, ResultStatus};
pub use map::Map;
pub use season::Season;
