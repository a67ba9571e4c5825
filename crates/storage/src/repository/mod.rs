pub mod competition;
pub mod leaderboard;
pub mod map;
pub mod schema;
pub mod season;

pub use competition::CompetitionRepository;
pub use leaderboard::LeaderboardRepository;
pub use map::MapRepository;
pub use schema::SchemaRepository;
pub use season::SeasonRepository;
