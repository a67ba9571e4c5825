pub mod competitions;
pub mod maps;
pub mod stats;
