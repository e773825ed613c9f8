pub mod browse;
pub mod catalog;
pub mod fanout;
pub mod friends;
pub mod match_finder;
pub mod profiles;

pub use browse::DeckBuilder;
pub use catalog::{ContentCatalog, TmdbCatalog};
pub use match_finder::MatchFinder;
