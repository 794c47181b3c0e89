// Entity Models
// A watchlist entry keeps its store-assigned identity for life; values are never mutated

pub mod watchlist;

pub use watchlist::{NewWatchlistEntry, RiskCategory, WatchlistEntry};
