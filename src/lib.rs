// EntitySense - Core Library
// Screens payment counterparties against a watchlist of high-risk entities.
// Exposes all modules for use in CLI, API server, and tests

pub mod error;
pub mod config;
pub mod entities;
pub mod schema;         // Request shapes + validation
pub mod similarity;     // Cosine distance
pub mod matching;       // Threshold/ranking policy → ALLOW / BLOCK
pub mod embedding;      // Text → vector providers
pub mod store;          // Watchlist persistence
pub mod enrollment;
pub mod screening;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use error::{EntitySenseError, Result};
pub use config::EntitySenseConfig;
pub use entities::{NewWatchlistEntry, RiskCategory, WatchlistEntry};
pub use schema::{
    CreateWatchListEntityRequest, ValidatePaymentRequest, ValidationError, ValidationResult,
};
pub use similarity::cosine_distance;
pub use matching::{MatchResult, MatchingEngine, ScreeningDecision, ScreeningStatus};
pub use embedding::{
    build_prompt, embed_checked, EmbeddingProvider, HashingEmbeddingProvider,
    OllamaEmbeddingProvider,
};
pub use store::{
    Event, MemoryWatchlistStore, SqliteWatchlistStore, WatchlistStore,
    setup_database, insert_event,
};
pub use enrollment::EnrollmentService;
pub use screening::ScreeningService;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
