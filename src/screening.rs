// 🔎 Screening Service - embed the payee, scan the watchlist, decide
// Fails closed: no usable embedding means no decision, never a default ALLOW

use crate::config::EntitySenseConfig;
use crate::embedding::{build_prompt, embed_checked, EmbeddingProvider};
use crate::error::{EntitySenseError, Result};
use crate::matching::{MatchingEngine, ScreeningDecision};
use crate::schema::ValidatePaymentRequest;
use crate::store::WatchlistStore;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct ScreeningService {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn WatchlistStore>,
    engine: MatchingEngine,
    prompt_delimiter: String,
    embedding_dimension: usize,
}

impl ScreeningService {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn WatchlistStore>,
        config: &EntitySenseConfig,
    ) -> Self {
        ScreeningService {
            provider,
            store,
            engine: MatchingEngine::new(config.distance_threshold),
            prompt_delimiter: config.prompt_delimiter.clone(),
            embedding_dimension: config.embedding_dimension,
        }
    }

    pub fn screen(&self, request: &ValidatePaymentRequest) -> Result<ScreeningDecision> {
        request.validate().map_err(EntitySenseError::Validation)?;

        info!(payee = %request.payee_name, "Validating payment");

        let prompt = build_prompt(
            &request.payee_name,
            request.payee_address.as_deref(),
            request.payee_country.as_deref(),
            &self.prompt_delimiter,
        );
        let input = embed_checked(self.provider.as_ref(), &prompt, self.embedding_dimension)
            .map_err(|e| {
                error!(payee = %request.payee_name, error = %e, "Failed to generate embedding for payee");
                e
            })?;

        let entries = self.store.find_all()?;
        let decision = self.engine.screen(&input, request.account(), &entries)?;

        if decision.is_blocked() {
            warn!(
                status = decision.status.as_str(),
                payee = %request.payee_name,
                matches = decision.matches.len(),
                closest = ?decision.matches.first().map(|m| m.id),
                "Payment blocked due to potential watchlist match"
            );
        } else {
            info!(
                status = decision.status.as_str(),
                payee = %request.payee_name,
                scanned = entries.len(),
                "Payment allowed, no matches found"
            );
        }

        Ok(decision)
    }
}
