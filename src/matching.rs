// 🎯 Matching Engine - scan the watchlist and decide ALLOW / BLOCK
// Full scan, O(n) per call: no index, no early termination

use crate::entities::{RiskCategory, WatchlistEntry};
use crate::error::Result;
use crate::similarity::cosine_distance;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// ============================================================================
// SCREENING STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScreeningStatus {
    /// No watchlist entry matched
    Allow,

    /// At least one entry matched by similarity or account
    Block,
}

impl ScreeningStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreeningStatus::Allow => "ALLOW",
            ScreeningStatus::Block => "BLOCK",
        }
    }
}

// ============================================================================
// MATCH RESULT
// ============================================================================

/// One watchlist entry that matched a payment (not persisted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub id: i64,
    pub name: String,
    pub risk_category: RiskCategory,

    /// Cosine distance to the payee embedding, in [0, 2]
    pub distance: f64,

    /// Payment account is an exact member of the entry's known accounts
    pub matched_account: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_accounts: Option<Vec<String>>,
}

impl MatchResult {
    fn from_entry(entry: &WatchlistEntry, distance: f64, matched_account: bool) -> Self {
        MatchResult {
            id: entry.id,
            name: entry.name.clone(),
            risk_category: entry.risk_category,
            distance,
            matched_account,
            address: entry.address.clone(),
            country: entry.country.clone(),
            known_accounts: if entry.known_accounts.is_empty() {
                None
            } else {
                Some(entry.known_accounts.clone())
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningDecision {
    pub status: ScreeningStatus,

    /// Ascending by distance; ties broken by entry id
    #[serde(rename = "possibleWatchListEntityMatches")]
    pub matches: Vec<MatchResult>,
}

impl ScreeningDecision {
    /// Status follows directly from whether anything matched
    pub fn from_matches(matches: Vec<MatchResult>) -> Self {
        let status = if matches.is_empty() {
            ScreeningStatus::Allow
        } else {
            ScreeningStatus::Block
        };
        ScreeningDecision { status, matches }
    }

    pub fn is_blocked(&self) -> bool {
        self.status == ScreeningStatus::Block
    }
}

// ============================================================================
// MATCHING ENGINE
// ============================================================================

pub struct MatchingEngine {
    /// Entries strictly below this distance are similarity matches
    pub distance_threshold: f64,
}

impl MatchingEngine {
    pub fn new(distance_threshold: f64) -> Self {
        MatchingEngine { distance_threshold }
    }

    /// Score every entry, keep similarity or account matches, rank ascending by distance.
    ///
    /// Fails with `InvalidVector` if any stored embedding has a different length than
    /// `input`; a partial decision is never returned.
    pub fn screen(
        &self,
        input: &[f32],
        account_number: Option<&str>,
        entries: &[WatchlistEntry],
    ) -> Result<ScreeningDecision> {
        let mut matches = Vec::new();

        for entry in entries {
            let distance = cosine_distance(input, &entry.embedding)?;
            let matched_account = entry.has_account(account_number);

            if distance < self.distance_threshold || matched_account {
                matches.push(MatchResult::from_entry(entry, distance, matched_account));
            }
        }

        matches.sort_by(rank);

        Ok(ScreeningDecision::from_matches(matches))
    }
}

fn rank(a: &MatchResult, b: &MatchResult) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.id.cmp(&b.id))
}
