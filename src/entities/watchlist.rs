// 🚫 Watchlist Entity - Known sanctioned or high-risk counterparty
//
// Identity: store-assigned id (never changes)
// Values: name, address, country, known accounts, risk category
// Embedding: generated once at enrollment from name + address + country

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// RISK CATEGORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskCategory {
    /// Listed by a sanctions authority
    Sanction,

    /// Money mule (account used to move illicit funds)
    Mule,

    /// Politically exposed person
    Pep,

    /// Shell company with no real operations
    ShellEntity,

    /// Linked to malware, ransomware or account takeover
    CyberThreat,

    /// Known scam operator
    ScamEntity,

    /// Linked to terrorist financing
    TerroristFinancing,

    /// Confirmed fraud
    Fraud,

    /// Other / Unknown
    Other,
}

impl RiskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Sanction => "SANCTION",
            RiskCategory::Mule => "MULE",
            RiskCategory::Pep => "PEP",
            RiskCategory::ShellEntity => "SHELL_ENTITY",
            RiskCategory::CyberThreat => "CYBER_THREAT",
            RiskCategory::ScamEntity => "SCAM_ENTITY",
            RiskCategory::TerroristFinancing => "TERRORIST_FINANCING",
            RiskCategory::Fraud => "FRAUD",
            RiskCategory::Other => "OTHER",
        }
    }

    pub fn all() -> &'static [RiskCategory] {
        &[
            RiskCategory::Sanction,
            RiskCategory::Mule,
            RiskCategory::Pep,
            RiskCategory::ShellEntity,
            RiskCategory::CyberThreat,
            RiskCategory::ScamEntity,
            RiskCategory::TerroristFinancing,
            RiskCategory::Fraud,
            RiskCategory::Other,
        ]
    }
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskCategory {
    type Err = String;

    /// Case-insensitive; accepts `-` or `_` as separator
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        RiskCategory::all()
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| format!("Unknown risk category: {}", s))
    }
}

// ============================================================================
// WATCHLIST ENTRY
// ============================================================================

/// Entry ready to be persisted (no id yet, the store assigns it)
#[derive(Debug, Clone, PartialEq)]
pub struct NewWatchlistEntry {
    pub name: String,
    pub address: Option<String>,
    pub country: Option<String>,
    pub known_accounts: Vec<String>,
    pub risk_category: RiskCategory,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl NewWatchlistEntry {
    pub fn new(
        name: String,
        address: Option<String>,
        country: Option<String>,
        known_accounts: Vec<String>,
        risk_category: RiskCategory,
        embedding: Vec<f32>,
    ) -> Self {
        NewWatchlistEntry {
            name,
            address,
            country,
            known_accounts,
            risk_category,
            embedding,
            created_at: Utc::now(),
        }
    }

    /// Attach the store-assigned identity
    pub fn with_id(self, id: i64) -> WatchlistEntry {
        WatchlistEntry {
            id,
            name: self.name,
            address: self.address,
            country: self.country,
            known_accounts: self.known_accounts,
            risk_category: self.risk_category,
            embedding: self.embedding,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistEntry {
    /// Stable identity assigned by the store - NEVER changes
    pub id: i64,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(default)]
    pub known_accounts: Vec<String>,

    pub risk_category: RiskCategory,

    /// Fixed-length vector from the embedding provider
    pub embedding: Vec<f32>,

    pub created_at: DateTime<Utc>,
}

impl WatchlistEntry {
    /// Exact membership test; an absent account never matches
    pub fn has_account(&self, account_number: Option<&str>) -> bool {
        match account_number {
            Some(account) => self.known_accounts.iter().any(|known| known == account),
            None => false,
        }
    }

    pub fn embedding_dimension(&self) -> usize {
        self.embedding.len()
    }
}
