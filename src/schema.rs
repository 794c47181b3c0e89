// 📐 Shape Layer - Request schemas and validation
// Validates enrollment and screening requests before any remote call

use crate::entities::RiskCategory;
use serde::{Deserialize, Serialize};

// ============================================================================
// VALIDATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub context: String,
}

impl ValidationError {
    pub fn new(field: &str, message: &str, context: &str) -> Self {
        ValidationError {
            field: field.to_string(),
            message: message.to_string(),
            context: context.to_string(),
        }
    }

    /// Required field is missing or blank
    pub fn required(field: &str, context: &str) -> Self {
        Self::new(field, "Required field is missing or blank", context)
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.context, self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), Vec<ValidationError>>;

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

// ============================================================================
// ENROLLMENT REQUEST
// ============================================================================

/// Request to add a sanctioned or high-risk entity to the watchlist
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWatchListEntityRequest {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub country: Option<String>,

    #[serde(default)]
    pub known_accounts: Option<Vec<String>>,

    #[serde(default)]
    pub risk_category: Option<RiskCategory>,
}

impl CreateWatchListEntityRequest {
    pub const CONTEXT: &'static str = "WatchlistEntry";

    pub fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        if is_blank(&self.name) {
            errors.push(ValidationError::required("name", Self::CONTEXT));
        }

        if self.risk_category.is_none() {
            errors.push(ValidationError::required("riskCategory", Self::CONTEXT));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Known accounts with blank identifiers dropped, duplicates removed (first wins)
    pub fn normalized_accounts(&self) -> Vec<String> {
        let mut accounts: Vec<String> = Vec::new();
        for account in self.known_accounts.iter().flatten() {
            if !is_blank(account) && !accounts.contains(account) {
                accounts.push(account.clone());
            }
        }
        accounts
    }
}

// ============================================================================
// SCREENING REQUEST
// ============================================================================

/// Payment counterparty to screen against the watchlist
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePaymentRequest {
    #[serde(default)]
    pub payee_name: String,

    #[serde(default)]
    pub payee_address: Option<String>,

    #[serde(default)]
    pub payee_country: Option<String>,

    #[serde(default)]
    pub account_number: Option<String>,
}

impl ValidatePaymentRequest {
    pub const CONTEXT: &'static str = "Payment";

    pub fn validate(&self) -> ValidationResult {
        if is_blank(&self.payee_name) {
            return Err(vec![ValidationError::required("payeeName", Self::CONTEXT)]);
        }
        Ok(())
    }

    /// Account number to match, absent when missing or blank
    pub fn account(&self) -> Option<&str> {
        self.account_number.as_deref().filter(|a| !is_blank(a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrollment_requires_name_and_category() {
        let request = CreateWatchListEntityRequest {
            name: "   ".to_string(),
            ..Default::default()
        };

        let errors = request.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "name");
        assert_eq!(errors[1].field, "riskCategory");
    }

    #[test]
    fn test_enrollment_valid_request() {
        let request = CreateWatchListEntityRequest {
            name: "Test Corp".to_string(),
            risk_category: Some(RiskCategory::Sanction),
            ..Default::default()
        };

        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_normalized_accounts_drops_blanks_and_duplicates() {
        let request = CreateWatchListEntityRequest {
            name: "Bob".to_string(),
            known_accounts: Some(vec![
                "AC999".to_string(),
                "".to_string(),
                "  ".to_string(),
                "AC999".to_string(),
                "AC100".to_string(),
            ]),
            risk_category: Some(RiskCategory::Mule),
            ..Default::default()
        };

        assert_eq!(request.normalized_accounts(), vec!["AC999", "AC100"]);
    }

    #[test]
    fn test_enrollment_request_camel_case_json() {
        let json = r#"{
            "name": "Test Corp",
            "address": "10 Street",
            "country": "SG",
            "knownAccounts": ["AC1"],
            "riskCategory": "SHELL_ENTITY"
        }"#;

        let request: CreateWatchListEntityRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.name, "Test Corp");
        assert_eq!(request.known_accounts, Some(vec!["AC1".to_string()]));
        assert_eq!(request.risk_category, Some(RiskCategory::ShellEntity));
    }

    #[test]
    fn test_payment_requires_payee_name() {
        let request = ValidatePaymentRequest::default();
        let errors = request.validate().unwrap_err();

        assert_eq!(errors[0].field, "payeeName");
        assert_eq!(errors[0].to_string(), "[Payment] payeeName: Required field is missing or blank");
    }

    #[test]
    fn test_payment_blank_account_is_absent() {
        let mut request = ValidatePaymentRequest {
            payee_name: "Unknown Corp".to_string(),
            account_number: Some(" ".to_string()),
            ..Default::default()
        };
        assert_eq!(request.account(), None);

        request.account_number = Some("AC999".to_string());
        assert_eq!(request.account(), Some("AC999"));
    }
}
