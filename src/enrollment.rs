// ➕ Enrollment Service - embed identity text, then persist the entry
// An entry is never stored without a usable embedding

use crate::config::EntitySenseConfig;
use crate::embedding::{build_prompt, embed_checked, EmbeddingProvider};
use crate::entities::{NewWatchlistEntry, RiskCategory, WatchlistEntry};
use crate::error::{EntitySenseError, Result};
use crate::schema::{CreateWatchListEntityRequest, ValidationError};
use crate::store::WatchlistStore;
use serde::Deserialize;
use std::io::Read;
use std::sync::Arc;
use tracing::{error, info};

pub struct EnrollmentService {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn WatchlistStore>,
    prompt_delimiter: String,
    embedding_dimension: usize,
}

impl EnrollmentService {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn WatchlistStore>,
        config: &EntitySenseConfig,
    ) -> Self {
        EnrollmentService {
            provider,
            store,
            prompt_delimiter: config.prompt_delimiter.clone(),
            embedding_dimension: config.embedding_dimension,
        }
    }

    /// Validate → embed → persist. Any failure aborts before the store is touched
    /// (validation and embedding) or surfaces the store's own error.
    pub fn enroll(&self, request: &CreateWatchListEntityRequest) -> Result<WatchlistEntry> {
        request.validate().map_err(EntitySenseError::Validation)?;
        let risk_category = request
            .risk_category
            .ok_or_else(|| EntitySenseError::Validation(vec![ValidationError::required(
                "riskCategory",
                CreateWatchListEntityRequest::CONTEXT,
            )]))?;

        info!(name = %request.name, category = %risk_category, "Enrolling watchlist entry");

        let prompt = build_prompt(
            &request.name,
            request.address.as_deref(),
            request.country.as_deref(),
            &self.prompt_delimiter,
        );
        let embedding = embed_checked(self.provider.as_ref(), &prompt, self.embedding_dimension)
            .map_err(|e| {
                error!(name = %request.name, error = %e, "Failed to generate embedding for entry");
                e
            })?;

        let entry = NewWatchlistEntry::new(
            request.name.clone(),
            request.address.clone(),
            request.country.clone(),
            request.normalized_accounts(),
            risk_category,
            embedding,
        );

        let stored = self.store.create(entry)?;
        info!(id = stored.id, name = %stored.name, "Watchlist entry enrolled");
        Ok(stored)
    }

    /// Bulk enrollment from CSV with header `name,address,country,known_accounts,risk_category`.
    /// `known_accounts` is `;`-separated. Stops at the first failing row; rows before it
    /// stay enrolled.
    pub fn import_csv<R: Read>(&self, reader: R) -> Result<Vec<WatchlistEntry>> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut enrolled = Vec::new();

        for (index, result) in rdr.deserialize::<CsvWatchlistRow>().enumerate() {
            // Header is line 1
            let line = index + 2;
            let row = result.map_err(|e| csv_error(line, &e.to_string()))?;
            let request = row.into_request().map_err(|msg| csv_error(line, &msg))?;
            enrolled.push(self.enroll(&request).map_err(|e| at_line(line, e))?);
        }

        info!(count = enrolled.len(), "CSV import complete");
        Ok(enrolled)
    }
}

fn csv_error(line: usize, message: &str) -> EntitySenseError {
    EntitySenseError::Validation(vec![ValidationError::new(
        &format!("line {}", line),
        message,
        "CsvImport",
    )])
}

/// Tag a row-level enrollment failure with its CSV line, keeping the error kind
fn at_line(line: usize, err: EntitySenseError) -> EntitySenseError {
    match err {
        EntitySenseError::Validation(errors) => {
            let message = errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ");
            csv_error(line, &message)
        }
        EntitySenseError::EmbeddingUnavailable(msg) => {
            EntitySenseError::EmbeddingUnavailable(format!("line {}: {}", line, msg))
        }
        EntitySenseError::InvalidVector(msg) => {
            EntitySenseError::InvalidVector(format!("line {}: {}", line, msg))
        }
        EntitySenseError::StoreUnavailable(msg) => {
            EntitySenseError::StoreUnavailable(format!("line {}: {}", line, msg))
        }
    }
}

#[derive(Debug, Deserialize)]
struct CsvWatchlistRow {
    name: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    known_accounts: String,
    risk_category: String,
}

impl CsvWatchlistRow {
    fn into_request(self) -> std::result::Result<CreateWatchListEntityRequest, String> {
        let risk_category: RiskCategory = self.risk_category.parse()?;
        let non_empty = |s: String| {
            let trimmed = s.trim().to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        };

        Ok(CreateWatchListEntityRequest {
            name: self.name,
            address: non_empty(self.address),
            country: non_empty(self.country),
            known_accounts: Some(
                self.known_accounts
                    .split(';')
                    .map(|a| a.trim().to_string())
                    .collect(),
            ),
            risk_category: Some(risk_category),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryWatchlistStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns `[1, 0, 0]` for everything, or nothing when `fail` is set
    struct StubProvider {
        fail: bool,
    }

    impl EmbeddingProvider for StubProvider {
        fn embed(&self, _prompt: &str) -> Result<Vec<f32>> {
            if self.fail {
                Err(EntitySenseError::EmbeddingUnavailable("provider returned no embedding".into()))
            } else {
                Ok(vec![1.0, 0.0, 0.0])
            }
        }
    }

    /// Records prompts so tests can check the canonical text
    struct RecordingProvider {
        prompts: std::sync::Mutex<Vec<String>>,
    }

    impl EmbeddingProvider for RecordingProvider {
        fn embed(&self, prompt: &str) -> Result<Vec<f32>> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(vec![0.0, 1.0, 0.0])
        }
    }

    /// Counts create calls and otherwise delegates to memory
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryWatchlistStore,
        creates: AtomicUsize,
    }

    impl WatchlistStore for CountingStore {
        fn create(&self, entry: NewWatchlistEntry) -> Result<WatchlistEntry> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            self.inner.create(entry)
        }

        fn find_all(&self) -> Result<Vec<WatchlistEntry>> {
            self.inner.find_all()
        }
    }

    fn test_config() -> EntitySenseConfig {
        EntitySenseConfig {
            embedding_dimension: 3,
            ..Default::default()
        }
    }

    fn create_test_request(name: &str) -> CreateWatchListEntityRequest {
        CreateWatchListEntityRequest {
            name: name.to_string(),
            address: Some("10 Street".to_string()),
            country: Some("SG".to_string()),
            known_accounts: Some(vec!["AC999".to_string()]),
            risk_category: Some(RiskCategory::Sanction),
        }
    }

    #[test]
    fn test_enroll_persists_entry_with_embedding() {
        let store = Arc::new(CountingStore::default());
        let service = EnrollmentService::new(Arc::new(StubProvider { fail: false }), store.clone(), &test_config());

        let entry = service.enroll(&create_test_request("Test Corp")).unwrap();

        assert_eq!(entry.name, "Test Corp");
        assert_eq!(entry.embedding, vec![1.0, 0.0, 0.0]);
        assert_eq!(entry.known_accounts, vec!["AC999"]);
        assert_eq!(store.creates.load(Ordering::SeqCst), 1);
        assert_eq!(store.find_all().unwrap(), vec![entry]);
    }

    #[test]
    fn test_enroll_null_embedding_never_persists() {
        let store = Arc::new(CountingStore::default());
        let service = EnrollmentService::new(Arc::new(StubProvider { fail: true }), store.clone(), &test_config());

        let err = service.enroll(&create_test_request("Test Corp")).unwrap_err();

        assert!(matches!(err, EntitySenseError::EmbeddingUnavailable(_)));
        assert_eq!(store.creates.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_enroll_wrong_dimension_never_persists() {
        let store = Arc::new(CountingStore::default());
        let config = EntitySenseConfig {
            embedding_dimension: 768,
            ..Default::default()
        };
        let service = EnrollmentService::new(Arc::new(StubProvider { fail: false }), store.clone(), &config);

        let err = service.enroll(&create_test_request("Test Corp")).unwrap_err();

        assert!(matches!(err, EntitySenseError::EmbeddingUnavailable(_)));
        assert_eq!(store.creates.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_enroll_blank_name_rejected_before_provider() {
        let provider = Arc::new(RecordingProvider { prompts: Default::default() });
        let store = Arc::new(CountingStore::default());
        let service = EnrollmentService::new(provider.clone(), store.clone(), &test_config());

        let err = service.enroll(&create_test_request("  ")).unwrap_err();

        assert!(matches!(err, EntitySenseError::Validation(_)));
        assert!(provider.prompts.lock().unwrap().is_empty());
        assert_eq!(store.creates.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_enroll_builds_canonical_prompt() {
        let provider = Arc::new(RecordingProvider { prompts: Default::default() });
        let service = EnrollmentService::new(provider.clone(), Arc::new(MemoryWatchlistStore::new()), &test_config());

        let mut request = create_test_request("Bob");
        request.address = None;
        service.enroll(&request).unwrap();

        assert_eq!(provider.prompts.lock().unwrap().as_slice(), ["Bob ‖  ‖ SG"]);
    }

    #[test]
    fn test_import_csv_enrolls_rows() {
        let store = Arc::new(MemoryWatchlistStore::new());
        let service = EnrollmentService::new(Arc::new(StubProvider { fail: false }), store.clone(), &test_config());
        let csv = "name,address,country,known_accounts,risk_category\n\
                   Test Corp,10 Street,SG,AC1;AC2,SANCTION\n\
                   Bob,,,,mule\n";

        let enrolled = service.import_csv(csv.as_bytes()).unwrap();

        assert_eq!(enrolled.len(), 2);
        assert_eq!(enrolled[0].known_accounts, vec!["AC1", "AC2"]);
        assert_eq!(enrolled[1].risk_category, RiskCategory::Mule);
        assert_eq!(enrolled[1].address, None);
        assert!(enrolled[1].known_accounts.is_empty());
    }

    #[test]
    fn test_import_csv_stops_at_bad_row() {
        let store = Arc::new(MemoryWatchlistStore::new());
        let service = EnrollmentService::new(Arc::new(StubProvider { fail: false }), store.clone(), &test_config());
        let csv = "name,address,country,known_accounts,risk_category\n\
                   Test Corp,10 Street,SG,,SANCTION\n\
                   Bad Corp,,,,SMUGGLER\n\
                   Never Corp,,,,PEP\n";

        let err = service.import_csv(csv.as_bytes()).unwrap_err();

        match err {
            EntitySenseError::Validation(errors) => assert_eq!(errors[0].field, "line 3"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_import_csv_blank_name_names_the_line() {
        let store = Arc::new(MemoryWatchlistStore::new());
        let service = EnrollmentService::new(Arc::new(StubProvider { fail: false }), store.clone(), &test_config());
        let csv = "name,address,country,known_accounts,risk_category\n\
                   Test Corp,10 Street,SG,,SANCTION\n\
                   ,10 Street,SG,,MULE\n\
                   Never Corp,,,,PEP\n";

        let err = service.import_csv(csv.as_bytes()).unwrap_err();

        match err {
            EntitySenseError::Validation(errors) => {
                assert_eq!(errors[0].field, "line 3");
                assert_eq!(errors[0].context, "CsvImport");
                assert!(errors[0].message.contains("name"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_import_csv_provider_failure_names_the_line() {
        let store = Arc::new(CountingStore::default());
        let service = EnrollmentService::new(Arc::new(StubProvider { fail: true }), store.clone(), &test_config());
        let csv = "name,address,country,known_accounts,risk_category\n\
                   Test Corp,10 Street,SG,,SANCTION\n";

        let err = service.import_csv(csv.as_bytes()).unwrap_err();

        match err {
            EntitySenseError::EmbeddingUnavailable(msg) => assert!(msg.starts_with("line 2: ")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(store.creates.load(Ordering::SeqCst), 0);
    }
}
