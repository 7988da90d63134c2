// Business logic for short links on top of the record store
use std::sync::Arc;

use log::{debug, info, warn};
use validator::Validate;

use super::locks::KeyedLocks;
use crate::errors::ServiceError;
use crate::models::{CreateShortLinkDto, ShortLinkRecord, UpdateShortLinkDto};
use crate::store::{find_row, Column, RecordStore};
use crate::utils::id_generator;

type Result<T> = std::result::Result<T, ServiceError>;

const MAX_GENERATE_ATTEMPTS: usize = 5;

const CREATE_FAILED: &str = "Failed to create short URL";
const RESOLVE_FAILED: &str = "Failed to retrieve short URL";
const UPDATE_FAILED: &str = "Failed to update short URL";
const DELETE_FAILED: &str = "Failed to delete short URL";
const STATS_FAILED: &str = "Failed to retrieve short URL stats";

pub struct ShortLinkService {
    store: Arc<dyn RecordStore>,
    code_length: usize,
    locks: KeyedLocks,
}

impl ShortLinkService {
    pub fn new(store: Arc<dyn RecordStore>, code_length: usize) -> Self {
        Self {
            store,
            code_length,
            locks: KeyedLocks::new(),
        }
    }

    pub async fn create(&self, dto: CreateShortLinkDto) -> Result<ShortLinkRecord> {
        dto.validate()?;
        let url = dto.url.unwrap_or_default();
        let requested = dto.short_code_input.filter(|code| !code.is_empty());

        // Explicit codes hold the lock across scan and append
        let _guard = match &requested {
            Some(code) => Some(self.locks.lock(code).await),
            None => None,
        };

        let codes = self
            .store
            .list_codes()
            .await
            .map_err(ServiceError::store(CREATE_FAILED))?;

        let short_code = match requested {
            Some(code) => {
                if codes.iter().any(|c| *c == code) {
                    debug!("Short code '{}' is already taken", code);
                    return Err(ServiceError::Conflict(
                        "Short code already in use".to_string(),
                    ));
                }
                code
            }
            None => self.generate_unique(&codes)?,
        };

        let record = ShortLinkRecord::new(url, short_code);
        self.store
            .append_row(&record)
            .await
            .map_err(ServiceError::store(CREATE_FAILED))?;

        info!("Created short code '{}' for {}", record.short_code, record.url);
        Ok(record)
    }

    /// Returns the target URL and counts the access.
    pub async fn resolve(&self, code: &str) -> Result<Option<String>> {
        require_code(code)?;
        let _guard = self.locks.lock(code).await;
        let row = self.locate(code, RESOLVE_FAILED).await?;

        let url = self
            .store
            .read_cell(row, Column::Url)
            .await
            .map_err(ServiceError::store(RESOLVE_FAILED))?;
        let count = self.read_count(row, RESOLVE_FAILED).await?;

        self.store
            .write_cell(row, Column::Count, (count + 1).to_string())
            .await
            .map_err(ServiceError::store(RESOLVE_FAILED))?;

        debug!("Resolved '{}' (row {}), count is now {}", code, row, count + 1);
        Ok(url)
    }

    /// Overwrites the target URL only; `updatedAt` is left as created.
    pub async fn update(&self, code: &str, dto: UpdateShortLinkDto) -> Result<()> {
        let url = match dto.url.filter(|u| !u.is_empty()) {
            Some(url) if !code.is_empty() => url,
            _ => {
                return Err(ServiceError::Validation(
                    "Short code and URL are required".to_string(),
                ))
            }
        };

        let _guard = self.locks.lock(code).await;
        let row = self.locate(code, UPDATE_FAILED).await?;
        self.store
            .write_cell(row, Column::Url, url)
            .await
            .map_err(ServiceError::store(UPDATE_FAILED))?;

        info!("Updated short code '{}'", code);
        Ok(())
    }

    /// Clears every cell of the row so the columns stay aligned.
    pub async fn delete(&self, code: &str) -> Result<()> {
        require_code(code)?;
        let _guard = self.locks.lock(code).await;
        let row = self.locate(code, DELETE_FAILED).await?;
        self.store
            .clear_row(row)
            .await
            .map_err(ServiceError::store(DELETE_FAILED))?;

        info!("Deleted short code '{}' (row {})", code, row);
        Ok(())
    }

    pub async fn stats(&self, code: &str) -> Result<u64> {
        require_code(code)?;
        let row = self.locate(code, STATS_FAILED).await?;
        self.read_count(row, STATS_FAILED).await
    }

    async fn locate(&self, code: &str, failure: &'static str) -> Result<usize> {
        find_row(self.store.as_ref(), code)
            .await
            .map_err(ServiceError::store(failure))?
            .ok_or_else(|| ServiceError::NotFound("Short code not found".to_string()))
    }

    async fn read_count(&self, row: usize, failure: &'static str) -> Result<u64> {
        let cell = self
            .store
            .read_cell(row, Column::Count)
            .await
            .map_err(ServiceError::store(failure))?;
        Ok(parse_count(cell.as_deref()))
    }

    fn generate_unique(&self, taken: &[String]) -> Result<String> {
        for _ in 0..MAX_GENERATE_ATTEMPTS {
            let code = id_generator::generate_short_id(self.code_length);
            if !taken.contains(&code) {
                return Ok(code);
            }
            debug!("Generated short code '{}' collided, retrying", code);
        }
        Err(ServiceError::Internal(CREATE_FAILED.to_string()))
    }
}

fn require_code(code: &str) -> Result<()> {
    if code.is_empty() {
        return Err(ServiceError::Validation(
            "Short code is required".to_string(),
        ));
    }
    Ok(())
}

/// Blank or unreadable counts start from zero
fn parse_count(cell: Option<&str>) -> u64 {
    let Some(raw) = cell.map(str::trim).filter(|v| !v.is_empty()) else {
        return 0;
    };
    if let Ok(n) = raw.parse::<u64>() {
        return n;
    }
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() && n >= 0.0 => n as u64,
        _ => {
            warn!("Unreadable count cell '{}', treating as 0", raw);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;

    use super::*;
    use crate::errors::StoreError;
    use crate::store::{MemoryStore, MockRecordStore};

    fn service() -> (Arc<MemoryStore>, ShortLinkService) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), ShortLinkService::new(store, 6))
    }

    fn create_dto(url: &str, code: Option<&str>) -> CreateShortLinkDto {
        CreateShortLinkDto {
            url: Some(url.to_string()),
            short_code_input: code.map(str::to_string),
        }
    }

    fn unavailable() -> StoreError {
        StoreError::Unavailable("simulated".to_string())
    }

    #[tokio::test]
    async fn create_generates_code_and_resolves() {
        let (_, service) = service();
        let record = service
            .create(create_dto("https://a.com", None))
            .await
            .unwrap();

        assert_eq!(record.short_code.len(), 6);
        assert_eq!(record.count, 0);
        assert_eq!(
            service.resolve(&record.short_code).await.unwrap().as_deref(),
            Some("https://a.com")
        );
    }

    #[tokio::test]
    async fn create_accepts_explicit_code_verbatim() {
        let (_, service) = service();
        let record = service
            .create(create_dto("https://a.com", Some("my-link!")))
            .await
            .unwrap();
        assert_eq!(record.short_code, "my-link!");
    }

    #[tokio::test]
    async fn empty_explicit_code_is_generated_instead() {
        let (_, service) = service();
        let record = service
            .create(create_dto("https://a.com", Some("")))
            .await
            .unwrap();
        assert_eq!(record.short_code.len(), 6);
    }

    #[tokio::test]
    async fn resolve_counts_every_access() {
        let (_, service) = service();
        service
            .create(create_dto("https://a.com", Some("abc123")))
            .await
            .unwrap();

        for _ in 0..3 {
            service.resolve("abc123").await.unwrap();
        }
        assert_eq!(service.stats("abc123").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn concurrent_resolves_do_not_lose_increments() {
        let (_, service) = service();
        let service = Arc::new(service);
        service
            .create(create_dto("https://a.com", Some("hot")))
            .await
            .unwrap();

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.resolve("hot").await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(service.stats("hot").await.unwrap(), 20);
    }

    #[tokio::test]
    async fn update_changes_url_but_keeps_count() {
        let (store, service) = service();
        let record = service
            .create(create_dto("https://a.com", Some("abc123")))
            .await
            .unwrap();
        service.resolve("abc123").await.unwrap();

        service
            .update(
                "abc123",
                UpdateShortLinkDto {
                    url: Some("https://b.com".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(
            service.resolve("abc123").await.unwrap().as_deref(),
            Some("https://b.com")
        );
        assert_eq!(service.stats("abc123").await.unwrap(), 2);
        // updatedAt is not refreshed by an update
        assert_eq!(
            store.read_cell(1, Column::UpdatedAt).await.unwrap(),
            Some(record.updated_at)
        );
    }

    #[tokio::test]
    async fn update_requires_code_and_url() {
        let (_, service) = service();
        let err = service
            .update("abc", UpdateShortLinkDto { url: None })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Short code and URL are required");

        let err = service
            .update(
                "",
                UpdateShortLinkDto {
                    url: Some("https://b.com".into()),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn delete_then_resolve_is_not_found() {
        let (store, service) = service();
        service
            .create(create_dto("https://a.com", Some("gone")))
            .await
            .unwrap();
        service
            .create(create_dto("https://b.com", Some("kept")))
            .await
            .unwrap();

        service.delete("gone").await.unwrap();

        assert!(matches!(
            service.resolve("gone").await,
            Err(ServiceError::NotFound(_))
        ));
        // The row stays in place, so the next record still lines up
        assert_eq!(store.list_codes().await.unwrap(), vec!["", "kept"]);
        assert_eq!(
            service.resolve("kept").await.unwrap().as_deref(),
            Some("https://b.com")
        );
    }

    #[tokio::test]
    async fn deleted_code_can_be_reused_on_a_new_row() {
        let (store, service) = service();
        service
            .create(create_dto("https://a.com", Some("again")))
            .await
            .unwrap();
        service.delete("again").await.unwrap();
        service
            .create(create_dto("https://b.com", Some("again")))
            .await
            .unwrap();

        assert_eq!(store.list_codes().await.unwrap(), vec!["", "again"]);
        assert_eq!(service.stats("again").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_code_is_a_validation_error() {
        let (_, service) = service();
        for result in [
            service.resolve("").await.map(|_| ()),
            service.delete("").await,
            service.stats("").await.map(|_| ()),
        ] {
            let err = result.unwrap_err();
            assert_eq!(err.to_string(), "Short code is required");
            assert_eq!(err.status_code(), 400);
        }
    }

    #[tokio::test]
    async fn create_without_url_never_touches_the_store() {
        let mut store = MockRecordStore::new();
        store.expect_list_codes().never();
        store.expect_append_row().never();
        let service = ShortLinkService::new(Arc::new(store), 6);

        let err = service
            .create(CreateShortLinkDto::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "URL is required");
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn duplicate_code_is_rejected_without_append() {
        let mut store = MockRecordStore::new();
        store
            .expect_list_codes()
            .times(1)
            .returning(|| Ok(vec!["taken1".to_string()]));
        store.expect_append_row().never();
        let service = ShortLinkService::new(Arc::new(store), 6);

        let err = service
            .create(create_dto("https://a.com", Some("taken1")))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(err.to_string(), "Short code already in use");
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn unknown_code_never_mutates() {
        let mut store = MockRecordStore::new();
        store
            .expect_list_codes()
            .returning(|| Ok(vec!["abc".to_string()]));
        store.expect_read_cell().never();
        store.expect_write_cell().never();
        store.expect_clear_row().never();
        let service = ShortLinkService::new(Arc::new(store), 6);

        for result in [
            service.resolve("nope").await.map(|_| ()),
            service
                .update(
                    "nope",
                    UpdateShortLinkDto {
                        url: Some("https://b.com".into()),
                    },
                )
                .await,
            service.delete("nope").await,
            service.stats("nope").await.map(|_| ()),
        ] {
            let err = result.unwrap_err();
            assert_eq!(err.status_code(), 404);
            assert_eq!(err.to_string(), "Short code not found");
        }
    }

    #[tokio::test]
    async fn store_failures_use_operation_messages() {
        let mut store = MockRecordStore::new();
        store.expect_list_codes().returning(|| Err(unavailable()));
        store.expect_append_row().never();
        store.expect_write_cell().never();
        store.expect_clear_row().never();
        let service = ShortLinkService::new(Arc::new(store), 6);

        let cases = [
            (
                service
                    .create(create_dto("https://a.com", None))
                    .await
                    .map(|_| ()),
                CREATE_FAILED,
            ),
            (service.resolve("abc").await.map(|_| ()), RESOLVE_FAILED),
            (
                service
                    .update(
                        "abc",
                        UpdateShortLinkDto {
                            url: Some("https://b.com".into()),
                        },
                    )
                    .await,
                UPDATE_FAILED,
            ),
            (service.delete("abc").await, DELETE_FAILED),
            (service.stats("abc").await.map(|_| ()), STATS_FAILED),
        ];

        for (result, message) in cases {
            let err = result.unwrap_err();
            assert_eq!(err.status_code(), 500);
            assert_eq!(err.to_string(), message);
        }
    }

    #[tokio::test]
    async fn failed_append_reports_create_failure() {
        let mut store = MockRecordStore::new();
        store.expect_list_codes().returning(|| Ok(Vec::new()));
        store
            .expect_append_row()
            .times(1)
            .returning(|_| Err(unavailable()));
        let service = ShortLinkService::new(Arc::new(store), 6);

        let err = service
            .create(create_dto("https://a.com", Some("fresh")))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), CREATE_FAILED);
    }

    #[tokio::test]
    async fn failed_count_write_reports_resolve_failure() {
        let mut store = MockRecordStore::new();
        store
            .expect_list_codes()
            .returning(|| Ok(vec!["abc".to_string()]));
        store
            .expect_read_cell()
            .with(eq(1), eq(Column::Url))
            .returning(|_, _| Ok(Some("https://a.com".to_string())));
        store
            .expect_read_cell()
            .with(eq(1), eq(Column::Count))
            .returning(|_, _| Ok(Some("4".to_string())));
        store
            .expect_write_cell()
            .with(eq(1), eq(Column::Count), eq("5".to_string()))
            .times(1)
            .returning(|_, _, _| Err(unavailable()));
        let service = ShortLinkService::new(Arc::new(store), 6);

        let err = service.resolve("abc").await.unwrap_err();
        assert_eq!(err.to_string(), RESOLVE_FAILED);
    }

    #[test]
    fn parses_count_cells() {
        assert_eq!(parse_count(None), 0);
        assert_eq!(parse_count(Some("")), 0);
        assert_eq!(parse_count(Some("7")), 7);
        assert_eq!(parse_count(Some(" 3 ")), 3);
        assert_eq!(parse_count(Some("2.0")), 2);
        assert_eq!(parse_count(Some("many")), 0);
    }
}
