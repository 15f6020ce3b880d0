//! Knowledge base lifecycle service - create, populate, synchronize, inspect and delete

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::domain::knowledge_base::{
    DeleteOptions, IngestionJobStatus, KnowledgeBaseControlPlane, KnowledgeBaseDetails,
    KnowledgeBaseHandle, KnowledgeBaseStatus, KnowledgeBaseSummary, UploadReport,
};
use crate::domain::DomainError;

/// Page size used for every listing; no further pages are requested
pub const LIST_PAGE_SIZE: i32 = 100;

/// Bounds on waiting for an ingestion job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(900),
            poll_interval: Duration::from_secs(5),
        }
    }
}

impl SyncSettings {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }
}

/// Manages a knowledge base by name.
///
/// Nothing is cached: every operation resolves the name to an id against the
/// control plane first.
pub struct KnowledgeBaseLifecycleService {
    control_plane: Arc<dyn KnowledgeBaseControlPlane>,
    sync: SyncSettings,
}

impl std::fmt::Debug for KnowledgeBaseLifecycleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBaseLifecycleService")
            .field("sync", &self.sync)
            .finish()
    }
}

impl KnowledgeBaseLifecycleService {
    pub fn new(control_plane: Arc<dyn KnowledgeBaseControlPlane>) -> Self {
        Self {
            control_plane,
            sync: SyncSettings::default(),
        }
    }

    pub fn with_sync_settings(mut self, sync: SyncSettings) -> Self {
        self.sync = sync;
        self
    }

    /// Look up a knowledge base id by name
    pub async fn resolve_id(&self, name: &str) -> Result<Option<String>, DomainError> {
        Ok(self
            .find_summary(name)
            .await?
            .map(|summary| summary.id))
    }

    async fn find_summary(&self, name: &str) -> Result<Option<KnowledgeBaseSummary>, DomainError> {
        let summaries = self.control_plane.list_knowledge_bases(LIST_PAGE_SIZE).await?;
        Ok(summaries.into_iter().find(|summary| summary.name == name))
    }

    async fn resolve_required(&self, name: &str) -> Result<String, DomainError> {
        self.resolve_id(name).await?.ok_or_else(|| {
            DomainError::not_found(format!("Knowledge base '{}' not found", name))
        })
    }

    /// Return the existing knowledge base named `name`, or provision it.
    ///
    /// The returned handle always carries a data source id.
    pub async fn create_or_retrieve(
        &self,
        name: &str,
        description: &str,
    ) -> Result<KnowledgeBaseHandle, DomainError> {
        let (kb_id, status) = match self.find_summary(name).await? {
            Some(existing) => {
                info!(kb_name = %name, kb_id = %existing.id, "Knowledge base already exists");
                (existing.id, existing.status)
            }
            None => {
                info!(kb_name = %name, "Provisioning knowledge base");
                let kb_id = self
                    .control_plane
                    .provision_knowledge_base(name, description)
                    .await?;
                (kb_id, KnowledgeBaseStatus::Active)
            }
        };

        let data_source_id = match self
            .control_plane
            .list_data_sources(&kb_id)
            .await?
            .into_iter()
            .next()
        {
            Some(ds_id) => ds_id,
            None => self.control_plane.create_data_source(&kb_id, name).await?,
        };

        Ok(KnowledgeBaseHandle {
            name: name.to_string(),
            id: kb_id,
            data_source_id: Some(data_source_id),
            status,
        })
    }

    /// Upload every regular, non-hidden file under `local_path` to `bucket_name`.
    ///
    /// Keys are paths relative to `local_path` with `/` separators. Uploaded
    /// objects are kept when a later file fails.
    pub async fn upload_directory(
        &self,
        local_path: &Path,
        bucket_name: &str,
    ) -> Result<UploadReport, DomainError> {
        if !local_path.is_dir() {
            return Err(DomainError::not_found(format!(
                "Document directory '{}' not found",
                local_path.display()
            )));
        }

        let mut report = UploadReport::default();

        let walker = WalkDir::new(local_path)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let key = e
                        .path()
                        .map(|p| object_key(local_path, p))
                        .unwrap_or_default();
                    report.failed.push((key, e.to_string()));
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let key = object_key(local_path, entry.path());
            match self
                .control_plane
                .upload_object(bucket_name, &key, entry.path())
                .await
            {
                Ok(()) => {
                    debug!(bucket = %bucket_name, key = %key, "Uploaded document");
                    report.uploaded.push(key);
                }
                Err(e) => {
                    warn!(bucket = %bucket_name, key = %key, error = %e, "Failed to upload document");
                    report.failed.push((key, e.to_string()));
                }
            }
        }

        info!(
            bucket = %bucket_name,
            uploaded = report.uploaded.len(),
            failed = report.failed.len(),
            "Finished uploading documents"
        );

        if report.is_complete() {
            Ok(report)
        } else {
            let keys: Vec<&str> = report.failed.iter().map(|(key, _)| key.as_str()).collect();
            Err(DomainError::provisioning(format!(
                "Failed to upload {} of {} documents: {}",
                report.failed.len(),
                report.failed.len() + report.uploaded.len(),
                keys.join(", ")
            )))
        }
    }

    /// Run an ingestion job and wait for it to finish
    pub async fn synchronize(
        &self,
        kb_id: &str,
        data_source_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), DomainError> {
        let deadline = tokio::time::Instant::now() + self.sync.timeout;
        let mut job = self
            .within_sync_window(
                self.control_plane.start_ingestion_job(kb_id, data_source_id),
                deadline,
                cancel,
                &format!("Ingestion for data source {}", data_source_id),
            )
            .await?;

        info!(kb_id = %kb_id, job_id = %job.id, "Started ingestion job");

        loop {
            match job.status {
                IngestionJobStatus::Complete => {
                    info!(kb_id = %kb_id, job_id = %job.id, "Ingestion job complete");
                    return Ok(());
                }
                IngestionJobStatus::Failed | IngestionJobStatus::Stopped => {
                    let reasons = if job.failure_reasons.is_empty() {
                        "no reason reported".to_string()
                    } else {
                        job.failure_reasons.join("; ")
                    };
                    return Err(DomainError::sync(format!(
                        "Ingestion job {} ended with status {:?}: {}",
                        job.id, job.status, reasons
                    )));
                }
                status => debug!(job_id = %job.id, ?status, "Waiting for ingestion job"),
            }

            let job_id = job.id.clone();
            let poll = async {
                tokio::time::sleep(self.sync.poll_interval).await;
                self.control_plane
                    .get_ingestion_job(kb_id, data_source_id, &job_id)
                    .await
            };
            job = self
                .within_sync_window(
                    poll,
                    deadline,
                    cancel,
                    &format!("Ingestion job {}", job_id),
                )
                .await?;
        }
    }

    /// Await one remote step, giving up at `deadline` or when `cancel` fires
    async fn within_sync_window<T>(
        &self,
        step: impl Future<Output = Result<T, DomainError>>,
        deadline: tokio::time::Instant,
        cancel: &CancellationToken,
        what: &str,
    ) -> Result<T, DomainError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                Err(DomainError::sync(format!("{} was cancelled", what)))
            }
            _ = tokio::time::sleep_until(deadline) => {
                Err(DomainError::sync(format!(
                    "{} timed out after {}s",
                    what,
                    self.sync.timeout.as_secs()
                )))
            }
            result = step => result,
        }
    }

    /// Current status of a knowledge base by id
    pub async fn get_status(&self, kb_id: &str) -> Result<KnowledgeBaseHandle, DomainError> {
        let details = self.control_plane.get_knowledge_base(kb_id).await?;
        let data_source_id = self
            .control_plane
            .list_data_sources(kb_id)
            .await?
            .into_iter()
            .next();

        Ok(KnowledgeBaseHandle {
            name: details.name,
            id: details.id,
            data_source_id,
            status: details.status,
        })
    }

    pub async fn get_status_by_name(&self, name: &str) -> Result<KnowledgeBaseHandle, DomainError> {
        let kb_id = self.resolve_required(name).await?;
        self.get_status(&kb_id).await
    }

    pub async fn get_details(&self, kb_id: &str) -> Result<KnowledgeBaseDetails, DomainError> {
        self.control_plane.get_knowledge_base(kb_id).await
    }

    /// First page of knowledge bases in the account
    pub async fn list_all(&self) -> Result<Vec<KnowledgeBaseSummary>, DomainError> {
        self.control_plane.list_knowledge_bases(LIST_PAGE_SIZE).await
    }

    pub async fn data_bucket_name(&self, kb_name: &str) -> Result<String, DomainError> {
        self.control_plane.data_bucket_name(kb_name).await
    }

    /// Delete a knowledge base by name, then the resources selected by `options`.
    ///
    /// Only resolving the name and deleting the knowledge base itself can fail;
    /// the cascade logs and skips whatever cannot be removed.
    pub async fn delete(&self, name: &str, options: DeleteOptions) -> Result<(), DomainError> {
        let kb_id = self.resolve_required(name).await?;

        match self.control_plane.list_data_sources(&kb_id).await {
            Ok(data_sources) => {
                for ds_id in data_sources {
                    if let Err(e) = self.control_plane.delete_data_source(&kb_id, &ds_id).await {
                        warn!(kb_id = %kb_id, data_source_id = %ds_id, error = %e, "Failed to delete data source");
                    }
                }
            }
            Err(e) => warn!(kb_id = %kb_id, error = %e, "Failed to list data sources"),
        }

        self.control_plane.delete_knowledge_base(&kb_id).await?;
        info!(kb_name = %name, kb_id = %kb_id, "Deleted knowledge base");

        if options.delete_bucket {
            if let Err(e) = self.control_plane.delete_bucket(name).await {
                warn!(kb_name = %name, error = %e, "Failed to delete document bucket");
            }
        }

        if options.delete_iam_roles_and_policies {
            if let Err(e) = self.control_plane.delete_access_roles(name).await {
                warn!(kb_name = %name, error = %e, "Failed to delete access roles");
            }
        }

        if options.delete_search_index_store {
            if let Err(e) = self.control_plane.delete_search_index_store(name).await {
                warn!(kb_name = %name, error = %e, "Failed to delete search index store");
            }
        }

        Ok(())
    }
}

fn is_hidden(file_name: &std::ffi::OsStr) -> bool {
    file_name.to_string_lossy().starts_with('.')
}

fn object_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::knowledge_base::{IngestionJob, MockKnowledgeBaseControlPlane};
    use crate::infrastructure::knowledge_base::InMemoryKnowledgeBaseService;

    fn fast_sync() -> SyncSettings {
        SyncSettings::new(Duration::from_millis(200), Duration::from_millis(5))
    }

    fn service(control_plane: impl KnowledgeBaseControlPlane + 'static) -> KnowledgeBaseLifecycleService {
        KnowledgeBaseLifecycleService::new(Arc::new(control_plane)).with_sync_settings(fast_sync())
    }

    #[test]
    fn test_object_key_uses_forward_slashes() {
        let root = Path::new("/docs");
        assert_eq!(object_key(root, Path::new("/docs/calendar.txt")), "calendar.txt");
        assert_eq!(
            object_key(root, Path::new("/docs/rules/exams.pdf")),
            "rules/exams.pdf"
        );
    }

    #[tokio::test]
    async fn test_create_or_retrieve_is_idempotent() {
        let in_memory = Arc::new(InMemoryKnowledgeBaseService::new());
        let service = KnowledgeBaseLifecycleService::new(in_memory.clone());

        let first = service
            .create_or_retrieve("schoolassistant", "School docs")
            .await
            .unwrap();
        let second = service
            .create_or_retrieve("schoolassistant", "School docs")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.data_source_id, second.data_source_id);
        assert!(first.data_source_id.is_some());
        assert_eq!(in_memory.provision_calls(), 1);
    }

    #[tokio::test]
    async fn test_create_or_retrieve_adds_missing_data_source() {
        let mut control_plane = MockKnowledgeBaseControlPlane::new();
        control_plane.expect_list_knowledge_bases().returning(|_| {
            Ok(vec![KnowledgeBaseSummary::new(
                "schoolassistant",
                "KB1",
                KnowledgeBaseStatus::Active,
            )])
        });
        control_plane
            .expect_list_data_sources()
            .returning(|_| Ok(Vec::new()));
        control_plane
            .expect_create_data_source()
            .withf(|kb_id, kb_name| kb_id == "KB1" && kb_name == "schoolassistant")
            .times(1)
            .returning(|_, _| Ok("DS1".to_string()));
        control_plane.expect_provision_knowledge_base().never();

        let handle = service(control_plane)
            .create_or_retrieve("schoolassistant", "School docs")
            .await
            .unwrap();

        assert_eq!(handle.id, "KB1");
        assert_eq!(handle.data_source_id.as_deref(), Some("DS1"));
    }

    #[tokio::test]
    async fn test_upload_directory_skips_hidden_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("calendar.txt"), "January trimester begins Jan 6").unwrap();
        std::fs::write(dir.path().join(".DS_Store"), "junk").unwrap();
        std::fs::create_dir(dir.path().join("rules")).unwrap();
        std::fs::write(dir.path().join("rules").join("exams.txt"), "No phones").unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git").join("HEAD"), "ref").unwrap();

        let in_memory = Arc::new(InMemoryKnowledgeBaseService::new());
        let service = KnowledgeBaseLifecycleService::new(in_memory.clone());
        service
            .create_or_retrieve("schoolassistant", "School docs")
            .await
            .unwrap();
        let bucket = service.data_bucket_name("schoolassistant").await.unwrap();

        let mut report = service.upload_directory(dir.path(), &bucket).await.unwrap();
        report.uploaded.sort();

        assert_eq!(report.uploaded, vec!["calendar.txt", "rules/exams.txt"]);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_upload_directory_missing_path() {
        let service = service(InMemoryKnowledgeBaseService::new());
        let err = service
            .upload_directory(Path::new("/definitely/not/here"), "bucket")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_upload_directory_reports_failures_after_walk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();

        let mut control_plane = MockKnowledgeBaseControlPlane::new();
        control_plane
            .expect_upload_object()
            .times(2)
            .returning(|_, key, _| {
                if key == "a.txt" {
                    Err(DomainError::network("connection reset"))
                } else {
                    Ok(())
                }
            });

        let err = service(control_plane)
            .upload_directory(dir.path(), "bucket")
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Provisioning { .. }));
        assert!(err.to_string().contains("a.txt"));
    }

    #[tokio::test]
    async fn test_synchronize_polls_until_complete() {
        let in_memory = Arc::new(InMemoryKnowledgeBaseService::new().with_ingestion_polls(3));
        let service =
            KnowledgeBaseLifecycleService::new(in_memory.clone()).with_sync_settings(fast_sync());
        let handle = service
            .create_or_retrieve("schoolassistant", "School docs")
            .await
            .unwrap();
        let ds_id = handle.data_source_id.unwrap();

        service
            .synchronize(&handle.id, &ds_id, &CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_synchronize_failed_job() {
        let service = service(InMemoryKnowledgeBaseService::new().with_failing_ingestion("bad pdf"));
        let handle = service
            .create_or_retrieve("schoolassistant", "School docs")
            .await
            .unwrap();
        let ds_id = handle.data_source_id.unwrap();

        let err = service
            .synchronize(&handle.id, &ds_id, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Sync { .. }));
        assert!(err.to_string().contains("bad pdf"));
    }

    #[tokio::test]
    async fn test_synchronize_times_out() {
        let mut control_plane = MockKnowledgeBaseControlPlane::new();
        control_plane
            .expect_start_ingestion_job()
            .returning(|_, _| Ok(IngestionJob::new("JOB1", IngestionJobStatus::Starting)));
        control_plane
            .expect_get_ingestion_job()
            .returning(|_, _, _| Ok(IngestionJob::new("JOB1", IngestionJobStatus::InProgress)));

        let service = KnowledgeBaseLifecycleService::new(Arc::new(control_plane)).with_sync_settings(
            SyncSettings::new(Duration::from_millis(30), Duration::from_millis(5)),
        );

        let err = service
            .synchronize("KB1", "DS1", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_synchronize_cancelled() {
        let mut control_plane = MockKnowledgeBaseControlPlane::new();
        control_plane
            .expect_start_ingestion_job()
            .returning(|_, _| Ok(IngestionJob::new("JOB1", IngestionJobStatus::InProgress)));
        control_plane
            .expect_get_ingestion_job()
            .returning(|_, _, _| Ok(IngestionJob::new("JOB1", IngestionJobStatus::InProgress)));

        let service = KnowledgeBaseLifecycleService::new(Arc::new(control_plane)).with_sync_settings(
            SyncSettings::new(Duration::from_secs(60), Duration::from_millis(5)),
        );

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = service.synchronize("KB1", "DS1", &cancel).await.unwrap_err();
        assert!(err.to_string().contains("cancelled"));
    }

    async fn stalled_service(timeout: Duration) -> (KnowledgeBaseLifecycleService, String, String) {
        let service = KnowledgeBaseLifecycleService::new(Arc::new(
            InMemoryKnowledgeBaseService::new()
                .with_ingestion_polls(1)
                .with_stalled_ingestion(),
        ))
        .with_sync_settings(SyncSettings::new(timeout, Duration::from_millis(5)));

        let handle = service
            .create_or_retrieve("schoolassistant", "School docs")
            .await
            .unwrap();
        let ds_id = handle.data_source_id.unwrap();
        (service, handle.id, ds_id)
    }

    #[tokio::test]
    async fn test_synchronize_times_out_on_hung_poll() {
        let (service, kb_id, ds_id) = stalled_service(Duration::from_millis(100)).await;
        let started = std::time::Instant::now();

        let result = tokio::time::timeout(
            Duration::from_secs(3),
            service.synchronize(&kb_id, &ds_id, &CancellationToken::new()),
        )
        .await
        .expect("synchronize must respect its own timeout");

        let err = result.unwrap_err();
        assert!(matches!(err, DomainError::Sync { .. }));
        assert!(err.to_string().contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_synchronize_cancelled_during_hung_poll() {
        let (service, kb_id, ds_id) = stalled_service(Duration::from_secs(60)).await;
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(3),
            service.synchronize(&kb_id, &ds_id, &cancel),
        )
        .await
        .expect("cancellation must interrupt a hung poll");

        assert!(result.unwrap_err().to_string().contains("cancelled"));
    }

    #[tokio::test]
    async fn test_delete_then_not_found() {
        let service = service(InMemoryKnowledgeBaseService::new());
        service
            .create_or_retrieve("schoolassistant", "School docs")
            .await
            .unwrap();

        service
            .delete("schoolassistant", DeleteOptions::everything())
            .await
            .unwrap();

        let mut gone = false;
        for _ in 0..10 {
            if service.resolve_id("schoolassistant").await.unwrap().is_none() {
                gone = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(gone);

        let err = service
            .get_status_by_name("schoolassistant")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_unknown_name() {
        let service = service(InMemoryKnowledgeBaseService::new());
        let err = service
            .delete("missing", DeleteOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_cascade_is_best_effort() {
        let mut control_plane = MockKnowledgeBaseControlPlane::new();
        control_plane.expect_list_knowledge_bases().returning(|_| {
            Ok(vec![KnowledgeBaseSummary::new(
                "schoolassistant",
                "KB1",
                KnowledgeBaseStatus::Active,
            )])
        });
        control_plane
            .expect_list_data_sources()
            .returning(|_| Ok(vec!["DS1".to_string()]));
        control_plane
            .expect_delete_data_source()
            .times(1)
            .returning(|_, _| Ok(()));
        control_plane
            .expect_delete_knowledge_base()
            .withf(|kb_id| kb_id == "KB1")
            .times(1)
            .returning(|_| Ok(()));
        control_plane.expect_delete_bucket().never();
        control_plane
            .expect_delete_access_roles()
            .times(1)
            .returning(|_| Err(DomainError::network("throttled")));
        control_plane
            .expect_delete_search_index_store()
            .times(1)
            .returning(|_| Ok(()));

        service(control_plane)
            .delete("schoolassistant", DeleteOptions::default())
            .await
            .unwrap();
    }
}
