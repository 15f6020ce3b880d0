//! In-memory knowledge base control plane and retriever for development and testing

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::knowledge_base::{
    IngestionJob, IngestionJobStatus, KnowledgeBaseControlPlane, KnowledgeBaseDetails,
    KnowledgeBaseStatus, KnowledgeBaseSummary, RetrieveAndGenerate,
};
use crate::domain::DomainError;

/// Answer returned when nothing relevant was retrieved
pub const NO_ANSWER: &str = "Sorry, I am unable to assist you with this request.";

#[derive(Debug, Clone)]
struct StoredKnowledgeBase {
    id: String,
    name: String,
    description: String,
    data_sources: Vec<String>,
    /// Object key to content, as of the last completed ingestion
    indexed: BTreeMap<String, String>,
    created_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredJob {
    kb_id: String,
    data_source_id: String,
    polls_remaining: u32,
}

#[derive(Debug, Default)]
struct State {
    knowledge_bases: Vec<StoredKnowledgeBase>,
    buckets: HashMap<String, BTreeMap<String, String>>,
    jobs: HashMap<String, StoredJob>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}{:06}", prefix, self.next_id)
    }

    fn find(&self, kb_id: &str) -> Option<&StoredKnowledgeBase> {
        self.knowledge_bases.iter().find(|kb| kb.id == kb_id)
    }

    fn find_mut(&mut self, kb_id: &str) -> Option<&mut StoredKnowledgeBase> {
        self.knowledge_bases.iter_mut().find(|kb| kb.id == kb_id)
    }
}

/// Knowledge bases held in process memory.
///
/// Uploaded files become searchable only after an ingestion job completes.
/// Retrieval scores each line of the indexed documents by how many query
/// words it contains.
#[derive(Debug, Default)]
pub struct InMemoryKnowledgeBaseService {
    state: RwLock<State>,
    ingestion_polls: u32,
    ingestion_failure: Option<String>,
    stalled_ingestion: bool,
    provision_calls: AtomicUsize,
}

fn not_found(kb_id: &str) -> DomainError {
    DomainError::not_found(format!("Knowledge base '{}' not found", kb_id))
}

fn bucket_for(kb_name: &str) -> String {
    format!("{}-documents", kb_name.to_lowercase().replace('_', "-"))
}

impl InMemoryKnowledgeBaseService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report IN_PROGRESS this many times before an ingestion job finishes
    pub fn with_ingestion_polls(mut self, polls: u32) -> Self {
        self.ingestion_polls = polls;
        self
    }

    /// Make every ingestion job end FAILED with `reason`
    pub fn with_failing_ingestion(mut self, reason: impl Into<String>) -> Self {
        self.ingestion_failure = Some(reason.into());
        self
    }

    /// Never answer ingestion job polls, like a remote call that hangs
    pub fn with_stalled_ingestion(mut self) -> Self {
        self.stalled_ingestion = true;
        self
    }

    /// How many times a knowledge base was provisioned from scratch
    pub fn provision_calls(&self) -> usize {
        self.provision_calls.load(Ordering::SeqCst)
    }

    /// Keys currently stored in `bucket`, if the bucket exists
    pub async fn bucket_keys(&self, bucket: &str) -> Option<Vec<String>> {
        let state = self.state.read().await;
        state
            .buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
    }
}

#[async_trait]
impl KnowledgeBaseControlPlane for InMemoryKnowledgeBaseService {
    async fn list_knowledge_bases(
        &self,
        max_results: i32,
    ) -> Result<Vec<KnowledgeBaseSummary>, DomainError> {
        let state = self.state.read().await;

        Ok(state
            .knowledge_bases
            .iter()
            .take(max_results.max(0) as usize)
            .map(|kb| KnowledgeBaseSummary::new(&kb.name, &kb.id, KnowledgeBaseStatus::Active))
            .collect())
    }

    async fn get_knowledge_base(&self, kb_id: &str) -> Result<KnowledgeBaseDetails, DomainError> {
        let state = self.state.read().await;
        let kb = state.find(kb_id).ok_or_else(|| not_found(kb_id))?;

        Ok(KnowledgeBaseDetails {
            id: kb.id.clone(),
            name: kb.name.clone(),
            status: KnowledgeBaseStatus::Active,
            description: Some(kb.description.clone()),
            created_at: Some(kb.created_at),
            updated_at: Some(kb.created_at),
        })
    }

    async fn provision_knowledge_base(
        &self,
        name: &str,
        description: &str,
    ) -> Result<String, DomainError> {
        let mut state = self.state.write().await;

        if state.knowledge_bases.iter().any(|kb| kb.name == name) {
            return Err(DomainError::provisioning(format!(
                "Knowledge base '{}' already exists",
                name
            )));
        }

        let id = state.next_id("KB");
        state.buckets.entry(bucket_for(name)).or_default();
        state.knowledge_bases.push(StoredKnowledgeBase {
            id: id.clone(),
            name: name.to_string(),
            description: description.to_string(),
            data_sources: Vec::new(),
            indexed: BTreeMap::new(),
            created_at: Utc::now(),
        });

        self.provision_calls.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    async fn list_data_sources(&self, kb_id: &str) -> Result<Vec<String>, DomainError> {
        let state = self.state.read().await;
        let kb = state.find(kb_id).ok_or_else(|| not_found(kb_id))?;
        Ok(kb.data_sources.clone())
    }

    async fn create_data_source(&self, kb_id: &str, _kb_name: &str) -> Result<String, DomainError> {
        let mut state = self.state.write().await;
        let ds_id = state.next_id("DS");

        let kb = state.find_mut(kb_id).ok_or_else(|| not_found(kb_id))?;
        kb.data_sources.push(ds_id.clone());

        Ok(ds_id)
    }

    async fn delete_data_source(
        &self,
        kb_id: &str,
        data_source_id: &str,
    ) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        let kb = state.find_mut(kb_id).ok_or_else(|| not_found(kb_id))?;

        let before = kb.data_sources.len();
        kb.data_sources.retain(|ds| ds != data_source_id);

        if kb.data_sources.len() == before {
            return Err(DomainError::not_found(format!(
                "Data source '{}' not found",
                data_source_id
            )));
        }

        Ok(())
    }

    async fn start_ingestion_job(
        &self,
        kb_id: &str,
        data_source_id: &str,
    ) -> Result<IngestionJob, DomainError> {
        let mut state = self.state.write().await;

        let kb = state.find(kb_id).ok_or_else(|| not_found(kb_id))?;
        if !kb.data_sources.iter().any(|ds| ds == data_source_id) {
            return Err(DomainError::sync(format!(
                "Data source '{}' is not attached to '{}'",
                data_source_id, kb_id
            )));
        }

        let job_id = state.next_id("JOB");
        state.jobs.insert(
            job_id.clone(),
            StoredJob {
                kb_id: kb_id.to_string(),
                data_source_id: data_source_id.to_string(),
                polls_remaining: self.ingestion_polls,
            },
        );

        Ok(IngestionJob::new(job_id, IngestionJobStatus::Starting))
    }

    async fn get_ingestion_job(
        &self,
        kb_id: &str,
        data_source_id: &str,
        job_id: &str,
    ) -> Result<IngestionJob, DomainError> {
        if self.stalled_ingestion {
            std::future::pending::<()>().await;
        }

        let mut state = self.state.write().await;

        let job = state
            .jobs
            .get_mut(job_id)
            .filter(|job| job.kb_id == kb_id && job.data_source_id == data_source_id)
            .ok_or_else(|| DomainError::sync(format!("Ingestion job '{}' not found", job_id)))?;

        if job.polls_remaining > 0 {
            job.polls_remaining -= 1;
            return Ok(IngestionJob::new(job_id, IngestionJobStatus::InProgress));
        }

        if let Some(reason) = &self.ingestion_failure {
            return Ok(IngestionJob::new(job_id, IngestionJobStatus::Failed)
                .with_failure_reasons(vec![reason.clone()]));
        }

        let kb_name = state
            .find(kb_id)
            .map(|kb| kb.name.clone())
            .ok_or_else(|| not_found(kb_id))?;
        let documents = state
            .buckets
            .get(&bucket_for(&kb_name))
            .cloned()
            .unwrap_or_default();

        if let Some(kb) = state.find_mut(kb_id) {
            kb.indexed = documents;
        }

        Ok(IngestionJob::new(job_id, IngestionJobStatus::Complete))
    }

    async fn data_bucket_name(&self, kb_name: &str) -> Result<String, DomainError> {
        Ok(bucket_for(kb_name))
    }

    async fn upload_object(&self, bucket: &str, key: &str, path: &Path) -> Result<(), DomainError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            DomainError::not_found(format!("Cannot read '{}': {}", path.display(), e))
        })?;

        let mut state = self.state.write().await;
        let objects = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| DomainError::not_found(format!("Bucket '{}' not found", bucket)))?;

        objects.insert(key.to_string(), String::from_utf8_lossy(&bytes).into_owned());
        Ok(())
    }

    async fn delete_knowledge_base(&self, kb_id: &str) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        let before = state.knowledge_bases.len();
        state.knowledge_bases.retain(|kb| kb.id != kb_id);

        if state.knowledge_bases.len() == before {
            return Err(not_found(kb_id));
        }

        state.jobs.retain(|_, job| job.kb_id != kb_id);
        Ok(())
    }

    async fn delete_bucket(&self, kb_name: &str) -> Result<(), DomainError> {
        self.state.write().await.buckets.remove(&bucket_for(kb_name));
        Ok(())
    }

    async fn delete_access_roles(&self, _kb_name: &str) -> Result<(), DomainError> {
        Ok(())
    }

    async fn delete_search_index_store(&self, _kb_name: &str) -> Result<(), DomainError> {
        Ok(())
    }
}

fn query_terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.len() >= 3)
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl RetrieveAndGenerate for InMemoryKnowledgeBaseService {
    async fn retrieve_and_generate(
        &self,
        kb_id: &str,
        text: &str,
        result_limit: u32,
    ) -> Result<String, DomainError> {
        let state = self.state.read().await;
        let kb = state.find(kb_id).ok_or_else(|| not_found(kb_id))?;
        let terms = query_terms(text);

        let mut scored: Vec<(usize, &str)> = kb
            .indexed
            .values()
            .flat_map(|content| content.lines())
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                let lower = line.to_lowercase();
                let score = terms.iter().filter(|t| lower.contains(t.as_str())).count();
                (score, line)
            })
            .filter(|(score, _)| *score > 0)
            .collect();

        // Stable sort keeps document order among equal scores
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        if scored.is_empty() {
            return Ok(NO_ANSWER.to_string());
        }

        Ok(scored
            .into_iter()
            .take(result_limit as usize)
            .map(|(_, line)| line)
            .collect::<Vec<_>>()
            .join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    async fn provisioned(service: &InMemoryKnowledgeBaseService) -> (String, String) {
        let kb_id = service
            .provision_knowledge_base("schoolassistant", "School docs")
            .await
            .unwrap();
        let ds_id = service
            .create_data_source(&kb_id, "schoolassistant")
            .await
            .unwrap();
        (kb_id, ds_id)
    }

    fn write_file(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_provision_and_list() {
        let service = InMemoryKnowledgeBaseService::new();
        let (kb_id, _) = provisioned(&service).await;

        let summaries = service.list_knowledge_bases(100).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].name, "schoolassistant");
        assert_eq!(summaries[0].id, kb_id);
        assert_eq!(service.provision_calls(), 1);

        let err = service
            .provision_knowledge_base("schoolassistant", "again")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Provisioning { .. }));
    }

    #[tokio::test]
    async fn test_documents_searchable_after_ingestion() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "calendar.txt", "January trimester begins Jan 6");

        let service = InMemoryKnowledgeBaseService::new().with_ingestion_polls(1);
        let (kb_id, ds_id) = provisioned(&service).await;
        let bucket = service.data_bucket_name("schoolassistant").await.unwrap();

        service
            .upload_object(&bucket, "calendar.txt", &path)
            .await
            .unwrap();

        let before = service
            .retrieve_and_generate(&kb_id, "When does January trimester start?", 5)
            .await
            .unwrap();
        assert_eq!(before, NO_ANSWER);

        let job = service.start_ingestion_job(&kb_id, &ds_id).await.unwrap();
        let first = service
            .get_ingestion_job(&kb_id, &ds_id, &job.id)
            .await
            .unwrap();
        assert_eq!(first.status, IngestionJobStatus::InProgress);
        let second = service
            .get_ingestion_job(&kb_id, &ds_id, &job.id)
            .await
            .unwrap();
        assert_eq!(second.status, IngestionJobStatus::Complete);

        let answer = service
            .retrieve_and_generate(&kb_id, "When does January trimester start?", 5)
            .await
            .unwrap();
        assert!(answer.contains("January"));
        assert!(answer.contains('6'));
    }

    #[tokio::test]
    async fn test_failing_ingestion() {
        let service = InMemoryKnowledgeBaseService::new().with_failing_ingestion("bad file");
        let (kb_id, ds_id) = provisioned(&service).await;

        let job = service.start_ingestion_job(&kb_id, &ds_id).await.unwrap();
        let polled = service
            .get_ingestion_job(&kb_id, &ds_id, &job.id)
            .await
            .unwrap();

        assert_eq!(polled.status, IngestionJobStatus::Failed);
        assert_eq!(polled.failure_reasons, vec!["bad file".to_string()]);
    }

    #[tokio::test]
    async fn test_result_limit_caps_passages() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "fees.txt",
            "Graduation fee is 5000\nGraduation gown collection\nGraduation date is in December",
        );

        let service = InMemoryKnowledgeBaseService::new();
        let (kb_id, ds_id) = provisioned(&service).await;
        service
            .upload_object("schoolassistant-documents", "fees.txt", &path)
            .await
            .unwrap();
        let job = service.start_ingestion_job(&kb_id, &ds_id).await.unwrap();
        service
            .get_ingestion_job(&kb_id, &ds_id, &job.id)
            .await
            .unwrap();

        let answer = service
            .retrieve_and_generate(&kb_id, "graduation fee", 1)
            .await
            .unwrap();
        assert_eq!(answer, "Graduation fee is 5000");
    }

    #[tokio::test]
    async fn test_delete_knowledge_base() {
        let service = InMemoryKnowledgeBaseService::new();
        let (kb_id, _) = provisioned(&service).await;

        service.delete_knowledge_base(&kb_id).await.unwrap();
        assert!(service.get_knowledge_base(&kb_id).await.unwrap_err().is_not_found());
        assert!(service.delete_knowledge_base(&kb_id).await.unwrap_err().is_not_found());

        service.delete_bucket("schoolassistant").await.unwrap();
        assert!(service.bucket_keys("schoolassistant-documents").await.is_none());
    }

    #[tokio::test]
    async fn test_upload_to_missing_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.txt", "x");
        let service = InMemoryKnowledgeBaseService::new();

        let err = service
            .upload_object("nowhere", "a.txt", &path)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
