// src/queue.rs - Asynchronous print jobs and their lifecycle
use crate::error::PrintError;
use crate::events::{EventBus, PrintEvent};
use crate::request::PrintRequest;
use crate::transport::PrintTransport;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const UNTITLED: &str = "(untitled)";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum JobState {
    Pending,
    Completed,
    Failed(String),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Pending)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PrintJob {
    pub id: JobId,
    pub title: String,
    pub state: JobState,
    pub result_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PrintJob {
    fn new(title: &str) -> Self {
        let title = title.trim();
        Self {
            id: JobId::generate(),
            title: if title.is_empty() { UNTITLED.to_string() } else { title.to_string() },
            state: JobState::Pending,
            result_url: None,
            created_at: Utc::now(),
        }
    }
}

/// Interprets the body returned by the print service's create endpoint.
///
/// Success is a JSON object carrying the document location in `url` (or
/// `getURL`, as MapFish names it). An empty location counts as missing.
pub fn parse_print_response(body: &str) -> Result<String, PrintError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| PrintError::Submission(format!("unparsable print response: {}", e)))?;
    for key in ["url", "getURL"] {
        if let Some(url) = value.get(key).and_then(|v| v.as_str()).filter(|u| !u.trim().is_empty()) {
            return Ok(url.to_string());
        }
    }
    for key in ["error", "exception", "message"] {
        if let Some(reason) = value.get(key) {
            let reason = reason.as_str().map(str::to_string).unwrap_or_else(|| reason.to_string());
            return Err(PrintError::Submission(format!("print service exception: {}", reason)));
        }
    }
    Err(PrintError::Submission("print response has no result url".to_string()))
}

/// Tracks every print job of a session. Several jobs may be pending at once;
/// each response is matched to its job by id.
#[derive(Clone)]
pub struct PrintJobQueue {
    jobs: Arc<Mutex<VecDeque<PrintJob>>>,
    transport: Arc<dyn PrintTransport>,
    events: EventBus,
}

impl PrintJobQueue {
    pub fn new(transport: Arc<dyn PrintTransport>, events: EventBus) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(VecDeque::new())),
            transport,
            events,
        }
    }

    /// Records a pending job and posts `request` in the background.
    ///
    /// Returns as soon as the job is recorded; the outcome arrives as a
    /// [`PrintEvent`]. The handle can be awaited to know when the job settled.
    pub async fn submit(
        &self,
        url: &str,
        request: &PrintRequest,
        title: &str,
    ) -> Result<(JobId, JoinHandle<()>), PrintError> {
        let body = request.to_json()?;
        let job = PrintJob::new(title);
        let id = job.id.clone();
        self.jobs.lock().await.push_back(job);
        tracing::info!("Print job {} submitted to {}", id, url);

        let queue = self.clone();
        let url = url.to_string();
        let job_id = id.clone();
        let handle = tokio::spawn(async move {
            let outcome = queue.transport.post_json(&url, body).await;
            queue.resolve(&job_id, outcome).await;
        });
        Ok((id, handle))
    }

    /// Settles job `id` from the raw transport outcome.
    ///
    /// Outcomes for jobs no longer in the queue, or already settled, are dropped.
    pub async fn resolve(&self, id: &JobId, outcome: Result<String, PrintError>) {
        let result = outcome.and_then(|body| parse_print_response(&body));
        let event = {
            let mut jobs = self.jobs.lock().await;
            let Some(job) = jobs.iter_mut().find(|j| &j.id == id) else {
                tracing::debug!("Dropping response for forgotten job {}", id);
                return;
            };
            if job.state.is_terminal() {
                tracing::debug!("Job {} already settled, ignoring response", id);
                return;
            }
            match result {
                Ok(url) => {
                    tracing::info!("Print job {} completed: {}", id, url);
                    job.state = JobState::Completed;
                    job.result_url = Some(url.clone());
                    PrintEvent::Print { job_id: id.clone(), result_url: url }
                }
                Err(error) => {
                    tracing::warn!("Print job {} failed: {}", id, error);
                    job.state = JobState::Failed(error.to_string());
                    PrintEvent::PrintException { job_id: id.clone(), error }
                }
            }
        };
        self.events.emit(event);
    }

    pub async fn get(&self, id: &JobId) -> Option<PrintJob> {
        self.jobs.lock().await.iter().find(|j| &j.id == id).cloned()
    }

    /// All jobs in submission order.
    pub async fn jobs(&self) -> Vec<PrintJob> {
        self.jobs.lock().await.iter().cloned().collect()
    }

    pub async fn pending_count(&self) -> usize {
        self.jobs.lock().await.iter().filter(|j| !j.state.is_terminal()).count()
    }

    pub async fn remove(&self, id: &JobId) -> Option<PrintJob> {
        let mut jobs = self.jobs.lock().await;
        let idx = jobs.iter().position(|j| &j.id == id)?;
        jobs.remove(idx)
    }

    pub async fn clear(&self) {
        let mut jobs = self.jobs.lock().await;
        tracing::debug!("Clearing {} print jobs", jobs.len());
        jobs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NoopTransport;

    #[async_trait]
    impl PrintTransport for NoopTransport {
        async fn get(&self, _url: &str) -> Result<String, PrintError> {
            Err(PrintError::Transport("unused".into()))
        }
        async fn post_json(&self, _url: &str, _body: String) -> Result<String, PrintError> {
            Err(PrintError::Transport("unused".into()))
        }
    }

    async fn queue_with_job(title: &str) -> (PrintJobQueue, JobId) {
        let queue = PrintJobQueue::new(Arc::new(NoopTransport), EventBus::default());
        let job = PrintJob::new(title);
        let id = job.id.clone();
        queue.jobs.lock().await.push_back(job);
        (queue, id)
    }

    #[test]
    fn test_parse_print_response() {
        assert_eq!(parse_print_response(r#"{"url": "http://x/doc.pdf"}"#).unwrap(), "http://x/doc.pdf");
        assert_eq!(parse_print_response(r#"{"getURL": "http://x/1.pdf"}"#).unwrap(), "http://x/1.pdf");
        assert!(matches!(parse_print_response("not json"), Err(PrintError::Submission(_))));
        let err = parse_print_response(r#"{"error": "layout not found"}"#).unwrap_err();
        assert!(err.to_string().contains("layout not found"));
        assert!(parse_print_response(r#"{"ok": true}"#).is_err());
    }

    #[tokio::test]
    async fn test_empty_result_url_fails_job() {
        assert!(matches!(parse_print_response(r#"{"url": ""}"#), Err(PrintError::Submission(_))));
        assert_eq!(parse_print_response(r#"{"url": " ", "getURL": "http://x/2.pdf"}"#).unwrap(), "http://x/2.pdf");

        let (queue, id) = queue_with_job("map").await;
        queue.resolve(&id, Ok(r#"{"url": ""}"#.into())).await;
        let job = queue.get(&id).await.unwrap();
        assert!(matches!(job.state, JobState::Failed(_)));
        assert!(job.result_url.is_none());
    }

    #[tokio::test]
    async fn test_resolve_completes_job_and_emits_print() {
        let (queue, id) = queue_with_job("  ").await;
        let mut rx = queue.events.subscribe();
        queue.resolve(&id, Ok(r#"{"url": "http://x/doc.pdf"}"#.into())).await;
        let job = queue.get(&id).await.unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.result_url.as_deref(), Some("http://x/doc.pdf"));
        assert_eq!(job.title, UNTITLED);
        match rx.recv().await.unwrap() {
            PrintEvent::Print { job_id, result_url } => {
                assert_eq!(job_id, id);
                assert_eq!(result_url, "http://x/doc.pdf");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_terminal_jobs_are_not_revisited() {
        let (queue, id) = queue_with_job("map").await;
        queue.resolve(&id, Err(PrintError::Transport("timeout".into()))).await;
        queue.resolve(&id, Ok(r#"{"url": "http://late"}"#.into())).await;
        let job = queue.get(&id).await.unwrap();
        assert!(matches!(job.state, JobState::Failed(_)));
        assert!(job.result_url.is_none());
    }

    #[tokio::test]
    async fn test_unknown_job_is_noop() {
        let (queue, id) = queue_with_job("map").await;
        let mut rx = queue.events.subscribe();
        queue.clear().await;
        queue.resolve(&id, Ok(r#"{"url": "http://late"}"#.into())).await;
        assert!(queue.jobs().await.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_remove_and_pending_count() {
        let (queue, id) = queue_with_job("a").await;
        assert_eq!(queue.pending_count().await, 1);
        assert_eq!(queue.remove(&id).await.map(|j| j.title), Some("a".to_string()));
        assert_eq!(queue.pending_count().await, 0);
        assert!(queue.remove(&id).await.is_none());
    }
}
