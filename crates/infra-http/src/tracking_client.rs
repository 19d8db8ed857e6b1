// Workflow service REST client
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use robot_master_core::domain::{EligibleJob, QualifiedStep, StepStatus};
use robot_master_core::error::{AppError, Result};
use robot_master_core::port::{PendingQuery, TrackingService};

/// `GET workflow_queue` response
#[derive(Debug, Deserialize)]
struct PendingObjects {
    #[serde(default)]
    objects: Vec<PendingObject>,
}

#[derive(Debug, Deserialize)]
struct PendingObject {
    id: String,
    #[serde(default)]
    priority: i64,
}

/// Optional body of a status update response
#[derive(Debug, Deserialize)]
struct StatusBody {
    status: StepStatus,
}

/// Tracking service backed by the workflow service's REST API
#[derive(Debug, Clone)]
pub struct HttpTrackingService {
    client: Client,
    base: Url,
}

impl HttpTrackingService {
    /// Create a client for the service rooted at `base_url`
    ///
    /// Every request is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        // Url::join drops the last segment unless the base ends with '/'
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base = Url::parse(&normalized)
            .map_err(|e| AppError::Config(format!("Invalid workflow URL {}: {}", base_url, e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Cannot build HTTP client: {}", e)))?;

        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn queue_url(&self) -> Result<Url> {
        self.base
            .join("workflow_queue")
            .map_err(|e| AppError::Internal(format!("Cannot build query URL: {}", e)))
    }

    /// `{base}/{repository}/objects/{object_id}/workflows/{workflow}/{step}`
    fn status_url(&self, step: &QualifiedStep, object_id: &str) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Config(format!("Workflow URL cannot be a base: {}", self.base)))?
            .pop_if_empty()
            .extend([
                step.namespace(),
                "objects",
                object_id,
                "workflows",
                step.pipeline(),
                step.step(),
            ]);
        Ok(url)
    }
}

fn query_params(query: &PendingQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![("waiting", query.step.to_string())];
    params.extend(
        query
            .prerequisites
            .iter()
            .map(|prereq| ("completed", prereq.to_string())),
    );
    params.push(("limit", query.limit.to_string()));
    params.push(("with_priority", query.with_priority.to_string()));
    if let Some(cursor) = &query.cursor {
        params.push(("cursor", cursor.clone()));
    }
    if let Some(filter) = &query.filter {
        params.push(("filter", filter.clone()));
    }
    params
}

fn unavailable(context: &str, err: reqwest::Error) -> AppError {
    AppError::TrackingUnavailable(format!("{}: {}", context, err))
}

fn check_status(context: &str, status: StatusCode) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(AppError::TrackingUnavailable(format!(
            "{}: HTTP {}",
            context, status
        )))
    }
}

#[async_trait]
impl TrackingService for HttpTrackingService {
    async fn find_pending(&self, query: &PendingQuery) -> Result<Vec<EligibleJob>> {
        let url = self.queue_url()?;
        debug!(url = %url, step = %query.step, limit = query.limit, "Querying workflow queue");

        let response = self
            .client
            .get(url)
            .query(&query_params(query))
            .send()
            .await
            .map_err(|e| unavailable("Workflow queue request failed", e))?;
        check_status("Workflow queue request failed", response.status())?;

        let body: PendingObjects = response
            .json()
            .await
            .map_err(|e| unavailable("Invalid workflow queue response", e))?;

        Ok(body
            .objects
            .into_iter()
            .take(query.limit)
            .map(|object| EligibleJob::new(object.id, object.priority))
            .collect())
    }

    async fn mark_enqueued(&self, step: &QualifiedStep, object_id: &str) -> Result<StepStatus> {
        let url = self.status_url(step, object_id)?;
        debug!(url = %url, "Updating workflow status");

        let response = self
            .client
            .put(url)
            .json(&serde_json::json!({ "status": StepStatus::Queued.as_str() }))
            .send()
            .await
            .map_err(|e| unavailable("Workflow status update failed", e))?;
        check_status("Workflow status update failed", response.status())?;

        // The service may echo the stored status; an empty body means it was accepted
        let body = response
            .text()
            .await
            .map_err(|e| unavailable("Workflow status update failed", e))?;
        let status = serde_json::from_str::<StatusBody>(&body)
            .map(|b| b.status)
            .unwrap_or(StepStatus::Queued);

        Ok(status)
    }
}
