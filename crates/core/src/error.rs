// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    /// The process-graph document could not be located or parsed.
    /// Fatal for the whole pass over that pipeline.
    #[error("Cannot load workflow graph {namespace}:{pipeline}: {source}")]
    GraphLoad {
        namespace: String,
        pipeline: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Queue store unavailable: {0}")]
    QueueUnavailable(String),

    #[error("Tracking service unavailable: {0}")]
    TrackingUnavailable(String),

    /// Failure inside the enqueue + mark pair for one object.
    #[error("Cannot enqueue job: {step} {object_id}: {source}")]
    Dispatch {
        step: String,
        object_id: String,
        #[source]
        source: Box<AppError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn graph_load(
        namespace: impl Into<String>,
        pipeline: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        AppError::GraphLoad {
            namespace: namespace.into(),
            pipeline: pipeline.into(),
            source: source.into(),
        }
    }

    pub fn dispatch(step: impl ToString, object_id: impl Into<String>, source: AppError) -> Self {
        AppError::Dispatch {
            step: step.to_string(),
            object_id: object_id.into(),
            source: Box::new(source),
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
