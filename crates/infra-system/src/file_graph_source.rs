// File-backed graph source
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use robot_master_core::domain::WorkflowGraph;
use robot_master_core::error::{AppError, Result};
use robot_master_core::port::GraphSource;

const EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Loads process graphs from `{root}/{namespace}/{pipeline}.yaml`
///
/// Files are re-read on every load, so edits take effect on the next pass.
#[derive(Debug, Clone)]
pub struct FileGraphSource {
    root: PathBuf,
}

impl FileGraphSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Candidate paths for a pipeline, in lookup order
    pub fn candidates(&self, namespace: &str, pipeline: &str) -> Vec<PathBuf> {
        let dir = self.root.join(namespace);
        EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{}.{}", pipeline, ext)))
            .collect()
    }

    async fn read_document(&self, namespace: &str, pipeline: &str) -> Result<(PathBuf, String)> {
        for path in self.candidates(namespace, pipeline) {
            match tokio::fs::read_to_string(&path).await {
                Ok(contents) => return Ok((path, contents)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(AppError::graph_load(namespace, pipeline, e)),
            }
        }

        Err(AppError::graph_load(
            namespace,
            pipeline,
            io::Error::new(
                io::ErrorKind::NotFound,
                format!(
                    "no graph document for {}:{} under {}",
                    namespace,
                    pipeline,
                    self.root.display()
                ),
            ),
        ))
    }
}

#[async_trait]
impl GraphSource for FileGraphSource {
    async fn load(&self, namespace: &str, pipeline: &str) -> Result<WorkflowGraph> {
        let (path, contents) = self.read_document(namespace, pipeline).await?;
        debug!(path = %path.display(), "Reading workflow graph");

        WorkflowGraph::parse(namespace, pipeline, &contents)
    }
}
