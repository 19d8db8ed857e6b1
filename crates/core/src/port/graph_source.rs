// Graph Source Port (where process-graph documents come from)

use crate::domain::WorkflowGraph;
use crate::error::Result;
use async_trait::async_trait;

/// Process-graph definition source
#[async_trait]
pub trait GraphSource: Send + Sync {
    /// Load the graph for one pipeline
    ///
    /// Fails with `AppError::GraphLoad` when the definition cannot be
    /// located or parsed. No partial graph is ever returned.
    async fn load(&self, namespace: &str, pipeline: &str) -> Result<WorkflowGraph>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves graphs registered up front
    #[derive(Default)]
    pub struct StaticGraphSource {
        graphs: Mutex<HashMap<(String, String), WorkflowGraph>>,
    }

    impl StaticGraphSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_graph(graph: WorkflowGraph) -> Self {
            let source = Self::new();
            source.insert(graph);
            source
        }

        pub fn insert(&self, graph: WorkflowGraph) {
            let key = (graph.namespace().to_string(), graph.pipeline().to_string());
            self.graphs.lock().unwrap().insert(key, graph);
        }
    }

    #[async_trait]
    impl GraphSource for StaticGraphSource {
        async fn load(&self, namespace: &str, pipeline: &str) -> Result<WorkflowGraph> {
            self.graphs
                .lock()
                .unwrap()
                .get(&(namespace.to_string(), pipeline.to_string()))
                .cloned()
                .ok_or_else(|| {
                    AppError::graph_load(
                        namespace,
                        pipeline,
                        std::io::Error::new(std::io::ErrorKind::NotFound, "no such workflow"),
                    )
                })
        }
    }
}
