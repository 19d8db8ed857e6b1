// Workflow Graph - ordered steps of one pipeline and their prerequisites

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;
use crate::domain::step::{qualify, QualifiedStep};
use crate::error::{AppError, Result};

/// One step of a pipeline as declared in the process-graph document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub name: QualifiedStep,
    pub prerequisites: Vec<QualifiedStep>,
    pub skip: bool,
    /// Page size override for the pending-objects query
    pub limit: Option<usize>,
}

impl StepDefinition {
    pub fn new(name: QualifiedStep, prerequisites: Vec<QualifiedStep>) -> Self {
        Self {
            name,
            prerequisites,
            skip: false,
            limit: None,
        }
    }

    pub fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A process node in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphNode {
    Step(StepDefinition),
    /// A node whose name or prerequisites cannot be qualified. It is kept in
    /// place so the pass can report it without losing the other steps.
    Rejected { name: String, error: DomainError },
}

impl GraphNode {
    /// Qualified step name, which may be malformed for a rejected node
    pub fn name(&self) -> &str {
        match self {
            GraphNode::Step(step) => step.name.as_str(),
            GraphNode::Rejected { name, .. } => name,
        }
    }
}

/// Ordered steps of exactly one (namespace, pipeline) pair. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowGraph {
    namespace: String,
    pipeline: String,
    nodes: Vec<GraphNode>,
}

impl WorkflowGraph {
    pub fn new(
        namespace: impl Into<String>,
        pipeline: impl Into<String>,
        steps: Vec<StepDefinition>,
    ) -> Self {
        Self::with_nodes(namespace, pipeline, steps.into_iter().map(GraphNode::Step).collect())
    }

    pub fn with_nodes(
        namespace: impl Into<String>,
        pipeline: impl Into<String>,
        nodes: Vec<GraphNode>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            pipeline: pipeline.into(),
            nodes,
        }
    }

    /// Parse a YAML process-graph document
    ///
    /// ```yaml
    /// id: assemblyWF
    /// repository: dor
    /// processes:
    ///   - name: checksum-compute
    ///     prereq: [start-assembly]
    ///   - name: jp2-create
    ///     prereq: [checksum-compute]
    ///     skip-queue: true
    /// ```
    ///
    /// Unqualified step and prerequisite names are qualified within
    /// `namespace:pipeline`. A step is skipped when `skip-queue` is true or
    /// when `status` is present and is anything other than `waiting`.
    ///
    /// A node that cannot be qualified becomes [`GraphNode::Rejected`]; only a
    /// document that is not valid YAML fails the parse.
    pub fn parse(namespace: &str, pipeline: &str, document: &str) -> Result<Self> {
        let doc: WorkflowDocument = serde_yaml::from_str(document)
            .map_err(|e| AppError::graph_load(namespace, pipeline, e))?;

        let nodes = doc
            .processes
            .iter()
            .map(|node| match node.to_step(namespace, pipeline) {
                Ok(step) => GraphNode::Step(step),
                Err(error) => GraphNode::Rejected {
                    name: qualify(node.name.trim(), namespace, pipeline),
                    error,
                },
            })
            .collect();

        Ok(Self::with_nodes(namespace, pipeline, nodes))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// Nodes that qualified cleanly, in document order
    pub fn steps(&self) -> impl Iterator<Item = &StepDefinition> {
        self.nodes.iter().filter_map(|node| match node {
            GraphNode::Step(step) => Some(step),
            GraphNode::Rejected { .. } => None,
        })
    }

    pub fn step(&self, name: &str) -> Option<&StepDefinition> {
        self.steps().find(|s| s.name.as_str() == name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct WorkflowDocument {
    #[serde(default)]
    processes: Vec<ProcessNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ProcessNode {
    name: String,
    #[serde(default, alias = "prereqs")]
    prereq: Vec<String>,
    #[serde(default)]
    skip_queue: Option<SkipMarker>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

/// `skip-queue` may be written as a YAML bool or as a string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SkipMarker {
    Flag(bool),
    Text(String),
}

impl SkipMarker {
    fn is_set(&self) -> bool {
        match self {
            SkipMarker::Flag(flag) => *flag,
            SkipMarker::Text(text) => text.trim().eq_ignore_ascii_case("true"),
        }
    }
}

impl ProcessNode {
    fn to_step(
        &self,
        namespace: &str,
        pipeline: &str,
    ) -> std::result::Result<StepDefinition, DomainError> {
        let name = QualifiedStep::qualify(self.name.trim(), namespace, pipeline)?;

        let skip = self.skip_queue.as_ref().is_some_and(SkipMarker::is_set)
            || self
                .status
                .as_deref()
                .is_some_and(|status| !status.trim().eq_ignore_ascii_case("waiting"));

        let prerequisites = self
            .prereq
            .iter()
            .map(|p| QualifiedStep::qualify(p.trim(), namespace, pipeline))
            .collect::<std::result::Result<Vec<_>, DomainError>>()?;

        Ok(StepDefinition {
            name,
            prerequisites,
            skip,
            limit: self.limit,
        })
    }
}
