// Step Qualification
//
// Canonical step names have the form `namespace:pipeline:step`,
// e.g. `dor:assemblyWF:jp2-create`. Namespace and pipeline are word
// characters only; the step part may also contain dashes.

use crate::domain::error::{DomainError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static QUALIFIED_STEP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_]+:[A-Za-z0-9_]+:[A-Za-z0-9_\-]+$")
        .expect("qualified step pattern is valid")
});

/// True if `step` is a fully qualified name like `dor:assemblyWF:jp2-create`
pub fn is_qualified(step: &str) -> bool {
    QUALIFIED_STEP.is_match(step)
}

/// Fails with `InvalidStepName` unless `step` is fully qualified
pub fn assert_qualified(step: &str) -> Result<()> {
    if is_qualified(step) {
        Ok(())
    } else {
        Err(DomainError::InvalidStepName(step.to_string()))
    }
}

/// Split a qualified name into `(namespace, pipeline, step)`
///
/// ```
/// use robot_master_core::domain::parse_qualified;
///
/// let (ns, pipeline, step) = parse_qualified("dor:assemblyWF:jp2-create").unwrap();
/// assert_eq!((ns, pipeline, step), ("dor", "assemblyWF", "jp2-create"));
/// ```
pub fn parse_qualified(step: &str) -> Result<(&str, &str, &str)> {
    assert_qualified(step)?;

    let mut parts = step.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(namespace), Some(pipeline), Some(name)) => Ok((namespace, pipeline, name)),
        _ => Err(DomainError::InvalidStepName(step.to_string())),
    }
}

/// Qualify `step` within `namespace:pipeline`, leaving qualified names untouched
pub fn qualify(step: &str, namespace: &str, pipeline: &str) -> String {
    if is_qualified(step) {
        step.to_string()
    } else {
        format!("{}:{}:{}", namespace, pipeline, step)
    }
}

/// A step name that is known to be fully qualified
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QualifiedStep {
    name: String,
    namespace_end: usize,
    pipeline_end: usize,
}

impl QualifiedStep {
    /// Qualify `step` within `namespace:pipeline` and validate the result
    pub fn qualify(step: &str, namespace: &str, pipeline: &str) -> Result<Self> {
        Self::try_from(qualify(step, namespace, pipeline))
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.name[..self.namespace_end]
    }

    pub fn pipeline(&self) -> &str {
        &self.name[self.namespace_end + 1..self.pipeline_end]
    }

    pub fn step(&self) -> &str {
        &self.name[self.pipeline_end + 1..]
    }
}

impl TryFrom<String> for QualifiedStep {
    type Error = DomainError;

    fn try_from(name: String) -> Result<Self> {
        let (namespace, pipeline, _) = parse_qualified(&name)?;
        let namespace_end = namespace.len();
        let pipeline_end = namespace_end + 1 + pipeline.len();
        Ok(Self {
            name,
            namespace_end,
            pipeline_end,
        })
    }
}

impl FromStr for QualifiedStep {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        Self::try_from(s.to_string())
    }
}

impl From<QualifiedStep> for String {
    fn from(step: QualifiedStep) -> Self {
        step.name
    }
}

impl AsRef<str> for QualifiedStep {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for QualifiedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
