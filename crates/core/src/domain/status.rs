// Step Status - the per-(step, object) status held by the tracking service

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Status of one object at one step
///
/// Only `Waiting -> Queued` is driven by the dispatcher; the other values
/// are owned by the tracking service and workers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StepStatus {
    Waiting,
    Queued,
    Completed,
    Error,
    Hold,
    Other(String),
}

impl StepStatus {
    pub fn as_str(&self) -> &str {
        match self {
            StepStatus::Waiting => "waiting",
            StepStatus::Queued => "queued",
            StepStatus::Completed => "completed",
            StepStatus::Error => "error",
            StepStatus::Hold => "hold",
            StepStatus::Other(s) => s,
        }
    }

    pub fn is_waiting(&self) -> bool {
        matches!(self, StepStatus::Waiting)
    }
}

impl FromStr for StepStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s.trim().to_ascii_lowercase().as_str() {
            "waiting" => StepStatus::Waiting,
            "queued" => StepStatus::Queued,
            "completed" => StepStatus::Completed,
            "error" => StepStatus::Error,
            "hold" => StepStatus::Hold,
            other => StepStatus::Other(other.to_string()),
        };
        Ok(status)
    }
}

impl From<String> for StepStatus {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(status) => status,
            Err(never) => match never {},
        }
    }
}

impl From<StepStatus> for String {
    fn from(status: StepStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
