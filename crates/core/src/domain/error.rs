// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("step not qualified: {0}")]
    InvalidStepName(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
