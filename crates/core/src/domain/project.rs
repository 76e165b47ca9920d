use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerRef;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Proposal,
    ContractSigned,
    InExecution,
    InReview,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    /// Lifecycle states counted as active work for a customer.
    pub const ACTIVE: [ProjectStatus; 3] =
        [ProjectStatus::ContractSigned, ProjectStatus::InExecution, ProjectStatus::InReview];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proposal => "proposal",
            Self::ContractSigned => "contract_signed",
            Self::InExecution => "in_execution",
            Self::InReview => "in_review",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }
}

impl FromStr for ProjectStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "proposal" => Ok(Self::Proposal),
            "contract_signed" => Ok(Self::ContractSigned),
            "in_execution" => Ok(Self::InExecution),
            "in_review" => Ok(Self::InReview),
            "completed" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            other => {
                Err(DomainError::InvariantViolation(format!("unknown project status `{other}`")))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub customer: CustomerRef,
    pub name: String,
    pub status: ProjectStatus,
}
