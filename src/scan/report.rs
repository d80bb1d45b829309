// Composite report: the unmerged outcome of every provider for one scan.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::target::ScanTarget;
use crate::providers::traits::ProviderVerdict;
use crate::service::ServiceId;

/// Category of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Unconfigured,
    Transient,
    Protocol,
    UnresolvedHost,
    AnalysisTimedOut,
}

/// What one provider produced for one scan. Failures are data, not errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdapterResult {
    Success(ProviderVerdict),
    Failure { kind: FailureKind, reason: String },
}

impl AdapterResult {
    pub fn failure(kind: FailureKind, reason: impl Into<String>) -> Self {
        AdapterResult::Failure {
            kind,
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AdapterResult::Success(_))
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            AdapterResult::Success(_) => None,
            AdapterResult::Failure { reason, .. } => Some(reason),
        }
    }
}

/// All provider outcomes for one target. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeReport {
    pub target: ScanTarget,
    pub per_service: BTreeMap<ServiceId, AdapterResult>,
    pub scanned_at: DateTime<Utc>,
}
