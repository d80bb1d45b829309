// Reputation provider trait: the seam between the orchestrator and each
// upstream API.
//
// Every provider translates its own response shape into ProviderVerdict.
// Errors are typed (ProviderError) and converted into AdapterResult::Failure
// by `provider_outcome`, so nothing an adapter does can escape as a fault.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::credentials::Credential;
use crate::scan::report::{AdapterResult, FailureKind};
use crate::scan::target::ScanTarget;
use crate::service::ServiceId;

/// A successful, normalized answer from one provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderVerdict {
    pub is_safe: bool,
    pub threat_labels: BTreeSet<String>,
    pub details: Details,
    /// The provider's payload as received, for display and debugging.
    pub raw: serde_json::Value,
    pub using_backup_key: bool,
    pub remaining_quota: u32,
}

impl ProviderVerdict {
    /// Build a verdict, taking quota metadata from the credential that was
    /// issued for this call.
    pub fn new(
        is_safe: bool,
        threat_labels: BTreeSet<String>,
        details: Details,
        raw: serde_json::Value,
        credential: &Credential,
    ) -> Self {
        Self {
            is_safe,
            threat_labels,
            details,
            raw,
            using_backup_key: credential.using_backup(),
            remaining_quota: credential.remaining_quota(),
        }
    }
}

/// Where a VirusTotal verdict came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    /// A prior analysis already stored upstream.
    Existing,
    /// A new analysis submitted and polled to completion.
    Fresh,
}

/// A WOT category that cleared the confidence threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScorecardCategory {
    pub id: u32,
    pub label: String,
    pub confidence: u32,
}

/// Provider-specific supporting detail carried alongside the verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Details {
    /// Engine detection ratio from the scanning aggregator.
    Detections {
        positives: u32,
        total: u32,
        source: AnalysisSource,
    },
    /// Threat-match lookups (Google / Yandex Safe Browsing).
    ThreatMatches { match_count: usize },
    /// IP abuse reputation of the resolved host.
    AbuseReport {
        domain: String,
        ip_address: String,
        confidence_score: u32,
        total_reports: u32,
        country_code: Option<String>,
        is_whitelisted: Option<bool>,
    },
    /// Reputation scorecard categories above threshold.
    Scorecard { flagged: Vec<ScorecardCategory> },
}

/// Why a provider call did not produce a verdict.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("service not configured")]
    Unconfigured,

    /// Timeout, connection failure or non-success status.
    #[error("upstream request failed: {0}")]
    Transient(String),

    /// The provider answered with a payload we could not interpret.
    #[error("unexpected response from upstream: {0}")]
    Protocol(String),

    #[error("could not resolve host")]
    UnresolvedHost,

    #[error("timed out awaiting analysis")]
    AnalysisTimedOut,
}

impl ProviderError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ProviderError::Unconfigured => FailureKind::Unconfigured,
            ProviderError::Transient(_) => FailureKind::Transient,
            ProviderError::Protocol(_) => FailureKind::Protocol,
            ProviderError::UnresolvedHost => FailureKind::UnresolvedHost,
            ProviderError::AnalysisTimedOut => FailureKind::AnalysisTimedOut,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProviderError::Protocol(e.to_string())
        } else if e.is_timeout() {
            ProviderError::Transient(format!("request timed out: {e}"))
        } else {
            ProviderError::Transient(e.to_string())
        }
    }
}

/// One upstream threat-intelligence service.
#[async_trait]
pub trait ReputationProvider: Send + Sync {
    fn service(&self) -> ServiceId;

    /// Look up `target` and translate the answer into a verdict.
    async fn check(&self, target: &ScanTarget) -> Result<ProviderVerdict, ProviderError>;
}

/// Run a provider and fold any error into a `Failure` entry.
pub async fn provider_outcome(
    provider: &dyn ReputationProvider,
    target: &ScanTarget,
) -> AdapterResult {
    let service = provider.service();
    match provider.check(target).await {
        Ok(verdict) => {
            debug!(
                service = %service,
                is_safe = verdict.is_safe,
                labels = verdict.threat_labels.len(),
                "Provider returned verdict"
            );
            AdapterResult::Success(verdict)
        }
        Err(e) => {
            if matches!(e, ProviderError::Unconfigured) {
                debug!(service = %service, "Provider skipped, no credential");
            } else {
                warn!(service = %service, error = %e, "Provider check failed");
            }
            AdapterResult::failure(e.kind(), e.to_string())
        }
    }
}
