// Verdict normalization: composite report in, uniform verdict out.
//
// Every known service appears in the output. Services that failed or never
// ran are filled with the safe default (is_safe = true, no threats); their
// `status` and `error` fields say why, so a client can tell a defaulted entry
// from a genuinely clean one.
//
// The overall flag only looks at the two authoritative services (VirusTotal
// and Google Safe Browsing). Supplementary services are informational.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::report::{AdapterResult, CompositeReport, FailureKind};
use crate::providers::traits::Details;
use crate::service::ServiceId;

/// How a service's entry was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Ok,
    Failed,
    Unconfigured,
    NotRun,
}

/// One service's slice of the normalized verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceVerdict {
    pub status: ServiceStatus,
    pub is_safe: bool,
    pub threats: Vec<String>,
    pub using_backup_key: bool,
    pub remaining_quota: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Details>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceVerdict {
    fn safe_default(status: ServiceStatus, error: String) -> Self {
        Self {
            status,
            is_safe: true,
            threats: Vec::new(),
            using_backup_key: false,
            remaining_quota: None,
            details: None,
            raw: None,
            error: Some(error),
        }
    }
}

/// The consumer-facing scan result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedVerdict {
    pub url: String,
    pub overall_safe: bool,
    pub scanned_at: DateTime<Utc>,
    pub services: BTreeMap<ServiceId, ServiceVerdict>,
}

impl NormalizedVerdict {
    pub fn service(&self, service: ServiceId) -> &ServiceVerdict {
        &self.services[&service]
    }

    /// Services that reported the URL as unsafe.
    pub fn flagged_by(&self) -> Vec<ServiceId> {
        self.services
            .iter()
            .filter(|(_, v)| !v.is_safe)
            .map(|(s, _)| *s)
            .collect()
    }
}

/// Build the normalized verdict. Pure: the same report always yields the same verdict.
pub fn normalize(report: &CompositeReport) -> NormalizedVerdict {
    let services: BTreeMap<ServiceId, ServiceVerdict> = ServiceId::ALL
        .into_iter()
        .map(|service| (service, service_verdict(report.per_service.get(&service))))
        .collect();

    let overall_safe = ServiceId::ALL
        .into_iter()
        .filter(|s| s.is_authoritative())
        .all(|s| services[&s].is_safe);

    NormalizedVerdict {
        url: report.target.as_str().to_string(),
        overall_safe,
        scanned_at: report.scanned_at,
        services,
    }
}

fn service_verdict(result: Option<&AdapterResult>) -> ServiceVerdict {
    match result {
        Some(AdapterResult::Success(v)) => ServiceVerdict {
            status: ServiceStatus::Ok,
            is_safe: v.is_safe,
            threats: v.threat_labels.iter().cloned().collect(),
            using_backup_key: v.using_backup_key,
            remaining_quota: Some(v.remaining_quota),
            details: Some(v.details.clone()),
            raw: Some(v.raw.clone()),
            error: None,
        },
        Some(AdapterResult::Failure {
            kind: FailureKind::Unconfigured,
            reason,
        }) => ServiceVerdict::safe_default(ServiceStatus::Unconfigured, reason.clone()),
        Some(AdapterResult::Failure { reason, .. }) => {
            ServiceVerdict::safe_default(ServiceStatus::Failed, reason.clone())
        }
        None => ServiceVerdict::safe_default(
            ServiceStatus::NotRun,
            "service not enabled".to_string(),
        ),
    }
}
