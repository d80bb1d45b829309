// AbuseIPDB IP reputation.
//
// AbuseIPDB scores IP addresses, so the target's hostname is resolved first
// (DNS-over-HTTPS) unless the URL already uses an IP literal. The abuse
// confidence score (0-100) over a 90-day window decides the verdict.
//
// API docs: https://docs.abuseipdb.com/#check-endpoint

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::dns::DohResolver;
use super::http::{self, Endpoint};
use super::traits::{Details, ProviderError, ProviderVerdict, ReputationProvider};
use crate::credentials::CredentialRotator;
use crate::scan::target::ScanTarget;
use crate::service::ServiceId;

pub const DEFAULT_BASE_URL: &str = "https://api.abuseipdb.com";

/// Reports older than this are ignored by the check endpoint.
const MAX_AGE_IN_DAYS: u32 = 90;

/// Scores at or above this are treated as unsafe.
pub const UNSAFE_SCORE: u32 = 25;

pub const ABUSIVE_IP_LABEL: &str = "ABUSIVE_IP";

pub struct AbuseIpdbProvider {
    client: Client,
    endpoint: Endpoint,
    rotator: Arc<CredentialRotator>,
    resolver: DohResolver,
}

impl AbuseIpdbProvider {
    pub fn new(
        client: Client,
        endpoint: Endpoint,
        rotator: Arc<CredentialRotator>,
        resolver: DohResolver,
    ) -> Self {
        Self {
            client,
            endpoint,
            rotator,
            resolver,
        }
    }
}

#[async_trait]
impl ReputationProvider for AbuseIpdbProvider {
    fn service(&self) -> ServiceId {
        ServiceId::AbuseIpdb
    }

    async fn check(&self, target: &ScanTarget) -> Result<ProviderVerdict, ProviderError> {
        let credential = self.rotator.active_key(self.service());
        let key = credential.secret().ok_or(ProviderError::Unconfigured)?;

        let ip = match target.ip_literal() {
            Some(ip) => ip,
            None => self.resolver.resolve(target.host()).await?,
        };
        let ip = ip.to_string();
        let max_age = MAX_AGE_IN_DAYS.to_string();

        let request = self
            .client
            .get(self.endpoint.url("/api/v2/check"))
            .header("Key", key)
            .header("Accept", "application/json")
            .query(&[
                ("ipAddress", ip.as_str()),
                ("maxAgeInDays", max_age.as_str()),
                ("verbose", "true"),
            ]);

        let response = http::send(request, self.endpoint.timeout).await?;
        let response = http::require_success(response, "AbuseIPDB").await?;
        let (report, raw): (CheckResponse, _) = http::read_json(response, "AbuseIPDB").await?;
        let data = report.data;

        let is_safe = is_safe_score(data.abuse_confidence_score);
        let mut labels = BTreeSet::new();
        if !is_safe {
            labels.insert(ABUSIVE_IP_LABEL.to_string());
        }

        Ok(ProviderVerdict::new(
            is_safe,
            labels,
            Details::AbuseReport {
                domain: target.host().to_string(),
                ip_address: data.ip_address.unwrap_or(ip),
                confidence_score: data.abuse_confidence_score,
                total_reports: data.total_reports.unwrap_or(0),
                country_code: data.country_code,
                is_whitelisted: data.is_whitelisted,
            },
            raw,
            &credential,
        ))
    }
}

pub fn is_safe_score(score: u32) -> bool {
    score < UNSAFE_SCORE
}

#[derive(Deserialize)]
struct CheckResponse {
    data: CheckData,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckData {
    ip_address: Option<String>,
    abuse_confidence_score: u32,
    total_reports: Option<u32>,
    country_code: Option<String>,
    is_whitelisted: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_threshold_boundary() {
        assert!(is_safe_score(0));
        assert!(is_safe_score(24));
        assert!(!is_safe_score(25));
        assert!(!is_safe_score(100));
    }

    #[test]
    fn test_check_response_tolerates_missing_optionals() {
        let resp: CheckResponse =
            serde_json::from_str(r#"{"data": {"abuseConfidenceScore": 12}}"#).unwrap();
        assert_eq!(resp.data.abuse_confidence_score, 12);
        assert!(resp.data.country_code.is_none());
        assert!(resp.data.is_whitelisted.is_none());
    }

    #[test]
    fn test_check_response_rejects_missing_score() {
        let resp = serde_json::from_str::<CheckResponse>(r#"{"data": {"ipAddress": "1.2.3.4"}}"#);
        assert!(resp.is_err());
    }
}
