// Google Safe Browsing v4 threat-match lookup.
//
// API docs: https://developers.google.com/safe-browsing/v4/lookup-api

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use super::http::{self, Endpoint};
use super::threat_match::{ThreatMatchRequest, ThreatMatchResponse};
use super::traits::{Details, ProviderError, ProviderVerdict, ReputationProvider};
use crate::credentials::CredentialRotator;
use crate::scan::target::ScanTarget;
use crate::service::ServiceId;

pub const DEFAULT_BASE_URL: &str = "https://safebrowsing.googleapis.com";

const THREAT_TYPES: [&str; 4] = [
    "MALWARE",
    "SOCIAL_ENGINEERING",
    "UNWANTED_SOFTWARE",
    "POTENTIALLY_HARMFUL_APPLICATION",
];

pub struct SafeBrowsingProvider {
    client: Client,
    endpoint: Endpoint,
    rotator: Arc<CredentialRotator>,
}

impl SafeBrowsingProvider {
    pub fn new(client: Client, endpoint: Endpoint, rotator: Arc<CredentialRotator>) -> Self {
        Self {
            client,
            endpoint,
            rotator,
        }
    }
}

#[async_trait]
impl ReputationProvider for SafeBrowsingProvider {
    fn service(&self) -> ServiceId {
        ServiceId::SafeBrowsing
    }

    async fn check(&self, target: &ScanTarget) -> Result<ProviderVerdict, ProviderError> {
        let credential = self.rotator.active_key(self.service());
        let key = credential.secret().ok_or(ProviderError::Unconfigured)?;

        let request = self
            .client
            .post(self.endpoint.url("/v4/threatMatches:find"))
            .query(&[("key", key)])
            .json(&ThreatMatchRequest::for_url(target.as_str(), &THREAT_TYPES));

        let response = http::send(request, self.endpoint.timeout).await?;
        let response = http::require_success(response, "Safe Browsing").await?;
        let (result, raw): (ThreatMatchResponse, _) =
            http::read_json(response, "Safe Browsing").await?;

        Ok(ProviderVerdict::new(
            result.is_safe(),
            result.threat_labels(),
            Details::ThreatMatches {
                match_count: result.matches.len(),
            },
            raw,
            &credential,
        ))
    }
}
