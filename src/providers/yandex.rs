// Yandex Safe Browsing: supplementary threat-match lookup.
//
// Speaks the same v4 protocol as Google's service, with a narrower set of
// threat types. Informational only: it never changes the overall verdict.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use super::http::{self, Endpoint};
use super::threat_match::{ThreatMatchRequest, ThreatMatchResponse};
use super::traits::{Details, ProviderError, ProviderVerdict, ReputationProvider};
use crate::credentials::CredentialRotator;
use crate::scan::target::ScanTarget;
use crate::service::ServiceId;

pub const DEFAULT_BASE_URL: &str = "https://sba.yandex.net";

const THREAT_TYPES: [&str; 2] = ["MALWARE", "SOCIAL_ENGINEERING"];

pub struct YandexProvider {
    client: Client,
    endpoint: Endpoint,
    rotator: Arc<CredentialRotator>,
}

impl YandexProvider {
    pub fn new(client: Client, endpoint: Endpoint, rotator: Arc<CredentialRotator>) -> Self {
        Self {
            client,
            endpoint,
            rotator,
        }
    }
}

#[async_trait]
impl ReputationProvider for YandexProvider {
    fn service(&self) -> ServiceId {
        ServiceId::YandexSafeBrowsing
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
        let response = http::require_success(response, "Yandex Safe Browsing").await?;
        let (result, raw): (ThreatMatchResponse, _) =
            http::read_json(response, "Yandex Safe Browsing").await?;

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
