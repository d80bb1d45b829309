// Reputation providers: one adapter per upstream threat-intelligence API.
//
// Each adapter implements ReputationProvider and does nothing but translate
// its provider's request/response shapes into ProviderVerdict. The
// orchestrator only ever sees the trait.

pub mod abuseipdb;
pub mod dns;
pub mod http;
pub mod safe_browsing;
pub mod threat_match;
pub mod traits;
pub mod virustotal;
pub mod wot;
pub mod yandex;

use std::sync::Arc;

use crate::config::Config;
use crate::credentials::CredentialRotator;
use crate::service::ServiceId;

use self::http::Endpoint;
use self::traits::ReputationProvider;

/// Build the adapters for every enabled service, in the configured order.
pub fn build_providers(
    config: &Config,
    rotator: Arc<CredentialRotator>,
    client: reqwest::Client,
) -> Vec<Arc<dyn ReputationProvider>> {
    config
        .enabled
        .iter()
        .map(|&service| build_provider(service, config, Arc::clone(&rotator), client.clone()))
        .collect()
}

fn build_provider(
    service: ServiceId,
    config: &Config,
    rotator: Arc<CredentialRotator>,
    client: reqwest::Client,
) -> Arc<dyn ReputationProvider> {
    let cfg = config.service(service);
    let endpoint = Endpoint::new(&cfg.base_url, cfg.timeout);

    match service {
        ServiceId::VirusTotal => Arc::new(virustotal::VirusTotalProvider::new(
            client,
            endpoint,
            rotator,
            config.vt_poll,
        )),
        ServiceId::SafeBrowsing => Arc::new(safe_browsing::SafeBrowsingProvider::new(
            client, endpoint, rotator,
        )),
        ServiceId::AbuseIpdb => {
            let resolver = dns::DohResolver::new(
                client.clone(),
                Endpoint::new(&config.dns_resolver_url, config.dns_timeout),
            );
            Arc::new(abuseipdb::AbuseIpdbProvider::new(
                client, endpoint, rotator, resolver,
            ))
        }
        ServiceId::WebOfTrust => Arc::new(wot::WotProvider::new(
            client,
            endpoint,
            rotator,
            config.wot_user_id.clone(),
            config.wot_threshold,
        )),
        ServiceId::YandexSafeBrowsing => {
            Arc::new(yandex::YandexProvider::new(client, endpoint, rotator))
        }
    }
}
