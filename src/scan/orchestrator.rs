// Fan-out orchestrator: one URL, every provider, settle-all.
//
// Each provider runs in its own tokio task. The orchestrator waits for all of
// them regardless of individual outcomes and keys the results by service.
// Tasks are detached rather than aborted if the caller goes away, so an
// abandoned request still lets in-flight provider calls finish cleanly.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use futures::future::join_all;
use tracing::{error, info};

use super::error::ScanError;
use super::report::{AdapterResult, CompositeReport, FailureKind};
use super::target::ScanTarget;
use crate::config::Config;
use crate::credentials::CredentialRotator;
use crate::providers::traits::{provider_outcome, ReputationProvider};
use crate::providers::{build_providers, http};
use crate::service::ServiceId;

pub struct Scanner {
    providers: Vec<Arc<dyn ReputationProvider>>,
    rotator: Arc<CredentialRotator>,
}

impl Scanner {
    pub fn new(providers: Vec<Arc<dyn ReputationProvider>>, rotator: Arc<CredentialRotator>) -> Self {
        Self { providers, rotator }
    }

    /// Build a scanner with one adapter per enabled service, all sharing one
    /// HTTP client and the given rotator.
    pub fn from_config(config: &Config, rotator: Arc<CredentialRotator>) -> Result<Self> {
        let client = http::build_client()?;
        Ok(Self::new(
            build_providers(config, Arc::clone(&rotator), client),
            rotator,
        ))
    }

    /// Services this scanner fans out to.
    pub fn services(&self) -> Vec<ServiceId> {
        self.providers.iter().map(|p| p.service()).collect()
    }

    /// Validate `url` and query every provider for it.
    pub async fn aggregate(&self, url: &str) -> Result<CompositeReport, ScanError> {
        let target = ScanTarget::parse(url)?;
        self.aggregate_target(target).await
    }

    /// Query every provider for an already validated target.
    pub async fn aggregate_target(&self, target: ScanTarget) -> Result<CompositeReport, ScanError> {
        // Enabled services without a key would only answer Unconfigured.
        let configured = self
            .providers
            .iter()
            .any(|p| self.rotator.is_configured(p.service()));
        if !configured {
            return Err(ScanError::NoProviders);
        }

        let (services, handles): (Vec<_>, Vec<_>) = self
            .providers
            .iter()
            .map(|provider| {
                let provider = Arc::clone(provider);
                let target = target.clone();
                let service = provider.service();
                let handle =
                    tokio::spawn(async move { provider_outcome(provider.as_ref(), &target).await });
                (service, handle)
            })
            .unzip();

        let outcomes = join_all(handles).await;

        if outcomes.iter().all(|o| o.is_err()) {
            error!(url = %target, "No provider task completed");
            return Err(ScanError::Unavailable(
                "no provider task completed".to_string(),
            ));
        }

        let per_service: BTreeMap<ServiceId, AdapterResult> = services
            .into_iter()
            .zip(outcomes)
            .map(|(service, outcome)| {
                let result = outcome.unwrap_or_else(|e| {
                    error!(service = %service, error = %e, "Provider task did not complete");
                    AdapterResult::failure(FailureKind::Protocol, "provider task aborted")
                });
                (service, result)
            })
            .collect();

        let succeeded = per_service.values().filter(|r| r.is_success()).count();
        info!(
            url = %target,
            succeeded,
            failed = per_service.len() - succeeded,
            "Scan complete"
        );

        Ok(CompositeReport {
            target,
            per_service,
            scanned_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};

    use async_trait::async_trait;

    use super::*;
    use crate::credentials::ServiceKeys;
    use crate::providers::traits::{Details, ProviderError, ProviderVerdict};

    /// Answers clean for its service using a key from the shared rotator.
    struct CleanProvider {
        service: ServiceId,
        rotator: Arc<CredentialRotator>,
    }

    #[async_trait]
    impl ReputationProvider for CleanProvider {
        fn service(&self) -> ServiceId {
            self.service
        }

        async fn check(&self, _target: &ScanTarget) -> Result<ProviderVerdict, ProviderError> {
            let credential = self.rotator.active_key(self.service);
            credential.secret().ok_or(ProviderError::Unconfigured)?;
            Ok(ProviderVerdict::new(
                true,
                BTreeSet::new(),
                Details::ThreatMatches { match_count: 0 },
                serde_json::json!({}),
                &credential,
            ))
        }
    }

    struct PanickingProvider(ServiceId);

    #[async_trait]
    impl ReputationProvider for PanickingProvider {
        fn service(&self) -> ServiceId {
            self.0
        }

        async fn check(&self, _target: &ScanTarget) -> Result<ProviderVerdict, ProviderError> {
            panic!("provider bug");
        }
    }

    fn rotator_with_keys(services: &[ServiceId]) -> Arc<CredentialRotator> {
        let keys: HashMap<ServiceId, ServiceKeys> = services
            .iter()
            .map(|s| (*s, ServiceKeys::new(Some(format!("{s}-key")), None, 100)))
            .collect();
        Arc::new(CredentialRotator::with_system_clock(keys))
    }

    #[tokio::test]
    async fn test_no_keyed_provider_is_no_providers() {
        let rotator = rotator_with_keys(&[]);
        let providers: Vec<Arc<dyn ReputationProvider>> = ServiceId::ALL
            .into_iter()
            .map(|service| {
                Arc::new(CleanProvider {
                    service,
                    rotator: Arc::clone(&rotator),
                }) as Arc<dyn ReputationProvider>
            })
            .collect();
        let scanner = Scanner::new(providers, rotator);

        let err = scanner.aggregate("https://example.com/").await.unwrap_err();
        assert!(matches!(err, ScanError::NoProviders));
        assert_eq!(err.kind(), "unconfigured_service");
    }

    #[tokio::test]
    async fn test_one_keyed_provider_is_enough() {
        let rotator = rotator_with_keys(&[ServiceId::WebOfTrust]);
        let providers: Vec<Arc<dyn ReputationProvider>> = [ServiceId::VirusTotal, ServiceId::WebOfTrust]
            .into_iter()
            .map(|service| {
                Arc::new(CleanProvider {
                    service,
                    rotator: Arc::clone(&rotator),
                }) as Arc<dyn ReputationProvider>
            })
            .collect();
        let scanner = Scanner::new(providers, rotator);

        let report = scanner.aggregate("https://example.com/").await.unwrap();
        assert!(report.per_service[&ServiceId::WebOfTrust].is_success());
        assert!(matches!(
            report.per_service[&ServiceId::VirusTotal],
            AdapterResult::Failure {
                kind: FailureKind::Unconfigured,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_panicked_task_is_recorded_as_failure() {
        let rotator = rotator_with_keys(&[ServiceId::SafeBrowsing, ServiceId::YandexSafeBrowsing]);
        let providers: Vec<Arc<dyn ReputationProvider>> = vec![
            Arc::new(CleanProvider {
                service: ServiceId::SafeBrowsing,
                rotator: Arc::clone(&rotator),
            }),
            Arc::new(PanickingProvider(ServiceId::YandexSafeBrowsing)),
        ];
        let scanner = Scanner::new(providers, rotator);

        let report = scanner.aggregate("https://example.com/").await.unwrap();
        assert!(report.per_service[&ServiceId::SafeBrowsing].is_success());
        assert_eq!(
            report.per_service[&ServiceId::YandexSafeBrowsing].failure_reason(),
            Some("provider task aborted")
        );
    }

    #[tokio::test]
    async fn test_every_task_panicking_is_unavailable() {
        let rotator = rotator_with_keys(&[ServiceId::VirusTotal, ServiceId::SafeBrowsing]);
        let providers: Vec<Arc<dyn ReputationProvider>> = vec![
            Arc::new(PanickingProvider(ServiceId::VirusTotal)),
            Arc::new(PanickingProvider(ServiceId::SafeBrowsing)),
        ];
        let scanner = Scanner::new(providers, rotator);

        let err = scanner.aggregate("https://example.com/").await.unwrap_err();
        assert!(matches!(err, ScanError::Unavailable(_)));
        assert_eq!(err.kind(), "upstream_unavailable");
    }
}
