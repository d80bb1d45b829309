// VirusTotal v3 URL scanning: the primary aggregator.
//
// Two-phase protocol:
// 1. Look up an existing URL report by its identifier (unpadded URL-safe
//    base64 of the URL string). 200 means we already have a verdict.
// 2. On 404, submit the URL for analysis and poll the analysis endpoint at a
//    fixed interval until it completes or the attempt budget runs out.
//
// API docs: https://docs.virustotal.com/reference/url-info

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::http::{self, Endpoint};
use super::traits::{AnalysisSource, Details, ProviderError, ProviderVerdict, ReputationProvider};
use crate::credentials::CredentialRotator;
use crate::scan::target::ScanTarget;
use crate::service::ServiceId;

pub const DEFAULT_BASE_URL: &str = "https://www.virustotal.com";

/// Polling schedule for fresh analyses.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 10,
        }
    }
}

pub struct VirusTotalProvider {
    client: Client,
    endpoint: Endpoint,
    rotator: Arc<CredentialRotator>,
    poll: PollSettings,
}

/// Stable identifier VirusTotal uses for a URL.
pub fn url_id(url: &str) -> String {
    URL_SAFE_NO_PAD.encode(url.as_bytes())
}

/// Progress of a submitted analysis.
enum PollState {
    Submitted { analysis_id: String },
    Polling { analysis_id: String, attempt: u32 },
    Completed {
        attributes: AnalysisAttributes,
        raw: serde_json::Value,
    },
    TimedOut,
}

impl VirusTotalProvider {
    pub fn new(
        client: Client,
        endpoint: Endpoint,
        rotator: Arc<CredentialRotator>,
        poll: PollSettings,
    ) -> Self {
        Self {
            client,
            endpoint,
            rotator,
            poll,
        }
    }

    /// Phase 1: fetch a stored report. `None` when VirusTotal has never seen the URL.
    async fn existing_report(
        &self,
        url: &str,
        key: &str,
    ) -> Result<Option<(UrlAttributes, serde_json::Value)>, ProviderError> {
        let request = self
            .client
            .get(self.endpoint.url(&format!("/api/v3/urls/{}", url_id(url))))
            .header("x-apikey", key)
            .header("Accept", "application/json");

        let response = http::send(request, self.endpoint.timeout).await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(url = url, "No existing VirusTotal report");
            return Ok(None);
        }
        let response = http::require_success(response, "VirusTotal URL lookup").await?;
        let (report, raw): (DataEnvelope<UrlAttributes>, _) =
            http::read_json(response, "VirusTotal URL lookup").await?;
        Ok(Some((report.data.attributes, raw)))
    }

    /// Phase 2a: submit the URL and return the analysis id.
    async fn submit(&self, url: &str, key: &str) -> Result<String, ProviderError> {
        let request = self
            .client
            .post(self.endpoint.url("/api/v3/urls"))
            .header("x-apikey", key)
            .header("Accept", "application/json")
            .form(&[("url", url)]);

        let response = http::send(request, self.endpoint.timeout).await?;
        let response = http::require_success(response, "VirusTotal submission").await?;
        let (submission, _): (SubmissionEnvelope, _) =
            http::read_json(response, "VirusTotal submission").await?;
        Ok(submission.data.id)
    }

    async fn fetch_analysis(
        &self,
        analysis_id: &str,
        key: &str,
    ) -> Result<(AnalysisAttributes, serde_json::Value), ProviderError> {
        let request = self
            .client
            .get(self.endpoint.url(&format!("/api/v3/analyses/{analysis_id}")))
            .header("x-apikey", key)
            .header("Accept", "application/json");

        let response = http::send(request, self.endpoint.timeout).await?;
        let response = http::require_success(response, "VirusTotal analysis").await?;
        let (analysis, raw): (DataEnvelope<AnalysisAttributes>, _) =
            http::read_json(response, "VirusTotal analysis").await?;
        Ok((analysis.data.attributes, raw))
    }

    /// Phase 2b: poll until completed or the attempt budget is spent.
    async fn await_analysis(
        &self,
        analysis_id: String,
        key: &str,
    ) -> Result<(AnalysisAttributes, serde_json::Value), ProviderError> {
        let max_attempts = self.poll.max_attempts.max(1);
        let mut state = PollState::Submitted { analysis_id };

        loop {
            state = match state {
                PollState::Submitted { analysis_id } => PollState::Polling {
                    analysis_id,
                    attempt: 1,
                },
                PollState::Polling {
                    analysis_id,
                    attempt,
                } => {
                    let (attributes, raw) = self.fetch_analysis(&analysis_id, key).await?;
                    debug!(
                        analysis_id = %analysis_id,
                        attempt,
                        max_attempts,
                        status = %attributes.status,
                        "VirusTotal analysis status"
                    );
                    if attributes.is_completed() {
                        PollState::Completed { attributes, raw }
                    } else if attempt >= max_attempts {
                        PollState::TimedOut
                    } else {
                        tokio::time::sleep(self.poll.interval).await;
                        PollState::Polling {
                            analysis_id,
                            attempt: attempt + 1,
                        }
                    }
                }
                PollState::Completed { attributes, raw } => return Ok((attributes, raw)),
                PollState::TimedOut => return Err(ProviderError::AnalysisTimedOut),
            };
        }
    }
}

#[async_trait]
impl ReputationProvider for VirusTotalProvider {
    fn service(&self) -> ServiceId {
        ServiceId::VirusTotal
    }

    async fn check(&self, target: &ScanTarget) -> Result<ProviderVerdict, ProviderError> {
        let credential = self.rotator.active_key(self.service());
        let key = credential.secret().ok_or(ProviderError::Unconfigured)?;
        let url = target.as_str();

        let (stats, results, source, raw) = match self.existing_report(url, key).await? {
            Some((attributes, raw)) => (
                attributes.last_analysis_stats,
                attributes.last_analysis_results,
                AnalysisSource::Existing,
                raw,
            ),
            None => {
                let analysis_id = self.submit(url, key).await?;
                debug!(analysis_id = %analysis_id, "Submitted URL to VirusTotal");
                let (attributes, raw) = self.await_analysis(analysis_id, key).await?;
                (attributes.stats, attributes.results, AnalysisSource::Fresh, raw)
            }
        };

        let (positives, total) = detection_ratio(&stats);
        Ok(ProviderVerdict::new(
            positives == 0,
            engine_labels(&results),
            Details::Detections {
                positives,
                total,
                source,
            },
            raw,
            &credential,
        ))
    }
}

/// Positives (malicious + suspicious engines) over all engines that reported.
pub fn detection_ratio(stats: &HashMap<String, u32>) -> (u32, u32) {
    let count = |k: &str| stats.get(k).copied().unwrap_or(0);
    let positives = count("malicious").saturating_add(count("suspicious"));
    let total = stats.values().fold(0u32, |acc, n| acc.saturating_add(*n));
    (positives, total)
}

/// Distinct verdict strings from engines that flagged the URL.
fn engine_labels(results: &HashMap<String, EngineResult>) -> BTreeSet<String> {
    results
        .values()
        .filter(|r| matches!(r.category.as_str(), "malicious" | "suspicious"))
        .filter_map(|r| r.result.clone())
        .filter(|r| !r.is_empty())
        .collect()
}

// --- VirusTotal API response types ---

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: DataObject<T>,
}

#[derive(Deserialize)]
struct DataObject<T> {
    attributes: T,
}

#[derive(Deserialize)]
struct SubmissionEnvelope {
    data: SubmissionData,
}

#[derive(Deserialize)]
struct SubmissionData {
    id: String,
}

#[derive(Deserialize)]
struct UrlAttributes {
    #[serde(default)]
    last_analysis_stats: HashMap<String, u32>,
    #[serde(default)]
    last_analysis_results: HashMap<String, EngineResult>,
}

#[derive(Deserialize)]
struct AnalysisAttributes {
    status: String,
    #[serde(default)]
    stats: HashMap<String, u32>,
    #[serde(default)]
    results: HashMap<String, EngineResult>,
}

impl AnalysisAttributes {
    fn is_completed(&self) -> bool {
        self.status == "completed"
    }
}

#[derive(Deserialize)]
struct EngineResult {
    category: String,
    #[serde(default)]
    result: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_id_is_unpadded_url_safe_base64() {
        assert_eq!(url_id("http://example.com"), "aHR0cDovL2V4YW1wbGUuY29t");
        // '?' and '>' produce '/' and '+' in standard base64
        let id = url_id("http://example.com/?a=>>>");
        assert!(!id.contains('/') && !id.contains('+') && !id.ends_with('='));
    }

    #[test]
    fn test_detection_ratio_counts_malicious_and_suspicious() {
        let stats: HashMap<String, u32> = [
            ("harmless", 60),
            ("malicious", 2),
            ("suspicious", 1),
            ("undetected", 7),
            ("timeout", 0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        assert_eq!(detection_ratio(&stats), (3, 70));
    }

    #[test]
    fn test_detection_ratio_saturates_on_huge_counts() {
        let stats: HashMap<String, u32> = [
            ("malicious", u32::MAX),
            ("suspicious", 5),
            ("harmless", u32::MAX),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        assert_eq!(detection_ratio(&stats), (u32::MAX, u32::MAX));
    }

    #[test]
    fn test_detection_ratio_empty_stats() {
        assert_eq!(detection_ratio(&HashMap::new()), (0, 0));
    }

    #[test]
    fn test_engine_labels_only_from_flagging_engines() {
        let results: HashMap<String, EngineResult> = serde_json::from_str(
            r#"{
                "EngineA": {"category": "malicious", "result": "phishing"},
                "EngineB": {"category": "suspicious", "result": "suspicious"},
                "EngineC": {"category": "harmless", "result": "clean"},
                "EngineD": {"category": "malicious", "result": "phishing"},
                "EngineE": {"category": "undetected", "result": null}
            }"#,
        )
        .unwrap();
        let labels: Vec<_> = engine_labels(&results).into_iter().collect();
        assert_eq!(labels, vec!["phishing", "suspicious"]);
    }

    #[test]
    fn test_default_poll_settings() {
        let poll = PollSettings::default();
        assert_eq!(poll.interval, Duration::from_secs(2));
        assert_eq!(poll.max_attempts, 10);
    }
}
