// Web of Trust scorecard: supplementary hostname reputation.
//
// WOT reports per-category confidence (0-100). Categories that indicate a
// threat and clear the confidence threshold become threat labels. The
// service answers either with a category map keyed by id or, on the v3
// targets endpoint, with a list of targets each carrying a category list;
// both shapes are accepted.
//
// API docs: https://support.mywot.com/hc/en-us/sections/360004477734-API-

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::http::{self, Endpoint};
use super::traits::{
    Details, ProviderError, ProviderVerdict, ReputationProvider, ScorecardCategory,
};
use crate::credentials::CredentialRotator;
use crate::scan::target::ScanTarget;
use crate::service::ServiceId;

pub const DEFAULT_BASE_URL: &str = "https://scorecard.api.mywot.com";

/// Confidence must be strictly above this for a category to count.
pub const DEFAULT_THRESHOLD: u32 = 50;

/// Threat-bearing WOT category ids and the labels we report them as.
const THREAT_CATEGORIES: [(u32, &str); 4] = [
    (101, "malware"),
    (103, "phishing"),
    (104, "scam"),
    (108, "potentially_unsafe"),
];

pub struct WotProvider {
    client: Client,
    endpoint: Endpoint,
    rotator: Arc<CredentialRotator>,
    user_id: Option<String>,
    threshold: u32,
}

impl WotProvider {
    pub fn new(
        client: Client,
        endpoint: Endpoint,
        rotator: Arc<CredentialRotator>,
        user_id: Option<String>,
        threshold: u32,
    ) -> Self {
        Self {
            client,
            endpoint,
            rotator,
            user_id,
            threshold,
        }
    }
}

#[async_trait]
impl ReputationProvider for WotProvider {
    fn service(&self) -> ServiceId {
        ServiceId::WebOfTrust
    }

    async fn check(&self, target: &ScanTarget) -> Result<ProviderVerdict, ProviderError> {
        let credential = self.rotator.active_key(self.service());
        let key = credential.secret().ok_or(ProviderError::Unconfigured)?;

        let mut request = self
            .client
            .get(self.endpoint.url(&format!("/v3/targets/{}", target.host())))
            .header("x-api-key", key)
            .header("Accept", "application/json");
        if let Some(user_id) = &self.user_id {
            request = request.header("x-user-id", user_id);
        }

        let response = http::send(request, self.endpoint.timeout).await?;
        let response = http::require_success(response, "WOT").await?;
        let (payload, raw): (WotPayload, _) = http::read_json(response, "WOT").await?;

        let flagged = flagged_categories(&payload.confidences(), self.threshold);
        let labels: BTreeSet<String> = flagged.iter().map(|c| c.label.clone()).collect();

        Ok(ProviderVerdict::new(
            labels.is_empty(),
            labels,
            Details::Scorecard { flagged },
            raw,
            &credential,
        ))
    }
}

/// Threat categories whose confidence is strictly above `threshold`.
pub fn flagged_categories(
    confidences: &HashMap<u32, u32>,
    threshold: u32,
) -> Vec<ScorecardCategory> {
    THREAT_CATEGORIES
        .iter()
        .filter_map(|&(id, label)| {
            let confidence = *confidences.get(&id)?;
            (confidence > threshold).then(|| ScorecardCategory {
                id,
                label: label.to_string(),
                confidence,
            })
        })
        .collect()
}

// --- WOT response shapes ---

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WotPayload {
    Targets(Vec<WotTarget>),
    Target(WotTarget),
}

#[derive(Debug, Deserialize)]
struct WotTarget {
    #[serde(default)]
    categories: Option<WotCategories>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WotCategories {
    ById(HashMap<String, WotScore>),
    Listed(Vec<WotListedCategory>),
}

#[derive(Debug, Deserialize)]
struct WotScore {
    confidence: u32,
}

#[derive(Debug, Deserialize)]
struct WotListedCategory {
    id: u32,
    confidence: u32,
}

impl WotPayload {
    /// Highest confidence per category id across all returned targets.
    fn confidences(&self) -> HashMap<u32, u32> {
        let targets: Vec<&WotTarget> = match self {
            WotPayload::Targets(list) => list.iter().collect(),
            WotPayload::Target(one) => vec![one],
        };

        let mut out: HashMap<u32, u32> = HashMap::new();
        let mut record = |id: u32, confidence: u32| {
            let entry = out.entry(id).or_insert(0);
            *entry = (*entry).max(confidence);
        };

        for target in targets {
            match &target.categories {
                Some(WotCategories::ById(map)) => {
                    for (id, score) in map {
                        if let Ok(id) = id.parse::<u32>() {
                            record(id, score.confidence);
                        }
                    }
                }
                Some(WotCategories::Listed(list)) => {
                    for category in list {
                        record(category.id, category.confidence);
                    }
                }
                None => {}
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confidences(json: &str) -> HashMap<u32, u32> {
        serde_json::from_str::<WotPayload>(json).unwrap().confidences()
    }

    #[test]
    fn test_map_shape() {
        let c = confidences(
            r#"{"target": "example.com", "categories": {
                "101": {"confidence": 80, "severity": 3},
                "501": {"confidence": 90, "severity": 0}
            }}"#,
        );
        assert_eq!(c.get(&101), Some(&80));
        assert_eq!(c.get(&501), Some(&90));
    }

    #[test]
    fn test_list_shape_takes_max_across_targets() {
        let c = confidences(
            r#"[
                {"target": "a.example", "categories": [{"id": 103, "name": "Phishing", "confidence": 40}]},
                {"target": "a.example", "categories": [{"id": 103, "name": "Phishing", "confidence": 70}]}
            ]"#,
        );
        assert_eq!(c.get(&103), Some(&70));
    }

    #[test]
    fn test_missing_categories_is_empty() {
        assert!(confidences(r#"{"target": "example.com"}"#).is_empty());
    }

    #[test]
    fn test_threshold_is_strict() {
        let c: HashMap<u32, u32> = [(101, 50), (103, 51), (104, 99), (501, 100)]
            .into_iter()
            .collect();
        let flagged = flagged_categories(&c, DEFAULT_THRESHOLD);
        let labels: Vec<_> = flagged.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["phishing", "scam"]);
    }

    #[test]
    fn test_non_threat_categories_ignored() {
        let c: HashMap<u32, u32> = [(501, 100), (301, 95)].into_iter().collect();
        assert!(flagged_categories(&c, DEFAULT_THRESHOLD).is_empty());
    }
}
