// Safe Browsing v4 `threatMatches:find` protocol, shared by Google and Yandex.
//
// Both services accept the same request body and answer with an optional
// `matches` array; an absent or empty array means no known threat.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub const CLIENT_ID: &str = "urlwarden";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatMatchRequest {
    pub client: ClientInfo,
    pub threat_info: ThreatInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub client_id: String,
    pub client_version: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatInfo {
    pub threat_types: Vec<String>,
    pub platform_types: Vec<String>,
    pub threat_entry_types: Vec<String>,
    pub threat_entries: Vec<ThreatEntry>,
}

#[derive(Debug, Serialize)]
pub struct ThreatEntry {
    pub url: String,
}

impl ThreatMatchRequest {
    /// Query for `url` across `threat_types` on any platform.
    pub fn for_url(url: &str, threat_types: &[&str]) -> Self {
        Self {
            client: ClientInfo {
                client_id: CLIENT_ID.to_string(),
                client_version: env!("CARGO_PKG_VERSION").to_string(),
            },
            threat_info: ThreatInfo {
                threat_types: threat_types.iter().map(|t| t.to_string()).collect(),
                platform_types: vec!["ANY_PLATFORM".to_string()],
                threat_entry_types: vec!["URL".to_string()],
                threat_entries: vec![ThreatEntry {
                    url: url.to_string(),
                }],
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThreatMatchResponse {
    #[serde(default)]
    pub matches: Vec<ThreatMatch>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatMatch {
    pub threat_type: String,
    #[serde(default)]
    pub platform_type: Option<String>,
}

impl ThreatMatchResponse {
    pub fn is_safe(&self) -> bool {
        self.matches.is_empty()
    }

    /// Distinct threat types across all matches.
    pub fn threat_labels(&self) -> BTreeSet<String> {
        self.matches
            .iter()
            .map(|m| m.threat_type.clone())
            .collect()
    }
}
