// Service identity: the five upstream threat-intelligence providers.
//
// ServiceId is the key used everywhere a per-service value is stored:
// credential slots, composite reports, normalized verdicts. The serde names
// match the JSON keys the frontend already expects.

use serde::{Deserialize, Serialize};

/// One upstream reputation provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ServiceId {
    #[serde(rename = "virusTotal")]
    VirusTotal,
    #[serde(rename = "googleSafeBrowsing")]
    SafeBrowsing,
    #[serde(rename = "abuseIPDB")]
    AbuseIpdb,
    #[serde(rename = "webOfTrust")]
    WebOfTrust,
    #[serde(rename = "yandexSafe")]
    YandexSafeBrowsing,
}

impl ServiceId {
    /// Every known service, in display order.
    pub const ALL: [ServiceId; 5] = [
        ServiceId::VirusTotal,
        ServiceId::SafeBrowsing,
        ServiceId::AbuseIpdb,
        ServiceId::WebOfTrust,
        ServiceId::YandexSafeBrowsing,
    ];

    /// Wire name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceId::VirusTotal => "virusTotal",
            ServiceId::SafeBrowsing => "googleSafeBrowsing",
            ServiceId::AbuseIpdb => "abuseIPDB",
            ServiceId::WebOfTrust => "webOfTrust",
            ServiceId::YandexSafeBrowsing => "yandexSafe",
        }
    }

    /// Human-readable provider name for terminal output.
    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceId::VirusTotal => "VirusTotal",
            ServiceId::SafeBrowsing => "Google Safe Browsing",
            ServiceId::AbuseIpdb => "AbuseIPDB",
            ServiceId::WebOfTrust => "Web of Trust",
            ServiceId::YandexSafeBrowsing => "Yandex Safe Browsing",
        }
    }

    /// Environment variable prefix for this service's settings.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            ServiceId::VirusTotal => "VT",
            ServiceId::SafeBrowsing => "GSB",
            ServiceId::AbuseIpdb => "ABUSE",
            ServiceId::WebOfTrust => "WOT",
            ServiceId::YandexSafeBrowsing => "YANDEX",
        }
    }

    /// Authoritative services decide the top-line verdict; the others are
    /// informational only.
    pub fn is_authoritative(&self) -> bool {
        matches!(self, ServiceId::VirusTotal | ServiceId::SafeBrowsing)
    }

    /// Parse a wire name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        ServiceId::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for ServiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
