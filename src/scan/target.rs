// Scan target validation.
//
// A target must be an absolute http(s) URL with a host. Anything else is
// rejected here, before a single provider is contacted.

use serde::{Serialize, Serializer};
use url::Url;

use super::error::ScanError;

/// A validated URL submitted for scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    /// The submitted string, trimmed. Providers receive exactly this.
    raw: String,
    url: Url,
}

impl ScanTarget {
    pub fn parse(input: &str) -> Result<Self, ScanError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(ScanError::InvalidUrl("URL is empty".to_string()));
        }

        let url = Url::parse(raw).map_err(|e| ScanError::InvalidUrl(format!("{raw}: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ScanError::InvalidUrl(format!(
                "{raw}: unsupported scheme '{}'",
                url.scheme()
            )));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(ScanError::InvalidUrl(format!("{raw}: missing host")));
        }

        Ok(Self {
            raw: raw.to_string(),
            url,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Hostname without IPv6 brackets.
    pub fn host(&self) -> &str {
        let host = self.url.host_str().unwrap_or_default();
        host.trim_start_matches('[').trim_end_matches(']')
    }

    /// The host as an IP address when the URL uses an IP literal.
    pub fn ip_literal(&self) -> Option<std::net::IpAddr> {
        match self.url.host()? {
            url::Host::Ipv4(ip) => Some(ip.into()),
            url::Host::Ipv6(ip) => Some(ip.into()),
            url::Host::Domain(_) => None,
        }
    }
}

impl std::fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for ScanTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}
