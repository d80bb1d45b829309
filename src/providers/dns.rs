// DNS-over-HTTPS resolution via the JSON API (dns.google style).
//
// Used by the AbuseIPDB adapter, which reports on IP addresses rather than
// hostnames. Answers are scanned for the first record whose data is an IP
// address, skipping CNAME hops.

use std::net::IpAddr;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::http::{self, Endpoint};
use super::traits::ProviderError;

pub const DEFAULT_RESOLVER_URL: &str = "https://dns.google";

pub struct DohResolver {
    client: Client,
    endpoint: Endpoint,
}

impl DohResolver {
    pub fn new(client: Client, endpoint: Endpoint) -> Self {
        Self { client, endpoint }
    }

    /// Resolve `host` to an IPv4 address.
    pub async fn resolve(&self, host: &str) -> Result<IpAddr, ProviderError> {
        let request = self
            .client
            .get(self.endpoint.url("/resolve"))
            .query(&[("name", host), ("type", "A")])
            .header("Accept", "application/dns-json");

        let response = http::send(request, self.endpoint.timeout).await?;
        let response = http::require_success(response, "DNS resolver").await?;
        let (answer, _): (DohResponse, _) = http::read_json(response, "DNS resolver").await?;

        let ip = first_address(&answer).ok_or(ProviderError::UnresolvedHost)?;
        debug!(host = host, ip = %ip, "Resolved host");
        Ok(ip)
    }
}

/// First usable address in a successful answer; `None` for NXDOMAIN,
/// SERVFAIL or an answer without address records.
fn first_address(response: &DohResponse) -> Option<IpAddr> {
    if response.status != 0 {
        return None;
    }
    response
        .answer
        .iter()
        .find_map(|record| record.data.trim().parse::<IpAddr>().ok())
}

#[derive(Debug, Deserialize)]
struct DohResponse {
    #[serde(rename = "Status", default)]
    status: u32,
    #[serde(rename = "Answer", default)]
    answer: Vec<DohRecord>,
}

#[derive(Debug, Deserialize)]
struct DohRecord {
    data: String,
}
