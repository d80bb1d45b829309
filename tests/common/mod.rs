// Shared fixtures for the integration tests: one mock server per upstream
// service plus a config that points every adapter at its mock.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use urlwarden::config::Config;
use urlwarden::credentials::{CredentialRotator, ManualClock};
use urlwarden::scan::Scanner;

pub struct Upstreams {
    pub vt: MockServer,
    pub gsb: MockServer,
    pub abuse: MockServer,
    pub wot: MockServer,
    pub yandex: MockServer,
    pub dns: MockServer,
}

impl Upstreams {
    pub async fn start() -> Self {
        Self {
            vt: MockServer::start().await,
            gsb: MockServer::start().await,
            abuse: MockServer::start().await,
            wot: MockServer::start().await,
            yandex: MockServer::start().await,
            dns: MockServer::start().await,
        }
    }

    /// Config with a key for every service and every base URL on a mock.
    /// `overrides` replace or add variables; an empty value unsets one.
    pub fn config(&self, overrides: &[(&str, &str)]) -> Config {
        let mut vars: HashMap<String, String> = [
            ("VT_API_KEY", "vt-primary"),
            ("GSB_API_KEY", "gsb-primary"),
            ("ABUSE_API_KEY", "abuse-primary"),
            ("WOT_API_KEY", "wot-primary"),
            ("YANDEX_API_KEY", "yandex-primary"),
            ("VT_POLL_INTERVAL_MS", "5"),
            ("VT_POLL_ATTEMPTS", "3"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        vars.insert("VT_BASE_URL".into(), self.vt.uri());
        vars.insert("GSB_BASE_URL".into(), self.gsb.uri());
        vars.insert("ABUSE_BASE_URL".into(), self.abuse.uri());
        vars.insert("WOT_BASE_URL".into(), self.wot.uri());
        vars.insert("YANDEX_BASE_URL".into(), self.yandex.uri());
        vars.insert("DNS_RESOLVER_URL".into(), self.dns.uri());

        for (k, v) in overrides {
            vars.insert(k.to_string(), v.to_string());
        }

        Config::from_lookup(|k| vars.get(k).cloned()).unwrap()
    }

    /// Mount a clean answer on every upstream.
    pub async fn mount_clean(&self) {
        mount_vt_existing(&self.vt, json!({"harmless": 70, "undetected": 5}), json!({})).await;
        mount_threat_matches(&self.gsb, json!({})).await;
        mount_threat_matches(&self.yandex, json!({})).await;
        mount_dns(&self.dns, "93.184.216.34").await;
        mount_abuse(&self.abuse, 0).await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/v3/targets/.+$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"target": "example.com", "categories": [{"id": 501, "confidence": 95}]}
            ])))
            .mount(&self.wot)
            .await;
    }

    /// Total requests received across all mocks.
    pub async fn total_requests(&self) -> usize {
        let mut total = 0;
        for server in [
            &self.vt,
            &self.gsb,
            &self.abuse,
            &self.wot,
            &self.yandex,
            &self.dns,
        ] {
            total += server.received_requests().await.unwrap_or_default().len();
        }
        total
    }
}

pub async fn mount_vt_existing(
    server: &MockServer,
    stats: serde_json::Value,
    results: serde_json::Value,
) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/v3/urls/[A-Za-z0-9_-]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "type": "url",
                "attributes": {
                    "last_analysis_stats": stats,
                    "last_analysis_results": results,
                }
            }
        })))
        .mount(server)
        .await;
}

pub async fn mount_threat_matches(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/v4/threatMatches:find"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_dns(server: &MockServer, ip: &str) {
    Mock::given(method("GET"))
        .and(path("/resolve"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Status": 0,
            "Answer": [
                {"name": "example.com.", "type": 5, "TTL": 300, "data": "cdn.example.net."},
                {"name": "cdn.example.net.", "type": 1, "TTL": 300, "data": ip}
            ]
        })))
        .mount(server)
        .await;
}

pub async fn mount_abuse(server: &MockServer, score: u32) {
    Mock::given(method("GET"))
        .and(path("/api/v2/check"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "ipAddress": "93.184.216.34",
                "abuseConfidenceScore": score,
                "totalReports": if score > 0 { 12 } else { 0 },
                "countryCode": "US",
                "isWhitelisted": false
            }
        })))
        .mount(server)
        .await;
}

/// Rotator on a manual clock fixed mid-month, and a scanner sharing it.
pub fn scanner_for(config: &Config) -> (Scanner, Arc<CredentialRotator>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap(),
    ));
    let rotator = Arc::new(CredentialRotator::new(
        config.credential_keys(),
        clock.clone(),
    ));
    let scanner = Scanner::from_config(config, Arc::clone(&rotator)).unwrap();
    (scanner, rotator, clock)
}
