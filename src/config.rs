use std::collections::{BTreeMap, HashMap};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::credentials::ServiceKeys;
use crate::providers::virustotal::PollSettings;
use crate::providers::{abuseipdb, dns, safe_browsing, virustotal, wot, yandex};
use crate::service::ServiceId;

pub const DEFAULT_PORT: u16 = 3002;
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DNS_TIMEOUT_SECS: u64 = 5;

/// Settings for one upstream service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub keys: ServiceKeys,
    pub base_url: String,
    pub timeout: Duration,
}

/// Central configuration loaded from environment variables.
///
/// API keys come only from the environment (or a .env file loaded by the
/// binary via dotenvy). Every service reads the same set of variables under
/// its own prefix: `{P}_API_KEY`, `{P}_API_KEY_BACKUP`, `{P}_MONTHLY_LIMIT`,
/// `{P}_TIMEOUT_SECS` and `{P}_BASE_URL`.
#[derive(Debug, Clone)]
pub struct Config {
    pub services: BTreeMap<ServiceId, ServiceConfig>,
    /// Services the orchestrator fans out to (URLWARDEN_SERVICES, default all).
    pub enabled: Vec<ServiceId>,
    pub vt_poll: PollSettings,
    /// WOT account id, sent as `x-user-id` when set.
    pub wot_user_id: Option<String>,
    pub wot_threshold: u32,
    pub dns_resolver_url: String,
    pub dns_timeout: Duration,
    pub port: u16,
    pub bind: String,
    /// Frontend origin allowed by CORS.
    pub allowed_origin: String,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup. Missing keys fall back to defaults;
    /// malformed numbers are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut services = BTreeMap::new();
        for service in ServiceId::ALL {
            let prefix = service.env_prefix();
            let keys = ServiceKeys::new(
                get(&format!("{prefix}_API_KEY")),
                get(&format!("{prefix}_API_KEY_BACKUP")),
                parse_or(&get, &format!("{prefix}_MONTHLY_LIMIT"), default_limit(service))?,
            );
            let timeout_secs: u64 =
                parse_or(&get, &format!("{prefix}_TIMEOUT_SECS"), DEFAULT_TIMEOUT_SECS)?;
            let base_url = get(&format!("{prefix}_BASE_URL"))
                .unwrap_or_else(|| default_base_url(service).to_string());

            services.insert(
                service,
                ServiceConfig {
                    keys,
                    base_url,
                    timeout: Duration::from_secs(timeout_secs),
                },
            );
        }

        let enabled = match get("URLWARDEN_SERVICES") {
            None => ServiceId::ALL.to_vec(),
            Some(list) => parse_service_list(&list)?,
        };

        let defaults = PollSettings::default();
        let vt_poll = PollSettings {
            interval: Duration::from_millis(parse_or(
                &get,
                "VT_POLL_INTERVAL_MS",
                defaults.interval.as_millis() as u64,
            )?),
            max_attempts: parse_or(&get, "VT_POLL_ATTEMPTS", defaults.max_attempts)?,
        };

        Ok(Self {
            services,
            enabled,
            vt_poll,
            wot_user_id: get("WOT_USER_ID"),
            wot_threshold: parse_or(&get, "WOT_THRESHOLD", wot::DEFAULT_THRESHOLD)?,
            dns_resolver_url: get("DNS_RESOLVER_URL")
                .unwrap_or_else(|| dns::DEFAULT_RESOLVER_URL.to_string()),
            dns_timeout: Duration::from_secs(parse_or(
                &get,
                "DNS_TIMEOUT_SECS",
                DEFAULT_DNS_TIMEOUT_SECS,
            )?),
            port: parse_or(&get, "URLWARDEN_PORT", DEFAULT_PORT)?,
            bind: get("URLWARDEN_BIND").unwrap_or_else(|| "0.0.0.0".to_string()),
            allowed_origin: get("URLWARDEN_ALLOWED_ORIGIN")
                .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGIN.to_string()),
        })
    }

    /// Settings for `service`. Every known service always has an entry.
    pub fn service(&self, service: ServiceId) -> &ServiceConfig {
        &self.services[&service]
    }

    /// Keys and limits in the shape the credential rotator takes.
    pub fn credential_keys(&self) -> HashMap<ServiceId, ServiceKeys> {
        self.services
            .iter()
            .map(|(id, cfg)| (*id, cfg.keys.clone()))
            .collect()
    }

    /// Check that at least one enabled service has a key.
    /// Call this before serving so a misconfigured deployment fails loudly.
    pub fn require_any_key(&self) -> Result<()> {
        let any = self
            .enabled
            .iter()
            .any(|s| self.service(*s).keys.primary.is_some());
        if !any {
            anyhow::bail!(
                "No API keys configured for any enabled service.\n\
                 Set at least one of VT_API_KEY, GSB_API_KEY, ABUSE_API_KEY, \
                 WOT_API_KEY or YANDEX_API_KEY in your .env file."
            );
        }
        Ok(())
    }
}

fn default_limit(service: ServiceId) -> u32 {
    match service {
        ServiceId::VirusTotal => 500,
        _ => 1000,
    }
}

fn default_base_url(service: ServiceId) -> &'static str {
    match service {
        ServiceId::VirusTotal => virustotal::DEFAULT_BASE_URL,
        ServiceId::SafeBrowsing => safe_browsing::DEFAULT_BASE_URL,
        ServiceId::AbuseIpdb => abuseipdb::DEFAULT_BASE_URL,
        ServiceId::WebOfTrust => wot::DEFAULT_BASE_URL,
        ServiceId::YandexSafeBrowsing => yandex::DEFAULT_BASE_URL,
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
    }
}

fn parse_service_list(list: &str) -> Result<Vec<ServiceId>> {
    let mut services = Vec::new();
    if list.trim().eq_ignore_ascii_case("none") {
        return Ok(services);
    }
    for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let Some(service) = ServiceId::from_name(name) else {
            anyhow::bail!(
                "URLWARDEN_SERVICES contains unknown service {name:?}. Known services: {}",
                ServiceId::ALL.map(|s| s.as_str()).join(", ")
            );
        };
        if !services.contains(&service) {
            services.push(service);
        }
    }
    Ok(services)
}
