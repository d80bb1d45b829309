// System status display: providers, key presence, quota and endpoints.
//
// Never prints a key; only whether one is configured.

use colored::Colorize;

use crate::config::Config;
use crate::credentials::{CredentialRotator, Tier};
use crate::service::ServiceId;

/// Display configuration and quota state to the terminal.
pub fn show(config: &Config, rotator: &CredentialRotator) {
    println!("{}", "Providers:".bold());
    for service in ServiceId::ALL {
        let cfg = config.service(service);
        let enabled = if config.enabled.contains(&service) {
            "enabled".green()
        } else {
            "disabled".dimmed()
        };
        let key = if cfg.keys.primary.is_some() {
            "key set".normal()
        } else {
            "no key".yellow()
        };
        let backup = if cfg.keys.backup.is_some() {
            "backup set"
        } else {
            "no backup"
        };
        println!(
            "  {:<22} {:<8}  {}, {}",
            service.display_name(),
            enabled,
            key,
            backup
        );
        println!("    endpoint: {}", cfg.base_url.dimmed());

        match rotator.snapshot(service) {
            Some(slot) => {
                let tier = match slot.active_tier {
                    Tier::Primary => "primary".normal(),
                    Tier::Backup => "backup".yellow(),
                };
                println!(
                    "    quota: {}/{} used this month on {} key",
                    slot.usage_count, slot.monthly_limit, tier
                );
            }
            None => println!("    quota: n/a"),
        }
    }

    println!();
    println!("DNS resolver: {}", config.dns_resolver_url);
    println!(
        "VirusTotal polling: {} attempts every {} ms",
        config.vt_poll.max_attempts,
        config.vt_poll.interval.as_millis()
    );

    if config.require_any_key().is_err() {
        println!();
        println!("No enabled service has an API key.");
        println!("  Copy .env.example to .env and set at least VT_API_KEY or GSB_API_KEY.");
    }
}
