// Colored terminal output for scan verdicts.
//
// This module handles all terminal-specific formatting for the `scan`
// command. The main.rs display path delegates here.

use colored::{ColoredString, Colorize};

use super::truncate_chars;
use crate::providers::traits::{AnalysisSource, Details};
use crate::scan::{NormalizedVerdict, ServiceStatus, ServiceVerdict};
use crate::service::ServiceId;

/// Display a normalized verdict in the terminal.
pub fn display_verdict(verdict: &NormalizedVerdict) {
    println!("\n{}", format!("=== Scan: {} ===", verdict.url).bold());
    println!(
        "  Scanned at {}",
        verdict.scanned_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!();

    let overall = if verdict.overall_safe {
        "SAFE".green().bold()
    } else {
        "UNSAFE".red().bold()
    };
    println!("  Overall: {overall}");
    println!();

    for service in ServiceId::ALL {
        if let Some(entry) = verdict.services.get(&service) {
            display_service(service, entry);
        }
    }

    let flagged = verdict.flagged_by();
    if !flagged.is_empty() {
        let names: Vec<&str> = flagged.iter().map(|s| s.display_name()).collect();
        println!();
        println!("  {} Flagged by {}", "!!".red().bold(), names.join(", "));
    }
    println!();
}

fn display_service(service: ServiceId, entry: &ServiceVerdict) {
    let marker = if service.is_authoritative() { "*" } else { " " };
    println!(
        "  {marker} {:<22} {}",
        service.display_name(),
        colorize_status(entry)
    );

    if let Some(details) = &entry.details {
        println!("      {}", describe_details(details).dimmed());
    }
    if !entry.threats.is_empty() {
        println!("      threats: {}", entry.threats.join(", ").red());
    }
    if let Some(error) = &entry.error {
        println!("      {}", truncate_chars(error, 100).dimmed());
    }
    if let Some(remaining) = entry.remaining_quota {
        let tier = if entry.using_backup_key {
            " (backup key)".yellow()
        } else {
            "".normal()
        };
        println!("      quota left: {remaining}{tier}");
    }
}

fn colorize_status(entry: &ServiceVerdict) -> ColoredString {
    match entry.status {
        ServiceStatus::Ok if entry.is_safe => "clean".green(),
        ServiceStatus::Ok => "flagged".red().bold(),
        ServiceStatus::Failed => "failed".yellow(),
        ServiceStatus::Unconfigured => "no key".dimmed(),
        ServiceStatus::NotRun => "skipped".dimmed(),
    }
}

/// One-line summary of a provider's supporting detail.
pub fn describe_details(details: &Details) -> String {
    match details {
        Details::Detections {
            positives,
            total,
            source,
        } => {
            let source = match source {
                AnalysisSource::Existing => "existing",
                AnalysisSource::Fresh => "fresh",
            };
            format!("{positives}/{total} engines ({source} analysis)")
        }
        Details::ThreatMatches { match_count } => format!("{match_count} threat matches"),
        Details::AbuseReport {
            ip_address,
            confidence_score,
            total_reports,
            ..
        } => format!("{ip_address}: abuse score {confidence_score}, {total_reports} reports"),
        Details::Scorecard { flagged } if flagged.is_empty() => {
            "no categories above threshold".to_string()
        }
        Details::Scorecard { flagged } => {
            let parts: Vec<String> = flagged
                .iter()
                .map(|c| format!("{} ({}%)", c.label, c.confidence))
                .collect();
            parts.join(", ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::traits::ScorecardCategory;

    #[test]
    fn test_describe_detections() {
        let details = Details::Detections {
            positives: 3,
            total: 70,
            source: AnalysisSource::Fresh,
        };
        assert_eq!(describe_details(&details), "3/70 engines (fresh analysis)");
    }

    #[test]
    fn test_describe_scorecard() {
        let empty = Details::Scorecard { flagged: vec![] };
        assert_eq!(describe_details(&empty), "no categories above threshold");

        let flagged = Details::Scorecard {
            flagged: vec![ScorecardCategory {
                id: 103,
                label: "phishing".to_string(),
                confidence: 80,
            }],
        };
        assert_eq!(describe_details(&flagged), "phishing (80%)");
    }
}
