// Per-service credential slots with monthly quota tracking.
//
// Quota semantics:
// - Every call to `active_key` is one issuance and counts against the active tier.
// - A new calendar month (UTC) resets usage to 0 and returns the slot to Primary.
// - On Primary, when usage has already reached the monthly limit, the next
//   issuance flips to Backup and resets usage. The triggering issuance counts
//   against the backup budget, so usage is 1 right after the flip.
// - Backup never reverts to Primary except via month rollover.
// - Without a backup key the primary keeps being issued past its limit; the
//   remaining quota reads 0.
//
// Each slot has its own mutex. Locks are only held for the synchronous
// bookkeeping, never across an await.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::clock::{Clock, SystemClock};
use crate::service::ServiceId;

/// Which credential a slot is currently issuing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Primary,
    Backup,
}

/// Configured keys and budget for one service.
#[derive(Debug, Clone, Default)]
pub struct ServiceKeys {
    pub primary: Option<String>,
    pub backup: Option<String>,
    pub monthly_limit: u32,
}

impl ServiceKeys {
    pub fn new(primary: Option<String>, backup: Option<String>, monthly_limit: u32) -> Self {
        // Blank keys are treated the same as missing ones.
        let clean = |k: Option<String>| k.filter(|k| !k.trim().is_empty());
        Self {
            primary: clean(primary),
            backup: clean(backup),
            monthly_limit,
        }
    }
}

/// Calendar month a slot was last reset in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn of(instant: DateTime<Utc>) -> Self {
        Self {
            year: instant.year(),
            month: instant.month(),
        }
    }
}

/// Read-only view of one service's quota state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialSlot {
    pub service: ServiceId,
    pub monthly_limit: u32,
    pub usage_count: u32,
    pub last_reset_month: MonthKey,
    pub active_tier: Tier,
    pub has_backup: bool,
}

impl CredentialSlot {
    pub fn remaining_quota(&self) -> u32 {
        self.monthly_limit.saturating_sub(self.usage_count)
    }
}

/// A key handed to an adapter for one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// The service has no usable key; the adapter must not call upstream.
    Unconfigured,
    Key {
        secret: String,
        tier: Tier,
        /// Budget left on the issuing tier after this issuance.
        remaining_quota: u32,
    },
}

impl Credential {
    pub fn secret(&self) -> Option<&str> {
        match self {
            Credential::Unconfigured => None,
            Credential::Key { secret, .. } => Some(secret),
        }
    }

    pub fn using_backup(&self) -> bool {
        matches!(
            self,
            Credential::Key {
                tier: Tier::Backup,
                ..
            }
        )
    }

    pub fn remaining_quota(&self) -> u32 {
        match self {
            Credential::Unconfigured => 0,
            Credential::Key {
                remaining_quota, ..
            } => *remaining_quota,
        }
    }
}

struct SlotState {
    slot: CredentialSlot,
    /// Month in which the "primary exhausted, no backup" warning was logged.
    warned_month: Option<MonthKey>,
}

struct SlotEntry {
    keys: ServiceKeys,
    state: Mutex<SlotState>,
}

/// Owns every service's credential slot. Share it with `Arc`.
pub struct CredentialRotator {
    clock: Arc<dyn Clock>,
    slots: HashMap<ServiceId, SlotEntry>,
}

impl CredentialRotator {
    /// Build slots for every service that has a primary key.
    pub fn new(keys: HashMap<ServiceId, ServiceKeys>, clock: Arc<dyn Clock>) -> Self {
        let month = MonthKey::of(clock.now());
        let slots = keys
            .into_iter()
            .filter(|(_, k)| k.primary.is_some())
            .map(|(service, keys)| {
                let slot = CredentialSlot {
                    service,
                    monthly_limit: keys.monthly_limit,
                    usage_count: 0,
                    last_reset_month: month,
                    active_tier: Tier::Primary,
                    has_backup: keys.backup.is_some(),
                };
                let entry = SlotEntry {
                    keys,
                    state: Mutex::new(SlotState {
                        slot,
                        warned_month: None,
                    }),
                };
                (service, entry)
            })
            .collect();

        Self { clock, slots }
    }

    pub fn with_system_clock(keys: HashMap<ServiceId, ServiceKeys>) -> Self {
        Self::new(keys, Arc::new(SystemClock))
    }

    pub fn is_configured(&self, service: ServiceId) -> bool {
        self.slots.contains_key(&service)
    }

    /// Issue the active key for `service`, counting one use against its quota.
    pub fn active_key(&self, service: ServiceId) -> Credential {
        let Some(entry) = self.slots.get(&service) else {
            return Credential::Unconfigured;
        };
        let month = MonthKey::of(self.clock.now());
        let mut state = entry.state.lock().unwrap_or_else(|e| e.into_inner());
        roll_over(&mut state.slot, month);

        let exhausted = state.slot.usage_count >= state.slot.monthly_limit;
        if state.slot.active_tier == Tier::Primary && exhausted {
            if entry.keys.backup.is_some() {
                state.slot.active_tier = Tier::Backup;
                state.slot.usage_count = 0;
                info!(service = %service, "Primary quota exhausted, switching to backup key");
            } else if state.warned_month != Some(month) {
                state.warned_month = Some(month);
                warn!(
                    service = %service,
                    limit = state.slot.monthly_limit,
                    "Primary quota exhausted and no backup key configured"
                );
            }
        }

        state.slot.usage_count = state.slot.usage_count.saturating_add(1);

        let secret = match state.slot.active_tier {
            Tier::Primary => entry.keys.primary.clone(),
            Tier::Backup => entry.keys.backup.clone(),
        };
        match secret {
            Some(secret) => Credential::Key {
                secret,
                tier: state.slot.active_tier,
                remaining_quota: state.slot.remaining_quota(),
            },
            None => Credential::Unconfigured,
        }
    }

    /// Budget left on the active tier, never negative.
    pub fn remaining_quota(&self, service: ServiceId) -> u32 {
        self.snapshot(service)
            .map(|s| s.remaining_quota())
            .unwrap_or(0)
    }

    pub fn is_on_backup(&self, service: ServiceId) -> bool {
        self.snapshot(service)
            .is_some_and(|s| s.active_tier == Tier::Backup)
    }

    /// Current slot state with month rollover applied.
    pub fn snapshot(&self, service: ServiceId) -> Option<CredentialSlot> {
        let entry = self.slots.get(&service)?;
        let month = MonthKey::of(self.clock.now());
        let mut state = entry.state.lock().unwrap_or_else(|e| e.into_inner());
        roll_over(&mut state.slot, month);
        Some(state.slot.clone())
    }

    /// Snapshots of every configured slot, in service display order.
    pub fn snapshots(&self) -> Vec<CredentialSlot> {
        ServiceId::ALL
            .into_iter()
            .filter_map(|s| self.snapshot(s))
            .collect()
    }
}

fn roll_over(slot: &mut CredentialSlot, month: MonthKey) {
    if slot.last_reset_month != month {
        slot.usage_count = 0;
        slot.active_tier = Tier::Primary;
        slot.last_reset_month = month;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::clock::ManualClock;
    use chrono::TimeZone;

    fn rotator_with(keys: ServiceKeys) -> (CredentialRotator, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap(),
        ));
        let mut map = HashMap::new();
        map.insert(ServiceId::VirusTotal, keys);
        (CredentialRotator::new(map, clock.clone()), clock)
    }

    fn both_keys(limit: u32) -> ServiceKeys {
        ServiceKeys::new(Some("primary".into()), Some("backup".into()), limit)
    }

    #[test]
    fn test_unknown_service_is_unconfigured() {
        let (rotator, _) = rotator_with(both_keys(5));
        assert_eq!(
            rotator.active_key(ServiceId::AbuseIpdb),
            Credential::Unconfigured
        );
        assert_eq!(rotator.remaining_quota(ServiceId::AbuseIpdb), 0);
    }

    #[test]
    fn test_blank_primary_key_is_unconfigured() {
        let (rotator, _) = rotator_with(ServiceKeys::new(Some("  ".into()), None, 5));
        assert!(!rotator.is_configured(ServiceId::VirusTotal));
        assert_eq!(
            rotator.active_key(ServiceId::VirusTotal),
            Credential::Unconfigured
        );
    }

    #[test]
    fn test_issuance_counts_usage() {
        let (rotator, _) = rotator_with(both_keys(5));
        let cred = rotator.active_key(ServiceId::VirusTotal);
        assert_eq!(cred.secret(), Some("primary"));
        assert_eq!(cred.remaining_quota(), 4);
        rotator.active_key(ServiceId::VirusTotal);
        assert_eq!(rotator.remaining_quota(ServiceId::VirusTotal), 3);
    }

    #[test]
    fn test_flip_to_backup_counts_triggering_call() {
        let (rotator, _) = rotator_with(both_keys(3));
        for _ in 0..3 {
            assert_eq!(
                rotator.active_key(ServiceId::VirusTotal).secret(),
                Some("primary")
            );
        }
        let slot = rotator.snapshot(ServiceId::VirusTotal).unwrap();
        assert_eq!(slot.usage_count, 3);
        assert_eq!(slot.active_tier, Tier::Primary);

        let cred = rotator.active_key(ServiceId::VirusTotal);
        assert_eq!(cred.secret(), Some("backup"));
        assert!(cred.using_backup());

        let slot = rotator.snapshot(ServiceId::VirusTotal).unwrap();
        assert_eq!(slot.active_tier, Tier::Backup);
        assert_eq!(slot.usage_count, 1);
        assert!(rotator.is_on_backup(ServiceId::VirusTotal));
    }

    #[test]
    fn test_backup_never_reverts_within_month() {
        let (rotator, _) = rotator_with(both_keys(1));
        rotator.active_key(ServiceId::VirusTotal);
        rotator.active_key(ServiceId::VirusTotal);
        for _ in 0..5 {
            assert_eq!(
                rotator.active_key(ServiceId::VirusTotal).secret(),
                Some("backup")
            );
        }
        assert_eq!(rotator.remaining_quota(ServiceId::VirusTotal), 0);
    }

    #[test]
    fn test_no_backup_keeps_issuing_primary() {
        let (rotator, _) = rotator_with(ServiceKeys::new(Some("primary".into()), None, 2));
        for _ in 0..4 {
            assert_eq!(
                rotator.active_key(ServiceId::VirusTotal).secret(),
                Some("primary")
            );
        }
        let slot = rotator.snapshot(ServiceId::VirusTotal).unwrap();
        assert_eq!(slot.active_tier, Tier::Primary);
        assert_eq!(slot.remaining_quota(), 0);
    }

    #[test]
    fn test_month_rollover_resets_to_primary() {
        let (rotator, clock) = rotator_with(both_keys(1));
        rotator.active_key(ServiceId::VirusTotal);
        rotator.active_key(ServiceId::VirusTotal);
        assert!(rotator.is_on_backup(ServiceId::VirusTotal));

        clock.set(Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap());
        let slot = rotator.snapshot(ServiceId::VirusTotal).unwrap();
        assert_eq!(slot.usage_count, 0);
        assert_eq!(slot.active_tier, Tier::Primary);
        assert_eq!(slot.last_reset_month, MonthKey { year: 2026, month: 4 });

        assert_eq!(
            rotator.active_key(ServiceId::VirusTotal).secret(),
            Some("primary")
        );
    }

    #[test]
    fn test_same_month_next_year_still_rolls_over() {
        let (rotator, clock) = rotator_with(both_keys(10));
        rotator.active_key(ServiceId::VirusTotal);
        clock.set(Utc.with_ymd_and_hms(2027, 3, 15, 12, 0, 0).unwrap());
        assert_eq!(
            rotator.snapshot(ServiceId::VirusTotal).unwrap().usage_count,
            0
        );
    }

    #[test]
    fn test_concurrent_issuance_never_overshoots() {
        let (rotator, _) = rotator_with(both_keys(50));
        let rotator = Arc::new(rotator);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let rotator = Arc::clone(&rotator);
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        rotator.active_key(ServiceId::VirusTotal);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        // 80 issuances: 50 on primary, then 30 on backup.
        let slot = rotator.snapshot(ServiceId::VirusTotal).unwrap();
        assert_eq!(slot.active_tier, Tier::Backup);
        assert_eq!(slot.usage_count, 30);
    }
}
