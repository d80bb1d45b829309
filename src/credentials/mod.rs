// Credential rotation: primary/backup API keys under a monthly quota.
//
// Every upstream service gets one CredentialSlot. Each key issuance counts
// against the slot's monthly limit; once the primary key's budget is spent the
// slot switches to the backup key until the calendar month rolls over.

pub mod clock;
pub mod rotator;

pub use clock::{Clock, ManualClock, SystemClock};
pub use rotator::{Credential, CredentialRotator, CredentialSlot, ServiceKeys, Tier};
