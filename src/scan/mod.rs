// Scan pipeline: validate, fan out, collect, normalize.

pub mod error;
pub mod normalize;
pub mod orchestrator;
pub mod report;
pub mod target;

pub use error::ScanError;
pub use normalize::{normalize, NormalizedVerdict, ServiceStatus, ServiceVerdict};
pub use orchestrator::Scanner;
pub use report::{AdapterResult, CompositeReport, FailureKind};
pub use target::ScanTarget;
