// urlwarden: URL reputation aggregation across threat-intelligence services
//
// This is the library root. Each module corresponds to a major subsystem:
// credentials feed providers, providers feed the scan orchestrator, and the
// orchestrator's report is normalized for the CLI and web surfaces.

pub mod config;
pub mod credentials;
pub mod output;
pub mod providers;
pub mod scan;
pub mod service;
pub mod status;

#[cfg(feature = "web")]
pub mod web;
