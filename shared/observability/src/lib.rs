//! Tally observability library
//!
//! Logging and tracing setup shared by the Tally services.
//!
//! - Structured JSON or pretty logging via `tracing-subscriber`
//! - Domain event records for auth and session activity
//! - Log-safe token fingerprints

pub mod domain_events;
pub mod init;
pub mod token_debug;

pub use domain_events::*;
pub use init::*;
