//! mctl-core: Core types, configuration and parsing for menuctl
//!
//! This crate holds everything that does not need a network connection:
//! the known_hosts trust store, the process filter engine, the text
//! scrapers for remote output, and the configuration files.

pub mod config;
pub mod error;
pub mod filter;
pub mod history;
pub mod known_hosts;
pub mod parser;
pub mod types;

pub use error::{ConfigError, PidListError, TrustStoreError};
pub use filter::{FilterKind, FilterRule, PermanentFilter, VolatileFilter};
pub use known_hosts::{HostIdentity, PresentedKey, TrustDecision, TrustStore};
pub use types::{LookupKind, ProcessRecord, ScrapedEntry, SessionState};
