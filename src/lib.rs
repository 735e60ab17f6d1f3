//! ACH debit bridge for the VitalPerks premium-payment credit line.
//!
//! Incoming debits (an insurer pulling a premium from a member's virtual
//! account) are authorized against an in-memory ledger: the processor
//! resolves the account, suppresses redelivered debits, checks the credit
//! line, and on approval draws the credit, mints reward points and records
//! a pending ledger entry.
//!
//! - [`domain`] - accounts, ledger entries, money, requests and responses
//! - [`store`] - the in-memory [`domain::AccountStore`]
//! - [`processor`] - the debit authorization algorithm
//! - [`onboarding`] - account creation for individuals and employers
//! - [`engine`] / [`ingestion`] - batch replay of a CSV command feed

pub mod clock;
pub mod config;
pub mod dlq;
pub mod domain;
pub mod engine;
pub mod ingestion;
pub mod onboarding;
pub mod processor;
pub mod report;
pub mod store;
pub mod telemetry;

pub use clock::{ManualClock, SystemClock};
pub use config::Config;
pub use engine::{Engine, RunSummary};
pub use processor::DebitProcessor;
pub use store::InMemoryAccountStore;
