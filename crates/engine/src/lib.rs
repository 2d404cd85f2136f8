//! Settlement engine for token-settled gas sponsorship.
//!
//! The central state machine of the protocol: validates authorized
//! sponsorship requests, provisionally reserves native collateral before the
//! sponsored action runs, and settles the actual cost against the chosen
//! token exactly once. All registries (allow-list, oracle table, collateral
//! pool) are explicit owned state on [`SettlementEngine`], passed into every
//! operation rather than living in process-wide globals.

mod collateral;
mod config;
mod error;
mod ledger;
mod record;
mod settlement;

pub use collateral::{CollateralAccount, CollateralError};
pub use config::EngineConfig;
pub use error::SettlementError;
pub use ledger::{LedgerError, TokenLedger};
pub use record::{RecordStore, RejectReason, SettlementOutcome, SettlementRecord};
pub use settlement::{SettlementEngine, Shortfall};
