//! Price oracle adapter for the sponsorship protocol.
//!
//! Normalizes heterogeneous price sources into one convention, token
//! smallest-units per one whole unit of the native asset, behind a typed
//! feed interface with one strategy per feed kind. All conversion is
//! integer-only with upward rounding so the sponsor never under-collects.

mod adapter;
mod feed;
mod registry;

pub use adapter::{OracleAdapter, OracleError, OraclePolicy};
pub use feed::{FeedError, FeedStrategy, FixedFeed, PriceFeed, RawQuote};
pub use registry::{OracleRegistry, TokenOracleEntry};
