//! CFB Aggregator - college football stats query layer
//!
//! Season, week and poll aware reads over an external relational store,
//! shaped into serializable view models for a stats portal. A secondary
//! scouting API is wrapped with an explicit TTL cache.
//!
//! Store access goes through [`store::Store`], which executes typed
//! [`query::Query`] values. The [`aggregator::Aggregator`] builds those
//! queries, applies ordering and default-selection rules, and assembles
//! pages with concurrent fetches.

pub mod aggregator;
pub mod cache;
pub mod cancel;
pub mod error;
pub mod fetch;
pub mod models;
pub mod query;
pub mod report;
pub mod scouting;
pub mod slug;
pub mod store;

#[cfg(test)]
mod test_support;

pub use aggregator::{Aggregator, AggregatorSettings};
pub use cancel::{CancelContext, CancelHandle};
pub use error::{AggregatorError, ScoutingError, StoreError};
pub use fetch::Fetch;
