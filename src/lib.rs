//! Storefront
//!
//! Client-side cart pricing for a REST storefront backend: a persisted local
//! cart, a quote client for the backend's pricing endpoint, and the
//! reconciliation logic that keeps the two consistent as lines are removed.

pub mod cart;
pub mod client;
pub mod config;
pub mod observability;
pub mod prelude;
pub mod quote;
pub mod receipt;
pub mod reconciler;
pub mod schema;
pub mod session;
