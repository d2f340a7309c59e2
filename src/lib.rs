//! Data-access and cache-consistency layer for the virtual makeup SDK
//! dashboard.
//!
//! Requests flow hook -> service -> transport -> API, and results flow back
//! through a shared keyed cache whose subscribers are told about every point
//! update, invalidation and eviction. Start from [`Dashboard`].

pub mod api;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod hooks;
pub mod i18n;
pub mod logging;
pub mod mutation;
pub mod notify;
pub mod query;
pub mod services;
pub mod session;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use dashboard::Dashboard;
pub use error::ApiError;
