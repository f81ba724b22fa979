//! Client code for pantry-offline.
//!
//! This crate provides the upstream fetch client, the request interception
//! engine, and the store lifecycle controller shared by the proxy binary and
//! tests.

pub mod fetch;
pub mod intercept;
pub mod lifecycle;

pub use fetch::{FetchClient, FetchConfig, FetchError, Network, RequestMode};
pub use intercept::{Engine, EngineSettings, Outcome, Served, Source, Strategy, StrategyError};
pub use lifecycle::{InstallPlan, InstallReport, InstallState, Lifecycle, Readiness};
