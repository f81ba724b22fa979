//! Strategy executors, one per non-passthrough `Strategy`.
//!
//! Each executor is a straight sequence of awaits that ends in either a
//! `Served` response or a `StrategyError` naming the last miss.

pub mod api;
pub mod image;
pub mod navigation;
