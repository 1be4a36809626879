//! Application Layer - Ports and the analytics use case.
//!
//! Ports describe what the engine needs from the outside world (a tick
//! repository and a market-data feed). Services compose domain functions
//! over those ports.

/// Driven ports: tick persistence and feed transport.
pub mod ports;

/// Application services (one pairs analytics pass).
pub mod services;
