//! Deterministic mobility simulation for the letx link-quality engine.
//!
//! Drives several protocol instances through seeded random-walk mobility,
//! a distance-dependent lossy broadcast medium, periodic window rotation
//! and metric-fed one-hop route refreshes.

pub mod config;
pub mod mobility;
pub mod network;
pub mod node;
pub mod report;
