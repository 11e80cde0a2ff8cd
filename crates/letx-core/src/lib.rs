//! # letx-core
//!
//! Neighbor link-quality engine for a reactive MANET routing protocol
//! (AODV family).
//!
//! Nodes broadcast periodic link probes. From the probes each node keeps a
//! 12-slot reception window per neighbor, derives an Expected Transmission
//! Count (ETX), predicts a Link Expiration Time (LET) from the neighbor's
//! last known position and velocity, and fuses both into one route metric.
//!
//! ## Crate structure
//!
//! - [`kinematics`]: Position/velocity snapshot and its fixed-point wire form
//! - [`window`]: 12-slot reception bitmap and the shared slot cursor
//! - [`etx`]: Settled reception count and scaled ETX
//! - [`expiry`]: Link expiration time from relative motion
//! - [`metric`]: Hybrid ETX + LET metric
//! - [`neighbor`]: Per-instance neighbor statistics table
//! - [`wire`]: LPP, RREQ, RREP, RREP-ACK and RERR message formats
//! - [`rtable`]: Routing table entries carrying the fused metric
//! - [`config`]: TOML engine configuration
//! - [`stats`]: Serializable per-neighbor reports

pub mod config;
pub mod etx;
pub mod expiry;
pub mod kinematics;
pub mod metric;
pub mod neighbor;
pub mod rtable;
pub mod stats;
pub mod wire;
pub mod window;
