//! # Avionics Sensor Bus Simulator
//!
//! Stands in for the sensor line-replaceable units of a flight-management unit
//! on the bench. Fixed-format binary telemetry is streamed over UDP at the
//! rates the real sensors use, and the unit is always handed its labels back
//! ("unblocked") when the run ends.
//!
//! ## Features
//!
//! - **Byte-exact packets**: GPS, air data, AHRS, traffic, TAWS, FMS clock and IOF control
//! - **Multi-rate scheduling**: five staggered channels driven from one 50 ms loop
//! - **Best-effort transport**: host-down errors are ignored, anything else stops the run
//! - **Guaranteed cleanup**: unblock directives on timeout, interrupt and failure
//!
//! ## Quick Start
//!
//! ```no_run
//! use sensorbus::{SimulatorConfig, Simulator};
//!
//! # async fn demo() -> Result<(), sensorbus::lifecycle::SimError> {
//! let mut config = SimulatorConfig::default();
//! config.host = "127.0.0.1".to_string();
//! config.magvar_deg = Some(2.5);
//! config.timeout_secs = Some(10);
//!
//! let mut simulator = Simulator::open(&config)?;
//! let summary = simulator.run(std::future::pending()).await?;
//! println!("stopped: {:?}", summary.reason);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`units`] - Unit conversions applied before encoding
//! - [`labels`] - IOF label identifiers
//! - [`protocol`] - Packet encoders
//! - [`config`] - Validated simulator configuration
//! - [`transport`] - UDP datagram link and failure classification
//! - [`scheduler`] - Channel cadence and per-channel packet selection
//! - [`lifecycle`] - Start, run, cleanup and shutdown

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod units;
pub mod labels;
pub mod protocol;
pub mod config;
pub mod transport;
pub mod scheduler;
pub mod lifecycle;

// Re-export main public types for convenience
pub use config::SimulatorConfig;
pub use lifecycle::{Simulator, RunSummary, StopReason};
pub use transport::{PacketSink, TransportResult, UdpTransport};
