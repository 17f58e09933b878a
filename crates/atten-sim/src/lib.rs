//! Step Attenuator Simulation Library
//!
//! This crate provides a simulated instrument for exercising attenuator
//! control code without lab hardware. [`VirtualInstrument`] implements the
//! `atten-core` driver contract and adds the knobs tests need:
//!
//! - a log of every driver call
//! - hardware step quantization
//! - transport fault injection
//! - out-of-band channel changes
//!
//! # Example
//!
//! ```rust
//! use atten_core::Attenuator;
//! use atten_sim::VirtualInstrument;
//!
//! let sim = VirtualInstrument::new("SIM-4", 4, Some(60.0));
//! let atten = Attenuator::with_offset(&sim.shared(), 0, 5.0).unwrap();
//!
//! atten.set_attenuation(50.0).unwrap();
//! assert_eq!(sim.sets(), vec![(0, 55.0)]);
//! ```

pub mod instrument;

pub use instrument::{DriverCall, VirtualInstrument, VirtualInstrumentConfig};
