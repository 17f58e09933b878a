//! Step Attenuator Rack
//!
//! This crate assembles attenuator instruments into a usable test rack:
//!
//! - **config**: JSON description of instruments, calibration and groups
//! - **registry**: (model, transport) → driver factory lookup
//! - **rack**: builds instruments, attenuators and groups from a config
//! - **actor**: gives a group a single owner task for concurrent callers
//!
//! # Example
//!
//! ```rust
//! use atten_rack::{DriverRegistry, Rack, RackConfig};
//!
//! let config = RackConfig::from_json(r#"{
//!     "instruments": [
//!         { "model": "SIM-4", "transport": "simulated", "channel_count": 4,
//!           "max_attenuation": 60.0, "offsets": [0.0, 2.0, 0.0, 0.0] }
//!     ],
//!     "groups": [
//!         { "name": "ap", "members": [{ "instrument": 0, "index": 0 },
//!                                     { "instrument": 0, "index": 1 }] }
//!     ]
//! }"#).unwrap();
//!
//! let mut rack = Rack::build(&config, &DriverRegistry::with_simulated()).unwrap();
//! let ap = rack.group_mut("ap").unwrap();
//! ap.set_attenuation(10.0).unwrap();
//! assert_eq!(ap.get_attenuation(), 10.0);
//! assert!(ap.is_synchronized().unwrap());
//! ```

pub mod actor;
pub mod config;
pub mod error;
pub mod rack;
pub mod registry;

pub use actor::{spawn_group_actor, GroupActorCommand, GroupActorHandle};
pub use config::{GroupConfig, InstrumentConfig, MemberRef, RackConfig, Transport};
pub use error::{ConfigError, RackError};
pub use rack::{GroupStatus, Rack, RackInstrument, RackStatus};
pub use registry::{simulated_driver, DriverFactory, DriverKey, DriverRegistry, SIMULATED_MODELS};
