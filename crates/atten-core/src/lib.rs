//! Step Attenuator Control Library
//!
//! This crate provides a uniform interface for programmable RF step
//! attenuators, independent of the instrument driving them:
//!
//! - **Instrument**: a driver implementing [`AttenuatorInstrument`], shared
//!   through a [`SharedInstrument`] handle
//! - **Attenuator**: one channel on an instrument, with a calibration offset
//! - **Group**: attenuators driven together to one nominal value
//!
//! # Limits
//!
//! The commanded value plus a channel's offset may never exceed the
//! instrument's maximum. Requests above it fail before any command is sent.
//!
//! # Concurrency
//!
//! Everything here is blocking. Each driver call holds the instrument lock
//! for its own duration only, so a multi-call sequence such as a group set
//! can interleave with other users of the same instrument. Callers that need
//! whole-group atomicity with respect to each other should serialize through
//! one owner (see the `atten-rack` actor).
//!
//! # Example
//!
//! ```rust,ignore
//! use atten_core::{Attenuator, Group, SharedInstrument};
//!
//! let instrument = SharedInstrument::new(driver);
//!
//! let mut uplink = Group::new("uplink");
//! uplink.add(Attenuator::with_offset(&instrument, 0, 1.5)?);
//! uplink.add_from_instrument(&instrument, 1..3)?;
//!
//! uplink.set_attenuation(30.0)?;
//! assert_eq!(uplink.get_attenuation(), 30.0);
//! ```

pub mod attenuator;
pub mod error;
pub mod group;
pub mod instrument;

pub use attenuator::Attenuator;
pub use error::{AttenError, ErrorKind, GroupSetError, TransportError};
pub use group::{ChannelSelection, Group};
pub use instrument::{AttenuatorInstrument, InstrumentInfo, SharedInstrument};
