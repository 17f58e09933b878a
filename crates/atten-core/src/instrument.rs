//! Instrument driver contract
//!
//! An instrument is one physical step attenuator box with a controller and
//! one or more attenuator channels behind a single command/response session.
//! Concrete drivers (telnet, serial, simulated) implement
//! [`AttenuatorInstrument`]; everything above them goes through a
//! [`SharedInstrument`] handle.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::TransportError;

/// Low-level interface every step attenuator driver provides
///
/// Values passed to and returned from a driver are raw hardware values in dB,
/// with any calibration offset already applied by the caller. Drivers must
/// have their properties populated (by their own connect step) before they
/// are handed to this crate, and those properties must not change afterwards,
/// except that an unknown maximum may become known.
pub trait AttenuatorInstrument: Send {
    /// Model identifier reported by the instrument
    fn model(&self) -> &str;

    /// Number of attenuator channels on the instrument
    fn channel_count(&self) -> usize;

    /// Calibrated maximum attenuation in dB, `None` until the instrument reports one
    fn max_attenuation(&self) -> Option<f64>;

    /// Command the raw attenuation of one channel
    fn set_attenuation(&mut self, index: usize, value: f64) -> Result<(), TransportError>;

    /// Read back the raw attenuation of one channel
    fn get_attenuation(&mut self, index: usize) -> Result<f64, TransportError>;
}

/// Snapshot of an instrument's fixed properties
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstrumentInfo {
    /// Model identifier
    pub model: String,
    /// Number of channels
    pub channel_count: usize,
    /// Maximum attenuation in dB, if known
    pub max_attenuation: Option<f64>,
}

/// Shared, serialized handle to a driver
///
/// Every attenuator built on an instrument holds a clone of the same handle.
/// Each driver call takes the lock for exactly that call, so commands and
/// their responses on one session never interleave. A poisoned lock means a
/// driver call panicked mid-command and is reported as a [`TransportError`].
#[derive(Clone)]
pub struct SharedInstrument {
    inner: Arc<Mutex<Box<dyn AttenuatorInstrument>>>,
}

impl SharedInstrument {
    /// Wrap a driver for sharing between attenuators
    pub fn new(driver: impl AttenuatorInstrument + 'static) -> Self {
        Self::from_boxed(Box::new(driver))
    }

    /// Wrap an already boxed driver, as produced by a driver registry
    pub fn from_boxed(driver: Box<dyn AttenuatorInstrument>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(driver)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Box<dyn AttenuatorInstrument>>, TransportError> {
        self.inner
            .lock()
            .map_err(|_| TransportError::new("instrument session poisoned by a failed command"))
    }

    /// Model identifier of the driver
    pub fn model(&self) -> Result<String, TransportError> {
        Ok(self.lock()?.model().to_string())
    }

    /// Channel count of the driver
    pub fn channel_count(&self) -> Result<usize, TransportError> {
        Ok(self.lock()?.channel_count())
    }

    /// Maximum attenuation of the driver, if known
    pub fn max_attenuation(&self) -> Result<Option<f64>, TransportError> {
        Ok(self.lock()?.max_attenuation())
    }

    /// Snapshot of all fixed properties under one lock
    pub fn info(&self) -> Result<InstrumentInfo, TransportError> {
        let driver = self.lock()?;
        Ok(InstrumentInfo {
            model: driver.model().to_string(),
            channel_count: driver.channel_count(),
            max_attenuation: driver.max_attenuation(),
        })
    }

    /// Send a raw set command for one channel
    pub fn set_raw(&self, index: usize, value: f64) -> Result<(), TransportError> {
        self.lock()?.set_attenuation(index, value)
    }

    /// Read the raw value of one channel
    pub fn get_raw(&self, index: usize) -> Result<f64, TransportError> {
        self.lock()?.get_attenuation(index)
    }

    /// Run several driver calls without other users of the handle interleaving
    pub fn with_driver<R>(
        &self,
        f: impl FnOnce(&mut dyn AttenuatorInstrument) -> R,
    ) -> Result<R, TransportError> {
        let mut driver = self.lock()?;
        Ok(f(driver.as_mut()))
    }

    /// True if both handles refer to the same driver
    pub fn same_instrument(&self, other: &SharedInstrument) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for SharedInstrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("SharedInstrument");
        match self.inner.try_lock() {
            Ok(driver) => s
                .field("model", &driver.model())
                .field("channel_count", &driver.channel_count())
                .field("max_attenuation", &driver.max_attenuation()),
            Err(_) => s.field("driver", &"<busy>"),
        };
        s.finish()
    }
}
