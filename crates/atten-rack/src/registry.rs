//! Driver registry
//!
//! Maps a (model, transport) pair to a factory that builds and connects the
//! matching driver. Drivers are registered explicitly, so an unsupported
//! combination is reported when the rack is built rather than on first use.

use std::collections::HashMap;

use atten_core::AttenuatorInstrument;
use atten_sim::{VirtualInstrument, VirtualInstrumentConfig};
use tracing::debug;

use crate::config::{InstrumentConfig, Transport};
use crate::error::RackError;

/// Builds a connected driver from its descriptor
pub type DriverFactory = fn(&InstrumentConfig) -> Result<Box<dyn AttenuatorInstrument>, RackError>;

/// Key under which a driver factory is registered
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DriverKey {
    /// Model name as it appears in configuration
    pub model: String,
    /// Transport to the instrument
    pub transport: Transport,
}

impl DriverKey {
    /// Create a key
    pub fn new(model: impl Into<String>, transport: Transport) -> Self {
        Self {
            model: model.into(),
            transport,
        }
    }
}

/// Model names the simulated driver answers to in [`DriverRegistry::with_simulated`]
pub const SIMULATED_MODELS: &[&str] = &["SIM-1", "SIM-2", "SIM-4", "SIM-8"];

/// Registry of available drivers
#[derive(Debug, Clone, Default)]
pub struct DriverRegistry {
    factories: HashMap<DriverKey, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the simulated driver available
    ///
    /// The simulated driver handles every model over
    /// [`Transport::Simulated`] via [`create`](Self::create), and the
    /// [`SIMULATED_MODELS`] names over every transport.
    pub fn with_simulated() -> Self {
        let mut registry = Self::new();
        for model in SIMULATED_MODELS {
            for transport in [Transport::Telnet, Transport::Serial, Transport::Simulated] {
                registry.register(*model, transport, simulated_driver);
            }
        }
        registry
    }

    /// Register a factory, replacing any previous one for the same key
    pub fn register(&mut self, model: impl Into<String>, transport: Transport, factory: DriverFactory) {
        let key = DriverKey::new(model, transport);
        debug!("Registered driver for {} over {}", key.model, key.transport);
        self.factories.insert(key, factory);
    }

    /// Look up the factory for a model/transport pair
    pub fn resolve(&self, model: &str, transport: Transport) -> Option<DriverFactory> {
        self.factories
            .get(&DriverKey::new(model, transport))
            .copied()
    }

    /// True if a driver is registered for the pair
    pub fn contains(&self, model: &str, transport: Transport) -> bool {
        self.resolve(model, transport).is_some()
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<DriverKey> {
        let mut keys: Vec<_> = self.factories.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Build and connect a driver for a descriptor
    pub fn create(&self, config: &InstrumentConfig) -> Result<Box<dyn AttenuatorInstrument>, RackError> {
        let factory = self
            .resolve(&config.model, config.transport)
            .or_else(|| (config.transport == Transport::Simulated).then_some(simulated_driver as DriverFactory))
            .ok_or_else(|| RackError::UnknownDriver {
                model: config.model.clone(),
                transport: config.transport,
            })?;
        factory(config)
    }
}

/// Factory for [`VirtualInstrument`]
pub fn simulated_driver(config: &InstrumentConfig) -> Result<Box<dyn AttenuatorInstrument>, RackError> {
    Ok(Box::new(VirtualInstrument::from_config(VirtualInstrumentConfig {
        model: config.model.clone(),
        channel_count: config.channel_count,
        max_attenuation: config.max_attenuation,
        step_db: None,
    })))
}
