//! Virtual step attenuator instrument
//!
//! Behaves like a faithful round-trip store by default. Tests can make it
//! quantize to a hardware step size, fail commands with transport errors,
//! or have a channel changed behind the back of everything using it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use atten_core::{AttenuatorInstrument, SharedInstrument, TransportError};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// A driver call seen by a virtual instrument
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    /// `set_attenuation(index, value)`
    Set { index: usize, value: f64 },
    /// `get_attenuation(index)`
    Get { index: usize },
}

/// Configuration for creating a virtual instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualInstrumentConfig {
    /// Model identifier to report
    pub model: String,
    /// Number of channels
    pub channel_count: usize,
    /// Maximum attenuation, `None` to start without one
    #[serde(default)]
    pub max_attenuation: Option<f64>,
    /// Hardware step size in dB; values are rounded to a multiple of it
    #[serde(default)]
    pub step_db: Option<f64>,
}

impl Default for VirtualInstrumentConfig {
    fn default() -> Self {
        Self {
            model: "SIM-4".to_string(),
            channel_count: 4,
            max_attenuation: Some(95.0),
            step_db: None,
        }
    }
}

#[derive(Debug)]
struct SimState {
    values: Vec<f64>,
    max_attenuation: Option<f64>,
    step_db: Option<f64>,
    calls: Vec<DriverCall>,
    fail_sets: usize,
    fail_gets: usize,
    failing_indices: HashSet<usize>,
}

/// Simulated attenuator instrument
///
/// Clones share state, so one clone can be handed to a
/// [`SharedInstrument`] while another stays with the test to inspect the
/// call log or tamper with channels.
#[derive(Debug, Clone)]
pub struct VirtualInstrument {
    model: String,
    channel_count: usize,
    state: Arc<Mutex<SimState>>,
}

impl VirtualInstrument {
    /// Create a virtual instrument with all channels at 0 dB
    pub fn new(model: impl Into<String>, channel_count: usize, max_attenuation: Option<f64>) -> Self {
        Self::from_config(VirtualInstrumentConfig {
            model: model.into(),
            channel_count,
            max_attenuation,
            step_db: None,
        })
    }

    /// Create a virtual instrument from configuration
    pub fn from_config(config: VirtualInstrumentConfig) -> Self {
        Self {
            model: config.model,
            channel_count: config.channel_count,
            state: Arc::new(Mutex::new(SimState {
                values: vec![0.0; config.channel_count],
                max_attenuation: config.max_attenuation,
                step_db: config.step_db.filter(|step| *step > 0.0),
                calls: Vec::new(),
                fail_sets: 0,
                fail_gets: 0,
                failing_indices: HashSet::new(),
            })),
        }
    }

    /// Wrap a clone in a [`SharedInstrument`], keeping `self` as a probe
    pub fn shared(&self) -> SharedInstrument {
        SharedInstrument::new(self.clone())
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Report a calibrated maximum, as a real instrument does once connected
    pub fn report_max(&self, max_attenuation: f64) {
        self.state().max_attenuation = Some(max_attenuation);
    }

    /// Round commanded values to multiples of `step_db`
    pub fn set_step(&self, step_db: f64) {
        self.state().step_db = Some(step_db).filter(|step| *step > 0.0);
    }

    /// Change a channel without going through the driver interface
    pub fn force_value(&self, index: usize, value: f64) {
        if let Some(slot) = self.state().values.get_mut(index) {
            *slot = value;
        }
    }

    /// Current raw value of a channel, without logging a call
    pub fn value(&self, index: usize) -> Option<f64> {
        self.state().values.get(index).copied()
    }

    /// All driver calls received so far
    pub fn calls(&self) -> Vec<DriverCall> {
        self.state().calls.clone()
    }

    /// Only the set calls, as `(index, value)` pairs
    pub fn sets(&self) -> Vec<(usize, f64)> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                DriverCall::Set { index, value } => Some((*index, *value)),
                DriverCall::Get { .. } => None,
            })
            .collect()
    }

    /// Forget the call log
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Make the next `count` set commands fail with a transport error
    pub fn fail_next_sets(&self, count: usize) {
        self.state().fail_sets = count;
    }

    /// Make the next `count` reads fail with a transport error
    pub fn fail_next_gets(&self, count: usize) {
        self.state().fail_gets = count;
    }

    /// Make every command to `index` fail until [`heal`](Self::heal)
    pub fn fail_index(&self, index: usize) {
        self.state().failing_indices.insert(index);
    }

    /// Clear all injected faults
    pub fn heal(&self) {
        let mut state = self.state();
        state.fail_sets = 0;
        state.fail_gets = 0;
        state.failing_indices.clear();
    }
}

impl AttenuatorInstrument for VirtualInstrument {
    fn model(&self) -> &str {
        &self.model
    }

    fn channel_count(&self) -> usize {
        self.channel_count
    }

    fn max_attenuation(&self) -> Option<f64> {
        self.state().max_attenuation
    }

    fn set_attenuation(&mut self, index: usize, value: f64) -> Result<(), TransportError> {
        let mut state = self.state();
        state.calls.push(DriverCall::Set { index, value });

        if state.fail_sets > 0 {
            state.fail_sets -= 1;
            return Err(TransportError::unexpected_response(
                &format!("SET {index} {value}"),
                "\u{fffd}",
            ));
        }
        if state.failing_indices.contains(&index) {
            return Err(TransportError::new(format!("channel {index} did not respond")));
        }

        let stored = match state.step_db {
            Some(step) => (value / step).round() * step,
            None => value,
        };
        let Some(slot) = state.values.get_mut(index) else {
            return Err(TransportError::new(format!("no channel {index}")));
        };
        *slot = stored;

        trace!("{}: channel {} set to {}", self.model, index, stored);
        Ok(())
    }

    fn get_attenuation(&mut self, index: usize) -> Result<f64, TransportError> {
        let mut state = self.state();
        state.calls.push(DriverCall::Get { index });

        if state.fail_gets > 0 {
            state.fail_gets -= 1;
            debug!("{}: injected read failure on channel {}", self.model, index);
            return Err(TransportError::unexpected_response(
                &format!("GET {index}"),
                "",
            ));
        }
        if state.failing_indices.contains(&index) {
            return Err(TransportError::new(format!("channel {index} did not respond")));
        }

        state
            .values
            .get(index)
            .copied()
            .ok_or_else(|| TransportError::new(format!("no channel {index}")))
    }
}
