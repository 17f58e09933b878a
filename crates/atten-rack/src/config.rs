//! Rack configuration
//!
//! A rack is described by a JSON file listing the attenuator instruments,
//! how to reach them, their per-channel calibration, and any groups to
//! build from their channels:
//!
//! ```json
//! {
//!   "instruments": [
//!     {
//!       "model": "SIM-4",
//!       "transport": "simulated",
//!       "channel_count": 4,
//!       "offsets": [0.0, 1.5, 0.0, 2.0],
//!       "paths": ["AP-2G", "AP-5G", "STA-2G", "STA-5G"]
//!     }
//!   ],
//!   "groups": [
//!     { "name": "ap", "members": [{ "instrument": 0, "index": 0 }, { "instrument": 0, "index": 1 }] }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, RackError};

/// How the driver reaches the instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Text command session over a TCP telnet connection
    #[default]
    Telnet,
    /// Text command session over a serial port
    Serial,
    /// In-process simulated instrument
    Simulated,
}

impl Transport {
    /// Returns a human-readable name for the transport
    pub fn name(&self) -> &'static str {
        match self {
            Transport::Telnet => "telnet",
            Transport::Serial => "serial",
            Transport::Simulated => "simulated",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn default_port() -> u16 {
    23
}

/// One attenuator instrument in the rack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Model name, used with the transport to pick a driver
    pub model: String,
    /// Transport to the instrument
    #[serde(default)]
    pub transport: Transport,
    /// Host name, IP address or serial device
    #[serde(default)]
    pub address: String,
    /// TCP port (ignored by serial and simulated transports)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Number of attenuator channels to expose
    pub channel_count: usize,
    /// Calibration offset per channel, in dB
    #[serde(default)]
    pub offsets: Option<Vec<f64>>,
    /// RF path label per channel
    #[serde(default)]
    pub paths: Option<Vec<String>>,
    /// Maximum attenuation for simulated instruments
    #[serde(default)]
    pub max_attenuation: Option<f64>,
}

impl InstrumentConfig {
    /// Descriptor for a simulated instrument
    pub fn simulated(model: impl Into<String>, channel_count: usize, max_attenuation: f64) -> Self {
        Self {
            model: model.into(),
            transport: Transport::Simulated,
            address: String::new(),
            port: default_port(),
            channel_count,
            offsets: None,
            paths: None,
            max_attenuation: Some(max_attenuation),
        }
    }

    /// Calibration offset for a channel, 0 when no offsets are configured
    pub fn offset(&self, index: usize) -> f64 {
        self.offsets
            .as_ref()
            .and_then(|offsets| offsets.get(index).copied())
            .unwrap_or(0.0)
    }

    /// Path label for a channel, if configured
    pub fn path(&self, index: usize) -> Option<&str> {
        self.paths
            .as_ref()
            .and_then(|paths| paths.get(index))
            .map(String::as_str)
    }

    fn validate(&self, instrument: usize) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel { instrument });
        }
        if let Some(offsets) = &self.offsets {
            if offsets.len() < self.channel_count {
                return Err(ConfigError::MissingOffsets {
                    instrument,
                    given: offsets.len(),
                    channel_count: self.channel_count,
                });
            }
        }
        if let Some(paths) = &self.paths {
            if paths.len() < self.channel_count {
                return Err(ConfigError::MissingPaths {
                    instrument,
                    given: paths.len(),
                    channel_count: self.channel_count,
                });
            }
        }
        Ok(())
    }
}

/// Reference to one channel of a configured instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRef {
    /// Zero-based position in [`RackConfig::instruments`]
    pub instrument: usize,
    /// Channel index on that instrument
    pub index: usize,
}

/// A group to build from configured channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Group name
    pub name: String,
    /// Members in command order
    #[serde(default)]
    pub members: Vec<MemberRef>,
}

/// Complete rack description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RackConfig {
    /// Instruments in the rack
    #[serde(default)]
    pub instruments: Vec<InstrumentConfig>,
    /// Groups to build
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

impl RackConfig {
    /// Parse a configuration from JSON text
    pub fn from_json(text: &str) -> Result<Self, RackError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RackError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RackError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Check descriptor consistency
    ///
    /// Offset and path lists shorter than the channel count are errors,
    /// never padded with defaults.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (position, instrument) in self.instruments.iter().enumerate() {
            instrument.validate(position)?;
        }

        let mut names = HashSet::new();
        for group in &self.groups {
            if !names.insert(group.name.as_str()) {
                return Err(ConfigError::DuplicateGroup(group.name.clone()));
            }
        }
        Ok(())
    }
}
