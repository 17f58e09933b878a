//! Rack assembly
//!
//! Turns a [`RackConfig`] into connected instruments, calibrated
//! attenuators and groups.

use atten_core::{AttenError, Attenuator, Group, InstrumentInfo, SharedInstrument};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::RackConfig;
use crate::error::RackError;
use crate::registry::DriverRegistry;

/// One instrument in a built rack
#[derive(Debug, Clone)]
pub struct RackInstrument {
    /// Shared driver handle
    pub instrument: SharedInstrument,
    /// Attenuators in channel order
    pub attenuators: Vec<Attenuator>,
}

/// Cached value of one group in a [`RackStatus`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStatus {
    /// Group name
    pub name: String,
    /// Number of members
    pub members: usize,
    /// Last value commanded to the whole group, in dB
    pub attenuation: f64,
}

/// Serializable snapshot of a built rack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RackStatus {
    /// Instrument properties in configuration order
    pub instruments: Vec<InstrumentInfo>,
    /// Groups in configuration order
    pub groups: Vec<GroupStatus>,
}

impl RackStatus {
    /// Render as pretty JSON
    pub fn to_json(&self) -> Result<String, RackError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Instruments, attenuators and groups built from a configuration
#[derive(Debug, Default)]
pub struct Rack {
    instruments: Vec<RackInstrument>,
    groups: Vec<Group>,
}

impl Rack {
    /// Validate `config`, connect every instrument and build its groups
    pub fn build(config: &RackConfig, registry: &DriverRegistry) -> Result<Self, RackError> {
        config.validate()?;

        let mut instruments = Vec::with_capacity(config.instruments.len());
        for descriptor in &config.instruments {
            let instrument = SharedInstrument::from_boxed(registry.create(descriptor)?);

            let reported = instrument.channel_count().map_err(AttenError::from)?;
            if reported != descriptor.channel_count {
                return Err(RackError::ChannelCountMismatch {
                    model: descriptor.model.clone(),
                    configured: descriptor.channel_count,
                    reported,
                });
            }

            let mut attenuators = Vec::with_capacity(descriptor.channel_count);
            for index in 0..descriptor.channel_count {
                let mut attenuator =
                    Attenuator::with_offset(&instrument, index, descriptor.offset(index))?;
                if let Some(path) = descriptor.path(index) {
                    attenuator.set_path(path);
                }
                attenuators.push(attenuator);
            }

            info!(
                "Connected {} over {} ({} channels)",
                descriptor.model, descriptor.transport, descriptor.channel_count
            );
            instruments.push(RackInstrument {
                instrument,
                attenuators,
            });
        }

        let mut rack = Self {
            instruments,
            groups: Vec::with_capacity(config.groups.len()),
        };

        for group_config in &config.groups {
            let mut group = Group::new(group_config.name.clone());
            for member in &group_config.members {
                let attenuator = rack
                    .attenuator(member.instrument, member.index)
                    .cloned()
                    .ok_or_else(|| RackError::UnknownGroupMember {
                        group: group_config.name.clone(),
                        instrument: member.instrument,
                        index: member.index,
                    })?;
                group.add(attenuator);
            }
            info!("Built group {} with {} members", group.name(), group.len());
            rack.groups.push(group);
        }

        Ok(rack)
    }

    /// Built instruments in configuration order
    pub fn instruments(&self) -> &[RackInstrument] {
        &self.instruments
    }

    /// Every attenuator, instrument by instrument
    pub fn attenuators(&self) -> impl Iterator<Item = &Attenuator> {
        self.instruments
            .iter()
            .flat_map(|instrument| instrument.attenuators.iter())
    }

    /// Attenuator at a channel of a configured instrument
    pub fn attenuator(&self, instrument: usize, index: usize) -> Option<&Attenuator> {
        self.instruments
            .get(instrument)
            .and_then(|instrument| instrument.attenuators.get(index))
    }

    /// First attenuator labelled with `path`
    pub fn find_by_path(&self, path: &str) -> Option<&Attenuator> {
        self.attenuators()
            .find(|attenuator| attenuator.path() == Some(path))
    }

    /// Group by name
    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|group| group.name() == name)
    }

    /// Group by name, mutable
    pub fn group_mut(&mut self, name: &str) -> Option<&mut Group> {
        self.groups.iter_mut().find(|group| group.name() == name)
    }

    /// Group by name, or [`RackError::GroupNotFound`]
    pub fn require_group(&self, name: &str) -> Result<&Group, RackError> {
        self.group(name)
            .ok_or_else(|| RackError::GroupNotFound(name.to_string()))
    }

    /// Mutable group by name, or [`RackError::GroupNotFound`]
    pub fn require_group_mut(&mut self, name: &str) -> Result<&mut Group, RackError> {
        self.group_mut(name)
            .ok_or_else(|| RackError::GroupNotFound(name.to_string()))
    }

    /// All groups in configuration order
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Snapshot of instrument properties and cached group values
    ///
    /// Takes each instrument lock once and reads no channel values.
    pub fn status(&self) -> Result<RackStatus, RackError> {
        let instruments = self
            .instruments
            .iter()
            .map(|instrument| instrument.instrument.info().map_err(AttenError::from))
            .collect::<Result<Vec<_>, _>>()?;

        let groups = self
            .groups
            .iter()
            .map(|group| GroupStatus {
                name: group.name().to_string(),
                members: group.len(),
                attenuation: group.get_attenuation(),
            })
            .collect();

        Ok(RackStatus {
            instruments,
            groups,
        })
    }

    /// Remove a group from the rack, for example to hand it to an actor
    pub fn take_group(&mut self, name: &str) -> Option<Group> {
        let position = self.groups.iter().position(|group| group.name() == name)?;
        Some(self.groups.remove(position))
    }
}
