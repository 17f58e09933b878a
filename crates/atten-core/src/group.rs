//! Groups of attenuators driven to one nominal value
//!
//! A group commands its members in insertion order and remembers the last
//! value it successfully commanded. Reads of the group value come from that
//! cache, not from hardware, so a group is only as consistent as the code
//! that drives its members. [`Group::is_synchronized`] checks the hardware
//! and [`Group::synchronize`] re-asserts the cached value.
//!
//! Group sets are not atomic. If member `k` fails, members `0..k` keep the
//! new value, members `k..` keep whatever they had, and the cache keeps the
//! old value. The returned [`GroupSetError`] says where it stopped.

use std::ops::{Range, RangeInclusive};

use tracing::{debug, warn};

use crate::attenuator::Attenuator;
use crate::error::{AttenError, GroupSetError};
use crate::instrument::SharedInstrument;

/// Channel indices to take from one instrument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSelection {
    /// A single index
    Single(usize),
    /// An explicit list, in command order
    List(Vec<usize>),
    /// A contiguous range
    Range(Range<usize>),
}

impl ChannelSelection {
    /// Indices in the order they will be added
    pub fn indices(&self) -> Vec<usize> {
        match self {
            Self::Single(index) => vec![*index],
            Self::List(indices) => indices.clone(),
            Self::Range(range) => range.clone().collect(),
        }
    }
}

impl From<usize> for ChannelSelection {
    fn from(index: usize) -> Self {
        Self::Single(index)
    }
}

impl From<Vec<usize>> for ChannelSelection {
    fn from(indices: Vec<usize>) -> Self {
        Self::List(indices)
    }
}

impl From<&[usize]> for ChannelSelection {
    fn from(indices: &[usize]) -> Self {
        Self::List(indices.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for ChannelSelection {
    fn from(indices: [usize; N]) -> Self {
        Self::List(indices.to_vec())
    }
}

impl From<Range<usize>> for ChannelSelection {
    fn from(range: Range<usize>) -> Self {
        Self::Range(range)
    }
}

impl From<RangeInclusive<usize>> for ChannelSelection {
    fn from(range: RangeInclusive<usize>) -> Self {
        let (start, end) = range.into_inner();
        Self::Range(start..end.saturating_add(1))
    }
}

/// A named set of attenuators driven together
#[derive(Debug, Clone, Default)]
pub struct Group {
    name: String,
    members: Vec<Attenuator>,
    last_commanded: f64,
}

impl Group {
    /// Create an empty group
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            last_commanded: 0.0,
        }
    }

    /// Diagnostic name of the group
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True if the group has no members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in command order
    pub fn members(&self) -> &[Attenuator] {
        &self.members
    }

    /// Iterate over members in command order
    pub fn iter(&self) -> std::slice::Iter<'_, Attenuator> {
        self.members.iter()
    }

    /// Append an attenuator; it is commanded after all current members
    pub fn add(&mut self, attenuator: Attenuator) {
        debug!(
            "Group {:?}: added {}[{}]",
            self.name,
            attenuator.model(),
            attenuator.index()
        );
        self.members.push(attenuator);
    }

    /// Create attenuators with zero offset for `selection` and append them
    ///
    /// All attenuators are created before any is added, so an out-of-range
    /// index leaves the group as it was.
    pub fn add_from_instrument(
        &mut self,
        instrument: &SharedInstrument,
        selection: impl Into<ChannelSelection>,
    ) -> Result<(), AttenError> {
        let created = selection
            .into()
            .indices()
            .into_iter()
            .map(|index| Attenuator::new(instrument, index))
            .collect::<Result<Vec<_>, _>>()?;

        for attenuator in created {
            self.add(attenuator);
        }
        Ok(())
    }

    /// Command every member to `value`, in order
    ///
    /// The cached group value only changes once every member has accepted
    /// the command. A non-finite value is rejected before any member is
    /// touched, even when the group is empty.
    pub fn set_attenuation(&mut self, value: impl Into<f64>) -> Result<(), GroupSetError> {
        let value = value.into();

        if !value.is_finite() {
            return Err(GroupSetError {
                group: self.name.clone(),
                member: 0,
                value,
                source: AttenError::InvalidArgument(format!(
                    "attenuation must be finite, got {value}"
                )),
            });
        }

        for (member, attenuator) in self.members.iter().enumerate() {
            if let Err(source) = attenuator.set_attenuation(value) {
                warn!(
                    "Group {:?}: set to {} dB stopped at member {} ({}[{}]): {}",
                    self.name,
                    value,
                    member,
                    attenuator.model(),
                    attenuator.index(),
                    source
                );
                return Err(GroupSetError {
                    group: self.name.clone(),
                    member,
                    value,
                    source,
                });
            }
        }

        self.last_commanded = value;
        debug!("Group {:?}: set {} members to {} dB", self.name, self.len(), value);
        Ok(())
    }

    /// Last value successfully commanded to the whole group
    ///
    /// Does not query hardware. Stale if a member was changed outside the
    /// group or a group set failed part way.
    pub fn get_attenuation(&self) -> f64 {
        self.last_commanded
    }

    /// Read every member and compare it to the cached value
    ///
    /// Comparison is exact. A driver that does not round-trip values bit for
    /// bit (quantizing step attenuators, for one) reports unsynchronized.
    pub fn is_synchronized(&self) -> Result<bool, AttenError> {
        for attenuator in &self.members {
            if attenuator.get_attenuation()? != self.last_commanded {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Command every member back to the cached value
    pub fn synchronize(&mut self) -> Result<(), GroupSetError> {
        self.set_attenuation(self.last_commanded)
    }
}

impl<'a> IntoIterator for &'a Group {
    type Item = &'a Attenuator;
    type IntoIter = std::slice::Iter<'a, Attenuator>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Extend<Attenuator> for Group {
    fn extend<T: IntoIterator<Item = Attenuator>>(&mut self, iter: T) {
        for attenuator in iter {
            self.add(attenuator);
        }
    }
}
