//! Single attenuator channels
//!
//! An [`Attenuator`] is one addressable channel on an instrument. It hides
//! which physical box and index it lives on, and applies a calibration
//! offset so callers can work in path-corrected values.

use tracing::{debug, trace};

use crate::error::AttenError;
use crate::instrument::SharedInstrument;

/// One attenuator channel on an instrument
///
/// User-facing values are converted to hardware values by adding `offset`
/// on the way down and subtracting it on the way back. Cloning an attenuator
/// yields another handle to the same hardware channel.
#[derive(Debug, Clone)]
pub struct Attenuator {
    instrument: SharedInstrument,
    model: String,
    index: usize,
    offset: f64,
    path: Option<String>,
}

impl Attenuator {
    /// Create an attenuator for `index` with no calibration offset
    pub fn new(instrument: &SharedInstrument, index: usize) -> Result<Self, AttenError> {
        Self::with_offset(instrument, index, 0.0)
    }

    /// Create an attenuator for `index` with a calibration offset in dB
    pub fn with_offset(
        instrument: &SharedInstrument,
        index: usize,
        offset: f64,
    ) -> Result<Self, AttenError> {
        check_finite("offset", offset)?;

        let info = instrument.info()?;
        if index >= info.channel_count {
            return Err(AttenError::IndexOutOfRange {
                index,
                channel_count: info.channel_count,
            });
        }

        Ok(Self {
            instrument: instrument.clone(),
            model: info.model,
            index,
            offset,
            path: None,
        })
    }

    /// Model of the instrument this attenuator lives on
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Zero-based channel index on the instrument
    pub fn index(&self) -> usize {
        self.index
    }

    /// Calibration offset in dB
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Change the calibration offset
    pub fn set_offset(&mut self, offset: f64) -> Result<(), AttenError> {
        check_finite("offset", offset)?;
        self.offset = offset;
        Ok(())
    }

    /// Label of the RF path this attenuator sits in, if configured
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Attach a path label
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = Some(path.into());
    }

    /// Builder form of [`set_path`](Self::set_path)
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.set_path(path);
        self
    }

    /// Handle to the underlying instrument
    pub fn instrument(&self) -> &SharedInstrument {
        &self.instrument
    }

    /// Command the attenuation, normalized by the offset
    ///
    /// Fails with [`AttenError::LimitExceeded`] without touching hardware if
    /// `value + offset` is above the instrument maximum, and with
    /// [`AttenError::InvalidState`] if the instrument has not reported a
    /// maximum yet.
    pub fn set_attenuation(&self, value: f64) -> Result<(), AttenError> {
        check_finite("attenuation", value)?;

        let raw = value + self.offset;
        let Some(max) = self.instrument.max_attenuation()? else {
            return Err(AttenError::InvalidState(format!(
                "{} has not reported a maximum attenuation",
                self.model
            )));
        };

        if raw > max {
            debug!(
                "Rejected {} dB on {}[{}]: {} dB with offset exceeds {} dB",
                value, self.model, self.index, raw, max
            );
            return Err(AttenError::LimitExceeded {
                requested: value,
                offset: self.offset,
                max,
            });
        }

        trace!("Setting {}[{}] to {} dB (raw {})", self.model, self.index, value, raw);
        self.instrument.set_raw(self.index, raw)?;
        Ok(())
    }

    /// Read the attenuation back from hardware, normalized by the offset
    ///
    /// The result can be negative when the offset is larger than the hardware
    /// value; that is a valid calibration setup, not an error.
    pub fn get_attenuation(&self) -> Result<f64, AttenError> {
        let raw = self.instrument.get_raw(self.index)?;
        Ok(raw - self.offset)
    }

    /// Highest value [`set_attenuation`](Self::set_attenuation) accepts
    pub fn get_max_attenuation(&self) -> Result<f64, AttenError> {
        match self.instrument.max_attenuation()? {
            Some(max) => Ok(max - self.offset),
            None => Err(AttenError::InvalidState(format!(
                "{} has not reported a maximum attenuation",
                self.model
            ))),
        }
    }
}

fn check_finite(what: &str, value: f64) -> Result<(), AttenError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(AttenError::InvalidArgument(format!(
            "{what} must be finite, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, TransportError};
    use crate::instrument::AttenuatorInstrument;
    use std::sync::{Arc, Mutex};

    /// Round-trip store that records every raw set
    struct Recorder {
        max: Option<f64>,
        values: Vec<f64>,
        sets: Arc<Mutex<Vec<(usize, f64)>>>,
    }

    impl AttenuatorInstrument for Recorder {
        fn model(&self) -> &str {
            "REC-4"
        }

        fn channel_count(&self) -> usize {
            self.values.len()
        }

        fn max_attenuation(&self) -> Option<f64> {
            self.max
        }

        fn set_attenuation(&mut self, index: usize, value: f64) -> Result<(), TransportError> {
            self.sets.lock().unwrap().push((index, value));
            self.values[index] = value;
            Ok(())
        }

        fn get_attenuation(&mut self, index: usize) -> Result<f64, TransportError> {
            Ok(self.values[index])
        }
    }

    fn recorder(max: Option<f64>) -> (SharedInstrument, Arc<Mutex<Vec<(usize, f64)>>>) {
        let sets = Arc::new(Mutex::new(Vec::new()));
        let inst = SharedInstrument::new(Recorder {
            max,
            values: vec![0.0; 4],
            sets: sets.clone(),
        });
        (inst, sets)
    }

    #[test]
    fn test_offset_applied_to_driver() {
        let (inst, sets) = recorder(Some(60.0));
        let atten = Attenuator::with_offset(&inst, 0, 5.0).unwrap();

        atten.set_attenuation(50.0).unwrap();
        assert_eq!(*sets.lock().unwrap(), vec![(0, 55.0)]);
        assert_eq!(atten.get_attenuation().unwrap(), 50.0);
    }

    #[test]
    fn test_limit_exceeded_issues_no_command() {
        let (inst, sets) = recorder(Some(60.0));
        let atten = Attenuator::with_offset(&inst, 0, 5.0).unwrap();

        let err = atten.set_attenuation(56.0).unwrap_err();
        assert_eq!(
            err,
            AttenError::LimitExceeded {
                requested: 56.0,
                offset: 5.0,
                max: 60.0
            }
        );
        assert!(sets.lock().unwrap().is_empty());
    }

    #[test]
    fn test_exact_maximum_accepted() {
        let (inst, _) = recorder(Some(60.0));
        let atten = Attenuator::with_offset(&inst, 3, 5.0).unwrap();
        atten.set_attenuation(55.0).unwrap();
    }

    #[test]
    fn test_index_out_of_range() {
        let (inst, _) = recorder(Some(60.0));
        let err = Attenuator::new(&inst, 4).unwrap_err();
        assert_eq!(
            err,
            AttenError::IndexOutOfRange {
                index: 4,
                channel_count: 4
            }
        );
    }

    #[test]
    fn test_unknown_maximum() {
        let (inst, sets) = recorder(None);
        let atten = Attenuator::new(&inst, 1).unwrap();

        assert_eq!(
            atten.get_max_attenuation().unwrap_err().kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(
            atten.set_attenuation(10.0).unwrap_err().kind(),
            ErrorKind::InvalidState
        );
        assert!(sets.lock().unwrap().is_empty());
    }

    #[test]
    fn test_max_normalized_by_offset() {
        let (inst, _) = recorder(Some(60.0));
        let atten = Attenuator::with_offset(&inst, 1, 2.5).unwrap();
        assert_eq!(atten.get_max_attenuation().unwrap(), 57.5);
    }

    #[test]
    fn test_negative_readback_allowed() {
        let (inst, _) = recorder(Some(60.0));
        let atten = Attenuator::with_offset(&inst, 2, 10.0).unwrap();
        // Hardware sits at 0 dB
        assert_eq!(atten.get_attenuation().unwrap(), -10.0);
    }

    #[test]
    fn test_non_finite_rejected() {
        let (inst, sets) = recorder(Some(60.0));
        assert_eq!(
            Attenuator::with_offset(&inst, 0, f64::NAN).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );

        let mut atten = Attenuator::new(&inst, 0).unwrap();
        assert_eq!(
            atten.set_attenuation(f64::INFINITY).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert!(atten.set_offset(f64::NEG_INFINITY).is_err());
        assert_eq!(atten.offset(), 0.0);
        assert!(sets.lock().unwrap().is_empty());
    }

    #[test]
    fn test_model_and_path() {
        let (inst, _) = recorder(Some(60.0));
        let atten = Attenuator::new(&inst, 0).unwrap().with_path("AP1-2G");
        assert_eq!(atten.model(), "REC-4");
        assert_eq!(atten.path(), Some("AP1-2G"));
        assert_eq!(atten.index(), 0);
    }
}
