//! ADC access
//!
//! Raw conversions from the application processor's ADC (exposed by the IIO
//! subsystem) or from an external converter IC.

use crate::HalError;
use std::fs;
use std::path::{Path, PathBuf};

/// Source of raw ADC conversions
pub trait AdcReader: Send + Sync {
    /// Read one raw conversion from `channel`
    fn read(&self, channel: u32) -> Result<i32, HalError>;
}

/// ADC exposed through an IIO device directory
#[derive(Debug, Clone)]
pub struct IioAdc {
    device: PathBuf,
}

impl IioAdc {
    /// Create a reader for e.g. `/sys/bus/iio/devices/iio:device0`
    pub fn new(device: &Path) -> Self {
        Self {
            device: device.to_path_buf(),
        }
    }

    fn channel_path(&self, channel: u32) -> PathBuf {
        self.device.join(format!("in_voltage{}_raw", channel))
    }
}

impl AdcReader for IioAdc {
    fn read(&self, channel: u32) -> Result<i32, HalError> {
        let path = self.channel_path(channel);
        let contents = fs::read_to_string(&path).map_err(|e| HalError::AdcRead {
            channel,
            reason: e.to_string(),
        })?;

        contents.trim().parse().map_err(|_| HalError::AdcRead {
            channel,
            reason: format!("unparsable sample {:?}", contents.trim()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_iio_read() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("in_voltage4_raw"), "1783\n").unwrap();

        let adc = IioAdc::new(dir.path());
        assert_eq!(adc.read(4).unwrap(), 1783);
    }

    #[test]
    fn test_iio_missing_channel() {
        let dir = TempDir::new().unwrap();
        let adc = IioAdc::new(dir.path());

        match adc.read(7) {
            Err(HalError::AdcRead { channel, .. }) => assert_eq!(channel, 7),
            other => panic!("Expected AdcRead error, got {:?}", other),
        }
    }

    #[test]
    fn test_iio_garbage() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("in_voltage1_raw"), "busy").unwrap();

        let adc = IioAdc::new(dir.path());
        assert!(adc.read(1).is_err());
    }
}
