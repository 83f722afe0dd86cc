//! GPIO input lines via the sysfs GPIO interface

use crate::HalError;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads the level of a GPIO line
pub trait GpioReader: Send + Sync {
    /// `true` when the line is high
    fn get_value(&self, gpio: u32) -> Result<bool, HalError>;
}

/// GPIO lines under `/sys/class/gpio`
///
/// A line that is not exported yet is exported for the duration of the read
/// and released again afterwards.
#[derive(Debug, Clone)]
pub struct SysfsGpio {
    root: PathBuf,
}

impl SysfsGpio {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn line_dir(&self, gpio: u32) -> PathBuf {
        self.root.join(format!("gpio{}", gpio))
    }

    fn read_value(&self, gpio: u32) -> Result<bool, HalError> {
        let contents = fs::read_to_string(self.line_dir(gpio).join("value"))?;
        match contents.trim() {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(HalError::InvalidValue {
                property: "gpio value",
                value: other.to_string(),
            }),
        }
    }
}

impl Default for SysfsGpio {
    fn default() -> Self {
        Self::new(Path::new("/sys/class/gpio"))
    }
}

impl GpioReader for SysfsGpio {
    fn get_value(&self, gpio: u32) -> Result<bool, HalError> {
        let exported_here = if self.line_dir(gpio).exists() {
            false
        } else {
            fs::write(self.root.join("export"), gpio.to_string())
                .map_err(|_| HalError::Gpio(gpio))?;
            true
        };

        let value = self.read_value(gpio);

        if exported_here {
            if let Err(e) = fs::write(self.root.join("unexport"), gpio.to_string()) {
                tracing::warn!("Failed to release GPIO {}: {}", gpio, e);
            }
        }

        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_exported_line() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("gpio42")).unwrap();
        fs::write(dir.path().join("gpio42/value"), "1\n").unwrap();

        let gpio = SysfsGpio::new(dir.path());
        assert!(gpio.get_value(42).unwrap());
    }

    #[test]
    fn test_unexportable_line() {
        let dir = TempDir::new().unwrap();
        let gpio = SysfsGpio::new(&dir.path().join("missing"));

        assert!(matches!(gpio.get_value(5), Err(HalError::Gpio(5))));
    }
}
