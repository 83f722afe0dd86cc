//! Board hooks for a running system

use midas_battery::Board;
use midas_hal::Health;
use std::fs;
use std::path::Path;

/// Kernel command line flag set by the bootloader when booting to charge
const LPM_FLAG: &str = "lpcharge=1";

/// Board backed by the kernel command line; the remaining hooks only log
#[derive(Debug, Clone, Default)]
pub struct SysBoard {
    lpm: bool,
}

impl SysBoard {
    pub fn detect(cmdline: &Path) -> Self {
        let lpm = fs::read_to_string(cmdline)
            .map(|line| parse_lpm(&line))
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to read {}: {}", cmdline.display(), e);
                false
            });

        if lpm {
            tracing::info!("Low power charging mode");
        }
        Self { lpm }
    }
}

fn parse_lpm(cmdline: &str) -> bool {
    cmdline.split_whitespace().any(|arg| arg == LPM_FLAG)
}

impl Board for SysBoard {
    fn is_lpm(&self) -> bool {
        self.lpm
    }

    fn check_result(&self) {
        tracing::warn!("Battery removed");
    }

    fn ovp_uvlo_result(&self, health: Health) {
        tracing::warn!("Charger input {}", health.as_str());
    }

    fn initial_check(&self) {
        tracing::debug!("Initial board check");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_lpm_flag() {
        assert!(parse_lpm("console=ttySAC2 lpcharge=1 androidboot.mode=charger"));
        assert!(!parse_lpm("console=ttySAC2 lpcharge=0"));
        assert!(!parse_lpm("xlpcharge=1"));
    }

    #[test]
    fn test_detect_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "root=/dev/mmcblk0p5 lpcharge=1").unwrap();
        assert!(SysBoard::detect(file.path()).is_lpm());

        assert!(!SysBoard::detect(Path::new("/nonexistent/cmdline")).is_lpm());
    }
}
