//! Host board detection from `/proc/cpuinfo`

use std::path::Path;
use tracing::debug;

/// Board families with distinct GPIO conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// NextThing CHIP (Allwinner sun4i/sun5i), pins named `XIO-Pn`
    Chip,
    /// Raspberry Pi (Broadcom SoC), BCM pin numbers
    RaspberryPi,
    /// Anything else with a Linux GPIO interface
    Generic,
}

impl Platform {
    /// Detect the platform of the running host
    pub fn detect() -> Self {
        Self::detect_from(Path::new("/proc/cpuinfo"))
    }

    /// Detect from a cpuinfo file; unreadable files mean `Generic`
    pub fn detect_from(cpuinfo: &Path) -> Self {
        match std::fs::read_to_string(cpuinfo) {
            Ok(content) => Self::from_cpuinfo(&content),
            Err(e) => {
                debug!("Cannot read {}: {}", cpuinfo.display(), e);
                Platform::Generic
            }
        }
    }

    /// Classify by the `Hardware : ...` line
    pub fn from_cpuinfo(content: &str) -> Self {
        let hardware = content.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case("hardware")
                .then(|| value.trim())
        });

        match hardware {
            Some(value) if value.contains("sun4i/sun5i") => Platform::Chip,
            Some(value) if value.starts_with("BCM") => Platform::RaspberryPi,
            _ => Platform::Generic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_chip() {
        let cpuinfo = "processor\t: 0\nHardware\t: Allwinner sun4i/sun5i Families\nRevision\t: 0000\n";
        assert_eq!(Platform::from_cpuinfo(cpuinfo), Platform::Chip);
    }

    #[test]
    fn test_detects_raspberry_pi() {
        let cpuinfo = "model name\t: ARMv7 Processor rev 4 (v7l)\nHardware\t: BCM2835\n";
        assert_eq!(Platform::from_cpuinfo(cpuinfo), Platform::RaspberryPi);
    }

    #[test]
    fn test_generic_without_hardware_line() {
        let cpuinfo = "processor\t: 0\nvendor_id\t: GenuineIntel\n";
        assert_eq!(Platform::from_cpuinfo(cpuinfo), Platform::Generic);
    }

    #[test]
    fn test_missing_cpuinfo_is_generic() {
        assert_eq!(
            Platform::detect_from(Path::new("/nonexistent/cpuinfo")),
            Platform::Generic
        );
    }
}
