//! Kernel-wide configuration, loadable from TOML.

// Layer 1: Standard library
// (none)

// Layer 2: Third-party
use serde::{Deserialize, Serialize};

// Layer 3: Internal
use crate::registry::RegistryConfig;
use kernos_rt::SchedulerConfig;

/// Ticks between registry health passes.
pub const DEFAULT_MODULE_CHECK_INTERVAL: u64 = 500;

/// Top-level configuration for a [`Kernel`](crate::kernel::Kernel).
///
/// # Example
///
/// ```rust
/// use kernos_mods::kernel::KernelConfig;
///
/// let config: KernelConfig = toml::from_str(
///     r#"
///     module_check_interval_ticks = 250
///
///     [scheduler]
///     max_actors = 64
///     timeslice_ticks = 8
///
///     [registry]
///     strict_enforcement = true
///     "#,
/// )
/// .unwrap();
/// assert_eq!(config.scheduler.max_actors, 64);
/// assert_eq!(config.module_check_interval_ticks, 250);
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Scheduler section.
    pub scheduler: SchedulerConfig,

    /// Registry and sandbox section.
    pub registry: RegistryConfig,

    /// Registry health-pass cadence in ticks (0 disables it).
    pub module_check_interval_ticks: u64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            registry: RegistryConfig::default(),
            module_check_interval_ticks: DEFAULT_MODULE_CHECK_INTERVAL,
        }
    }
}

impl KernelConfig {
    /// Parse from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, String> {
        let config: KernelConfig = toml::from_str(text).map_err(|err| err.to_string())?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all sections.
    pub fn validate(&self) -> Result<(), String> {
        self.scheduler.validate()?;
        self.registry.validate()?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        assert!(KernelConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = KernelConfig::from_toml("[scheduler]\nmax_actors = 32\n").unwrap();
        assert_eq!(config.scheduler.max_actors, 32);
        assert_eq!(
            config.module_check_interval_ticks,
            DEFAULT_MODULE_CHECK_INTERVAL
        );
        assert!(config.registry.strict_enforcement);
    }

    #[test]
    fn test_invalid_section_rejected() {
        let err = KernelConfig::from_toml("[scheduler]\ntimeslice_ticks = 0\n").unwrap_err();
        assert!(err.contains("timeslice_ticks"));
    }
}
