//! Configuration types for controlling runs and generation parameters.

use std::time::Duration;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Invalid number of runs (must be > 0)
    InvalidRuns(usize),
    /// Invalid shrink step budget (must be > 0)
    InvalidShrinkSteps(usize),
    /// Invalid timeout (must be > 0)
    InvalidTimeout,
    /// Invalid max depth (must be > 0)
    InvalidMaxDepth(usize),
    /// Lower size bound exceeds the upper one
    InvalidSizeRange { min: usize, max: usize },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidRuns(n) => {
                write!(f, "Invalid run count: {} (must be > 0)", n)
            }
            ConfigError::InvalidShrinkSteps(n) => {
                write!(f, "Invalid shrink step budget: {} (must be > 0)", n)
            }
            ConfigError::InvalidTimeout => {
                write!(f, "Invalid timeout (must be > 0)")
            }
            ConfigError::InvalidMaxDepth(n) => {
                write!(f, "Invalid max depth: {} (must be > 0)", n)
            }
            ConfigError::InvalidSizeRange { min, max } => {
                write!(f, "Invalid size range: min {} exceeds max {}", min, max)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl ConfigError {
    /// Name of the configuration field this error refers to
    pub fn field(&self) -> &'static str {
        match self {
            ConfigError::InvalidRuns(_) => "num_runs",
            ConfigError::InvalidShrinkSteps(_) => "max_shrink_steps",
            ConfigError::InvalidTimeout => "shrink_timeout",
            ConfigError::InvalidMaxDepth(_) => "max_depth",
            ConfigError::InvalidSizeRange { .. } => "min_size",
        }
    }
}

/// Configuration for generators
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Default lower bound for collection sizes
    pub min_size: usize,
    /// Default upper bound for collection sizes
    pub max_size: usize,
    /// Maximum nesting depth for recursive generators
    pub max_depth: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            min_size: 0,
            max_size: 10,
            max_depth: 5,
        }
    }
}

impl GeneratorConfig {
    /// Create a new generator configuration with validation
    pub fn new(min_size: usize, max_size: usize, max_depth: usize) -> Result<Self, ConfigError> {
        let config = Self {
            min_size,
            max_size,
            max_depth,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the generator configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::InvalidMaxDepth(self.max_depth));
        }
        if self.min_size > self.max_size {
            return Err(ConfigError::InvalidSizeRange {
                min: self.min_size,
                max: self.max_size,
            });
        }
        Ok(())
    }
}

/// Configuration for a single property run
#[derive(Debug, Clone, PartialEq)]
pub struct TestConfig {
    /// Number of random trials to run
    pub num_runs: usize,
    /// Seed for the root random source; drawn from entropy when absent
    pub seed: Option<u64>,
    /// Maximum number of shrink candidates evaluated per failure
    pub max_shrink_steps: usize,
    /// Wall-clock budget for one shrink search
    pub shrink_timeout: Duration,
    /// Generation parameters handed to every generator
    pub generator_config: GeneratorConfig,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            num_runs: 100,
            seed: None,
            max_shrink_steps: 1000,
            shrink_timeout: Duration::from_secs(10),
            generator_config: GeneratorConfig::default(),
        }
    }
}

impl TestConfig {
    /// Create a new test configuration with validation
    pub fn new(
        num_runs: usize,
        seed: Option<u64>,
        max_shrink_steps: usize,
        shrink_timeout: Duration,
        generator_config: GeneratorConfig,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            num_runs,
            seed,
            max_shrink_steps,
            shrink_timeout,
            generator_config,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the test configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_runs == 0 {
            return Err(ConfigError::InvalidRuns(self.num_runs));
        }
        if self.max_shrink_steps == 0 {
            return Err(ConfigError::InvalidShrinkSteps(self.max_shrink_steps));
        }
        if self.shrink_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }
        self.generator_config.validate()?;
        Ok(())
    }

    /// Same configuration with a fixed seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_config_validation() {
        assert!(GeneratorConfig::new(0, 10, 5).is_ok());
        assert_eq!(
            GeneratorConfig::new(0, 10, 0),
            Err(ConfigError::InvalidMaxDepth(0))
        );
        assert_eq!(
            GeneratorConfig::new(4, 2, 5),
            Err(ConfigError::InvalidSizeRange { min: 4, max: 2 })
        );
    }

    #[test]
    fn test_test_config_validation() {
        let ok = TestConfig::new(
            10,
            Some(1),
            100,
            Duration::from_secs(1),
            GeneratorConfig::default(),
        );
        assert!(ok.is_ok());

        let zero_runs = TestConfig::new(
            0,
            None,
            100,
            Duration::from_secs(1),
            GeneratorConfig::default(),
        );
        assert_eq!(zero_runs, Err(ConfigError::InvalidRuns(0)));

        let zero_shrinks = TestConfig {
            max_shrink_steps: 0,
            ..TestConfig::default()
        };
        assert_eq!(
            zero_shrinks.validate(),
            Err(ConfigError::InvalidShrinkSteps(0))
        );

        let zero_timeout = TestConfig {
            shrink_timeout: Duration::ZERO,
            ..TestConfig::default()
        };
        assert_eq!(zero_timeout.validate(), Err(ConfigError::InvalidTimeout));
    }

    #[test]
    fn test_config_error_display() {
        let error = ConfigError::InvalidRuns(0);
        assert_eq!(error.to_string(), "Invalid run count: 0 (must be > 0)");
        assert_eq!(error.field(), "num_runs");
    }
}
