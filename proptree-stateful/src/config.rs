//! Configuration for stateful runs

use std::time::Duration;

use proptree::{ConfigError, GeneratorConfig, PropertyError};

/// Configuration for a stateful run
#[derive(Debug, Clone, PartialEq)]
pub struct StatefulConfig {
    /// Number of independent action sequences to run
    pub num_runs: usize,
    /// Seed for the root random source; drawn from entropy when absent
    pub seed: Option<u64>,
    /// Lower bound on actions per run
    pub min_actions: usize,
    /// Upper bound on actions per run
    pub max_actions: usize,
    /// Maximum number of shrink candidates evaluated per stage
    pub max_shrink_steps: usize,
    /// Wall-clock budget for each shrink stage
    pub shrink_timeout: Duration,
    /// Generation parameters handed to the state and action generators
    pub generator_config: GeneratorConfig,
}

impl Default for StatefulConfig {
    fn default() -> Self {
        Self {
            num_runs: 100,
            seed: None,
            min_actions: 1,
            max_actions: 100,
            max_shrink_steps: 1000,
            shrink_timeout: Duration::from_secs(10),
            generator_config: GeneratorConfig::default(),
        }
    }
}

impl StatefulConfig {
    /// Validate the configuration; zero actions per run is allowed
    pub fn validate(&self) -> Result<(), PropertyError> {
        if self.num_runs == 0 {
            return Err(ConfigError::InvalidRuns(self.num_runs).into());
        }
        if self.min_actions > self.max_actions {
            return Err(PropertyError::configuration_error(
                format!(
                    "min_actions {} exceeds max_actions {}",
                    self.min_actions, self.max_actions
                ),
                Some("min_actions"),
            ));
        }
        if self.max_shrink_steps == 0 {
            return Err(ConfigError::InvalidShrinkSteps(self.max_shrink_steps).into());
        }
        if self.shrink_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout.into());
        }
        self.generator_config.validate()?;
        Ok(())
    }
}
