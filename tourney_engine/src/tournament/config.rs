//! Engine configuration.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Default number of groups in a group stage
pub const DEFAULT_GROUP_COUNT: usize = 4;

/// Default number of teams advancing from each group
pub const DEFAULT_QUALIFIERS_PER_GROUP: usize = 2;

/// Tunables for schedule generation and progression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Groups formed for group-stage tournaments
    pub group_count: usize,

    /// Teams advancing from each group into the playoffs
    pub qualifiers_per_group: usize,

    /// Seed for entrant shuffles; `None` draws from OS entropy
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            group_count: DEFAULT_GROUP_COUNT,
            qualifiers_per_group: DEFAULT_QUALIFIERS_PER_GROUP,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `BRACKET_GROUP_COUNT`: groups in a group stage (default: 4)
    /// - `BRACKET_QUALIFIERS_PER_GROUP`: teams advancing per group (default: 2)
    /// - `BRACKET_SEED`: shuffle seed (default: unset, random)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a variable is set but unparsable or
    /// out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            group_count: parse_env_or("BRACKET_GROUP_COUNT", DEFAULT_GROUP_COUNT)?,
            qualifiers_per_group: parse_env_or(
                "BRACKET_QUALIFIERS_PER_GROUP",
                DEFAULT_QUALIFIERS_PER_GROUP,
            )?,
            seed: match std::env::var("BRACKET_SEED") {
                Ok(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid {
                    var: "BRACKET_SEED".to_string(),
                    reason: format!("'{raw}' is not an unsigned integer"),
                })?),
                Err(_) => None,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Use a fixed shuffle seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.group_count == 0 {
            return Err(ConfigError::Invalid {
                var: "BRACKET_GROUP_COUNT".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        if self.qualifiers_per_group == 0 {
            return Err(ConfigError::Invalid {
                var: "BRACKET_QUALIFIERS_PER_GROUP".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// Random source for shuffles
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parse an environment variable, falling back to `default` when unset
pub fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("'{raw}' could not be parsed"),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use serial_test::serial;

    const VARS: [&str; 3] = [
        "BRACKET_GROUP_COUNT",
        "BRACKET_QUALIFIERS_PER_GROUP",
        "BRACKET_SEED",
    ];

    fn clear_env() {
        for var in VARS {
            // SAFETY: tests touching the environment are serialized.
            unsafe { std::env::remove_var(var) };
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        let config = EngineConfig::from_env().unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        // SAFETY: serialized with the other environment tests.
        unsafe {
            std::env::set_var("BRACKET_GROUP_COUNT", "2");
            std::env::set_var("BRACKET_QUALIFIERS_PER_GROUP", "1");
            std::env::set_var("BRACKET_SEED", "99");
        }

        let config = EngineConfig::from_env().unwrap();
        assert_eq!(config.group_count, 2);
        assert_eq!(config.qualifiers_per_group, 1);
        assert_eq!(config.seed, Some(99));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_garbage() {
        clear_env();
        // SAFETY: serialized with the other environment tests.
        unsafe { std::env::set_var("BRACKET_SEED", "lots") };
        let err = EngineConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("BRACKET_SEED"));

        clear_env();
        // SAFETY: serialized with the other environment tests.
        unsafe { std::env::set_var("BRACKET_GROUP_COUNT", "0") };
        assert!(EngineConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let config = EngineConfig::default().with_seed(7);
        let a: u64 = config.rng().random();
        let b: u64 = config.rng().random();
        assert_eq!(a, b);
    }
}
