//! Simulator configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use std::str::FromStr;
use tourney_engine::db::DatabaseConfig;
use tourney_engine::tournament::config::parse_env_or;
use tourney_engine::tournament::{EngineConfig, TournamentFormat};

/// Default number of simulated teams
pub const DEFAULT_TEAMS: usize = 8;

/// Default highest score a simulated team can reach
pub const DEFAULT_MAX_SCORE: i32 = 16;

/// Complete simulator configuration
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Tournament format to simulate
    pub format: TournamentFormat,
    /// Number of teams registered
    pub teams: usize,
    /// Highest score a team can reach in a match
    pub max_score: i32,
    /// Engine tunables (groups, qualifiers, shuffle seed)
    pub engine: EngineConfig,
    /// PostgreSQL configuration; `None` keeps everything in memory
    pub database: Option<DatabaseConfig>,
    /// Print the outcome as JSON
    pub json: bool,
}

/// Values given on the command line, overriding the environment
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub format: Option<String>,
    pub teams: Option<usize>,
    pub max_score: Option<i32>,
    pub seed: Option<u64>,
    pub groups: Option<usize>,
    pub qualifiers: Option<usize>,
    pub database_url: Option<String>,
    pub json: bool,
}

impl SimConfig {
    /// Load configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - `SIM_FORMAT`: tournament format (default: single-elimination)
    /// - `SIM_TEAMS`: number of teams (default: 8)
    /// - `SIM_MAX_SCORE`: highest match score (default: 16)
    /// - `BRACKET_GROUP_COUNT`, `BRACKET_QUALIFIERS_PER_GROUP`, `BRACKET_SEED`
    /// - `DATABASE_URL` and `DB_*` pool settings; without `DATABASE_URL`
    ///   the simulation runs in memory
    ///
    /// # Errors
    ///
    /// Returns error if a variable or override is invalid
    pub fn from_env(overrides: Overrides) -> Result<Self, ConfigError> {
        let format_text = overrides
            .format
            .or_else(|| std::env::var("SIM_FORMAT").ok())
            .unwrap_or_else(|| "single-elimination".to_string());
        let format = parse_format(&format_text)?;

        let teams = match overrides.teams {
            Some(teams) => teams,
            None => parse_env_or("SIM_TEAMS", DEFAULT_TEAMS)?,
        };
        let max_score = match overrides.max_score {
            Some(score) => score,
            None => parse_env_or("SIM_MAX_SCORE", DEFAULT_MAX_SCORE)?,
        };

        let mut engine = EngineConfig::from_env()?;
        if let Some(seed) = overrides.seed {
            engine = engine.with_seed(seed);
        }
        if let Some(groups) = overrides.groups {
            engine.group_count = groups;
        }
        if let Some(qualifiers) = overrides.qualifiers {
            engine.qualifiers_per_group = qualifiers;
        }

        let database = match overrides.database_url {
            Some(database_url) => Some(DatabaseConfig {
                database_url,
                ..DatabaseConfig::from_env().unwrap_or_default()
            }),
            None => match DatabaseConfig::from_env() {
                Ok(config) => Some(config),
                Err(tourney_engine::tournament::ConfigError::MissingRequired(_)) => None,
                Err(err) => return Err(err.into()),
            },
        };

        let config = SimConfig {
            format,
            teams,
            max_score,
            engine,
            database,
            json: overrides.json,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.teams < 2 {
            return Err(ConfigError::Invalid {
                var: "SIM_TEAMS".to_string(),
                reason: "Must be at least 2".to_string(),
            });
        }

        if self.max_score < 1 {
            return Err(ConfigError::Invalid {
                var: "SIM_MAX_SCORE".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        self.engine.validate()?;
        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },

    #[error(transparent)]
    Engine(#[from] tourney_engine::tournament::ConfigError),
}

/// Parse a format name such as `round-robin`, `SWISS` or `groups`
pub fn parse_format(text: &str) -> Result<TournamentFormat, ConfigError> {
    let normalized = text.trim().to_ascii_uppercase().replace(['-', ' '], "_");
    let format = match normalized.as_str() {
        "SINGLE" | "SE" => TournamentFormat::SingleElimination,
        "DOUBLE" | "DE" => TournamentFormat::DoubleElimination,
        "RR" => TournamentFormat::RoundRobin,
        "GROUPS" | "GROUP_STAGE" => TournamentFormat::GroupStageElimination,
        other => TournamentFormat::from_str(other).map_err(|_| ConfigError::Invalid {
            var: "SIM_FORMAT".to_string(),
            reason: format!("Unknown tournament format '{text}'"),
        })?,
    };
    Ok(format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 7] = [
        "SIM_FORMAT",
        "SIM_TEAMS",
        "SIM_MAX_SCORE",
        "BRACKET_GROUP_COUNT",
        "BRACKET_QUALIFIERS_PER_GROUP",
        "BRACKET_SEED",
        "DATABASE_URL",
    ];

    fn clear_env() {
        for var in VARS {
            // SAFETY: tests touching the environment are serialized.
            unsafe { std::env::remove_var(var) };
        }
    }

    #[test]
    fn test_parse_format_aliases() {
        assert_eq!(
            parse_format("single-elimination").unwrap(),
            TournamentFormat::SingleElimination
        );
        assert_eq!(parse_format("rr").unwrap(), TournamentFormat::RoundRobin);
        assert_eq!(parse_format("Swiss").unwrap(), TournamentFormat::Swiss);
        assert_eq!(
            parse_format("group stage elimination").unwrap(),
            TournamentFormat::GroupStageElimination
        );
        assert_eq!(parse_format("DE").unwrap(), TournamentFormat::DoubleElimination);
        assert!(matches!(
            parse_format("ladder"),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    #[serial]
    fn test_defaults_run_in_memory() {
        clear_env();
        let config = SimConfig::from_env(Overrides::default()).unwrap();
        assert_eq!(config.format, TournamentFormat::SingleElimination);
        assert_eq!(config.teams, DEFAULT_TEAMS);
        assert_eq!(config.max_score, DEFAULT_MAX_SCORE);
        assert!(config.database.is_none());
        assert!(!config.json);
    }

    #[test]
    #[serial]
    fn test_overrides_win_over_environment() {
        clear_env();
        // SAFETY: serialized with the other environment tests.
        unsafe {
            std::env::set_var("SIM_TEAMS", "4");
            std::env::set_var("BRACKET_SEED", "10");
        }

        let config = SimConfig::from_env(Overrides {
            format: Some("groups".to_string()),
            teams: Some(16),
            seed: Some(99),
            groups: Some(2),
            database_url: Some("postgres://localhost/sim".to_string()),
            ..Overrides::default()
        })
        .unwrap();

        assert_eq!(config.format, TournamentFormat::GroupStageElimination);
        assert_eq!(config.teams, 16);
        assert_eq!(config.engine.seed, Some(99));
        assert_eq!(config.engine.group_count, 2);
        assert_eq!(
            config.database.map(|db| db.database_url),
            Some("postgres://localhost/sim".to_string())
        );
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_values_are_rejected() {
        clear_env();
        // SAFETY: serialized with the other environment tests.
        unsafe { std::env::set_var("SIM_TEAMS", "many") };
        let err = SimConfig::from_env(Overrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Engine(_)));
        assert!(err.to_string().contains("SIM_TEAMS"));
        clear_env();

        let err = SimConfig::from_env(Overrides {
            teams: Some(1),
            ..Overrides::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("SIM_TEAMS"));

        let err = SimConfig::from_env(Overrides {
            qualifiers: Some(0),
            ..Overrides::default()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Engine(_)));
    }
}
