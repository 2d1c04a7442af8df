use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use log::info;
use thiserror::Error;

use crate::db::is_valid_table_name;

// Discord allows 25 components per message, keep room for the refresh row
pub const OPTION_LIMIT: usize = 20;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Expected {0} in the environment")]
    Missing(&'static str),

    #[error("Invalid {key} value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub database_url: String,
    pub polls_table: String,
    pub votes_table: String,
    pub db_max_connections: u32,
    pub store_timeout: Duration,
    pub max_poll_options: usize,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let discord_token = lookup("DISCORD_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;

        let polls_table = table_name(&lookup, "POLLS_TABLE", "polls")?;
        let votes_table = table_name(&lookup, "VOTES_TABLE", "votes")?;
        if polls_table == votes_table {
            return Err(ConfigError::Invalid {
                key: "VOTES_TABLE",
                value: votes_table,
                reason: "must differ from POLLS_TABLE".to_string(),
            });
        }

        let db_max_connections: u32 = parse_or(&lookup, "DB_MAX_CONNECTIONS", "5")?;
        if db_max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "DB_MAX_CONNECTIONS",
                value: "0".to_string(),
                reason: "at least one connection is required".to_string(),
            });
        }

        let timeout_secs: u64 = parse_or(&lookup, "STORE_TIMEOUT_SECS", "5")?;
        let max_poll_options: usize = parse_or(&lookup, "MAX_POLL_OPTIONS", "6")?;
        if !(2..=OPTION_LIMIT).contains(&max_poll_options) {
            return Err(ConfigError::Invalid {
                key: "MAX_POLL_OPTIONS",
                value: max_poll_options.to_string(),
                reason: format!("must be between 2 and {OPTION_LIMIT}"),
            });
        }

        Ok(Self {
            discord_token,
            database_url: string_or(&lookup, "DATABASE_URL", "sqlite:trusty_poll.db"),
            polls_table,
            votes_table,
            db_max_connections,
            store_timeout: Duration::from_secs(timeout_secs.max(1)),
            max_poll_options,
        })
    }
}

fn string_or<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = string_or(lookup, key, default);
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: e.to_string(),
    })
}

fn table_name<F>(lookup: &F, key: &'static str, default: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let name = string_or(lookup, key, default);
    if !is_valid_table_name(&name) {
        return Err(ConfigError::Invalid {
            key,
            value: name,
            reason: "not a plain SQL identifier".to_string(),
        });
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_token_is_set() {
        let config = load(&[("DISCORD_TOKEN", "abc")]).unwrap();

        assert_eq!(config.database_url, "sqlite:trusty_poll.db");
        assert_eq!(config.polls_table, "polls");
        assert_eq!(config.votes_table, "votes");
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.store_timeout, Duration::from_secs(5));
        assert_eq!(config.max_poll_options, 6);
    }

    #[test]
    fn token_is_required() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("DISCORD_TOKEN"))));
        assert!(matches!(
            load(&[("DISCORD_TOKEN", "  ")]),
            Err(ConfigError::Missing(_))
        ));
    }

    #[test]
    fn overrides_are_read() {
        let config = load(&[
            ("DISCORD_TOKEN", "abc"),
            ("DATABASE_URL", "sqlite:other.db"),
            ("POLLS_TABLE", "PollsTable"),
            ("VOTES_TABLE", "VotesTable"),
            ("STORE_TIMEOUT_SECS", "12"),
            ("MAX_POLL_OPTIONS", "10"),
        ])
        .unwrap();

        assert_eq!(config.database_url, "sqlite:other.db");
        assert_eq!(config.polls_table, "PollsTable");
        assert_eq!(config.votes_table, "VotesTable");
        assert_eq!(config.store_timeout, Duration::from_secs(12));
        assert_eq!(config.max_poll_options, 10);
    }

    #[test]
    fn bad_values_are_rejected() {
        let cases = [
            ("POLLS_TABLE", "polls;--"),
            ("DB_MAX_CONNECTIONS", "0"),
            ("STORE_TIMEOUT_SECS", "soon"),
            ("MAX_POLL_OPTIONS", "1"),
            ("MAX_POLL_OPTIONS", "50"),
            ("VOTES_TABLE", "polls"),
        ];

        for (key, value) in cases {
            let result = load(&[("DISCORD_TOKEN", "abc"), (key, value)]);
            assert!(
                matches!(result, Err(ConfigError::Invalid { .. })),
                "{key}={value} should be rejected"
            );
        }
    }
}
