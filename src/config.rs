//! Environment-driven settings.

use std::env;

use crate::ledger::state::{DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_INSTRUCTORS};
use crate::ledger::{Identity, IdentityParseError, LedgerLimits};
use crate::service::persistence::DEFAULT_SNAPSHOT_KEY;
use crate::service::DEFAULT_FEED_CAPACITY;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("Invalid LEDGER_OWNER: {0}")]
    Owner(#[from] IdentityParseError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSettings {
    pub owner: Identity,
    pub max_batch_size: usize,
    pub max_instructors: usize,
    pub event_feed_capacity: usize,
    pub nats_url: String,
    pub nats_command_subject: String,
    pub nats_event_subject: String,
    pub redis_url: Option<String>,
    pub redis_snapshot_key: String,
    pub jwt_secret: String,
}

impl LedgerSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build settings from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let owner = lookup("LEDGER_OWNER")
            .ok_or(ConfigError::Missing("LEDGER_OWNER"))?
            .parse()?;
        let jwt_secret = lookup("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        Ok(LedgerSettings {
            owner,
            max_batch_size: parse_or(&lookup, "MAX_BATCH_SIZE", DEFAULT_MAX_BATCH_SIZE)?,
            max_instructors: parse_or(&lookup, "MAX_INSTRUCTORS", DEFAULT_MAX_INSTRUCTORS)?,
            event_feed_capacity: parse_or(&lookup, "EVENT_FEED_CAPACITY", DEFAULT_FEED_CAPACITY)?,
            nats_url: lookup("NATS_URL").unwrap_or_else(|| "nats://localhost:4222".to_string()),
            nats_command_subject: lookup("NATS_COMMAND_SUBJECT")
                .unwrap_or_else(|| "attendance.commands".to_string()),
            nats_event_subject: lookup("NATS_EVENT_SUBJECT")
                .unwrap_or_else(|| "attendance.events".to_string()),
            redis_url: lookup("REDIS_URL").filter(|url| !url.is_empty()),
            redis_snapshot_key: lookup("REDIS_SNAPSHOT_KEY")
                .unwrap_or_else(|| DEFAULT_SNAPSHOT_KEY.to_string()),
            jwt_secret,
        })
    }

    pub fn limits(&self) -> LedgerLimits {
        LedgerLimits {
            max_batch_size: self.max_batch_size,
            max_instructors: self.max_instructors,
        }
    }
}

fn parse_or<F>(lookup: &F, name: &'static str, default: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(0) => Err(ConfigError::Invalid {
                name,
                reason: "must be greater than zero".to_string(),
            }),
            Ok(value) => Ok(value),
            Err(e) => Err(ConfigError::Invalid {
                name,
                reason: e.to_string(),
            }),
        },
    }
}
