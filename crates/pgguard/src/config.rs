//! Guard configuration.
//!
//! A [`GuardConfig`] is fixed when a [`Db`](crate::Db) is constructed and shared
//! read-only with the validator and plan auditor.

use crate::error::{Fatal, GuardResult};
use std::fmt;
use std::str::FromStr;

/// Environment variable selecting the [`Mode`].
pub const MODE_ENV: &str = "PGGUARD_MODE";

/// Environment variable enabling SQL debug logging.
pub const LOG_SQL_ENV: &str = "PGGUARD_LOG_SQL";

/// Process mode.
///
/// `Debug` audits query plans and permits test-only destructive helpers;
/// `Production` skips plan auditing and refuses those helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Debug,
    Production,
}

impl Mode {
    pub fn is_debug(self) -> bool {
        self == Self::Debug
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Fatal;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "production" => Ok(Self::Production),
            _ => Err(Fatal::InvalidMode(s.to_string())),
        }
    }
}

/// Configuration for guarded execution.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Process mode.
    pub mode: Mode,
    /// Require ` WHERE ` on SELECT, DELETE and UPDATE statements.
    pub where_check: bool,
    /// Audit query plans for sequential scans (debug mode only).
    pub seq_scan_check: bool,
    /// Require `NOWAIT` on `FOR UPDATE` / `FOR SELECT` locking reads.
    pub nowait_check: bool,
    /// Require UPDATE statements to touch `updated_at`.
    pub updated_at_check: bool,
    /// Emit every guarded statement at debug level under `pgguard.sql`.
    pub log_sql: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Debug,
            where_check: true,
            seq_scan_check: true,
            nowait_check: true,
            updated_at_check: true,
            log_sql: false,
        }
    }
}

impl GuardConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from `PGGUARD_MODE` and `PGGUARD_LOG_SQL`.
    ///
    /// An unset mode means [`Mode::Debug`]; an unrecognized one is
    /// [`Fatal::InvalidMode`].
    pub fn from_env() -> GuardResult<Self> {
        let mut config = Self::default();
        if let Ok(mode) = std::env::var(MODE_ENV) {
            config.mode = mode.parse()?;
        }
        if let Ok(flag) = std::env::var(LOG_SQL_ENV) {
            config.log_sql = matches!(flag.trim(), "1" | "true" | "TRUE" | "yes");
        }
        Ok(config)
    }

    /// Set the process mode.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Shorthand for `mode(Mode::Production)`.
    pub fn production(self) -> Self {
        self.mode(Mode::Production)
    }

    /// Disable the mandatory WHERE check.
    pub fn no_where_check(mut self) -> Self {
        self.where_check = false;
        self
    }

    /// Disable sequential-scan auditing.
    pub fn no_seq_scan_check(mut self) -> Self {
        self.seq_scan_check = false;
        self
    }

    /// Disable the NOWAIT requirement on locking reads.
    pub fn no_nowait_check(mut self) -> Self {
        self.nowait_check = false;
        self
    }

    /// Disable the `updated_at` requirement on UPDATE.
    pub fn no_updated_at_check(mut self) -> Self {
        self.updated_at_check = false;
        self
    }

    /// Log every guarded statement.
    pub fn with_sql_logging(mut self) -> Self {
        self.log_sql = true;
        self
    }

    pub fn is_debug(&self) -> bool {
        self.mode.is_debug()
    }
}
