//! Policy constants for the bridge.
//!
//! Defaults mirror the current product policy; every value can be
//! overridden from a JSON file (`VITALPERKS_CONFIG`) and then from
//! individual `VITALPERKS_*` environment variables.

use std::path::Path;

use chrono::Duration;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::{Error, Money};

pub const ENV_PREFIX: &str = "VITALPERKS_";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub individual_credit_limit: Money,
    pub employer_credit_limit: Money,
    /// Reward points per currency unit, floored per debit.
    pub points_per_unit: Decimal,
    pub welcome_bonus_points: u64,
    pub dedup_window_secs: i64,
    pub idempotency_ttl_secs: i64,
    pub max_cas_retries: u32,
    pub history_cap: Option<usize>,
    pub min_scan_confidence: f64,
    pub enforce_routing_number: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            individual_credit_limit: Money(5_000 * Money::SCALE),
            employer_credit_limit: Money(250_000 * Money::SCALE),
            points_per_unit: Decimal::ONE,
            welcome_bonus_points: 500,
            dedup_window_secs: 60,
            idempotency_ttl_secs: 24 * 60 * 60,
            max_cas_retries: 8,
            history_cap: None,
            min_scan_confidence: 0.5,
            enforce_routing_number: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key/value source, e.g. a map in tests.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        let mut config = match var("CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Some(v) = var("INDIVIDUAL_CREDIT_LIMIT") {
            config.individual_credit_limit = parse_money("INDIVIDUAL_CREDIT_LIMIT", &v)?;
        }
        if let Some(v) = var("EMPLOYER_CREDIT_LIMIT") {
            config.employer_credit_limit = parse_money("EMPLOYER_CREDIT_LIMIT", &v)?;
        }
        if let Some(v) = var("POINTS_PER_UNIT") {
            config.points_per_unit = parse("POINTS_PER_UNIT", &v)?;
        }
        if let Some(v) = var("WELCOME_BONUS_POINTS") {
            config.welcome_bonus_points = parse("WELCOME_BONUS_POINTS", &v)?;
        }
        if let Some(v) = var("DEDUP_WINDOW_SECS") {
            config.dedup_window_secs = parse("DEDUP_WINDOW_SECS", &v)?;
        }
        if let Some(v) = var("IDEMPOTENCY_TTL_SECS") {
            config.idempotency_ttl_secs = parse("IDEMPOTENCY_TTL_SECS", &v)?;
        }
        if let Some(v) = var("MAX_CAS_RETRIES") {
            config.max_cas_retries = parse("MAX_CAS_RETRIES", &v)?;
        }
        if let Some(v) = var("HISTORY_CAP") {
            config.history_cap = Some(parse("HISTORY_CAP", &v)?);
        }
        if let Some(v) = var("MIN_SCAN_CONFIDENCE") {
            config.min_scan_confidence = parse("MIN_SCAN_CONFIDENCE", &v)?;
        }
        if let Some(v) = var("ENFORCE_ROUTING_NUMBER") {
            config.enforce_routing_number = parse("ENFORCE_ROUTING_NUMBER", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.individual_credit_limit < Money::ZERO || self.employer_credit_limit < Money::ZERO {
            return Err(Error::Config("credit limits must not be negative".to_string()));
        }
        if self.points_per_unit.is_sign_negative() {
            return Err(Error::Config("points_per_unit must not be negative".to_string()));
        }
        if self.dedup_window_secs < 0 || self.idempotency_ttl_secs < 0 {
            return Err(Error::Config("time windows must not be negative".to_string()));
        }
        if Duration::try_seconds(self.dedup_window_secs).is_none()
            || Duration::try_seconds(self.idempotency_ttl_secs).is_none()
        {
            return Err(Error::Config("time windows out of range".to_string()));
        }
        if self.history_cap == Some(0) {
            return Err(Error::Config("history_cap must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.min_scan_confidence) {
            return Err(Error::Config(
                "min_scan_confidence must be within [0, 1]".to_string(),
            ));
        }
        Ok(())
    }

    /// Saturates for configs that skipped `validate`.
    pub fn dedup_window(&self) -> Duration {
        Duration::try_seconds(self.dedup_window_secs).unwrap_or(Duration::MAX)
    }

    pub fn idempotency_ttl(&self) -> Duration {
        Duration::try_seconds(self.idempotency_ttl_secs).unwrap_or(Duration::MAX)
    }
}

fn parse<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, Error>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("{}{}={:?}: {}", ENV_PREFIX, name, value, e)))
}

fn parse_money(name: &str, value: &str) -> Result<Money, Error> {
    Money::from_decimal_str(value)
        .ok_or_else(|| Error::Config(format!("{}{}={:?}: not an amount", ENV_PREFIX, name, value)))
}
