//! Configuration loaded from environment variables.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::{env, str::FromStr};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Points granted to newly registered users
    pub default_user_points: Decimal,
    /// Points charged for each API request
    pub request_charge: Decimal,
    /// Points charged for each hotel API request
    pub hotel_request_charge: Decimal,
    /// `tracing` filter directive, e.g. `info` or `tour_booking_ledger=debug`
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_user_points: dec!(100),
            request_charge: dec!(1),
            hotel_request_charge: dec!(5),
            log_filter: "info".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
    #[error("failed to load .env file: {0}")]
    EnvFile(#[from] dotenvy::Error),
}

impl Config {
    /// Load configuration from the environment
    ///
    /// A `.env` file in the working directory is read first if present. Unset variables keep
    /// their default value.
    pub fn from_env() -> Result<Self, ConfigError> {
        env_file_loaded(dotenvy::dotenv())?;
        Self::from_lookup(|var| env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            default_user_points: decimal_var(
                &lookup,
                "DEFAULT_USER_POINTS",
                defaults.default_user_points,
            )?,
            request_charge: decimal_var(
                &lookup,
                "POINT_DEDUCTION_PER_REQUEST",
                defaults.request_charge,
            )?,
            hotel_request_charge: decimal_var(
                &lookup,
                "HOTEL_REQUEST_POINTS",
                defaults.hotel_request_charge,
            )?,
            log_filter: lookup("RUST_LOG")
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or(defaults.log_filter),
        })
    }
}

/// Accept a missing `.env` file, reject an unreadable or malformed one
fn env_file_loaded<T>(res: Result<T, dotenvy::Error>) -> Result<(), ConfigError> {
    match res {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Read a non-negative decimal variable
fn decimal_var(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: Decimal,
) -> Result<Decimal, ConfigError> {
    let Some(value) = lookup(var) else {
        return Ok(default);
    };

    match Decimal::from_str(value.trim()) {
        Ok(amount) if !amount.is_sign_negative() => Ok(amount),
        _ => Err(ConfigError::Invalid { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speculoos::prelude::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let res = Config::from_lookup(lookup(&[]));

        assert_that!(res).is_ok().is_equal_to(Config::default());
    }

    #[test]
    fn test_overrides() {
        let res = Config::from_lookup(lookup(&[
            ("DEFAULT_USER_POINTS", "500.00"),
            ("POINT_DEDUCTION_PER_REQUEST", " 2.5 "),
            ("RUST_LOG", "debug"),
        ]));

        assert_that!(res).is_ok().matches(|config| {
            config.default_user_points == dec!(500.00)
                && config.request_charge == dec!(2.5)
                && config.hotel_request_charge == dec!(5)
                && config.log_filter == "debug"
        });
    }

    #[test]
    fn test_invalid() {
        let res = Config::from_lookup(lookup(&[("HOTEL_REQUEST_POINTS", "-5")]));

        assert_that!(res).is_err().matches(|err| {
            matches!(
                err,
                ConfigError::Invalid { var: "HOTEL_REQUEST_POINTS", value } if value == "-5"
            )
        });
    }

    #[test]
    fn test_missing_env_file() {
        let path = env::temp_dir().join(format!("{}.env", uuid::Uuid::new_v4()));

        let res = env_file_loaded(dotenvy::from_path(&path));

        assert_that!(res).is_ok();
    }

    #[test]
    fn test_malformed_env_file() -> Result<(), std::io::Error> {
        // GIVEN a .env file with an unterminated quote
        let path = env::temp_dir().join(format!("{}.env", uuid::Uuid::new_v4()));
        std::fs::write(&path, "TOUR_BOOKING_LEDGER_BROKEN='unterminated\n")?;

        // WHEN loading it
        let res = env_file_loaded(dotenvy::from_path(&path));
        std::fs::remove_file(&path)?;

        // THEN the error is reported
        assert_that!(res)
            .is_err()
            .matches(|err| matches!(err, ConfigError::EnvFile(_)));

        Ok(())
    }
}
