use std::env;
use std::path::PathBuf;
use std::time::Duration;

use log::info;
use thiserror::Error;

/// Lowest cost bcrypt accepts; keeps hashing fast in tests.
pub const TEST_BCRYPT_COST: u32 = 4;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub mongo_uri: String,
    pub database_name: String,
    pub jwt_secret: String,
    pub jwt_expires_in: Duration,
    /// Allowed CORS origin; any origin when unset.
    pub client_origin: Option<String>,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub bcrypt_cost: u32,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));
        let or_default = |key: &str, default: &str| {
            lookup(key).unwrap_or_else(|| {
                info!("{} not set, using default: {}", key, default);
                default.to_string()
            })
        };

        let expires_raw = or_default("JWT_EXPIRES_IN", "7d");
        let jwt_expires_in = parse_duration(&expires_raw).ok_or(ConfigError::Invalid {
            key: "JWT_EXPIRES_IN",
            value: expires_raw.clone(),
        })?;

        Ok(Self {
            mongo_uri: required("MONGO_URI")?,
            database_name: or_default("DATABASE_NAME", "project_tracker"),
            jwt_secret: required("JWT_SECRET")?,
            jwt_expires_in,
            client_origin: lookup("CLIENT_URL").filter(|origin| !origin.trim().is_empty()),
            port: parse_number("PORT", &or_default("PORT", "5003"))?,
            upload_dir: PathBuf::from(or_default("UPLOAD_DIR", "uploads")),
            bcrypt_cost: parse_number("BCRYPT_COST", &or_default("BCRYPT_COST", "10"))?,
            max_upload_bytes: parse_number(
                "MAX_UPLOAD_BYTES",
                &or_default("MAX_UPLOAD_BYTES", "10485760"),
            )?,
        })
    }

    /// Settings for tests and in-memory runs. Uses the lowest bcrypt cost.
    pub fn for_tests(upload_dir: PathBuf) -> Self {
        Self {
            mongo_uri: String::new(),
            database_name: "project_tracker_test".to_string(),
            jwt_secret: "test-secret".to_string(),
            jwt_expires_in: Duration::from_secs(7 * 24 * 3600),
            client_origin: None,
            port: 0,
            upload_dir,
            bcrypt_cost: TEST_BCRYPT_COST,
            max_upload_bytes: 1024 * 1024,
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

/// Parses lifetimes such as `7d`, `12h`, `30m`, `45s` or a bare number of
/// seconds.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (digits, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => raw.split_at(idx),
        None => (raw, "s"),
    };
    let amount: u64 = digits.parse().ok()?;
    let seconds = match unit.trim() {
        "d" => amount.checked_mul(24 * 3600)?,
        "h" => amount.checked_mul(3600)?,
        "m" => amount.checked_mul(60)?,
        "s" => amount,
        _ => return None,
    };
    Some(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("7d"), Some(Duration::from_secs(604_800)));
        assert_eq!(parse_duration("12h"), Some(Duration::from_secs(43_200)));
        assert_eq!(parse_duration("30m"), Some(Duration::from_secs(1_800)));
        assert_eq!(parse_duration("3600"), Some(Duration::from_secs(3_600)));
        assert_eq!(parse_duration("1w"), None);
        assert_eq!(parse_duration("d"), None);
    }

    #[test]
    fn defaults_apply_when_only_required_keys_are_set() {
        let config =
            Config::from_lookup(lookup(&[("MONGO_URI", "mongodb://db"), ("JWT_SECRET", "s")]))
                .unwrap();
        assert_eq!(config.port, 5003);
        assert_eq!(config.database_name, "project_tracker");
        assert_eq!(config.jwt_expires_in, Duration::from_secs(604_800));
        assert_eq!(config.bcrypt_cost, 10);
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert!(config.client_origin.is_none());
    }

    #[test]
    fn missing_secret_is_reported() {
        let err = Config::from_lookup(lookup(&[("MONGO_URI", "mongodb://db")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("JWT_SECRET"));
    }

    #[test]
    fn bad_port_is_reported() {
        let err = Config::from_lookup(lookup(&[
            ("MONGO_URI", "mongodb://db"),
            ("JWT_SECRET", "s"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }
}
