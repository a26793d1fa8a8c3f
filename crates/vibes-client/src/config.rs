use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

use vibes_types::models::ReachSample;

/// 10 MB ceiling per uploaded file
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Runtime settings for the client core. Read from `VIBES_*` environment
/// variables, falling back to development defaults.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub db_path: PathBuf,
    pub storage_dir: PathBuf,
    /// Prefix for public object URLs, e.g. `https://cdn.example.com/storage`.
    pub public_url: String,
    pub payments_url: String,
    pub currency: String,
    /// Campaign list and friend-request refresh interval.
    pub poll_interval: Duration,
    pub autosave_interval: Duration,
    pub max_upload_bytes: u64,
    /// Audience curve used for reach estimates, ascending by distance.
    pub reach_samples: Vec<ReachSample>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("vibes.db"),
            storage_dir: PathBuf::from("./storage"),
            public_url: "http://localhost:3000/storage".into(),
            payments_url: "http://localhost:3100".into(),
            currency: "INR".into(),
            poll_interval: Duration::from_secs(30),
            autosave_interval: Duration::from_secs(30),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            reach_samples: default_reach_samples(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let db_path = var("VIBES_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);
        let storage_dir = var("VIBES_STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.storage_dir);
        let public_url = var("VIBES_PUBLIC_URL").unwrap_or(defaults.public_url);
        let payments_url = var("VIBES_PAYMENTS_URL").unwrap_or(defaults.payments_url);
        let currency = var("VIBES_CURRENCY").unwrap_or(defaults.currency);
        let poll_interval = interval_from(&var, "VIBES_POLL_SECS", defaults.poll_interval)?;
        let autosave_interval =
            interval_from(&var, "VIBES_AUTOSAVE_SECS", defaults.autosave_interval)?;
        let max_upload_bytes = match var("VIBES_MAX_UPLOAD_BYTES") {
            Some(v) => v.parse()?,
            None => defaults.max_upload_bytes,
        };

        Ok(Self {
            db_path,
            storage_dir,
            public_url: public_url.trim_end_matches('/').to_string(),
            payments_url: payments_url.trim_end_matches('/').to_string(),
            currency,
            poll_interval,
            autosave_interval,
            max_upload_bytes,
            reach_samples: defaults.reach_samples,
        })
    }
}

/// Whole seconds, at least one. Tokio intervals panic on a zero period.
fn interval_from(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> anyhow::Result<Duration> {
    let Some(raw) = var(key) else {
        return Ok(default);
    };
    let secs: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{} must be a whole number of seconds", key))?;
    if secs == 0 {
        bail!("{} must be at least 1 second", key);
    }
    Ok(Duration::from_secs(secs))
}

pub fn default_reach_samples() -> Vec<ReachSample> {
    [(5, 100), (25, 400), (50, 900), (100, 1500)]
        .into_iter()
        .map(|(distance_km, user_count)| ReachSample {
            distance_km,
            user_count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.autosave_interval, Duration::from_secs(30));
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn reads_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("VIBES_POLL_SECS", "5"),
            ("VIBES_AUTOSAVE_SECS", " 12 "),
            ("VIBES_PUBLIC_URL", "https://cdn.test/storage/"),
        ]))
        .unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.autosave_interval, Duration::from_secs(12));
        assert_eq!(config.public_url, "https://cdn.test/storage");
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[("VIBES_POLL_SECS", "0")])).unwrap_err();
        assert!(err.to_string().contains("VIBES_POLL_SECS"));

        let err = ClientConfig::from_lookup(lookup(&[("VIBES_AUTOSAVE_SECS", "0")])).unwrap_err();
        assert!(err.to_string().contains("VIBES_AUTOSAVE_SECS"));

        assert!(ClientConfig::from_lookup(lookup(&[("VIBES_POLL_SECS", "soon")])).is_err());
    }
}
