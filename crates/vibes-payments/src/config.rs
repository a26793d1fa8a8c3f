use anyhow::{Result, bail};

/// Secrets that ship in sample env files and must never reach production.
pub const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me",
    "change-me-to-a-random-string",
    "rzp_test_placeholder",
    "your_key_secret",
];

pub const DEFAULT_CURRENCY: &str = "INR";

#[derive(Debug, Clone)]
pub struct PaymentsConfig {
    pub host: String,
    pub port: u16,
    pub key_id: String,
    pub key_secret: String,
    /// Base URL of the provider's REST API.
    pub api_url: String,
}

impl PaymentsConfig {
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("VIBES_PAYMENTS_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("VIBES_PAYMENTS_PORT")
            .unwrap_or_else(|_| "3100".into())
            .parse()?;
        let key_id = std::env::var("VIBES_PAYMENTS_KEY_ID").unwrap_or_default();
        let key_secret = std::env::var("VIBES_PAYMENTS_KEY_SECRET").unwrap_or_default();
        let api_url = std::env::var("VIBES_PAYMENTS_API_URL")
            .unwrap_or_else(|_| "https://api.razorpay.com/v1".into());

        Ok(Self {
            host,
            port,
            key_id,
            key_secret,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Refuse to start with missing or sample credentials.
    pub fn check_credentials(&self) -> Result<()> {
        if self.key_id.is_empty() {
            bail!("VIBES_PAYMENTS_KEY_ID is unset");
        }
        if self.key_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&self.key_secret.as_str()) {
            bail!("VIBES_PAYMENTS_KEY_SECRET is unset or still a placeholder");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(key_id: &str, key_secret: &str) -> PaymentsConfig {
        PaymentsConfig {
            host: "127.0.0.1".into(),
            port: 3100,
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            api_url: "https://api.razorpay.com/v1".into(),
        }
    }

    #[test]
    fn placeholder_credentials_are_refused() {
        assert!(config("rzp_live_1", "s3cr3t-from-dashboard").check_credentials().is_ok());
        assert!(config("", "s3cr3t").check_credentials().is_err());
        assert!(config("rzp_live_1", "").check_credentials().is_err());
        assert!(config("rzp_live_1", "change-me").check_credentials().is_err());
    }
}
