use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub default_currency: String,
    pub cost_debounce_ms: u64,
    pub phone_region: String,
    pub survey_cache_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            api_base_url: std::env::var("SURVEY_API_BASE_URL")
                .map_err(|_| {
                    anyhow::anyhow!("SURVEY_API_BASE_URL environment variable required")
                })
                .and_then(|base| {
                    if base.trim().is_empty() {
                        anyhow::bail!("SURVEY_API_BASE_URL cannot be empty");
                    }
                    // Full parse up front so every client can join paths safely
                    url::Url::parse(&base)
                        .map_err(|e| anyhow::anyhow!("SURVEY_API_BASE_URL is not a valid URL: {}", e))?;
                    if !base.starts_with("http://") && !base.starts_with("https://") {
                        anyhow::bail!("SURVEY_API_BASE_URL must start with http:// or https://");
                    }
                    Ok(base.trim_end_matches('/').to_string())
                })?,
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("REQUEST_TIMEOUT_SECS must be a valid number"))?,
            default_currency: std::env::var("DEFAULT_CURRENCY")
                .unwrap_or_else(|_| "KES".to_string()),
            cost_debounce_ms: std::env::var("COST_DEBOUNCE_MS")
                .unwrap_or_else(|_| "800".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("COST_DEBOUNCE_MS must be a valid number"))?,
            phone_region: std::env::var("PHONE_REGION").unwrap_or_else(|_| "KE".to_string()),
            survey_cache_ttl_secs: std::env::var("SURVEY_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SURVEY_CACHE_TTL_SECS must be a valid number"))?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("API Base URL: {}", config.api_base_url);
        tracing::debug!("Default currency: {}", config.default_currency);
        tracing::debug!("Cost debounce window: {}ms", config.cost_debounce_ms);

        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cost_debounce(&self) -> Duration {
        Duration::from_millis(self.cost_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test owns all env mutation; parallel tests share the process env.
    #[test]
    fn from_env_applies_defaults_and_validates_url() {
        std::env::set_var("SURVEY_API_BASE_URL", "https://api.example.test/v1/");
        std::env::remove_var("REQUEST_TIMEOUT_SECS");
        std::env::remove_var("COST_DEBOUNCE_MS");

        let config = Config::from_env().unwrap();
        assert_eq!(config.api_base_url, "https://api.example.test/v1");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.cost_debounce(), Duration::from_millis(800));
        assert_eq!(config.phone_region, "KE");

        std::env::set_var("SURVEY_API_BASE_URL", "not a url");
        assert!(Config::from_env().is_err());
        std::env::remove_var("SURVEY_API_BASE_URL");
    }
}
