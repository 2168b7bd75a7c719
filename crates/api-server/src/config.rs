use std::env;

use anyhow::{Context, Result};

pub const DEFAULT_TRENDING: &[&str] = &["AAPL", "GOOGL", "MSFT", "TSLA", "AMZN", "NVDA"];

/// Server configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_name: String,
    pub groq_api_key: String,
    pub llm_base_url: String,
    pub llm_model: String,
    pub polygon_api_key: String,
    pub host: String,
    pub port: u16,
    pub trending_symbols: Vec<String>,
    pub blocking_threads: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            get(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{} must be set", key))
        };
        let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let config = Self {
            database_url: required("DATABASE_URL")?,
            db_name: required("DB_NAME")?,
            groq_api_key: required("GROQ_API_KEY")?,
            llm_base_url: or_default("LLM_BASE_URL", llm_client::DEFAULT_BASE_URL),
            llm_model: or_default("LLM_MODEL", llm_client::DEFAULT_MODEL),
            polygon_api_key: or_default("POLYGON_API_KEY", polygon_client::DEMO_API_KEY),
            host: or_default("HOST", "0.0.0.0"),
            port: or_default("PORT", "8001")
                .parse()
                .context("PORT must be a valid port number")?,
            trending_symbols: get("TRENDING_SYMBOLS")
                .map(|raw| parse_symbols(&raw))
                .filter(|symbols| !symbols.is_empty())
                .unwrap_or_else(|| DEFAULT_TRENDING.iter().map(|s| s.to_string()).collect()),
            blocking_threads: or_default("BLOCKING_THREADS", "4")
                .parse()
                .context("BLOCKING_THREADS must be a positive integer")?,
        };

        if config.blocking_threads == 0 {
            anyhow::bail!("BLOCKING_THREADS must be a positive integer");
        }
        if config.polygon_api_key == polygon_client::DEMO_API_KEY {
            tracing::warn!("POLYGON_API_KEY not set, using the rate-limited demo key");
        }

        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `"aapl, msft,,TSLA"` -> `["AAPL", "MSFT", "TSLA"]`
pub fn parse_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
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

    const REQUIRED: &[(&str, &str)] = &[
        ("DATABASE_URL", "sqlite://data"),
        ("DB_NAME", "stock_agent.db"),
        ("GROQ_API_KEY", "gsk_test"),
    ];

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(REQUIRED)).unwrap();
        assert_eq!(config.port, 8001);
        assert_eq!(config.bind_addr(), "0.0.0.0:8001");
        assert_eq!(config.polygon_api_key, "demo");
        assert_eq!(config.llm_model, llm_client::DEFAULT_MODEL);
        assert_eq!(config.trending_symbols.len(), 6);
        assert_eq!(config.trending_symbols[0], "AAPL");
        assert_eq!(config.blocking_threads, 4);
    }

    #[test]
    fn test_missing_required_variable() {
        let err = AppConfig::from_lookup(lookup(&REQUIRED[..2])).unwrap_err();
        assert!(err.to_string().contains("GROQ_API_KEY"));
    }

    #[test]
    fn test_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend_from_slice(&[
            ("PORT", "9000"),
            ("TRENDING_SYMBOLS", "amd, intc"),
            ("BLOCKING_THREADS", "8"),
        ]);
        let config = AppConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.trending_symbols, vec!["AMD", "INTC"]);
        assert_eq!(config.blocking_threads, 8);
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "eighty"));
        assert!(AppConfig::from_lookup(lookup(&pairs)).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("BLOCKING_THREADS", "0"));
        assert!(AppConfig::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn test_parse_symbols() {
        assert_eq!(parse_symbols("aapl, msft,,TSLA"), vec!["AAPL", "MSFT", "TSLA"]);
        assert!(parse_symbols(" , ").is_empty());
    }
}
