use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PricingConfig {
    /// Used until an admin stores a global markup of their own
    #[serde(default)]
    pub global_markup_percent: f64,
    #[serde(default = "default_scaling_exponent")]
    pub scaling_exponent: f64,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
}

fn default_scaling_exponent() -> f64 { 0.7 }

fn default_cache_ttl() -> u64 { 900 }

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            global_markup_percent: 0.0,
            scaling_exponent: default_scaling_exponent(),
            cache_ttl_seconds: default_cache_ttl(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub price_records_path: String,
    pub product_lines_path: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `ATELIER_PRICING__CACHE_TTL_SECONDS=60`
            .add_source(config::Environment::with_prefix("ATELIER").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
