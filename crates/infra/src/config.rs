//! Application configuration.
//!
//! Layered with the `config` crate: built-in defaults, then
//! `config/default.toml` and `config/{TRADEFLOW_ENV}.toml` when present, then
//! `TRADEFLOW__SECTION__KEY` environment variables.

use std::env;
use std::path::Path;

use anyhow::{Context, bail};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use rust_decimal::Decimal;
use serde::Deserialize;

use tradeflow_observability::LoggingSettings;
use tradeflow_sales::SalesSettings;

pub const CONFIG_DIR: &str = "config";
pub const DEFAULT_ENV: &str = "development";
const ENV_PREFIX: &str = "TRADEFLOW";

/// `sales` section; mirrors [`SalesSettings`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SalesConfig {
    pub tax_rate_percent: Decimal,
    pub money_precision: u32,
    pub quote_validity_days: u32,
    pub invoice_due_days: u32,
    pub quote_prefix: String,
    pub invoice_prefix: String,
    pub number_width: usize,
    pub require_reference_for_order: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    pub environment: String,
    pub sales: SalesConfig,
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Load from `./config` and the process environment.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(CONFIG_DIR)
    }

    pub fn load_from(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let run_env = env::var("TRADEFLOW_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());
        if !dir.exists() {
            tracing::info!(
                dir = %dir.display(),
                "config directory not found; using defaults and environment"
            );
        }

        let config = defaults(&run_env)?
            .add_source(File::from(dir.join("default")).required(false))
            .add_source(File::from(dir.join(&run_env)).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .context("failed to build configuration")?;

        Self::from_config(config)
    }

    /// Defaults overlaid with a TOML document.
    pub fn from_toml(source: &str) -> anyhow::Result<Self> {
        let config = defaults(DEFAULT_ENV)?
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()
            .context("failed to parse configuration")?;

        Self::from_config(config)
    }

    fn from_config(config: Config) -> anyhow::Result<Self> {
        let app: AppConfig = config
            .try_deserialize()
            .context("configuration has an unexpected shape")?;
        app.validate()?;
        tracing::debug!(environment = %app.environment, "configuration loaded");
        Ok(app)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.sales_settings()
            .validate()
            .context("invalid [sales] configuration")?;
        if self.logging.level.trim().is_empty() {
            bail!("invalid [logging] configuration: level cannot be empty");
        }
        Ok(())
    }

    /// Domain-level settings for the sales workflow.
    pub fn sales_settings(&self) -> SalesSettings {
        let sales = &self.sales;
        SalesSettings {
            tax_rate_percent: sales.tax_rate_percent,
            money_precision: sales.money_precision,
            quote_validity_days: sales.quote_validity_days,
            invoice_due_days: sales.invoice_due_days,
            quote_prefix: sales.quote_prefix.clone(),
            invoice_prefix: sales.invoice_prefix.clone(),
            number_width: sales.number_width,
            require_reference_for_order: sales.require_reference_for_order,
        }
    }
}

fn defaults(run_env: &str) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let sales = SalesSettings::default();
    let logging = LoggingSettings::default();

    Config::builder()
        .set_default("environment", run_env)?
        .set_default("sales.tax_rate_percent", sales.tax_rate_percent.to_string())?
        .set_default("sales.money_precision", u64::from(sales.money_precision))?
        .set_default("sales.quote_validity_days", u64::from(sales.quote_validity_days))?
        .set_default("sales.invoice_due_days", u64::from(sales.invoice_due_days))?
        .set_default("sales.quote_prefix", sales.quote_prefix)?
        .set_default("sales.invoice_prefix", sales.invoice_prefix)?
        .set_default("sales.number_width", sales.number_width as u64)?
        .set_default("sales.require_reference_for_order", sales.require_reference_for_order)?
        .set_default("logging.level", logging.level)?
        .set_default("logging.json", logging.json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults_match_domain_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.environment, DEFAULT_ENV);
        assert_eq!(config.sales_settings(), SalesSettings::default());
        assert_eq!(config.logging, LoggingSettings::default());
    }

    #[test]
    fn toml_overrides_individual_keys() {
        let config = AppConfig::from_toml(
            r#"
            [sales]
            tax_rate_percent = "8.25"
            invoice_due_days = 45
            require_reference_for_order = true

            [logging]
            json = false
            "#,
        )
        .unwrap();

        let sales = config.sales_settings();
        assert_eq!(sales.tax_rate_percent, dec!(8.25));
        assert_eq!(sales.invoice_due_days, 45);
        assert!(sales.require_reference_for_order);
        assert_eq!(sales.quote_prefix, "Q");
        assert!(!config.logging.json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn invalid_sales_settings_fail_at_load() {
        let negative_tax = AppConfig::from_toml("[sales]\ntax_rate_percent = \"-1\"\n");
        assert!(negative_tax.is_err());

        let empty_prefix = AppConfig::from_toml("[sales]\nquote_prefix = \"\"\n");
        assert!(empty_prefix.is_err());

        let too_precise = AppConfig::from_toml("[sales]\nmoney_precision = 11\n");
        assert!(too_precise.is_err());
    }

    #[test]
    fn missing_directory_falls_back_to_defaults() {
        let config = AppConfig::load_from("does/not/exist").unwrap();
        assert_eq!(config.sales.number_width, 5);
    }
}
