use std::str::FromStr;

use anyhow::{Context, Result};

use crate::layout::LayoutPolicy;

/// Application configuration loaded from environment variables.
/// Every variable is optional; layout overrides fall back to the built-in policy.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Upper bound on blocks accepted in one validation request.
    pub max_blocks_per_request: usize,
    pub policy: LayoutPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = LayoutPolicy::default();
        let policy = LayoutPolicy {
            min_height_px: optional_env("LAYOUT_MIN_HEIGHT_PX", defaults.min_height_px)?,
            max_height_px: optional_env("LAYOUT_MAX_HEIGHT_PX", defaults.max_height_px)?,
            baseline_height_px: optional_env(
                "LAYOUT_BASELINE_HEIGHT_PX",
                defaults.baseline_height_px,
            )?,
            max_table_rows: optional_env("LAYOUT_MAX_TABLE_ROWS", defaults.max_table_rows)?,
            min_pie_radius_px: optional_env(
                "LAYOUT_MIN_PIE_RADIUS_PX",
                defaults.min_pie_radius_px,
            )?,
            min_bar_width_px: optional_env("LAYOUT_MIN_BAR_WIDTH_PX", defaults.min_bar_width_px)?,
            default_bar_count: optional_env(
                "LAYOUT_DEFAULT_BAR_COUNT",
                defaults.default_bar_count,
            )?,
            ..defaults
        };
        policy
            .validate()
            .context("LAYOUT_* overrides produce an invalid layout policy")?;

        Ok(Config {
            port: optional_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_blocks_per_request: optional_env("MAX_BLOCKS_PER_REQUEST", 200)?,
            policy,
        })
    }
}

/// Reads and parses `key`, falling back to `default` when it is unset.
fn optional_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_env_falls_back_when_unset() {
        let value: u16 = optional_env("BLOCKFIT_TEST_UNSET_VARIABLE", 8080).unwrap();
        assert_eq!(value, 8080);
    }

    #[test]
    fn test_optional_env_reports_bad_value() {
        std::env::set_var("BLOCKFIT_TEST_BAD_PORT", "not-a-port");
        let err = optional_env::<u16>("BLOCKFIT_TEST_BAD_PORT", 8080).unwrap_err();
        assert!(err.to_string().contains("BLOCKFIT_TEST_BAD_PORT"));
        std::env::remove_var("BLOCKFIT_TEST_BAD_PORT");
    }

    #[test]
    fn test_optional_env_parses_float() {
        std::env::set_var("BLOCKFIT_TEST_MIN_HEIGHT", " 120.5 ");
        let value: f32 = optional_env("BLOCKFIT_TEST_MIN_HEIGHT", 150.0).unwrap();
        assert_eq!(value, 120.5);
        std::env::remove_var("BLOCKFIT_TEST_MIN_HEIGHT");
    }
}
