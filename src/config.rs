//! Review page configuration.
//!
//! Values come from defaults, optionally overridden by `REVIEW_*` variables.
//! A WASM build has no process environment, so the variables are read when
//! the crate is compiled. `hydrate()` resolves the config once and provides
//! it as context; consumers read it back with [`use_page_config`].

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_PAGE_SIZE: usize = 6;
pub const DEFAULT_SHEET_ENTER_MS: u64 = 300;
pub const DEFAULT_SHEET_EXIT_MS: u64 = 300;
pub const DEFAULT_API_BASE_URL: &str = "/api/v1";

/// Fixed animation durations for the review composer sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetTimings {
    pub enter: Duration,
    pub exit: Duration,
}

impl Default for SheetTimings {
    fn default() -> Self {
        Self {
            enter: Duration::from_millis(DEFAULT_SHEET_ENTER_MS),
            exit: Duration::from_millis(DEFAULT_SHEET_EXIT_MS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageConfig {
    pub page_size: usize,
    pub sheet: SheetTimings,
    pub api_base_url: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            sheet: SheetTimings::default(),
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
        }
    }
}

impl PageConfig {
    /// Build page config from `REVIEW_*` variables set at compile time.
    ///
    /// Optional:
    /// - `REVIEW_PAGE_SIZE`: reviews per page, default 6
    /// - `REVIEW_SHEET_ENTER_MS`: sheet entry animation, default 300
    /// - `REVIEW_SHEET_EXIT_MS`: sheet exit animation, default 300
    /// - `REVIEW_API_BASE_URL`: API prefix, default `/api/v1`
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but not parseable.
    pub fn from_build_env() -> Result<Self, ConfigError> {
        Self::from_lookup(build_env)
    }

    /// [`PageConfig::from_build_env`], falling back to the defaults with a
    /// warning when a variable does not parse.
    #[must_use]
    pub fn from_build_env_or_default() -> Self {
        Self::from_build_env().unwrap_or_else(|e| {
            leptos::logging::warn!("page config: {e}; using defaults");
            Self::default()
        })
    }

    /// Build page config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is present but not parseable, or if the
    /// page size is zero.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let page_size = parse_or("REVIEW_PAGE_SIZE", lookup("REVIEW_PAGE_SIZE"), DEFAULT_PAGE_SIZE)?;
        if page_size == 0 {
            return Err(ConfigError::Invalid { key: "REVIEW_PAGE_SIZE", value: "0".to_owned() });
        }
        let enter_ms = parse_or("REVIEW_SHEET_ENTER_MS", lookup("REVIEW_SHEET_ENTER_MS"), DEFAULT_SHEET_ENTER_MS)?;
        let exit_ms = parse_or("REVIEW_SHEET_EXIT_MS", lookup("REVIEW_SHEET_EXIT_MS"), DEFAULT_SHEET_EXIT_MS)?;
        let api_base_url = lookup("REVIEW_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();

        Ok(Self {
            page_size,
            sheet: SheetTimings { enter: Duration::from_millis(enter_ms), exit: Duration::from_millis(exit_ms) },
            api_base_url,
        })
    }
}

/// Config provided at the app root, or the defaults outside one.
#[must_use]
pub fn use_page_config() -> PageConfig {
    leptos::prelude::use_context::<PageConfig>().unwrap_or_default()
}

fn build_env(key: &str) -> Option<String> {
    let value = match key {
        "REVIEW_PAGE_SIZE" => option_env!("REVIEW_PAGE_SIZE"),
        "REVIEW_SHEET_ENTER_MS" => option_env!("REVIEW_SHEET_ENTER_MS"),
        "REVIEW_SHEET_EXIT_MS" => option_env!("REVIEW_SHEET_EXIT_MS"),
        "REVIEW_API_BASE_URL" => option_env!("REVIEW_API_BASE_URL"),
        _ => None,
    };
    value.map(str::to_owned)
}

fn parse_or<T: std::str::FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
