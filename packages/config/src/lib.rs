#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Process settings.
//!
//! Settings start from defaults, are overlaid by the TOML file named in
//! `GEOSCOPE_CONFIG` (if any), and finally by individual environment
//! variables:
//!
//! | Variable | Setting |
//! |---|---|
//! | `MAPPLUTO_PATH`, `LION_PATH`, `NTA_PATH` | geodata sources |
//! | `GEOCLIENT_API_KEY`, `GEOCLIENT_BASE_URL` | geocoder |
//! | `SOCRATA_DOMAIN`, `SOCRATA_APP_TOKEN` | dataset service |
//! | `GEOSCOPE_WORKERS` | worker-pool bound |
//! | `MAX_BUFFER_FT`, `MIN_BUFFER_FT`, `DEFAULT_BUFFER_INCREMENT_FT`, `DEFAULT_BUFFER_FT` | street buffer policy |

use std::{path::PathBuf, time::Duration};

use geoscope_spatial_models::{BufferPolicy, GeoSources, SourceConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming an optional TOML settings file.
pub const CONFIG_FILE_VAR: &str = "GEOSCOPE_CONFIG";

/// Default worker-pool bound.
pub const DEFAULT_WORKERS: usize = 4;

/// Default bundle cache capacity.
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Default per-request timeout for external services, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Errors from loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The settings file is not valid TOML for [`Settings`].
    #[error("invalid settings file: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required setting has no value.
    #[error("{name} is not set")]
    Missing {
        /// Variable or key name.
        name: &'static str,
    },

    /// A setting has a value of the wrong shape.
    #[error("invalid value for {name}: {value:?}")]
    Invalid {
        /// Variable or key name.
        name: &'static str,
        /// The offending value.
        value: String,
    },
}

/// Where the three geodata layers live. Each is required to build an
/// index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Parcel layer (`MAPPLUTO_PATH`).
    pub parcels: Option<SourceConfig>,
    /// Street centerline layer (`LION_PATH`).
    pub streets: Option<SourceConfig>,
    /// Neighborhood area layer (`NTA_PATH`).
    pub areas: Option<SourceConfig>,
}

/// External geocoder settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoclientSettings {
    /// Subscription key; the geocoder is disabled without one.
    pub api_key: Option<String>,
    /// Base URL override.
    pub base_url: Option<String>,
    /// Per-request timeout, in seconds.
    pub timeout_secs: u64,
}

impl Default for GeoclientSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl GeoclientSettings {
    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Tabular dataset service settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocrataSettings {
    /// Portal domain override.
    pub domain: Option<String>,
    /// App token sent with every request.
    pub app_token: Option<String>,
}

/// Dataset filter limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
    /// Ceiling on rows fetched per dataset.
    pub rows: u32,
    /// Rows fetched for an empty-scope preview.
    pub preview: u32,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            rows: 1000,
            preview: 50,
        }
    }
}

/// All process settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Geodata sources.
    pub sources: SourceSettings,
    /// External geocoder.
    pub geoclient: GeoclientSettings,
    /// Dataset service.
    pub socrata: SocrataSettings,
    /// Bound on concurrent lookups.
    pub workers: usize,
    /// Street corridor buffer policy.
    pub buffer: BufferPolicy,
    /// Bundle cache capacity.
    pub cache_capacity: usize,
    /// Dataset filter limits.
    pub limits: LimitSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sources: SourceSettings::default(),
            geoclient: GeoclientSettings::default(),
            socrata: SocrataSettings::default(),
            workers: DEFAULT_WORKERS,
            buffer: BufferPolicy::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            limits: LimitSettings::default(),
        }
    }
}

impl Settings {
    /// Loads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the settings file cannot be read or
    /// parsed, or a variable holds an invalid value.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    /// Loads settings reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the settings file cannot be read or
    /// parsed, or a variable holds an invalid value.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut settings = match non_empty(lookup(CONFIG_FILE_VAR)) {
            Some(path) => Self::from_file(PathBuf::from(path))?,
            None => Self::default(),
        };
        settings.apply_env(lookup)?;
        Ok(settings)
    }

    /// Reads a TOML settings file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] or [`ConfigError::Toml`].
    pub fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        log::info!("Loading settings from {}", path.display());
        Self::from_toml(&text)
    }

    /// Parses TOML settings; missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the text does not parse.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Overlays environment variables read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for unparseable numbers.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let var = |name: &str| non_empty(lookup(name));

        if let Some(path) = var("MAPPLUTO_PATH") {
            self.sources.parcels = Some(SourceConfig::new(path));
        }
        if let Some(path) = var("LION_PATH") {
            self.sources.streets = Some(SourceConfig::new(path));
        }
        if let Some(path) = var("NTA_PATH") {
            self.sources.areas = Some(SourceConfig::new(path));
        }

        if let Some(key) = var("GEOCLIENT_API_KEY") {
            self.geoclient.api_key = Some(key);
        }
        if let Some(url) = var("GEOCLIENT_BASE_URL") {
            self.geoclient.base_url = Some(url);
        }
        if let Some(domain) = var("SOCRATA_DOMAIN") {
            self.socrata.domain = Some(domain);
        }
        if let Some(token) = var("SOCRATA_APP_TOKEN") {
            self.socrata.app_token = Some(token);
        }

        if let Some(value) = var("GEOSCOPE_WORKERS") {
            self.workers = parse_var("GEOSCOPE_WORKERS", &value)?;
        }
        if let Some(value) = var("MAX_BUFFER_FT") {
            self.buffer.max_ft = parse_var("MAX_BUFFER_FT", &value)?;
        }
        if let Some(value) = var("MIN_BUFFER_FT") {
            self.buffer.min_ft = parse_var("MIN_BUFFER_FT", &value)?;
        }
        if let Some(value) = var("DEFAULT_BUFFER_INCREMENT_FT") {
            self.buffer.increment_ft = parse_var("DEFAULT_BUFFER_INCREMENT_FT", &value)?;
        }
        if let Some(value) = var("DEFAULT_BUFFER_FT") {
            self.buffer.default_ft = parse_var("DEFAULT_BUFFER_FT", &value)?;
        }

        self.validate()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid {
                name: "workers",
                value: "0".to_string(),
            });
        }
        let buffer = &self.buffer;
        for (field, value) in [
            ("max_ft", buffer.max_ft),
            ("min_ft", buffer.min_ft),
            ("increment_ft", buffer.increment_ft),
            ("default_ft", buffer.default_ft),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid {
                    name: "buffer",
                    value: format!("{field} {value}"),
                });
            }
        }
        if self.buffer.min_ft > self.buffer.max_ft {
            return Err(ConfigError::Invalid {
                name: "buffer",
                value: format!("min {} > max {}", self.buffer.min_ft, self.buffer.max_ft),
            });
        }
        Ok(())
    }

    /// The three geodata sources, all of which must be configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] naming the first unset source.
    pub fn geo_sources(&self) -> Result<GeoSources, ConfigError> {
        let required = |source: &Option<SourceConfig>, name| {
            source.clone().ok_or(ConfigError::Missing { name })
        };
        Ok(GeoSources {
            parcels: required(&self.sources.parcels, "MAPPLUTO_PATH")?,
            streets: required(&self.sources.streets, "LION_PATH")?,
            areas: required(&self.sources.areas, "NTA_PATH")?,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let settings = Settings::load_with(env(&[])).unwrap();
        assert_eq!(settings.workers, 4);
        assert_eq!(settings.cache_capacity, 4096);
        assert_eq!(settings.limits, LimitSettings { rows: 1000, preview: 50 });
        assert_eq!(settings.buffer, BufferPolicy::default());
        assert_eq!(settings.geoclient.timeout(), Duration::from_secs(10));
        assert!(settings.geoclient.api_key.is_none());
    }

    #[test]
    fn environment_overrides() {
        let settings = Settings::load_with(env(&[
            ("MAPPLUTO_PATH", "/data/pluto"),
            ("LION_PATH", "/data/lion.geojson"),
            ("NTA_PATH", "/data/nta.geojson"),
            ("GEOCLIENT_API_KEY", "secret"),
            ("SOCRATA_APP_TOKEN", ""),
            ("GEOSCOPE_WORKERS", "8"),
            ("DEFAULT_BUFFER_FT", "25"),
        ]))
        .unwrap();
        assert_eq!(settings.workers, 8);
        assert!((settings.buffer.default_ft - 25.0).abs() < f64::EPSILON);
        assert_eq!(settings.geoclient.api_key.as_deref(), Some("secret"));
        assert_eq!(settings.socrata.app_token, None);

        let sources = settings.geo_sources().unwrap();
        assert_eq!(sources.parcels.path, PathBuf::from("/data/pluto"));
        assert_eq!(sources.areas.path, PathBuf::from("/data/nta.geojson"));
    }

    #[test]
    fn missing_source_is_named() {
        let settings = Settings::load_with(env(&[("MAPPLUTO_PATH", "/data/pluto")])).unwrap();
        assert!(matches!(
            settings.geo_sources(),
            Err(ConfigError::Missing { name: "LION_PATH" })
        ));
    }

    #[test]
    fn bad_numbers_are_rejected() {
        assert!(matches!(
            Settings::load_with(env(&[("GEOSCOPE_WORKERS", "many")])),
            Err(ConfigError::Invalid { name: "GEOSCOPE_WORKERS", .. })
        ));
        assert!(matches!(
            Settings::load_with(env(&[("GEOSCOPE_WORKERS", "0")])),
            Err(ConfigError::Invalid { name: "workers", .. })
        ));
        assert!(matches!(
            Settings::load_with(env(&[("MIN_BUFFER_FT", "200")])),
            Err(ConfigError::Invalid { name: "buffer", .. })
        ));
    }

    #[test]
    fn non_finite_and_negative_buffers_are_rejected() {
        for (name, value) in [
            ("MIN_BUFFER_FT", "NaN"),
            ("MAX_BUFFER_FT", "inf"),
            ("DEFAULT_BUFFER_INCREMENT_FT", "-5"),
            ("DEFAULT_BUFFER_FT", "nan"),
        ] {
            assert!(
                matches!(
                    Settings::load_with(env(&[(name, value)])),
                    Err(ConfigError::Invalid { name: "buffer", .. })
                ),
                "{name}={value}"
            );
        }
    }

    #[test]
    fn toml_file_settings() {
        let settings = Settings::from_toml(
            r#"
            workers = 2
            cache_capacity = 16

            [sources.streets]
            path = "/data/lion"
            layer = "lion_2024"
            epsg = 2263

            [buffer]
            maxFt = 80.0

            [limits]
            preview = 10
            "#,
        )
        .unwrap();
        assert_eq!(settings.workers, 2);
        assert_eq!(settings.cache_capacity, 16);
        assert!((settings.buffer.max_ft - 80.0).abs() < f64::EPSILON);
        assert!((settings.buffer.min_ft - 10.0).abs() < f64::EPSILON);
        assert_eq!(settings.limits, LimitSettings { rows: 1000, preview: 10 });
        let streets = settings.sources.streets.unwrap();
        assert_eq!(streets.layer.as_deref(), Some("lion_2024"));
        assert_eq!(streets.epsg, Some(2263));
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let result = Settings::load_with(env(&[(CONFIG_FILE_VAR, "/nonexistent/geoscope.toml")]));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
