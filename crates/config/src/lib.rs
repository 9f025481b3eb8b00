//! Observatory configuration models and loaders.
//!
//! A configuration file is TOML (`.toml`) or YAML (anything else). Every field
//! has a default, so an empty file describes the reference site.

use std::fs::File;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Complete observatory configuration.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ObservatoryConfig {
    pub site: SiteConfig,
    pub constraints: ConstraintsConfig,
    pub allocation: AllocationConfig,
}

/// Geographic site and twilight threshold.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SiteConfig {
    pub latitude_deg: f64,
    /// East-positive longitude.
    pub longitude_deg: f64,
    pub twilight_altitude_deg: f64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            latitude_deg: 43.0,
            longitude_deg: -81.0,
            twilight_altitude_deg: -12.0,
        }
    }
}

/// Visibility limits applied by the filter and the validator.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ConstraintsConfig {
    pub elevation_limit_deg: f64,
    pub min_moon_offset_deg: f64,
}

impl Default for ConstraintsConfig {
    fn default() -> Self {
        Self {
            elevation_limit_deg: 10.0,
            min_moon_offset_deg: 15.0,
        }
    }
}

/// Window allocation knobs.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AllocationConfig {
    pub slew_allowance_min: f64,
    /// Number of nights a plan may span, counting the current one.
    pub max_nights: usize,
    pub max_deferrals: usize,
    pub min_duration_min: f64,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            slew_allowance_min: 5.0,
            max_nights: 3,
            max_deferrals: 1,
            min_duration_min: 5.0,
        }
    }
}

/// Errors that can occur while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {field} = {value} ({reason})")]
    Invalid {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },
}

impl ObservatoryConfig {
    /// Reject values the scheduler cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let site = &self.site;
        check("site.latitude_deg", site.latitude_deg, -90.0..=90.0)?;
        check("site.longitude_deg", site.longitude_deg, -180.0..=360.0)?;
        check(
            "site.twilight_altitude_deg",
            site.twilight_altitude_deg,
            -18.0..=0.0,
        )?;

        let limits = &self.constraints;
        check(
            "constraints.elevation_limit_deg",
            limits.elevation_limit_deg,
            -90.0..=90.0,
        )?;
        check(
            "constraints.min_moon_offset_deg",
            limits.min_moon_offset_deg,
            0.0..=180.0,
        )?;

        let alloc = &self.allocation;
        check(
            "allocation.slew_allowance_min",
            alloc.slew_allowance_min,
            0.0..=f64::MAX,
        )?;
        if alloc.min_duration_min <= 0.0 || !alloc.min_duration_min.is_finite() {
            return Err(ConfigError::Invalid {
                field: "allocation.min_duration_min",
                value: alloc.min_duration_min,
                reason: "must be positive",
            });
        }
        if alloc.max_nights == 0 {
            return Err(ConfigError::Invalid {
                field: "allocation.max_nights",
                value: 0.0,
                reason: "at least one night is required",
            });
        }
        Ok(())
    }
}

fn check(
    field: &'static str,
    value: f64,
    range: std::ops::RangeInclusive<f64>,
) -> Result<(), ConfigError> {
    if value.is_finite() && range.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            value,
            reason: "out of range",
        })
    }
}

/// Load and validate an observatory configuration.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ObservatoryConfig, ConfigError> {
    let config: ObservatoryConfig = load_record(path)?;
    config.validate()?;
    Ok(config)
}

/// Parse a configuration from TOML text without touching the filesystem.
pub fn config_from_toml(contents: &str) -> Result<ObservatoryConfig, ConfigError> {
    let config: ObservatoryConfig = toml::from_str(contents)?;
    config.validate()?;
    Ok(config)
}

fn load_record<T, P>(path: P) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.extension().map(|ext| ext == "toml").unwrap_or(false) {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    } else {
        let reader = File::open(path)?;
        Ok(serde_yaml::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_toml_yields_reference_site() {
        let config = config_from_toml("").unwrap();
        assert_eq!(config, ObservatoryConfig::default());
        assert_eq!(config.site.latitude_deg, 43.0);
        assert_eq!(config.site.longitude_deg, -81.0);
        assert_eq!(config.constraints.elevation_limit_deg, 10.0);
        assert_eq!(config.constraints.min_moon_offset_deg, 15.0);
        assert_eq!(config.allocation.max_nights, 3);
        assert_eq!(config.allocation.max_deferrals, 1);
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config = config_from_toml(
            r#"
            [site]
            latitude_deg = -30.2

            [allocation]
            slew_allowance_min = 2.5
            "#,
        )
        .unwrap();
        assert_eq!(config.site.latitude_deg, -30.2);
        assert_eq!(config.site.longitude_deg, -81.0);
        assert_eq!(config.allocation.slew_allowance_min, 2.5);
        assert_eq!(config.allocation.max_nights, 3);
    }

    #[test]
    fn rejects_out_of_range_latitude() {
        let err = config_from_toml("[site]\nlatitude_deg = 95.0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "site.latitude_deg",
                ..
            }
        ));
    }

    #[test]
    fn rejects_zero_night_cap() {
        let err = config_from_toml("[allocation]\nmax_nights = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn loads_yaml_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "constraints:\n  elevation_limit_deg: 25.0").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.constraints.elevation_limit_deg, 25.0);
        assert_eq!(config.constraints.min_moon_offset_deg, 15.0);
    }

    #[test]
    fn loads_toml_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[constraints]\nmin_moon_offset_deg = 30.0").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.constraints.min_moon_offset_deg, 30.0);
    }
}
