use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lightning::{EffectConfig, EffectKind, MotionPreference, Rgba};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level effect file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EffectFile {
    pub version: u32,
    #[serde(default)]
    pub reduced_motion: bool,
    /// Seeds the bolt generator; omitted means a fresh seed every run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default)]
    pub shader: ShaderSection,
    #[serde(default)]
    pub bolts: BoltSection,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ShaderSection {
    pub hue: Option<f32>,
    pub x_offset: Option<f32>,
    pub speed: Option<f32>,
    pub intensity: Option<f32>,
    pub size: Option<f32>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BoltSection {
    pub intensity: Option<f32>,
    pub frequency: Option<f32>,
    pub color: Option<String>,
    pub active: Option<bool>,
    #[serde(
        default,
        deserialize_with = "deserialize_millis_opt",
        skip_serializing
    )]
    pub lifetime_min: Option<Duration>,
    #[serde(
        default,
        deserialize_with = "deserialize_millis_opt",
        skip_serializing
    )]
    pub lifetime_max: Option<Duration>,
}

/// Accepts a humantime string (`"280ms"`) or a bare number of milliseconds.
fn deserialize_millis_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of milliseconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_millis(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_millis(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs_f64(v / 1000.0)))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl EffectFile {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: EffectFile = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }
        validate_effect(&self.effect_config(EffectKind::Shader)?)?;
        validate_effect(&self.effect_config(EffectKind::Bolts)?)?;
        Ok(())
    }

    pub fn motion(&self) -> MotionPreference {
        if self.reduced_motion {
            MotionPreference::Reduced
        } else {
            MotionPreference::Full
        }
    }

    /// Built-in defaults for `kind` with every value the file sets applied on top.
    ///
    /// Only the section matching `kind` is consulted; the bolt colour is parsed
    /// here, so a malformed colour surfaces as [`ConfigError::Invalid`].
    pub fn effect_config(&self, kind: EffectKind) -> Result<EffectConfig, ConfigError> {
        let mut config = EffectConfig::for_kind(kind);
        config.motion = self.motion();
        match kind {
            EffectKind::Shader => {
                let section = &self.shader;
                apply(&mut config.hue, section.hue);
                apply(&mut config.x_offset, section.x_offset);
                apply(&mut config.speed, section.speed);
                apply(&mut config.intensity, section.intensity);
                apply(&mut config.size, section.size);
                apply(&mut config.active, section.active);
            }
            EffectKind::Bolts => {
                let section = &self.bolts;
                apply(&mut config.intensity, section.intensity);
                apply(&mut config.frequency, section.frequency);
                apply(&mut config.active, section.active);
                apply(&mut config.bolt_lifetime.0, section.lifetime_min);
                apply(&mut config.bolt_lifetime.1, section.lifetime_max);
                if let Some(raw) = &section.color {
                    config.color = parse_color(raw)?;
                }
            }
        }
        Ok(config)
    }
}

fn apply<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

pub fn parse_color(raw: &str) -> Result<Rgba, ConfigError> {
    Rgba::from_hex(raw).map_err(|err| ConfigError::Invalid(err.to_string()))
}

/// Range checks shared by file loading and command-line overrides.
pub fn validate_effect(config: &EffectConfig) -> Result<(), ConfigError> {
    if !(0.0..360.0).contains(&config.hue) {
        return Err(ConfigError::Invalid(format!(
            "hue must be in [0, 360); got {}",
            config.hue
        )));
    }
    if !config.x_offset.is_finite() {
        return Err(ConfigError::Invalid("x_offset must be finite".into()));
    }
    for (name, value) in [
        ("speed", config.speed),
        ("size", config.size),
        ("frequency", config.frequency),
    ] {
        if !(value.is_finite() && value > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "{name} must be greater than zero; got {value}"
            )));
        }
    }
    if !(0.0..=1.0).contains(&config.intensity) {
        return Err(ConfigError::Invalid(format!(
            "intensity must be in [0, 1]; got {}",
            config.intensity
        )));
    }

    let (min, max) = config.bolt_lifetime;
    if min.is_zero() || max.is_zero() {
        return Err(ConfigError::Invalid(
            "bolt lifetimes must be greater than zero".into(),
        ));
    }
    if min > max {
        return Err(ConfigError::Invalid(format!(
            "lifetime_min ({}) exceeds lifetime_max ({})",
            humantime::format_duration(min),
            humantime::format_duration(max)
        )));
    }
    Ok(())
}
