use anyhow::{Context, Result};
use lightning::{EffectConfig, EffectKind, MotionPreference};
use stormconfig::EffectFile;

use crate::cli::EffectArgs;

/// Configuration for one effect after the file and command-line flags merged.
#[derive(Debug, Clone)]
pub struct ResolvedEffect {
    pub config: EffectConfig,
    pub seed: Option<u64>,
}

pub fn parse_surface_size(spec: &str) -> Result<(u32, u32)> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| anyhow::anyhow!("expected WxH format, e.g. 1920x1080"))?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid width in size specification"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid height in size specification"))?;

    if width == 0 || height == 0 {
        anyhow::bail!("surface dimensions must be greater than zero");
    }

    Ok((width, height))
}

/// Loads `--config` (if any), applies flag overrides for `kind` and validates
/// the result.
pub fn resolve_effect(args: &EffectArgs, kind: EffectKind) -> Result<ResolvedEffect> {
    let file = match args.config.as_ref() {
        Some(path) => {
            let file = EffectFile::load(path)
                .with_context(|| format!("failed to load effect config {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded effect config");
            file
        }
        None => EffectFile {
            version: 1,
            ..EffectFile::default()
        },
    };

    let mut config = file.effect_config(kind)?;
    apply_overrides(&mut config, args);
    stormconfig::validate_effect(&config).context("invalid effect settings")?;

    Ok(ResolvedEffect {
        config,
        seed: args.seed.or(file.seed),
    })
}

fn apply_overrides(config: &mut EffectConfig, args: &EffectArgs) {
    let overrides = [
        (&mut config.hue, args.hue),
        (&mut config.speed, args.speed),
        (&mut config.intensity, args.intensity),
        (&mut config.size, args.size),
        (&mut config.x_offset, args.x_offset),
        (&mut config.frequency, args.frequency),
    ];
    for (slot, value) in overrides {
        if let Some(value) = value {
            *slot = value;
        }
    }
    if let Some(color) = args.color {
        config.color = color;
    }
    if args.reduced_motion {
        config.motion = MotionPreference::Reduced;
    }
}
