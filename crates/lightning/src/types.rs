use std::fmt;
use std::time::Duration;

/// Straight (non-premultiplied) RGBA colour with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Rgba = Rgba::new(0.0, 0.0, 0.0, 1.0);
    /// Pale teal used for bolt glow when the caller supplies nothing else.
    pub const BOLT_TEAL: Rgba = Rgba::new(168.0 / 255.0, 1.0, 247.0 / 255.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parses `#rgb`, `#rrggbb` or `#rrggbbaa` (leading `#` optional).
    pub fn from_hex(raw: &str) -> Result<Self, ColorParseError> {
        let digits = raw.trim().trim_start_matches('#');
        let channel = |range: std::ops::Range<usize>| -> Result<f32, ColorParseError> {
            let slice = digits
                .get(range)
                .ok_or_else(|| ColorParseError(raw.to_string()))?;
            u8::from_str_radix(slice, 16)
                .map(|value| value as f32 / 255.0)
                .map_err(|_| ColorParseError(raw.to_string()))
        };
        match digits.len() {
            3 => {
                let expand = |index: usize| -> Result<f32, ColorParseError> {
                    let nibble = digits
                        .get(index..index + 1)
                        .and_then(|s| u8::from_str_radix(s, 16).ok())
                        .ok_or_else(|| ColorParseError(raw.to_string()))?;
                    Ok((nibble * 17) as f32 / 255.0)
                };
                Ok(Self::new(expand(0)?, expand(1)?, expand(2)?, 1.0))
            }
            6 => Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?, 1.0)),
            8 => Ok(Self::new(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)?,
            )),
            _ => Err(ColorParseError(raw.to_string())),
        }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid colour '{0}'; expected #rgb, #rrggbb or #rrggbbaa")]
pub struct ColorParseError(pub String);

/// Accessibility preference reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionPreference {
    #[default]
    Full,
    /// The user asked for minimal motion: no bolts spawn and shader time is frozen.
    Reduced,
}

/// Which rendering strategy an [`crate::EffectInstance`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    /// Full-screen domain-warped noise field evaluated in a fragment shader.
    Shader,
    /// CPU-generated bolts stroked onto a 2D canvas.
    Bolts,
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectKind::Shader => f.write_str("shader"),
            EffectKind::Bolts => f.write_str("bolts"),
        }
    }
}

/// Per-frame snapshot of everything the caller can tune.
///
/// The effect never mutates this; it is re-read at the start of every tick so
/// changes made through [`crate::EffectInstance::set_config`] land on the next
/// frame without restarting the loop. Fields irrelevant to a path are ignored
/// by it (the shader path ignores `frequency`/`color`, the bolt path ignores
/// `hue`/`x_offset`/`speed`/`size`).
#[derive(Debug, Clone, PartialEq)]
pub struct EffectConfig {
    /// Base colour angle in degrees, `[0, 360)`.
    pub hue: f32,
    /// Horizontal shift applied to the noise domain.
    pub x_offset: f32,
    /// Time multiplier, `> 0`.
    pub speed: f32,
    /// Brightness and spawn-rate multiplier, `[0, 1]`.
    pub intensity: f32,
    /// Spatial frequency multiplier of the noise field, `> 0`.
    pub size: f32,
    /// Approximate bolts per second at full intensity.
    pub frequency: f32,
    /// Glow colour of bolts.
    pub color: Rgba,
    /// Lifetime range new bolts draw from.
    pub bolt_lifetime: (Duration, Duration),
    pub active: bool,
    pub motion: MotionPreference,
}

pub const DEFAULT_BOLT_LIFETIME: (Duration, Duration) =
    (Duration::from_millis(280), Duration::from_millis(700));

/// Shader phase (`time × speed`) held while motion is reduced.
///
/// The flicker term is `hash(time × speed)`, which is zero at phase 0, so the
/// still frame is taken at a phase where the field is lit.
pub const FROZEN_SHADER_PHASE: f32 = 1.0;

impl EffectConfig {
    /// Defaults used by the shader path.
    pub fn shader() -> Self {
        Self {
            hue: 230.0,
            x_offset: 0.0,
            speed: 1.0,
            intensity: 1.0,
            size: 1.0,
            frequency: 0.6,
            color: Rgba::BOLT_TEAL,
            bolt_lifetime: DEFAULT_BOLT_LIFETIME,
            active: true,
            motion: MotionPreference::Full,
        }
    }

    /// Defaults used by the bolt path.
    pub fn bolts() -> Self {
        Self {
            intensity: 0.6,
            ..Self::shader()
        }
    }

    pub fn for_kind(kind: EffectKind) -> Self {
        match kind {
            EffectKind::Shader => Self::shader(),
            EffectKind::Bolts => Self::bolts(),
        }
    }

    pub fn reduced_motion(&self) -> bool {
        matches!(self.motion, MotionPreference::Reduced)
    }

    /// Value of `iTime` for a frame `elapsed` seconds after the time origin.
    ///
    /// Under reduced motion every frame maps to [`FROZEN_SHADER_PHASE`], so the
    /// field is a lit still image whatever the speed.
    pub fn shader_time(&self, elapsed: f32) -> f32 {
        if !self.reduced_motion() {
            return elapsed;
        }
        if self.speed.is_finite() && self.speed > 0.0 {
            FROZEN_SHADER_PHASE / self.speed
        } else {
            FROZEN_SHADER_PHASE
        }
    }
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self::shader()
    }
}
