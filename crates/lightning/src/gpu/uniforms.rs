use bytemuck::{Pod, Zeroable};
use winit::dpi::PhysicalSize;

use crate::types::EffectConfig;

use super::backend::UniformValue;

/// Uniform names the fragment program reads, in block order.
pub const UNIFORM_NAMES: [&str; 7] = [
    "iResolution",
    "iTime",
    "uHue",
    "uXOffset",
    "uSpeed",
    "uIntensity",
    "uSize",
];

/// Per-frame parameters of the lightning field.
///
/// The layout must match the `LightningParams` std140 block in
/// [`super::shaders::FRAGMENT_SHADER`]: a `vec2` followed by six floats, 32
/// bytes with no padding.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub resolution: [f32; 2],
    pub time: f32,
    pub hue: f32,
    pub x_offset: f32,
    pub speed: f32,
    pub intensity: f32,
    pub size: f32,
}

impl FrameUniforms {
    pub fn new(config: &EffectConfig, time: f32, physical: PhysicalSize<u32>) -> Self {
        Self {
            resolution: [physical.width as f32, physical.height as f32],
            time,
            hue: config.hue,
            x_offset: config.x_offset,
            speed: config.speed,
            intensity: config.intensity,
            size: config.size,
        }
    }

    /// Every uniform paired with its value for this frame.
    pub fn named_values(&self) -> [(&'static str, UniformValue); 7] {
        [
            ("iResolution", UniformValue::Vec2(self.resolution)),
            ("iTime", UniformValue::Float(self.time)),
            ("uHue", UniformValue::Float(self.hue)),
            ("uXOffset", UniformValue::Float(self.x_offset)),
            ("uSpeed", UniformValue::Float(self.speed)),
            ("uIntensity", UniformValue::Float(self.intensity)),
            ("uSize", UniformValue::Float(self.size)),
        ]
    }

    /// Byte offset of `name` inside the std140 block.
    pub fn block_offset(name: &str) -> Option<u32> {
        let offset = match name {
            "iResolution" => 0,
            "iTime" => 8,
            "uHue" => 12,
            "uXOffset" => 16,
            "uSpeed" => 20,
            "uIntensity" => 24,
            "uSize" => 28,
            _ => return None,
        };
        Some(offset)
    }

    /// Writes `value` at a byte offset previously returned by [`Self::block_offset`].
    /// Out-of-range writes are dropped.
    pub fn write(&mut self, offset: u32, value: UniformValue) {
        let words: &mut [f32; 8] = bytemuck::cast_mut(self);
        let index = (offset / 4) as usize;
        match value {
            UniformValue::Float(v) => {
                if let Some(slot) = words.get_mut(index) {
                    *slot = v;
                }
            }
            UniformValue::Vec2([x, y]) => {
                if let Some(pair) = words.get_mut(index..index + 2) {
                    pair[0] = x;
                    pair[1] = y;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_is_thirty_two_bytes() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 32);
    }

    #[test]
    fn offsets_cover_every_named_uniform() {
        for name in UNIFORM_NAMES {
            assert!(FrameUniforms::block_offset(name).is_some(), "{name}");
        }
        assert_eq!(FrameUniforms::block_offset("uMissing"), None);
    }

    #[test]
    fn writes_land_on_matching_fields() {
        let source = FrameUniforms::new(
            &EffectConfig {
                hue: 190.0,
                x_offset: 0.25,
                speed: 2.0,
                intensity: 0.5,
                size: 3.0,
                ..EffectConfig::shader()
            },
            4.5,
            PhysicalSize::new(800, 600),
        );
        let mut target = FrameUniforms::zeroed();
        for (name, value) in source.named_values() {
            let offset = FrameUniforms::block_offset(name).expect("offset");
            target.write(offset, value);
        }
        assert_eq!(target, source);
    }
}
