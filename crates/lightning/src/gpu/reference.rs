//! CPU evaluation of the lightning fragment program.
//!
//! Used for snapshot export without a GPU and as an oracle in tests. Colours
//! are returned unclamped, exactly as the fragment stage computes them; only
//! [`render_field`] clamps when quantising to 8-bit.

use crate::noise::{fbm, hash1, hsv_to_rgb, OCTAVE_COUNT};

use super::uniforms::FrameUniforms;

const SATURATION: f32 = 0.7;
const VALUE: f32 = 0.8;
const FLICKER_SCALE: f32 = 0.07;
const MIN_DISTANCE: f32 = 0.001;

/// Colour of the pixel at `frag_coord`, with the origin at the bottom-left.
pub fn shade(frame: &FrameUniforms, frag_coord: [f32; 2]) -> [f32; 3] {
    let [width, height] = frame.resolution;
    let mut uv = [
        2.0 * frag_coord[0] / width - 1.0,
        2.0 * frag_coord[1] / height - 1.0,
    ];
    uv[0] *= width / height;
    uv[0] += frame.x_offset;

    let drift = 0.8 * frame.time * frame.speed;
    let warp = 2.0 * fbm([uv[0] * frame.size + drift, uv[1] * frame.size + drift], OCTAVE_COUNT) - 1.0;
    uv[0] += warp;
    uv[1] += warp;

    let dist = uv[0].abs();
    let base = hsv_to_rgb(frame.hue / 360.0, SATURATION, VALUE);
    let flicker = FLICKER_SCALE * hash1(frame.time * frame.speed);
    let gain = flicker / dist.max(MIN_DISTANCE) * frame.intensity;
    [base[0] * gain, base[1] * gain, base[2] * gain]
}

/// Renders the whole field into tightly packed RGBA8 rows, top row first.
///
/// Pixels are sampled at their centres. Alpha is always opaque.
pub fn render_field(frame: &FrameUniforms, width: u32, height: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
    let mut frame = *frame;
    frame.resolution = [width.max(1) as f32, height.max(1) as f32];
    for row in 0..height {
        let y = (height - 1 - row) as f32 + 0.5;
        for column in 0..width {
            let color = shade(&frame, [column as f32 + 0.5, y]);
            pixels.extend(color.iter().map(|channel| quantise(*channel)));
            pixels.push(u8::MAX);
        }
    }
    pixels
}

fn quantise(channel: f32) -> u8 {
    if channel.is_nan() {
        return 0;
    }
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}
