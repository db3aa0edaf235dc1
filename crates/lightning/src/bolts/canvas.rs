use tiny_skia::{Color, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};
use winit::dpi::PhysicalSize;

use crate::types::Rgba;

/// Number of translucent strokes used to approximate a glow blur.
const GLOW_LAYERS: u32 = 4;

/// A point in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn lerp(self, other: Point, t: f32) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

/// How a polyline is stroked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: Rgba,
    /// Global alpha multiplied into `color.a`.
    pub alpha: f32,
    /// Line width in logical pixels.
    pub width: f32,
    /// Blur radius of the glow halo in logical pixels; `0` draws no halo.
    pub glow: f32,
}

/// 2D immediate-mode surface the bolt path draws on.
///
/// Coordinates are logical pixels; the canvas maps them to its backing store
/// through the scale set with [`Canvas::set_scale`].
pub trait Canvas {
    /// Reallocates the backing store. Contents are discarded.
    fn resize_backing(&mut self, size: PhysicalSize<u32>);

    /// Sets the logical-to-physical scale applied to every later draw.
    fn set_scale(&mut self, scale: f32);

    /// Clears the whole backing store to transparent.
    fn clear(&mut self);

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgba);

    /// Strokes an open polyline with round caps and joins.
    fn stroke(&mut self, points: &[Point], style: &StrokeStyle);
}

/// [`Canvas`] backed by a CPU `tiny-skia` pixmap.
pub struct PixmapCanvas {
    pixmap: Pixmap,
    transform: Transform,
}

impl PixmapCanvas {
    /// Returns `None` if the pixmap cannot be allocated at `size`.
    pub fn new(size: PhysicalSize<u32>) -> Option<Self> {
        let pixmap = Pixmap::new(size.width.max(1), size.height.max(1))?;
        Some(Self {
            pixmap,
            transform: Transform::identity(),
        })
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.pixmap.width(), self.pixmap.height())
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Straight-alpha RGBA8 rows, top row first.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixmap
            .pixels()
            .iter()
            .flat_map(|pixel| {
                let color = pixel.demultiply();
                [color.red(), color.green(), color.blue(), color.alpha()]
            })
            .collect()
    }

    fn paint(color: Rgba, alpha: f32) -> Option<Paint<'static>> {
        let skia = Color::from_rgba(
            color.r.clamp(0.0, 1.0),
            color.g.clamp(0.0, 1.0),
            color.b.clamp(0.0, 1.0),
            (color.a * alpha).clamp(0.0, 1.0),
        )?;
        let mut paint = Paint::default();
        paint.set_color(skia);
        paint.anti_alias = true;
        Some(paint)
    }
}

impl Canvas for PixmapCanvas {
    fn resize_backing(&mut self, size: PhysicalSize<u32>) {
        if size == self.size() {
            self.pixmap.fill(Color::TRANSPARENT);
            return;
        }
        match Pixmap::new(size.width.max(1), size.height.max(1)) {
            Some(pixmap) => self.pixmap = pixmap,
            None => tracing::warn!(
                width = size.width,
                height = size.height,
                "failed to allocate canvas backing store; keeping previous size"
            ),
        }
    }

    fn set_scale(&mut self, scale: f32) {
        self.transform = Transform::from_scale(scale, scale);
    }

    fn clear(&mut self) {
        self.pixmap.fill(Color::TRANSPARENT);
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgba) {
        let (Some(rect), Some(paint)) = (Rect::from_xywh(x, y, width, height), Self::paint(color, 1.0))
        else {
            return;
        };
        self.pixmap.fill_rect(rect, &paint, self.transform, None);
    }

    fn stroke(&mut self, points: &[Point], style: &StrokeStyle) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        if rest.is_empty() || style.width <= 0.0 || style.alpha <= 0.0 {
            return;
        }
        let mut builder = PathBuilder::new();
        builder.move_to(first.x, first.y);
        for point in rest {
            builder.line_to(point.x, point.y);
        }
        let Some(path) = builder.finish() else {
            return;
        };

        let mut stroke = Stroke {
            width: style.width,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };

        // Halo first, widest layer at the bottom.
        if style.glow > 0.0 {
            let layer_alpha = style.alpha / (GLOW_LAYERS + 1) as f32;
            for layer in (1..=GLOW_LAYERS).rev() {
                stroke.width = style.width + style.glow * layer as f32 / GLOW_LAYERS as f32;
                if let Some(paint) = Self::paint(style.color, layer_alpha) {
                    self.pixmap
                        .stroke_path(&path, &paint, &stroke, self.transform, None);
                }
            }
            stroke.width = style.width;
        }

        if let Some(paint) = Self::paint(style.color, style.alpha) {
            self.pixmap
                .stroke_path(&path, &paint, &stroke, self.transform, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(canvas: &PixmapCanvas, x: u32, y: u32) -> [u8; 4] {
        let width = canvas.size().width as usize;
        let rgba = canvas.to_rgba8();
        let offset = (y as usize * width + x as usize) * 4;
        [rgba[offset], rgba[offset + 1], rgba[offset + 2], rgba[offset + 3]]
    }

    #[test]
    fn stroke_lands_in_scaled_coordinates() {
        let mut canvas = PixmapCanvas::new(PhysicalSize::new(40, 40)).expect("pixmap");
        canvas.set_scale(2.0);
        canvas.stroke(
            &[Point::new(2.0, 10.0), Point::new(18.0, 10.0)],
            &StrokeStyle {
                color: Rgba::WHITE,
                alpha: 1.0,
                width: 2.0,
                glow: 0.0,
            },
        );
        assert_eq!(pixel(&canvas, 20, 20)[3], 255);
        assert_eq!(pixel(&canvas, 20, 2)[3], 0);
    }

    #[test]
    fn glow_spreads_beyond_core_width() {
        let style = StrokeStyle {
            color: Rgba::BOLT_TEAL,
            alpha: 1.0,
            width: 2.0,
            glow: 12.0,
        };
        let mut canvas = PixmapCanvas::new(PhysicalSize::new(40, 40)).expect("pixmap");
        canvas.stroke(&[Point::new(0.0, 20.0), Point::new(40.0, 20.0)], &style);
        let halo = pixel(&canvas, 20, 25);
        assert!(halo[3] > 0 && halo[3] < 255, "halo alpha {}", halo[3]);

        canvas.clear();
        canvas.stroke(
            &[Point::new(0.0, 20.0), Point::new(40.0, 20.0)],
            &StrokeStyle { glow: 0.0, ..style },
        );
        assert_eq!(pixel(&canvas, 20, 25)[3], 0);
    }

    #[test]
    fn translucent_fill_keeps_straight_colour() {
        let mut canvas = PixmapCanvas::new(PhysicalSize::new(4, 4)).expect("pixmap");
        canvas.fill_rect(0.0, 0.0, 4.0, 4.0, Rgba::new(0.0, 0.0, 0.0, 0.5));
        let px = pixel(&canvas, 1, 1);
        assert_eq!(&px[..3], &[0, 0, 0]);
        assert!((px[3] as i32 - 128).abs() <= 1);
    }

    #[test]
    fn resize_reallocates_and_clears() {
        let mut canvas = PixmapCanvas::new(PhysicalSize::new(4, 4)).expect("pixmap");
        canvas.fill_rect(0.0, 0.0, 4.0, 4.0, Rgba::WHITE);
        canvas.resize_backing(PhysicalSize::new(8, 2));
        assert_eq!(canvas.size(), PhysicalSize::new(8, 2));
        assert!(canvas.to_rgba8().iter().all(|&byte| byte == 0));
    }

    #[test]
    fn single_point_paths_draw_nothing() {
        let mut canvas = PixmapCanvas::new(PhysicalSize::new(4, 4)).expect("pixmap");
        canvas.stroke(
            &[Point::new(1.0, 1.0)],
            &StrokeStyle {
                color: Rgba::WHITE,
                alpha: 1.0,
                width: 3.0,
                glow: 4.0,
            },
        );
        assert!(canvas.to_rgba8().iter().all(|&byte| byte == 0));
    }
}
