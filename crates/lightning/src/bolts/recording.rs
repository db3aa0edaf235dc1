//! [`Canvas`] that records every call, for unit tests.

use std::cell::RefCell;
use std::rc::Rc;

use winit::dpi::PhysicalSize;

use crate::types::Rgba;

use super::canvas::{Canvas, Point, StrokeStyle};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CanvasOp {
    Resize(PhysicalSize<u32>),
    Scale(f32),
    Clear,
    FillRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgba,
    },
    Stroke {
        points: Vec<Point>,
        style: StrokeStyle,
    },
}

pub(crate) type CanvasLog = Rc<RefCell<Vec<CanvasOp>>>;

#[derive(Default)]
pub(crate) struct RecordingCanvas {
    log: CanvasLog,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> CanvasLog {
        Rc::clone(&self.log)
    }
}

impl Canvas for RecordingCanvas {
    fn resize_backing(&mut self, size: PhysicalSize<u32>) {
        self.log.borrow_mut().push(CanvasOp::Resize(size));
    }

    fn set_scale(&mut self, scale: f32) {
        self.log.borrow_mut().push(CanvasOp::Scale(scale));
    }

    fn clear(&mut self) {
        self.log.borrow_mut().push(CanvasOp::Clear);
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgba) {
        self.log.borrow_mut().push(CanvasOp::FillRect {
            x,
            y,
            width,
            height,
            color,
        });
    }

    fn stroke(&mut self, points: &[Point], style: &StrokeStyle) {
        self.log.borrow_mut().push(CanvasOp::Stroke {
            points: points.to_vec(),
            style: *style,
        });
    }
}

/// Strokes recorded since the log was last drained.
pub(crate) fn strokes(log: &CanvasLog) -> Vec<(Vec<Point>, StrokeStyle)> {
    log.borrow()
        .iter()
        .filter_map(|op| match op {
            CanvasOp::Stroke { points, style } => Some((points.clone(), *style)),
            _ => None,
        })
        .collect()
}
