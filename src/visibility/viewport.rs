//! Geometric viewport intersection source.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::trace;

use crate::{HandleId, config::SchedulerConfig};

use super::{VisibilitySink, VisibilitySource};

/// Axis-aligned rectangle in logical pixels, document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Grows the rectangle by `margin` on every side.
    pub fn expand(&self, margin: f32) -> Self {
        Self {
            x: self.x - margin,
            y: self.y - margin,
            width: self.width + margin * 2.0,
            height: self.height + margin * 2.0,
        }
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    /// Overlapping region, `None` when the rectangles do not overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return None;
        }
        Some(Rect::new(left, top, right - left, bottom - top))
    }
}

struct Target {
    bounds: Option<Rect>,
    visible: bool,
    sink: VisibilitySink,
}

/// Intersection source driven by explicit scroll and layout updates.
///
/// The viewport is expanded by the proximity margin before testing. An
/// element counts as visible once the intersected fraction of its area
/// reaches the threshold; zero-area elements count when their origin lies in
/// the expanded viewport. Handles without bounds are hidden until placed.
pub struct ViewportSource {
    viewport: Rect,
    threshold: f32,
    margin: f32,
    targets: BTreeMap<HandleId, Target>,
}

impl ViewportSource {
    pub fn new(viewport: Rect, config: &SchedulerConfig) -> Self {
        Self {
            viewport,
            threshold: config.visibility_threshold,
            margin: config.proximity_margin.as_pixels(),
            targets: BTreeMap::new(),
        }
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    /// Moves the viewport origin and re-evaluates every target.
    pub fn scroll_to(&mut self, x: f32, y: f32) {
        self.viewport.x = x;
        self.viewport.y = y;
        self.refresh();
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport.width = width;
        self.viewport.height = height;
        self.refresh();
    }

    /// Updates the layout box of an observed handle.
    pub fn place(&mut self, handle: HandleId, bounds: Rect) {
        let Some(target) = self.targets.get_mut(&handle) else {
            return;
        };
        target.bounds = Some(bounds);
        let visible = Self::intersects(self.viewport, self.margin, self.threshold, bounds);
        Self::transition(handle, target, visible);
    }

    /// Whether the source currently considers `handle` visible.
    pub fn is_visible(&self, handle: HandleId) -> bool {
        self.targets.get(&handle).is_some_and(|target| target.visible)
    }

    fn refresh(&mut self) {
        let (viewport, margin, threshold) = (self.viewport, self.margin, self.threshold);
        for (handle, target) in self.targets.iter_mut() {
            let visible = target
                .bounds
                .is_some_and(|bounds| Self::intersects(viewport, margin, threshold, bounds));
            Self::transition(*handle, target, visible);
        }
    }

    fn intersects(viewport: Rect, margin: f32, threshold: f32, bounds: Rect) -> bool {
        let root = viewport.expand(margin);
        let area = bounds.area();
        if area <= 0.0 {
            return root.contains_point(bounds.x, bounds.y);
        }
        match root.intersection(&bounds) {
            Some(overlap) => overlap.area() / area >= threshold,
            None => false,
        }
    }

    fn transition(handle: HandleId, target: &mut Target, visible: bool) {
        if target.visible == visible {
            return;
        }
        target.visible = visible;
        trace!(target = "visibility", %handle, visible, "intersection changed");
        if visible {
            target.sink.entered(handle);
        } else {
            target.sink.exited(handle);
        }
    }
}

impl VisibilitySource for ViewportSource {
    fn observe(&mut self, handle: HandleId, bounds: Option<Rect>, sink: VisibilitySink) {
        if self.targets.contains_key(&handle) {
            return;
        }
        let visible = bounds.is_some_and(|bounds| {
            Self::intersects(self.viewport, self.margin, self.threshold, bounds)
        });
        if visible {
            sink.entered(handle);
        }
        self.targets.insert(
            handle,
            Target {
                bounds,
                visible,
                sink,
            },
        );
    }

    fn unobserve(&mut self, handle: HandleId) {
        self.targets.remove(&handle);
    }

    fn observed(&self) -> usize {
        self.targets.len()
    }
}
