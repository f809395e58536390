use std::time::Instant;

use eframe::egui::{Pos2, Rect, Vec2};

use crate::config::CameraConfig;
use crate::lens::{CameraState, Projection, ease_out_cubic};

/// Perspective camera looking straight down at the graph plane.
#[derive(Clone, Debug)]
pub(super) struct Camera {
    config: CameraConfig,
    center: Vec2,
    distance: f32,
    flight: Option<Flight>,
}

#[derive(Clone, Copy, Debug)]
struct Flight {
    from_center: Vec2,
    from_distance: f32,
    to_center: Vec2,
    to_distance: f32,
    started: Instant,
}

impl Camera {
    pub(super) fn new(config: CameraConfig) -> Self {
        Self {
            config,
            center: Vec2::ZERO,
            distance: (config.min_distance * 40.0).min(config.max_distance),
            flight: None,
        }
    }

    pub(super) fn center(&self) -> Vec2 {
        self.center
    }

    pub(super) fn distance(&self) -> f32 {
        self.distance
    }

    pub(super) fn is_flying(&self) -> bool {
        self.flight.is_some()
    }

    pub(super) fn state(&self, viewport_px: Vec2) -> CameraState {
        CameraState {
            center: self.center,
            distance: self.distance,
            projection: Projection::Perspective {
                fov_y_degrees: self.config.fov_y_degrees,
            },
            viewport_px,
        }
    }

    fn half_fov_tan(&self) -> f32 {
        (self.config.fov_y_degrees.clamp(1.0, 179.0) * 0.5)
            .to_radians()
            .tan()
    }

    fn clamp_distance(&self, distance: f32) -> f32 {
        if distance.is_finite() {
            distance.clamp(self.config.min_distance, self.config.max_distance)
        } else {
            self.distance
        }
    }

    /// Distance at which `bounds` fills `fit_fill` of the viewport.
    pub(super) fn fit_distance(&self, bounds: Rect, viewport_px: Vec2) -> f32 {
        let aspect = viewport_px.x.max(1.0) / viewport_px.y.max(1.0);
        let needed_height =
            bounds.height().max(bounds.width() / aspect).max(1.0) / self.config.fit_fill;
        self.clamp_distance(needed_height / (2.0 * self.half_fov_tan()))
    }

    /// Starts an eased flight so that `bounds` fits the viewport.
    pub(super) fn fly_to_fit(&mut self, bounds: Rect, viewport_px: Vec2, now: Instant) {
        if !bounds.is_finite() {
            return;
        }

        let to_center = bounds.center().to_vec2();
        let to_distance = self.fit_distance(bounds, viewport_px);
        if self.config.fit_ms <= 0.0 {
            self.center = to_center;
            self.distance = to_distance;
            self.flight = None;
            return;
        }

        self.flight = Some(Flight {
            from_center: self.center,
            from_distance: self.distance,
            to_center,
            to_distance,
            started: now,
        });
    }

    /// Moves the camera along an active flight. Returns true while flying.
    pub(super) fn advance(&mut self, now: Instant) -> bool {
        let Some(flight) = self.flight else {
            return false;
        };

        let elapsed_ms = now
            .checked_duration_since(flight.started)
            .unwrap_or_default()
            .as_secs_f32()
            * 1000.0;
        let t = (elapsed_ms / self.config.fit_ms.max(f32::EPSILON)).clamp(0.0, 1.0);
        if t >= 1.0 {
            self.center = flight.to_center;
            self.distance = flight.to_distance;
            self.flight = None;
            return false;
        }

        let eased = ease_out_cubic(t);
        self.center = flight.from_center + (flight.to_center - flight.from_center) * eased;
        self.distance = flight.from_distance + (flight.to_distance - flight.from_distance) * eased;
        true
    }

    /// Zooms by `factor` keeping the world point under `pointer` fixed.
    pub(super) fn zoom_about(&mut self, factor: f32, pointer: Pos2, screen: Rect) {
        self.flight = None;
        let viewport_px = screen.size();
        let world_per_px = self.world_per_px(viewport_px);
        let anchor = self.center + (pointer - screen.center()) * world_per_px;

        self.distance = self.clamp_distance(self.distance * factor);
        let world_per_px = self.world_per_px(viewport_px);
        self.center = anchor - (pointer - screen.center()) * world_per_px;
    }

    /// Pans by a screen-space drag.
    pub(super) fn pan_by(&mut self, drag_px: Vec2, viewport_px: Vec2) {
        self.flight = None;
        self.center -= drag_px * self.world_per_px(viewport_px);
    }

    pub(super) fn recenter(&mut self, center: Vec2) {
        self.flight = None;
        self.center = center;
    }

    fn world_per_px(&self, viewport_px: Vec2) -> f32 {
        2.0 * self.distance * self.half_fov_tan() / viewport_px.y.max(1.0)
    }
}
