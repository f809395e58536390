use eframe::egui::{Pos2, Rect, Vec2, vec2};
use serde::Deserialize;

const MIN_VIEWPORT_PX: f32 = 1.0;
const MAX_INSET_FRACTION: f32 = 0.45;
const MIN_DISTANCE: f32 = 1.0e-3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    Perspective { fov_y_degrees: f32 },
    Orthographic { world_height: f32 },
}

impl Projection {
    fn visible_height(self, distance: f32) -> f32 {
        match self {
            Self::Perspective { fov_y_degrees } => {
                let half_fov = (fov_y_degrees.clamp(1.0, 179.0) * 0.5).to_radians();
                2.0 * distance.max(MIN_DISTANCE) * half_fov.tan()
            }
            Self::Orthographic { world_height } => world_height.max(MIN_DISTANCE),
        }
    }
}

/// Camera sample for one frame. `center` is the point on the graph plane the
/// camera looks at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraState {
    pub center: Vec2,
    pub distance: f32,
    pub projection: Projection,
    pub viewport_px: Vec2,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChromeInsets {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ZoneConfig {
    /// Width of the cliff band between the pull boundary and the viewport edge.
    pub edge_margin_px: f32,
    /// Extra inset keeping pulled nodes clear of fixed UI chrome.
    pub chrome: ChromeInsets,
    pub overscan_px: f32,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            edge_margin_px: 36.0,
            chrome: ChromeInsets {
                top: 28.0,
                right: 8.0,
                bottom: 8.0,
                left: 8.0,
            },
            overscan_px: 120.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportZones {
    pub center: Vec2,
    pub viewport: Rect,
    pub pull_bounds: Rect,
    pub extended_viewport: Rect,
    pub world_per_px: f32,
}

pub fn compute_viewport_zones(camera: &CameraState, config: &ZoneConfig) -> ViewportZones {
    let width_px = camera.viewport_px.x.max(MIN_VIEWPORT_PX);
    let height_px = camera.viewport_px.y.max(MIN_VIEWPORT_PX);

    let visible_height = camera.projection.visible_height(camera.distance);
    let world_per_px = visible_height / height_px;
    let size = vec2(width_px, height_px) * world_per_px;
    let center = camera.center;
    let viewport = Rect::from_center_size(center.to_pos2(), size);

    let inset = |pixels: f32, extent: f32| {
        ((pixels.max(0.0) * world_per_px).max(f32::EPSILON * extent.max(1.0)))
            .min(extent * MAX_INSET_FRACTION)
    };
    let chrome = config.chrome;
    let margin = config.edge_margin_px;
    let pull_bounds = Rect::from_min_max(
        Pos2::new(
            viewport.min.x + inset(margin + chrome.left, size.x),
            viewport.min.y + inset(margin + chrome.top, size.y),
        ),
        Pos2::new(
            viewport.max.x - inset(margin + chrome.right, size.x),
            viewport.max.y - inset(margin + chrome.bottom, size.y),
        ),
    );

    let overscan = (config.overscan_px.max(0.0) * world_per_px).max(world_per_px);
    let extended_viewport = viewport.expand(overscan);

    ViewportZones {
        center,
        viewport,
        pull_bounds,
        extended_viewport,
        world_per_px,
    }
}

impl ViewportZones {
    pub fn in_pull_bounds(&self, point: Vec2) -> bool {
        self.pull_bounds.contains(point.to_pos2())
    }

    pub fn in_extended_viewport(&self, point: Vec2) -> bool {
        self.extended_viewport.contains(point.to_pos2())
    }

    /// Radii for fisheye compression around the camera center: the horizon
    /// is the largest circle that fits inside the pull boundary.
    pub fn fisheye_radii(&self, band_px: f32) -> (f32, f32) {
        let bounds = self.pull_bounds;
        let max_radius = (self.center.x - bounds.min.x)
            .min(bounds.max.x - self.center.x)
            .min(self.center.y - bounds.min.y)
            .min(bounds.max.y - self.center.y)
            .max(0.0);
        let start_radius = (max_radius - band_px.max(0.0) * self.world_per_px).max(max_radius * 0.5);
        (start_radius, max_radius)
    }

    pub fn world_to_screen(&self, screen: Rect, world: Vec2) -> Pos2 {
        screen.center() + (world - self.center) / self.world_per_px
    }

    pub fn screen_to_world(&self, screen: Rect, point: Pos2) -> Vec2 {
        self.center + (point - screen.center()) * self.world_per_px
    }
}

/// Where the ray from `origin` through `point` leaves `rect`. A ray with no
/// direction stays at `point`.
pub fn ray_exit(origin: Vec2, point: Vec2, rect: Rect) -> Vec2 {
    let direction = point - origin;
    let axis_t = |delta: f32, low: f32, high: f32, start: f32| {
        if delta > f32::EPSILON {
            (high - start) / delta
        } else if delta < -f32::EPSILON {
            (low - start) / delta
        } else {
            f32::INFINITY
        }
    };

    let t = axis_t(direction.x, rect.min.x, rect.max.x, origin.x)
        .min(axis_t(direction.y, rect.min.y, rect.max.y, origin.y));
    if !t.is_finite() {
        return point;
    }

    origin + direction * t.max(0.0)
}

/// Pulls `point` back onto `rect` along the ray from `origin`. Points already
/// inside are returned unchanged.
pub fn clamp_to_bounds(origin: Vec2, point: Vec2, rect: Rect) -> Vec2 {
    if rect.contains(point.to_pos2()) {
        return point;
    }
    ray_exit(origin, point, rect)
}

/// Edge position for a node being pushed out of the way of a focus target:
/// the pull boundary exit along the camera ray, carried `overshoot` times as
/// far from the camera so the node visibly leaves past the edge.
pub fn push_target(zones: &ViewportZones, natural: Vec2, overshoot: f32) -> Vec2 {
    let exit = ray_exit(zones.center, natural, zones.pull_bounds);
    zones.center + (exit - zones.center) * overshoot.max(1.0)
}
