use std::fs;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::lens::{ConvergenceConfig, PullConfig, TransitionConfig, ZoneConfig};

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_y_degrees: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub fit_ms: f32,
    /// Share of the viewport the fitted bounds may fill.
    pub fit_fill: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 50.0,
            min_distance: 20.0,
            max_distance: 400_000.0,
            fit_ms: 600.0,
            fit_fill: 0.9,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct TopicConfig {
    pub resolution: f64,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self { resolution: 1.0 }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct LensConfig {
    pub zones: ZoneConfig,
    pub pull: PullConfig,
    pub transition: TransitionConfig,
    pub convergence: ConvergenceConfig,
    pub camera: CameraConfig,
    pub topics: TopicConfig,
}

impl LensConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::from_json(&raw)
            .with_context(|| format!("invalid config {}", path.display()))?;
        log::info!("loaded lens config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw).context("config is not valid JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let zones = &self.zones;
        let chrome = zones.chrome;
        ensure!(
            zones.edge_margin_px >= 0.0 && zones.overscan_px >= 0.0,
            "zone margins must be non-negative"
        );
        ensure!(
            [chrome.top, chrome.right, chrome.bottom, chrome.left]
                .iter()
                .all(|inset| *inset >= 0.0),
            "chrome insets must be non-negative"
        );

        ensure!(
            self.pull.fisheye_band_px > 0.0,
            "fisheye band must be positive, got {}",
            self.pull.fisheye_band_px
        );

        let transition = &self.transition;
        ensure!(
            transition.push_ms > 0.0 && transition.return_ms > 0.0,
            "transition durations must be positive"
        );
        ensure!(
            transition.overshoot > 1.0,
            "overshoot must exceed 1, got {}",
            transition.overshoot
        );

        let convergence = &self.convergence;
        ensure!(
            convergence.max_velocity > 0.0,
            "max velocity must be positive"
        );
        ensure!(
            convergence.settle_speed > 0.0,
            "settle speed must be positive"
        );
        ensure!(
            convergence.refit_interval_ticks > 0,
            "refit interval must be at least one tick"
        );

        let camera = &self.camera;
        ensure!(
            camera.fov_y_degrees > 1.0 && camera.fov_y_degrees < 179.0,
            "camera field of view must lie in (1, 179) degrees"
        );
        ensure!(
            camera.min_distance > 0.0 && camera.max_distance > camera.min_distance,
            "camera distance range is empty"
        );
        ensure!(camera.fit_ms >= 0.0, "fit duration must be non-negative");
        ensure!(
            camera.fit_fill > 0.0 && camera.fit_fill <= 1.0,
            "fit fill must lie in (0, 1]"
        );

        ensure!(
            self.topics.resolution.is_finite() && self.topics.resolution > 0.0,
            "topic resolution must be positive"
        );
        Ok(())
    }
}
