use eframe::egui::Vec2;
use serde::Deserialize;

/// Share of the fastest nodes ignored when judging whether the layout has
/// settled, so a few orbiting stragglers do not hold it open.
const OUTLIER_FRACTION: f32 = 0.05;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConvergenceConfig {
    pub max_velocity: f32,
    pub warmup_ticks: u32,
    pub settle_speed: f32,
    pub fit_after_ticks: u32,
    pub refit_interval_ticks: u32,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            max_velocity: 40.0,
            warmup_ticks: 60,
            settle_speed: 0.5,
            fit_after_ticks: 120,
            refit_interval_ticks: 90,
        }
    }
}

/// Watches simulation ticks and flags the moment the layout starts cooling.
#[derive(Clone, Debug, Default)]
pub struct ConvergenceDetector {
    config: ConvergenceConfig,
    tick_count: u32,
    cooling_down: bool,
    cooling_just_started: bool,
    last_speed: f32,
    speeds: Vec<f32>,
}

impl ConvergenceDetector {
    pub fn new(config: ConvergenceConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ConvergenceConfig {
        &self.config
    }

    pub fn tick_count(&self) -> u32 {
        self.tick_count
    }

    pub fn is_cooling_down(&self) -> bool {
        self.cooling_down
    }

    /// True only on the tick that crossed into cooling.
    pub fn cooling_just_started(&self) -> bool {
        self.cooling_just_started
    }

    /// Speed of the node at the outlier cut on the last observed tick.
    pub fn last_speed(&self) -> f32 {
        self.last_speed
    }

    pub fn reset(&mut self) {
        self.tick_count = 0;
        self.cooling_down = false;
        self.cooling_just_started = false;
        self.last_speed = 0.0;
        self.speeds.clear();
    }

    /// Clamps each velocity component to the configured limit, then updates
    /// the cooling state from the clamped speeds.
    pub fn observe_tick<'a>(&mut self, velocities: impl IntoIterator<Item = &'a mut Vec2>) {
        self.tick_count = self.tick_count.saturating_add(1);
        self.cooling_just_started = false;

        let limit = self.config.max_velocity.abs();
        self.speeds.clear();
        for velocity in velocities {
            velocity.x = velocity.x.clamp(-limit, limit);
            velocity.y = velocity.y.clamp(-limit, limit);
            self.speeds.push(velocity.length());
        }

        if self.speeds.is_empty() {
            self.last_speed = 0.0;
        } else {
            self.speeds
                .sort_unstable_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
            let cut = ((self.speeds.len() as f32) * OUTLIER_FRACTION).floor() as usize;
            self.last_speed = self.speeds[cut.min(self.speeds.len() - 1)];
        }

        if !self.cooling_down
            && self.tick_count > self.config.warmup_ticks
            && self.last_speed < self.config.settle_speed
        {
            self.cooling_down = true;
            self.cooling_just_started = true;
            log::debug!(
                "layout cooling after {} ticks (speed {:.3})",
                self.tick_count,
                self.last_speed
            );
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FitRequest {
    None,
    /// First fit once the layout has cooled.
    Initial,
    /// Keep the still-expanding layout in frame until it cools.
    Periodic,
}

/// Decides when the camera should frame the whole graph on its own.
#[derive(Clone, Debug, Default)]
pub struct AutoFitPolicy {
    fitted: bool,
    last_periodic_tick: u32,
}

impl AutoFitPolicy {
    pub fn has_fitted(&self) -> bool {
        self.fitted
    }

    /// Starts a new session, typically after a layer switch or reload.
    pub fn reset_session(&mut self) {
        self.fitted = false;
        self.last_periodic_tick = 0;
    }

    pub fn evaluate(&mut self, detector: &ConvergenceDetector, user_interacted: bool) -> FitRequest {
        if user_interacted || self.fitted {
            return FitRequest::None;
        }

        let config = detector.config();
        let tick = detector.tick_count();
        if detector.is_cooling_down() {
            if tick >= config.fit_after_ticks {
                self.fitted = true;
                return FitRequest::Initial;
            }
            return FitRequest::None;
        }

        let interval = config.refit_interval_ticks.max(1);
        if tick >= self.last_periodic_tick.saturating_add(interval) {
            self.last_periodic_tick = tick;
            return FitRequest::Periodic;
        }
        FitRequest::None
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;
    use pretty_assertions::assert_eq;

    use super::*;

    fn tick(detector: &mut ConvergenceDetector, velocities: &mut [Vec2]) {
        detector.observe_tick(velocities.iter_mut());
    }

    #[test]
    fn velocity_components_are_clamped() {
        let mut detector = ConvergenceDetector::new(ConvergenceConfig::default());
        let mut velocities = [vec2(120.0, -3.0), vec2(-55.0, 90.0), vec2(1.0, 2.0)];
        tick(&mut detector, &mut velocities);
        assert_eq!(velocities[0], vec2(40.0, -3.0));
        assert_eq!(velocities[1], vec2(-40.0, 40.0));
        assert_eq!(velocities[2], vec2(1.0, 2.0));
    }

    #[test]
    fn no_cooling_during_warmup() {
        let mut detector = ConvergenceDetector::new(ConvergenceConfig::default());
        let mut velocities = vec![Vec2::ZERO; 20];
        for _ in 0..60 {
            tick(&mut detector, &mut velocities);
            assert!(!detector.is_cooling_down());
        }
        tick(&mut detector, &mut velocities);
        assert!(detector.is_cooling_down());
        assert!(detector.cooling_just_started());
    }

    #[test]
    fn cooling_is_reported_exactly_once() {
        let mut detector = ConvergenceDetector::new(ConvergenceConfig::default());
        let mut velocities = vec![vec2(0.1, 0.1); 10];
        let mut reports = 0;
        for _ in 0..300 {
            tick(&mut detector, &mut velocities);
            if detector.cooling_just_started() {
                reports += 1;
            }
        }
        assert_eq!(reports, 1);
        assert!(detector.is_cooling_down());
    }

    #[test]
    fn a_few_fast_outliers_do_not_block_cooling() {
        let mut detector = ConvergenceDetector::new(ConvergenceConfig::default());
        let mut velocities = vec![vec2(0.2, 0.0); 100];
        for velocity in velocities.iter_mut().take(5) {
            *velocity = vec2(30.0, 30.0);
        }
        for _ in 0..61 {
            tick(&mut detector, &mut velocities);
        }
        assert!(detector.is_cooling_down());
        assert!((detector.last_speed() - 0.2).abs() < 1.0e-6);
    }

    #[test]
    fn broad_motion_keeps_the_layout_hot() {
        let mut detector = ConvergenceDetector::new(ConvergenceConfig::default());
        let mut velocities = vec![vec2(0.2, 0.0); 100];
        for velocity in velocities.iter_mut().take(6) {
            *velocity = vec2(3.0, 0.0);
        }
        for _ in 0..200 {
            tick(&mut detector, &mut velocities);
        }
        assert!(!detector.is_cooling_down());
        assert_eq!(detector.last_speed(), 3.0);
    }

    #[test]
    fn reset_restarts_warmup() {
        let mut detector = ConvergenceDetector::new(ConvergenceConfig::default());
        let mut velocities = vec![Vec2::ZERO; 4];
        for _ in 0..80 {
            tick(&mut detector, &mut velocities);
        }
        assert!(detector.is_cooling_down());
        detector.reset();
        assert_eq!(detector.tick_count(), 0);
        assert!(!detector.is_cooling_down());
        tick(&mut detector, &mut velocities);
        assert!(!detector.is_cooling_down());
    }

    #[test]
    fn initial_fit_waits_for_cooling_and_minimum_ticks() {
        let mut detector = ConvergenceDetector::new(ConvergenceConfig::default());
        let mut policy = AutoFitPolicy::default();
        let mut requests = Vec::new();
        for step in 0..200 {
            let speed = if step < 100 { 5.0 } else { 0.0 };
            let mut velocities = vec![vec2(speed, 0.0); 8];
            tick(&mut detector, &mut velocities);
            let request = policy.evaluate(&detector, false);
            if request != FitRequest::None {
                requests.push((detector.tick_count(), request));
            }
        }
        assert_eq!(
            requests,
            vec![(90, FitRequest::Periodic), (120, FitRequest::Initial)]
        );
        assert!(policy.has_fitted());
    }

    #[test]
    fn periodic_fits_repeat_while_hot() {
        let mut detector = ConvergenceDetector::new(ConvergenceConfig::default());
        let mut policy = AutoFitPolicy::default();
        let mut velocities = vec![vec2(5.0, 0.0); 8];

        let mut ticks = Vec::new();
        for _ in 0..300 {
            tick(&mut detector, &mut velocities);
            if policy.evaluate(&detector, false) == FitRequest::Periodic {
                ticks.push(detector.tick_count());
            }
        }
        assert_eq!(ticks, vec![90, 180, 270]);
        assert!(!policy.has_fitted());
    }

    #[test]
    fn user_interaction_suppresses_fitting() {
        let mut detector = ConvergenceDetector::new(ConvergenceConfig::default());
        let mut policy = AutoFitPolicy::default();
        let mut velocities = vec![Vec2::ZERO; 8];
        for _ in 0..200 {
            tick(&mut detector, &mut velocities);
            assert_eq!(policy.evaluate(&detector, true), FitRequest::None);
        }
        assert!(!policy.has_fitted());

        policy.reset_session();
        assert_eq!(policy.evaluate(&detector, false), FitRequest::Initial);
    }
}
