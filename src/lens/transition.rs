//! Focus push/return animation.
//!
//! When a node is focused, the nodes crowding the edge margin are pushed
//! outward past the pull boundary so the focused neighbourhood reads cleanly.
//! A changed margin set restarts the push from wherever each node is drawn
//! right now; clearing it animates everything back to its pull position.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::time::Instant;

use eframe::egui::Vec2;
use serde::Deserialize;

use super::zones::{ViewportZones, push_target};

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransitionConfig {
    pub push_ms: f32,
    pub return_ms: f32,
    pub overshoot: f32,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            push_ms: 1200.0,
            return_ms: 900.0,
            overshoot: 1.15,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransitionPhase {
    #[default]
    Idle,
    Pushing,
    /// Push finished; targets follow the camera until focus changes.
    Tracking,
    Returning,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct AnimationEntry {
    start: Vec2,
    target: Vec2,
    /// Progress the node was drawn at when this batch began.
    start_progress: f32,
    returning: bool,
}

impl AnimationEntry {
    fn progress(&self, eased: f32) -> f32 {
        if eased >= 1.0 {
            return if self.returning { 0.0 } else { 1.0 };
        }
        if self.returning {
            self.start_progress * (1.0 - eased)
        } else {
            self.start_progress + (1.0 - self.start_progress) * eased
        }
    }
}

/// Position that replaces the pull position while a node is animated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FocusOverride {
    pub position: Vec2,
    /// `0` at the pull position, `1` fully pushed. Falls while returning.
    pub progress: f32,
}

pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

#[derive(Clone, Debug)]
pub struct FocusTransition<K> {
    config: TransitionConfig,
    phase: TransitionPhase,
    started: Option<Instant>,
    progress: f32,
    margin: HashSet<K>,
    entries: HashMap<K, AnimationEntry>,
}

impl<K: Clone + Eq + Hash> FocusTransition<K> {
    pub fn new(config: TransitionConfig) -> Self {
        Self {
            config,
            phase: TransitionPhase::Idle,
            started: None,
            progress: 0.0,
            margin: HashSet::new(),
            entries: HashMap::new(),
        }
    }

    pub fn config(&self) -> &TransitionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: TransitionConfig) {
        self.config = config;
    }

    pub fn phase(&self) -> TransitionPhase {
        self.phase
    }

    pub fn is_animating(&self) -> bool {
        matches!(
            self.phase,
            TransitionPhase::Pushing | TransitionPhase::Returning
        )
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn margin(&self) -> &HashSet<K> {
        &self.margin
    }

    /// Drops every animation without easing back.
    pub fn reset(&mut self) {
        self.phase = TransitionPhase::Idle;
        self.started = None;
        self.progress = 0.0;
        self.margin.clear();
        self.entries.clear();
    }

    /// Advances the animation to `now`.
    ///
    /// `margin` is the set to push while focus is active, `None` once focus
    /// is gone. `natural` gives layout positions and `rendered` the position
    /// the pull pass would draw a node at without any override.
    pub fn update<N, R>(
        &mut self,
        now: Instant,
        margin: Option<&HashSet<K>>,
        zones: &ViewportZones,
        natural: N,
        rendered: R,
    ) where
        N: Fn(&K) -> Option<Vec2>,
        R: Fn(&K) -> Option<Vec2>,
    {
        let requested_empty = margin.is_none_or(HashSet::is_empty);
        let changed = match margin {
            Some(margin) => *margin != self.margin,
            None => !self.margin.is_empty(),
        };

        if changed {
            if requested_empty {
                self.begin_return(now, &rendered, &natural);
            } else if let Some(margin) = margin {
                self.begin_push(now, margin, zones, &natural, &rendered);
            }
        }

        let duration_ms = match self.phase {
            TransitionPhase::Idle => return,
            TransitionPhase::Pushing => self.config.push_ms,
            TransitionPhase::Tracking => 0.0,
            TransitionPhase::Returning => self.config.return_ms,
        };
        self.progress = self.progress_at(now, duration_ms);

        let overshoot = self.config.overshoot;
        for (key, entry) in &mut self.entries {
            if entry.returning {
                if let Some(home) = rendered(key).or_else(|| natural(key)) {
                    entry.target = home;
                }
            } else if let Some(position) = natural(key) {
                entry.target = push_target(zones, position, overshoot);
            }
        }

        if self.progress < 1.0 {
            return;
        }

        match self.phase {
            TransitionPhase::Pushing => {
                self.entries.retain(|_, entry| !entry.returning);
                self.phase = TransitionPhase::Tracking;
                log::debug!("focus push settled, tracking {} nodes", self.entries.len());
            }
            TransitionPhase::Returning => {
                self.entries.clear();
                self.started = None;
                self.phase = TransitionPhase::Idle;
                log::debug!("focus return finished");
            }
            TransitionPhase::Idle | TransitionPhase::Tracking => {}
        }
    }

    pub fn override_for(&self, key: &K) -> Option<FocusOverride> {
        let entry = self.entries.get(key)?;
        let eased = ease_out_cubic(self.progress);
        let position = if eased >= 1.0 {
            entry.target
        } else {
            entry.start + (entry.target - entry.start) * eased
        };
        Some(FocusOverride {
            position,
            progress: entry.progress(eased),
        })
    }

    /// True once a pushed node has reached its target and is held past the
    /// edge.
    pub fn is_fully_pushed(&self, key: &K) -> bool {
        self.phase == TransitionPhase::Tracking
            && self.entries.get(key).is_some_and(|entry| !entry.returning)
    }

    fn progress_at(&self, now: Instant, duration_ms: f32) -> f32 {
        if duration_ms <= 0.0 {
            return 1.0;
        }
        let elapsed = self
            .started
            .and_then(|started| now.checked_duration_since(started))
            .unwrap_or_default();
        (elapsed.as_secs_f32() * 1000.0 / duration_ms).clamp(0.0, 1.0)
    }

    /// Where a node is drawn right now and how far pushed it looks there.
    fn displayed<N, R>(&self, key: &K, natural: &N, rendered: &R) -> Option<(Vec2, f32)>
    where
        N: Fn(&K) -> Option<Vec2>,
        R: Fn(&K) -> Option<Vec2>,
    {
        match self.override_for(key) {
            Some(focus) => Some((focus.position, focus.progress)),
            None => rendered(key).or_else(|| natural(key)).map(|position| (position, 0.0)),
        }
    }

    fn begin_push<N, R>(
        &mut self,
        now: Instant,
        margin: &HashSet<K>,
        zones: &ViewportZones,
        natural: &N,
        rendered: &R,
    ) where
        N: Fn(&K) -> Option<Vec2>,
        R: Fn(&K) -> Option<Vec2>,
    {
        let mut entries = HashMap::with_capacity(margin.len() + self.entries.len());
        for key in margin {
            let (Some((start, start_progress)), Some(position)) =
                (self.displayed(key, natural, rendered), natural(key))
            else {
                continue;
            };
            let entry = AnimationEntry {
                start,
                target: push_target(zones, position, self.config.overshoot),
                start_progress,
                returning: false,
            };
            entries.insert(key.clone(), entry);
        }

        for key in self.entries.keys() {
            if margin.contains(key) {
                continue;
            }
            let Some((start, start_progress)) = self.displayed(key, natural, rendered) else {
                continue;
            };
            let target = rendered(key).or_else(|| natural(key)).unwrap_or(start);
            entries.insert(
                key.clone(),
                AnimationEntry {
                    start,
                    target,
                    start_progress,
                    returning: true,
                },
            );
        }

        log::debug!(
            "focus push batch: {} pushed, {} returning",
            margin.len(),
            entries.len().saturating_sub(margin.len())
        );
        self.entries = entries;
        self.margin = margin.clone();
        self.started = Some(now);
        self.progress = 0.0;
        self.phase = if self.entries.is_empty() {
            TransitionPhase::Idle
        } else {
            TransitionPhase::Pushing
        };
    }

    fn begin_return<N, R>(&mut self, now: Instant, rendered: &R, natural: &N)
    where
        N: Fn(&K) -> Option<Vec2>,
        R: Fn(&K) -> Option<Vec2>,
    {
        let entries = self
            .entries
            .keys()
            .filter_map(|key| {
                let (start, start_progress) = self.displayed(key, natural, rendered)?;
                let target = rendered(key).or_else(|| natural(key)).unwrap_or(start);
                Some((
                    key.clone(),
                    AnimationEntry {
                        start,
                        target,
                        start_progress,
                        returning: true,
                    },
                ))
            })
            .collect::<HashMap<_, _>>();

        self.entries = entries;
        self.margin.clear();
        self.started = Some(now);
        self.progress = 0.0;
        self.phase = if self.entries.is_empty() {
            TransitionPhase::Idle
        } else {
            TransitionPhase::Returning
        };
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use eframe::egui::vec2;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::lens::pull::tests::square_zones;

    fn layout() -> HashMap<&'static str, Vec2> {
        HashMap::from([
            ("a", vec2(100.0, 0.0)),
            ("b", vec2(0.0, -200.0)),
            ("c", vec2(-50.0, 50.0)),
        ])
    }

    fn after(start: Instant, ms: u64) -> Instant {
        start + Duration::from_millis(ms)
    }

    #[test]
    fn ease_out_cubic_hits_its_endpoints() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert!((ease_out_cubic(0.5) - 0.875).abs() < 1.0e-6);
        assert_eq!(ease_out_cubic(-3.0), 0.0);
        assert_eq!(ease_out_cubic(7.0), 1.0);
    }

    #[test]
    fn push_runs_from_start_to_target_then_tracks() {
        let positions = layout();
        let lookup = |key: &&str| positions.get(key).copied();
        let zones = square_zones();
        let mut transition = FocusTransition::new(TransitionConfig::default());
        let margin = HashSet::from(["a"]);
        let t0 = Instant::now();

        transition.update(t0, Some(&margin), &zones, lookup, lookup);
        assert_eq!(transition.phase(), TransitionPhase::Pushing);
        let first = transition.override_for(&"a").expect("pushed");
        assert_eq!(first.position, positions["a"]);
        assert_eq!(first.progress, 0.0);
        assert!(transition.override_for(&"b").is_none());

        transition.update(after(t0, 600), Some(&margin), &zones, lookup, lookup);
        let halfway = transition.override_for(&"a").expect("pushed");
        assert!((halfway.progress - 0.875).abs() < 1.0e-3);
        assert!(transition.is_animating());
        assert!(!transition.is_fully_pushed(&"a"));

        transition.update(after(t0, 1_250), Some(&margin), &zones, lookup, lookup);
        assert_eq!(transition.phase(), TransitionPhase::Tracking);
        assert!(transition.is_fully_pushed(&"a"));
        let pushed = transition.override_for(&"a").expect("tracked");
        assert_eq!(pushed.position, push_target(&zones, positions["a"], 1.15));
        assert!(!zones.in_pull_bounds(pushed.position));
    }

    #[test]
    fn tracking_follows_the_camera() {
        let positions = layout();
        let lookup = |key: &&str| positions.get(key).copied();
        let mut zones = square_zones();
        let mut transition = FocusTransition::new(TransitionConfig::default());
        let margin = HashSet::from(["b"]);
        let t0 = Instant::now();

        transition.update(t0, Some(&margin), &zones, lookup, lookup);
        transition.update(after(t0, 2_000), Some(&margin), &zones, lookup, lookup);
        let before = transition.override_for(&"b").expect("tracked").position;

        zones.center += vec2(0.0, 100.0);
        zones.pull_bounds = zones.pull_bounds.translate(vec2(0.0, 100.0));
        transition.update(after(t0, 2_016), Some(&margin), &zones, lookup, lookup);
        let moved = transition.override_for(&"b").expect("tracked").position;
        assert_ne!(before, moved);
        assert_eq!(moved, push_target(&zones, positions["b"], 1.15));
    }

    #[test]
    fn changing_focus_mid_push_restarts_from_drawn_positions() {
        let positions = layout();
        let lookup = |key: &&str| positions.get(key).copied();
        let zones = square_zones();
        let mut transition = FocusTransition::new(TransitionConfig::default());
        let t0 = Instant::now();

        let first = HashSet::from(["a", "c"]);
        transition.update(t0, Some(&first), &zones, lookup, lookup);
        transition.update(after(t0, 400), Some(&first), &zones, lookup, lookup);
        let a_mid = transition.override_for(&"a").expect("pushing");
        assert_ne!(a_mid.position, positions["a"]);

        let second = HashSet::from(["b", "c"]);
        transition.update(after(t0, 400), Some(&second), &zones, lookup, lookup);
        assert_eq!(transition.phase(), TransitionPhase::Pushing);
        assert_eq!(transition.entry_count(), 3);
        assert_eq!(transition.override_for(&"a").expect("returning"), a_mid);
        assert_eq!(transition.override_for(&"b").expect("pushing").progress, 0.0);

        transition.update(after(t0, 1_000), Some(&second), &zones, lookup, lookup);
        let a_back = transition.override_for(&"a").expect("returning");
        assert!(a_back.progress < a_mid.progress);

        transition.update(after(t0, 1_590), Some(&second), &zones, lookup, lookup);
        let a_home = transition.override_for(&"a").expect("returning");
        assert!(a_home.progress < 0.01);
        assert!((a_home.position - positions["a"]).length() < 1.0);

        transition.update(after(t0, 1_700), Some(&second), &zones, lookup, lookup);
        assert_eq!(transition.phase(), TransitionPhase::Tracking);
        assert!(transition.override_for(&"a").is_none());
        assert!(transition.is_fully_pushed(&"b"));
        assert!(transition.is_fully_pushed(&"c"));
        assert_eq!(transition.entry_count(), 2);
    }

    #[test]
    fn clearing_focus_returns_everything_and_goes_idle() {
        let positions = layout();
        let lookup = |key: &&str| positions.get(key).copied();
        let zones = square_zones();
        let mut transition = FocusTransition::new(TransitionConfig::default());
        let t0 = Instant::now();
        let margin = HashSet::from(["a", "b"]);

        transition.update(t0, Some(&margin), &zones, lookup, lookup);
        transition.update(after(t0, 1_500), Some(&margin), &zones, lookup, lookup);
        let held = transition.override_for(&"a").expect("tracked");
        assert_eq!(held.progress, 1.0);

        transition.update(after(t0, 1_500), None, &zones, lookup, lookup);
        assert_eq!(transition.phase(), TransitionPhase::Returning);
        assert_eq!(transition.override_for(&"a").expect("returning"), held);
        assert!(!transition.is_fully_pushed(&"a"));

        transition.update(after(t0, 1_950), None, &zones, lookup, lookup);
        let halfway = transition.override_for(&"a").expect("returning");
        assert!((halfway.progress - 0.125).abs() < 1.0e-3);

        transition.update(after(t0, 2_390), None, &zones, lookup, lookup);
        let nearly_home = transition.override_for(&"a").expect("returning");
        assert!(nearly_home.progress < 0.01);
        assert!((nearly_home.position - positions["a"]).length() < 1.0);

        transition.update(after(t0, 2_500), None, &zones, lookup, lookup);
        assert_eq!(transition.phase(), TransitionPhase::Idle);
        assert_eq!(transition.entry_count(), 0);
        assert!(transition.override_for(&"a").is_none());
        assert!(!transition.is_animating());
    }

    #[test]
    fn return_from_a_partial_push_continues_its_progress() {
        let positions = layout();
        let lookup = |key: &&str| positions.get(key).copied();
        let zones = square_zones();
        let mut transition = FocusTransition::new(TransitionConfig::default());
        let t0 = Instant::now();
        let margin = HashSet::from(["a"]);

        transition.update(t0, Some(&margin), &zones, lookup, lookup);
        transition.update(after(t0, 30), Some(&margin), &zones, lookup, lookup);
        let partial = transition.override_for(&"a").expect("pushing");
        assert!(partial.progress > 0.0 && partial.progress < 0.2);

        transition.update(after(t0, 30), None, &zones, lookup, lookup);
        assert_eq!(transition.override_for(&"a").expect("returning"), partial);

        transition.update(after(t0, 480), None, &zones, lookup, lookup);
        let returning = transition.override_for(&"a").expect("returning");
        assert!(returning.progress < partial.progress);

        transition.update(after(t0, 480), Some(&margin), &zones, lookup, lookup);
        assert_eq!(transition.phase(), TransitionPhase::Pushing);
        assert_eq!(transition.override_for(&"a").expect("pushing"), returning);
    }

    #[test]
    fn clock_running_backwards_holds_at_the_start() {
        let positions = layout();
        let lookup = |key: &&str| positions.get(key).copied();
        let zones = square_zones();
        let mut transition = FocusTransition::new(TransitionConfig::default());
        let t0 = Instant::now() + Duration::from_secs(1);
        let margin = HashSet::from(["c"]);

        transition.update(t0, Some(&margin), &zones, lookup, lookup);
        transition.update(t0 - Duration::from_millis(500), Some(&margin), &zones, lookup, lookup);
        let focus = transition.override_for(&"c").expect("pushing");
        assert_eq!(focus.progress, 0.0);
        assert_eq!(focus.position, positions["c"]);
    }

    #[test]
    fn unknown_nodes_are_skipped() {
        let positions = layout();
        let lookup = |key: &&str| positions.get(key).copied();
        let zones = square_zones();
        let mut transition = FocusTransition::new(TransitionConfig::default());
        let margin = HashSet::from(["ghost"]);

        transition.update(Instant::now(), Some(&margin), &zones, lookup, lookup);
        assert_eq!(transition.phase(), TransitionPhase::Idle);
        assert_eq!(transition.entry_count(), 0);
    }
}
