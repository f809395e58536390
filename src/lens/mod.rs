//! Viewport-relative pull, fisheye focus and layout convergence.

pub mod convergence;
pub mod fisheye;
pub mod pull;
pub mod transition;
pub mod zones;

pub use convergence::{AutoFitPolicy, ConvergenceConfig, ConvergenceDetector, FitRequest};
pub use pull::{
    ChunkGraph, ChunkPullState, ContentIndex, FocusLens, KeywordIndex, NodeClass, PullConfig,
    PullLimits, PullState,
};
pub use transition::{FocusTransition, TransitionConfig, TransitionPhase, ease_out_cubic};
pub use zones::{CameraState, Projection, ViewportZones, ZoneConfig, compute_viewport_zones};
