//! Fundamental scoring.
//!
//! Each scored metric is compared to a per-market baseline and bucketed into
//! a tier (0, 2, 5, 8 or 10). A metric the provider did not report earns half
//! of its points. The composite is the earned share of the mode's point
//! budget on a 0-100 scale, mapped to a rank and a recommendation through
//! configurable cutoff tables.

mod config;
mod engine;

pub use config::{
    Cutoff, ModeProfile, Rank, Recommendation, ScoringConfig, TierThresholds, UserMode,
};
pub use engine::{favorable_deviation, MetricScore, ScoreResult, ScoringEngine, Tier};
