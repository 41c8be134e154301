use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use super::config::{check_baseline, lookup, Rank, Recommendation, ScoringConfig, TierThresholds, UserMode};
use crate::{ConfigError, Direction, Market, Metric, MetricBundle};

/// Slack applied at tier boundaries so a deviation computed as exactly
/// -10% never lands in the lower tier through float rounding.
const BOUNDARY_EPSILON: f64 = 1e-9;

/// Discrete score bucket of a single metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    VeryPoor,
    Poor,
    Normal,
    Good,
    VeryGood,
}

impl Tier {
    /// Tier value on the 0-10 scale.
    pub const fn value(self) -> u8 {
        match self {
            Self::VeryPoor => 0,
            Self::Poor => 2,
            Self::Normal => 5,
            Self::Good => 8,
            Self::VeryGood => 10,
        }
    }

    /// Classify a favorable deviation; boundaries belong to the better tier.
    pub fn from_deviation(deviation: f64, thresholds: &TierThresholds) -> Self {
        let reaches = |bound: f64| deviation >= bound - BOUNDARY_EPSILON;
        if reaches(thresholds.very_good) {
            Self::VeryGood
        } else if reaches(thresholds.good) {
            Self::Good
        } else if reaches(thresholds.normal) {
            Self::Normal
        } else if reaches(thresholds.poor) {
            Self::Poor
        } else {
            Self::VeryPoor
        }
    }
}

impl Serialize for Tier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.value())
    }
}

/// Relative deviation from the baseline, positive when the value is favorable.
pub fn favorable_deviation(value: f64, baseline: f64, direction: Direction) -> f64 {
    match direction {
        Direction::HigherIsBetter => (value - baseline) / baseline,
        Direction::LowerIsBetter => (baseline - value) / baseline,
    }
}

/// Breakdown for one scored metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricScore {
    pub value: Option<f64>,
    pub baseline: f64,
    pub deviation: Option<f64>,
    pub tier: Tier,
    pub points: f64,
    pub max_points: f64,
    /// `false` when the provider did not report the metric and neutral credit was given.
    pub observed: bool,
}

/// Composite score with per-metric breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    pub mode: UserMode,
    pub market: Market,
    pub per_metric: BTreeMap<Metric, MetricScore>,
    pub composite: f64,
    pub rank: Rank,
    pub recommendation: Recommendation,
    pub observed_metrics: usize,
}

/// Mode-aware scorer over validated configuration.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    /// Validates `config` up front so scoring never hits a missing table entry.
    pub fn new(config: ScoringConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn update_baseline(
        &mut self,
        market: Market,
        metric: Metric,
        value: f64,
    ) -> Result<(), ConfigError> {
        let value = check_baseline(market, metric, value)?;
        self.config
            .baselines
            .entry(market)
            .or_default()
            .insert(metric, value);
        Ok(())
    }

    pub fn score(&self, bundle: &MetricBundle, mode: UserMode) -> Result<ScoreResult, ConfigError> {
        let profile = self.config.profile(mode)?;
        let market = Market::classify(&bundle.ticker);
        let max_points = profile.max_points_per_metric;

        let mut per_metric = BTreeMap::new();
        for &metric in &profile.metrics {
            let baseline = self.config.baseline(market, metric)?;
            let direction = self.config.direction(metric)?;

            let score = match bundle.get(metric) {
                Some(value) => {
                    let deviation = favorable_deviation(value, baseline, direction);
                    let tier = Tier::from_deviation(deviation, &self.config.tier_thresholds);
                    MetricScore {
                        value: Some(value),
                        baseline,
                        deviation: Some(deviation),
                        tier,
                        points: f64::from(tier.value()) / 10.0 * max_points,
                        max_points,
                        observed: true,
                    }
                }
                None => MetricScore {
                    value: None,
                    baseline,
                    deviation: None,
                    tier: Tier::Normal,
                    points: max_points * 0.5,
                    max_points,
                    observed: false,
                },
            };
            per_metric.insert(metric, score);
        }

        let earned: f64 = per_metric.values().map(|score| score.points).sum();
        let composite = round_one_decimal(earned / profile.max_total() * 100.0);
        let observed_metrics = per_metric.values().filter(|score| score.observed).count();

        Ok(ScoreResult {
            mode,
            market,
            per_metric,
            composite,
            rank: lookup(&self.config.rank_cutoffs, composite).unwrap_or(Rank::D),
            recommendation: lookup(&self.config.recommendation_cutoffs, composite)
                .unwrap_or(Recommendation::NotRecommended),
            observed_metrics,
        })
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
