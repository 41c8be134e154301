use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Direction, Market, Metric, ValidationError};

/// Audience the score is tailored to; decides which metrics are scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserMode {
    Beginner,
    Intermediate,
    Advanced,
}

impl UserMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl Display for UserMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserMode {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            other => Err(ValidationError::InvalidMode {
                value: other.to_string(),
            }),
        }
    }
}

/// Metrics scored in a mode and the points each one can earn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeProfile {
    pub metrics: Vec<Metric>,
    pub max_points_per_metric: f64,
}

impl ModeProfile {
    pub fn beginner() -> Self {
        Self {
            metrics: vec![Metric::Per, Metric::DividendYield],
            max_points_per_metric: 50.0,
        }
    }

    pub fn intermediate() -> Self {
        Self {
            metrics: vec![
                Metric::Per,
                Metric::Pbr,
                Metric::Roe,
                Metric::Roa,
                Metric::DividendYield,
                Metric::ProfitMargin,
                Metric::DebtToEquity,
                Metric::CurrentRatio,
                Metric::EarningsGrowth,
                Metric::RevenueGrowth,
            ],
            max_points_per_metric: 10.0,
        }
    }

    pub fn max_total(&self) -> f64 {
        self.max_points_per_metric * self.metrics.len() as f64
    }
}

/// Favorable-deviation lower bounds for each tier, as fractions of the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    pub very_good: f64,
    pub good: f64,
    pub normal: f64,
    pub poor: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            very_good: 0.20,
            good: 0.10,
            normal: -0.10,
            poor: -0.20,
        }
    }
}

impl TierThresholds {
    fn validate(&self) -> Result<(), ConfigError> {
        let bounds = [self.very_good, self.good, self.normal, self.poor];
        let finite = bounds.iter().all(|bound| bound.is_finite());
        let descending = bounds.windows(2).all(|pair| pair[0] > pair[1]);
        if finite && descending {
            Ok(())
        } else {
            Err(ConfigError::InvalidTierThresholds)
        }
    }
}

/// Letter rank derived from the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rank {
    S,
    A,
    B,
    C,
    D,
}

/// Investment recommendation derived from the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    StrongBuy,
    Buy,
    Neutral,
    Caution,
    NotRecommended,
}

/// One row of a cutoff table: scores at or above `min_score` get `label`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cutoff<T> {
    pub min_score: f64,
    pub label: T,
}

impl<T> Cutoff<T> {
    pub const fn new(min_score: f64, label: T) -> Self {
        Self { min_score, label }
    }
}

/// Picks the label of the first row whose bound the score reaches.
pub(crate) fn lookup<T: Copy>(table: &[Cutoff<T>], score: f64) -> Option<T> {
    table
        .iter()
        .find(|cutoff| score >= cutoff.min_score)
        .map(|cutoff| cutoff.label)
}

fn validate_cutoffs<T>(table: &[Cutoff<T>], name: &'static str) -> Result<(), ConfigError> {
    let finite = table.iter().all(|cutoff| cutoff.min_score.is_finite());
    let descending = table
        .windows(2)
        .all(|pair| pair[0].min_score > pair[1].min_score);
    let total = table.last().is_some_and(|last| last.min_score <= 0.0);
    if finite && descending && total {
        Ok(())
    } else {
        Err(ConfigError::InvalidCutoffs { table: name })
    }
}

/// Baselines, directions, tiers, modes and cutoff tables used by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub baselines: BTreeMap<Market, BTreeMap<Metric, f64>>,
    pub directions: BTreeMap<Metric, Direction>,
    pub tier_thresholds: TierThresholds,
    pub modes: BTreeMap<UserMode, ModeProfile>,
    pub rank_cutoffs: Vec<Cutoff<Rank>>,
    pub recommendation_cutoffs: Vec<Cutoff<Recommendation>>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let table = default_baselines();
        Self {
            baselines: Market::ALL
                .into_iter()
                .map(|market| (market, table.clone()))
                .collect(),
            directions: default_directions(),
            tier_thresholds: TierThresholds::default(),
            modes: BTreeMap::from([
                (UserMode::Beginner, ModeProfile::beginner()),
                (UserMode::Intermediate, ModeProfile::intermediate()),
            ]),
            rank_cutoffs: vec![
                Cutoff::new(80.0, Rank::S),
                Cutoff::new(65.0, Rank::A),
                Cutoff::new(50.0, Rank::B),
                Cutoff::new(35.0, Rank::C),
                Cutoff::new(0.0, Rank::D),
            ],
            recommendation_cutoffs: vec![
                Cutoff::new(80.0, Recommendation::StrongBuy),
                Cutoff::new(70.0, Recommendation::Buy),
                Cutoff::new(60.0, Recommendation::Neutral),
                Cutoff::new(40.0, Recommendation::Caution),
                Cutoff::new(0.0, Recommendation::NotRecommended),
            ],
        }
    }
}

impl ScoringConfig {
    /// Fills baselines, directions and modes a partial file left out.
    pub fn merge_defaults(mut self) -> Self {
        let defaults = Self::default();
        for (market, table) in defaults.baselines {
            let entry = self.baselines.entry(market).or_default();
            for (metric, baseline) in table {
                entry.entry(metric).or_insert(baseline);
            }
        }
        for (metric, direction) in defaults.directions {
            self.directions.entry(metric).or_insert(direction);
        }
        for (mode, profile) in defaults.modes {
            self.modes.entry(mode).or_insert(profile);
        }
        self
    }

    /// Rejects configurations that could not score every configured mode.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (mode, profile) in &self.modes {
            let budget = profile.max_points_per_metric;
            if profile.metrics.is_empty() || !budget.is_finite() || budget <= 0.0 {
                return Err(ConfigError::EmptyMode {
                    mode: mode.to_string(),
                });
            }

            for &metric in &profile.metrics {
                if !self.directions.contains_key(&metric) {
                    return Err(ConfigError::MissingDirection { metric });
                }
                for market in Market::ALL {
                    self.baseline(market, metric)?;
                }
            }
        }

        self.tier_thresholds.validate()?;
        validate_cutoffs(&self.rank_cutoffs, "rank")?;
        validate_cutoffs(&self.recommendation_cutoffs, "recommendation")?;
        Ok(())
    }

    pub fn profile(&self, mode: UserMode) -> Result<&ModeProfile, ConfigError> {
        self.modes.get(&mode).ok_or_else(|| ConfigError::UnknownMode {
            mode: mode.to_string(),
        })
    }

    pub fn baseline(&self, market: Market, metric: Metric) -> Result<f64, ConfigError> {
        let value = self
            .baselines
            .get(&market)
            .and_then(|table| table.get(&metric))
            .copied()
            .ok_or(ConfigError::MissingBaseline { metric, market })?;
        check_baseline(market, metric, value)
    }

    pub fn direction(&self, metric: Metric) -> Result<Direction, ConfigError> {
        self.directions
            .get(&metric)
            .copied()
            .ok_or(ConfigError::MissingDirection { metric })
    }
}

pub(crate) fn check_baseline(market: Market, metric: Metric, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidBaseline {
            metric,
            market,
            value,
        })
    }
}

fn default_baselines() -> BTreeMap<Metric, f64> {
    BTreeMap::from([
        (Metric::Per, 20.0),
        (Metric::Pbr, 1.5),
        (Metric::Roe, 12.0),
        (Metric::Roa, 6.0),
        (Metric::DividendYield, 2.5),
        (Metric::ProfitMargin, 15.0),
        (Metric::OperatingMargin, 15.0),
        (Metric::DebtToEquity, 50.0),
        (Metric::CurrentRatio, 1.8),
        (Metric::EarningsGrowth, 8.0),
        (Metric::RevenueGrowth, 6.0),
    ])
}

fn default_directions() -> BTreeMap<Metric, Direction> {
    use Direction::{HigherIsBetter, LowerIsBetter};

    BTreeMap::from([
        (Metric::Per, LowerIsBetter),
        (Metric::Pbr, LowerIsBetter),
        (Metric::Roe, HigherIsBetter),
        (Metric::Roa, HigherIsBetter),
        (Metric::DividendYield, HigherIsBetter),
        (Metric::ProfitMargin, HigherIsBetter),
        (Metric::OperatingMargin, HigherIsBetter),
        (Metric::DebtToEquity, LowerIsBetter),
        (Metric::CurrentRatio, HigherIsBetter),
        (Metric::EarningsGrowth, HigherIsBetter),
        (Metric::RevenueGrowth, HigherIsBetter),
    ])
}
