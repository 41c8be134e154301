//! Price-history indicators and valuation summaries shown next to a score.
//!
//! None of these values feed the composite score. Volatility is the only one
//! that reaches the risk assessment.

use serde::Serialize;

use crate::{Metric, MetricBundle, PriceHistory};

/// Fewer closes than this yield no indicators at all.
pub const MIN_HISTORY: usize = 20;

const TRADING_DAYS: usize = 252;
const LARGE_CAP: f64 = 10_000_000_000.0;
const MID_CAP: f64 = 2_000_000_000.0;

/// Indicators derived from a ticker's daily history, in percent where relative.
///
/// A field is `None` when the history is too short for its lookback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TechnicalIndicators {
    pub last_close: f64,
    pub change_1d: Option<f64>,
    pub change_1w: Option<f64>,
    pub change_1m: Option<f64>,
    pub change_1y: Option<f64>,
    pub ma20: Option<f64>,
    pub ma50: Option<f64>,
    pub ma200: Option<f64>,
    pub price_vs_ma20: Option<f64>,
    pub price_vs_ma50: Option<f64>,
    pub price_vs_ma200: Option<f64>,
    /// Annualized standard deviation of daily returns.
    pub volatility: f64,
    pub high_52w: f64,
    pub low_52w: f64,
    pub from_high_52w: f64,
    pub from_low_52w: f64,
}

impl TechnicalIndicators {
    pub fn from_history(history: &PriceHistory) -> Option<Self> {
        let closes: Vec<f64> = history.closes().collect();
        if closes.len() < MIN_HISTORY {
            return None;
        }
        let last = *closes.last()?;

        let ma20 = moving_average(&closes, 20);
        let ma50 = moving_average(&closes, 50);
        let ma200 = moving_average(&closes, 200);

        let window = &history.bars()[history.len().saturating_sub(TRADING_DAYS)..];
        let high = window.iter().map(|bar| bar.high).fold(f64::MIN, f64::max);
        let low = window.iter().map(|bar| bar.low).fold(f64::MAX, f64::min);

        Some(Self {
            last_close: round2(last),
            change_1d: change_over(&closes, 1),
            change_1w: change_over(&closes, 5),
            change_1m: change_over(&closes, 21),
            change_1y: change_over(&closes, TRADING_DAYS),
            ma20: ma20.map(round2),
            ma50: ma50.map(round2),
            ma200: ma200.map(round2),
            price_vs_ma20: ma20.and_then(|ma| relative(last, ma)),
            price_vs_ma50: ma50.and_then(|ma| relative(last, ma)),
            price_vs_ma200: ma200.and_then(|ma| relative(last, ma)),
            volatility: round2(annualized_volatility(&closes)),
            high_52w: round2(high),
            low_52w: round2(low),
            from_high_52w: relative(last, high).unwrap_or(0.0),
            from_low_52w: relative(last, low).unwrap_or(0.0),
        })
    }
}

/// Percent change from `days` sessions back to the last close.
fn change_over(closes: &[f64], days: usize) -> Option<f64> {
    let last = *closes.last()?;
    let index = closes.len().checked_sub(days + 1)?;
    relative(last, closes[index])
}

fn moving_average(closes: &[f64], window: usize) -> Option<f64> {
    if closes.len() < window {
        return None;
    }
    let tail = &closes[closes.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}

fn relative(value: f64, reference: f64) -> Option<f64> {
    (reference != 0.0).then(|| round2((value / reference - 1.0) * 100.0))
}

fn annualized_volatility(closes: &[f64]) -> f64 {
    let returns: Vec<f64> = closes
        .windows(2)
        .filter(|pair| pair[0] != 0.0)
        .map(|pair| pair[1] / pair[0] - 1.0)
        .collect();
    if returns.is_empty() {
        return 0.0;
    }
    let count = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / count;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / count;
    variance.sqrt() * (TRADING_DAYS as f64).sqrt() * 100.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Size class from market capitalization in the quote currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketCapCategory {
    LargeCap,
    MidCap,
    SmallCap,
}

impl MarketCapCategory {
    pub fn classify(market_cap: f64) -> Self {
        if market_cap >= LARGE_CAP {
            Self::LargeCap
        } else if market_cap >= MID_CAP {
            Self::MidCap
        } else {
            Self::SmallCap
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValuationSummary {
    /// Inverse of PER in percent; absent for missing or non-positive PER.
    pub earnings_yield: Option<f64>,
    pub market_cap_category: Option<MarketCapCategory>,
}

impl ValuationSummary {
    pub fn from_bundle(bundle: &MetricBundle) -> Self {
        Self {
            earnings_yield: bundle
                .get(Metric::Per)
                .filter(|per| *per > 0.0)
                .map(|per| round2(100.0 / per)),
            market_cap_category: bundle
                .get(Metric::MarketCap)
                .filter(|cap| *cap > 0.0)
                .map(MarketCapCategory::classify),
        }
    }
}
