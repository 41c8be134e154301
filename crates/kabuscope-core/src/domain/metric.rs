use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{PriceHistory, Ticker, ValidationError};

/// Fundamental and price metrics a provider can report.
///
/// Units are canonical across providers: valuation and liquidity ratios as
/// plain numbers, everything that is a percentage in percent (an ROE of
/// 12.5% is stored as `12.5`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Per,
    Pbr,
    Roe,
    Roa,
    DividendYield,
    ProfitMargin,
    OperatingMargin,
    DebtToEquity,
    CurrentRatio,
    EarningsGrowth,
    RevenueGrowth,
    PayoutRatio,
    Price,
    PreviousClose,
    MarketCap,
}

impl Metric {
    pub const ALL: [Self; 15] = [
        Self::Per,
        Self::Pbr,
        Self::Roe,
        Self::Roa,
        Self::DividendYield,
        Self::ProfitMargin,
        Self::OperatingMargin,
        Self::DebtToEquity,
        Self::CurrentRatio,
        Self::EarningsGrowth,
        Self::RevenueGrowth,
        Self::PayoutRatio,
        Self::Price,
        Self::PreviousClose,
        Self::MarketCap,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Per => "per",
            Self::Pbr => "pbr",
            Self::Roe => "roe",
            Self::Roa => "roa",
            Self::DividendYield => "dividend_yield",
            Self::ProfitMargin => "profit_margin",
            Self::OperatingMargin => "operating_margin",
            Self::DebtToEquity => "debt_to_equity",
            Self::CurrentRatio => "current_ratio",
            Self::EarningsGrowth => "earnings_growth",
            Self::RevenueGrowth => "revenue_growth",
            Self::PayoutRatio => "payout_ratio",
            Self::Price => "price",
            Self::PreviousClose => "previous_close",
            Self::MarketCap => "market_cap",
        }
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|metric| metric.as_str() == normalized)
            .ok_or(ValidationError::InvalidMetric { value: normalized })
    }
}

/// Which way a metric improves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

/// Metric values fetched for one ticker.
///
/// A metric missing from the bundle means the provider did not report it,
/// which is not the same as a reported zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricBundle {
    pub ticker: Ticker,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default)]
    values: BTreeMap<Metric, f64>,
    /// Daily bars for technical indicators; empty when the provider has none.
    #[serde(default, skip_serializing_if = "PriceHistory::is_empty")]
    pub history: PriceHistory,
}

impl MetricBundle {
    pub fn new(ticker: Ticker) -> Self {
        Self {
            ticker,
            company_name: None,
            currency: None,
            sector: None,
            industry: None,
            values: BTreeMap::new(),
            history: PriceHistory::default(),
        }
    }

    pub fn with_company_name(mut self, name: Option<String>) -> Self {
        self.company_name = non_blank(name);
        self
    }

    pub fn with_currency(mut self, currency: Option<String>) -> Self {
        self.currency = non_blank(currency);
        self
    }

    pub fn with_classification(mut self, sector: Option<String>, industry: Option<String>) -> Self {
        self.sector = non_blank(sector);
        self.industry = non_blank(industry);
        self
    }

    pub fn with_history(mut self, history: PriceHistory) -> Self {
        self.history = history;
        self
    }

    /// Store a value, rejecting NaN and infinities.
    pub fn insert(&mut self, metric: Metric, value: f64) -> Result<(), ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NonFiniteValue { metric });
        }
        self.values.insert(metric, value);
        Ok(())
    }

    /// Store a provider value if one was reported. Non-finite values are dropped.
    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        if let Some(value) = value.filter(|value| value.is_finite()) {
            self.values.insert(metric, value);
        }
    }

    pub fn with(mut self, metric: Metric, value: f64) -> Result<Self, ValidationError> {
        self.insert(metric, value)?;
        Ok(self)
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.values.get(&metric).copied()
    }

    pub fn contains(&self, metric: Metric) -> bool {
        self.values.contains_key(&metric)
    }

    /// Number of metrics the provider reported.
    pub fn observed(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        self.values.iter().map(|(metric, value)| (*metric, *value))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
