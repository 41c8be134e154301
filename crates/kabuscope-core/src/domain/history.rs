use serde::{Deserialize, Serialize};

/// One trading day, oldest first inside a [`PriceHistory`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub close: f64,
    pub high: f64,
    pub low: f64,
}

impl DailyBar {
    /// Missing or non-finite highs and lows fall back to the close.
    pub fn new(close: f64, high: Option<f64>, low: Option<f64>) -> Option<Self> {
        if !close.is_finite() {
            return None;
        }
        let finite_or_close = |value: Option<f64>| value.filter(|v| v.is_finite()).unwrap_or(close);
        Some(Self {
            close,
            high: finite_or_close(high),
            low: finite_or_close(low),
        })
    }
}

/// Daily bars over roughly the last year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceHistory {
    bars: Vec<DailyBar>,
}

impl PriceHistory {
    pub fn new(bars: Vec<DailyBar>) -> Self {
        Self { bars }
    }

    /// Builds a history from closes alone.
    pub fn from_closes(closes: impl IntoIterator<Item = f64>) -> Self {
        Self::new(
            closes
                .into_iter()
                .filter_map(|close| DailyBar::new(close, None, None))
                .collect(),
        )
    }

    pub fn bars(&self) -> &[DailyBar] {
        &self.bars
    }

    pub fn closes(&self) -> impl Iterator<Item = f64> + '_ {
        self.bars.iter().map(|bar| bar.close)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}
