use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::Ticker;

const EMERGING_SUFFIXES: [&str; 5] = ["SS", "SZ", "HK", "TW", "KS"];

const EMERGING_ADRS: [&str; 20] = [
    "TSM", "BABA", "JD", "PDD", "BIDU", "NIO", "XPEV", "LI", "SHOP", "SE", "GRAB", "VALE", "PBR",
    "ITUB", "BBD", "EWZ", "FMX", "ABEV", "SID", "ASML",
];

/// Market a ticker trades in; selects the baseline table used for scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    Japan,
    Us,
    Emerging,
}

impl Market {
    pub const ALL: [Self; 3] = [Self::Japan, Self::Us, Self::Emerging];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Japan => "japan",
            Self::Us => "us",
            Self::Emerging => "emerging",
        }
    }

    /// Classify a ticker by exchange suffix, falling back to a fixed ADR list.
    pub fn classify(ticker: &Ticker) -> Self {
        match ticker.suffix() {
            Some("T") => Self::Japan,
            Some(suffix) if EMERGING_SUFFIXES.contains(&suffix) => Self::Emerging,
            _ if EMERGING_ADRS.contains(&ticker.as_str()) => Self::Emerging,
            _ => Self::Us,
        }
    }
}

impl Display for Market {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(raw: &str) -> Market {
        Market::classify(&Ticker::parse(raw).expect("valid ticker"))
    }

    #[test]
    fn classifies_by_suffix_and_adr_list() {
        assert_eq!(classify("7203.T"), Market::Japan);
        assert_eq!(classify("0700.HK"), Market::Emerging);
        assert_eq!(classify("TSM"), Market::Emerging);
        assert_eq!(classify("AAPL"), Market::Us);
        assert_eq!(classify("BRK-B"), Market::Us);
    }
}
