//! # Domain Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Ticker`] | Validated ticker symbol |
//! | [`Metric`] | Fixed set of fundamental and price metrics |
//! | [`MetricBundle`] | Metric values fetched for one ticker |
//! | [`PriceHistory`] | Daily closes and ranges behind technical indicators |
//! | [`Direction`] | Whether higher or lower values are favorable |
//! | [`Market`] | Market classification used to pick baselines |
//! | [`UtcDateTime`] | RFC3339 UTC timestamp |

mod history;
mod market;
mod metric;
mod ticker;
mod timestamp;

pub use history::{DailyBar, PriceHistory};
pub use market::Market;
pub use metric::{Direction, Metric, MetricBundle};
pub use ticker::Ticker;
pub use timestamp::UtcDateTime;
