//! Provider adapters: Yahoo Finance (primary) and Finnhub (failover).

mod finnhub;
mod yahoo;

pub use finnhub::FinnhubAdapter;
pub use yahoo::{YahooAdapter, YahooAuthManager};
