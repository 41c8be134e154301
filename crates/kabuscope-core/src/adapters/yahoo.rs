use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::http_client::{HttpClient, HttpRequest, HttpResponse};
use crate::provider::{MarketDataProvider, ProviderError, ProviderFuture};
use crate::provider_policy::ProviderPolicy;
use crate::throttling::QuotaGate;
use crate::{DailyBar, Metric, MetricBundle, PriceHistory, ProviderId, Ticker};

const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URLS: [&str; 2] = [
    "https://query1.finance.yahoo.com/v1/test/getcrumb",
    "https://query2.finance.yahoo.com/v1/test/getcrumb",
];
const SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const SUMMARY_MODULES: &str =
    "price,summaryDetail,defaultKeyStatistics,financialData,assetProfile";
const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const REFERER: &str = "https://finance.yahoo.com/";

// ============================================================================
// Session handshake
// ============================================================================

#[derive(Debug, Clone)]
struct CachedCrumb {
    value: String,
    fetched_at: Instant,
}

/// Yahoo cookie/crumb session.
///
/// The session cookie lands in the HTTP client's jar after visiting
/// `fc.yahoo.com`; the crumb is fetched from the query hosts and appended to
/// every quoteSummary URL. The lock is held across the handshake so
/// concurrent callers share one refresh.
#[derive(Debug)]
pub struct YahooAuthManager {
    crumb: Mutex<Option<CachedCrumb>>,
    ttl: Duration,
}

impl Default for YahooAuthManager {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

impl YahooAuthManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            crumb: Mutex::new(None),
            ttl,
        }
    }

    pub async fn crumb(
        &self,
        http_client: &dyn HttpClient,
        timeout_ms: u64,
    ) -> Result<String, ProviderError> {
        let mut cached = self.crumb.lock().await;
        if let Some(crumb) = cached
            .as_ref()
            .filter(|crumb| crumb.fetched_at.elapsed() < self.ttl)
        {
            return Ok(crumb.value.clone());
        }

        debug!("refreshing yahoo session crumb");
        let value = handshake(http_client, timeout_ms).await?;
        *cached = Some(CachedCrumb {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        Ok(value)
    }

    pub async fn invalidate(&self) {
        *self.crumb.lock().await = None;
    }
}

async fn handshake(http_client: &dyn HttpClient, timeout_ms: u64) -> Result<String, ProviderError> {
    // fc.yahoo.com answers 404 but still sets the session cookie.
    let cookie_request = HttpRequest::get(COOKIE_URL)
        .with_header("referer", REFERER)
        .with_timeout_ms(timeout_ms);
    http_client
        .execute(cookie_request)
        .await
        .map_err(|error| ProviderError::from_http(ProviderId::Yahoo, &error))?;

    for endpoint in CRUMB_URLS {
        let request = HttpRequest::get(endpoint)
            .with_header("referer", REFERER)
            .with_timeout_ms(timeout_ms);

        let response = match http_client.execute(request).await {
            Ok(response) => response,
            Err(error) => {
                debug!(endpoint, error = %error, "yahoo crumb endpoint failed");
                continue;
            }
        };

        if response.status == 429 {
            return Err(ProviderError::rate_limited(
                "yahoo rate limited the crumb request",
            ));
        }

        if let Some(crumb) = accept_crumb(&response) {
            return Ok(crumb);
        }
    }

    Err(ProviderError::server_error(
        None,
        "failed to obtain yahoo crumb from any endpoint",
    ))
}

fn accept_crumb(response: &HttpResponse) -> Option<String> {
    if !response.is_success() {
        return None;
    }
    let body = response.body.trim();
    let plausible = !body.is_empty()
        && body.len() < 100
        && !body.contains('<')
        && !body.chars().any(char::is_whitespace);
    plausible.then(|| body.to_string())
}

// ============================================================================
// Yahoo Adapter
// ============================================================================

/// Primary provider backed by the Yahoo Finance quoteSummary endpoint.
#[derive(Clone)]
pub struct YahooAdapter {
    http_client: Arc<dyn HttpClient>,
    auth_manager: Arc<YahooAuthManager>,
    quota: QuotaGate,
    timeout_ms: u64,
}

impl YahooAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            auth_manager: Arc::new(YahooAuthManager::default()),
            quota: QuotaGate::from_policy(&ProviderPolicy::yahoo_default()),
            timeout_ms: 10_000,
        }
    }

    pub fn with_policy(mut self, policy: &ProviderPolicy) -> Self {
        self.quota = QuotaGate::from_policy(policy);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    async fn request_summary(
        &self,
        ticker: &Ticker,
        crumb: &str,
    ) -> Result<HttpResponse, ProviderError> {
        let url = format!(
            "{SUMMARY_URL}/{}?modules={SUMMARY_MODULES}&crumb={}",
            urlencoding::encode(ticker.as_str()),
            urlencoding::encode(crumb)
        );
        let request = HttpRequest::get(url)
            .with_header("referer", REFERER)
            .with_timeout_ms(self.timeout_ms);

        self.http_client
            .execute(request)
            .await
            .map_err(|error| ProviderError::from_http(ProviderId::Yahoo, &error))
    }

    async fn fetch_summary(&self, ticker: &Ticker) -> Result<MetricBundle, ProviderError> {
        if !self.quota.try_acquire() {
            return Err(ProviderError::rate_limited(
                "yahoo request quota exhausted for the current window",
            ));
        }

        let crumb = self
            .auth_manager
            .crumb(self.http_client.as_ref(), self.timeout_ms)
            .await?;
        let mut response = self.request_summary(ticker, &crumb).await?;

        if response.status == 401 {
            debug!(ticker = %ticker, "yahoo rejected the session, retrying with a fresh crumb");
            self.auth_manager.invalidate().await;
            let crumb = self
                .auth_manager
                .crumb(self.http_client.as_ref(), self.timeout_ms)
                .await?;
            response = self.request_summary(ticker, &crumb).await?;
        }

        if !response.is_success() {
            return Err(ProviderError::from_status(ProviderId::Yahoo, response.status));
        }

        let bundle = parse_summary(ticker, &response.body)?;
        let history = match self.fetch_history(ticker).await {
            Ok(history) => history,
            Err(error) => {
                debug!(ticker = %ticker, error = %error, "yahoo price history unavailable");
                PriceHistory::default()
            }
        };
        Ok(bundle.with_history(history))
    }

    /// One year of daily bars; fundamentals stand without them.
    async fn fetch_history(&self, ticker: &Ticker) -> Result<PriceHistory, ProviderError> {
        let url = format!(
            "{CHART_URL}/{}?range=1y&interval=1d",
            urlencoding::encode(ticker.as_str())
        );
        let request = HttpRequest::get(url)
            .with_header("referer", REFERER)
            .with_timeout_ms(self.timeout_ms);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|error| ProviderError::from_http(ProviderId::Yahoo, &error))?;
        if !response.is_success() {
            return Err(ProviderError::from_status(ProviderId::Yahoo, response.status));
        }

        parse_chart(&response.body)
    }
}

impl MarketDataProvider for YahooAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn fetch_fundamentals<'a>(&'a self, ticker: &'a Ticker) -> ProviderFuture<'a> {
        Box::pin(self.fetch_summary(ticker))
    }
}

fn parse_summary(ticker: &Ticker, body: &str) -> Result<MetricBundle, ProviderError> {
    let envelope: SummaryEnvelope = serde_json::from_str(body).map_err(|error| {
        ProviderError::server_error(None, format!("failed to parse yahoo quoteSummary: {error}"))
    })?;

    if let Some(error) = envelope.quote_summary.error {
        let code = error.code.unwrap_or_default();
        let description = error.description.unwrap_or_default();
        let message = format!("yahoo quoteSummary error {code}: {description}");
        return Err(if code.eq_ignore_ascii_case("not found") {
            ProviderError::not_found(message)
        } else {
            ProviderError::server_error(None, message)
        });
    }

    let result = envelope
        .quote_summary
        .result
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::not_found(format!("yahoo has no summary for {ticker}")))?;

    Ok(normalize(ticker, result))
}

fn parse_chart(body: &str) -> Result<PriceHistory, ProviderError> {
    let envelope: ChartEnvelope = serde_json::from_str(body).map_err(|error| {
        ProviderError::server_error(None, format!("failed to parse yahoo chart: {error}"))
    })?;

    let quote = envelope
        .chart
        .result
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|result| result.indicators.quote.into_iter().next())
        .unwrap_or_default();

    // Halted sessions come back as nulls and are skipped.
    let bars = quote
        .close
        .iter()
        .copied()
        .enumerate()
        .filter_map(|(index, close)| {
            let high = quote.high.get(index).copied().flatten();
            let low = quote.low.get(index).copied().flatten();
            close.and_then(|close| DailyBar::new(close, high, low))
        })
        .collect();
    Ok(PriceHistory::new(bars))
}

fn normalize(ticker: &Ticker, summary: SummaryResult) -> MetricBundle {
    let profile = summary.asset_profile.unwrap_or_default();
    let price = summary.price.unwrap_or_default();
    let detail = summary.summary_detail.unwrap_or_default();
    let stats = summary.default_key_statistics.unwrap_or_default();
    let financial = summary.financial_data.unwrap_or_default();

    let company_name = price.long_name.or(price.short_name);
    let currency = price.currency.or(financial.financial_currency);
    let mut bundle = MetricBundle::new(ticker.clone())
        .with_company_name(company_name)
        .with_currency(currency)
        .with_classification(profile.sector, profile.industry);

    bundle.set(
        Metric::Price,
        raw(&financial.current_price).or_else(|| raw(&price.regular_market_price)),
    );
    bundle.set(
        Metric::PreviousClose,
        raw(&price.regular_market_previous_close).or_else(|| raw(&detail.previous_close)),
    );
    bundle.set(
        Metric::MarketCap,
        raw(&price.market_cap).or_else(|| raw(&detail.market_cap)),
    );

    bundle.set(
        Metric::Per,
        raw(&detail.trailing_pe)
            .or_else(|| raw(&stats.trailing_pe))
            .or_else(|| raw(&detail.forward_pe))
            .or_else(|| raw(&stats.forward_pe)),
    );
    bundle.set(Metric::Pbr, raw(&stats.price_to_book));
    bundle.set(Metric::Roe, percent(raw(&financial.return_on_equity)));
    bundle.set(Metric::Roa, percent(raw(&financial.return_on_assets)));
    bundle.set(
        Metric::DividendYield,
        percent(raw(&detail.dividend_yield).or_else(|| raw(&detail.trailing_annual_dividend_yield))),
    );
    bundle.set(
        Metric::ProfitMargin,
        percent(raw(&financial.profit_margins).or_else(|| raw(&stats.profit_margins))),
    );
    bundle.set(
        Metric::OperatingMargin,
        percent(raw(&financial.operating_margins)),
    );
    // Yahoo already reports debt-to-equity in percent.
    bundle.set(Metric::DebtToEquity, raw(&financial.debt_to_equity));
    bundle.set(Metric::CurrentRatio, raw(&financial.current_ratio));
    bundle.set(Metric::EarningsGrowth, percent(raw(&financial.earnings_growth)));
    bundle.set(Metric::RevenueGrowth, percent(raw(&financial.revenue_growth)));
    bundle.set(Metric::PayoutRatio, percent(raw(&detail.payout_ratio)));

    bundle
}

fn raw(value: &Option<RawValue>) -> Option<f64> {
    value
        .as_ref()
        .and_then(|value| value.raw.as_ref())
        .and_then(serde_json::Value::as_f64)
}

fn percent(fraction: Option<f64>) -> Option<f64> {
    fraction.map(|fraction| fraction * 100.0)
}

// ============================================================================
// quoteSummary wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct SummaryEnvelope {
    #[serde(rename = "quoteSummary")]
    quote_summary: SummaryData,
}

#[derive(Debug, Deserialize)]
struct SummaryData {
    #[serde(default)]
    result: Option<Vec<SummaryResult>>,
    #[serde(default)]
    error: Option<SummaryError>,
}

#[derive(Debug, Deserialize)]
struct SummaryError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResult {
    #[serde(default)]
    price: Option<PriceModule>,
    #[serde(default)]
    summary_detail: Option<SummaryDetailModule>,
    #[serde(default)]
    default_key_statistics: Option<KeyStatisticsModule>,
    #[serde(default)]
    financial_data: Option<FinancialDataModule>,
    #[serde(default)]
    asset_profile: Option<AssetProfileModule>,
}

#[derive(Debug, Default, Deserialize)]
struct AssetProfileModule {
    #[serde(default)]
    sector: Option<String>,
    #[serde(default)]
    industry: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    #[serde(default)]
    long_name: Option<String>,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    regular_market_price: Option<RawValue>,
    #[serde(default)]
    regular_market_previous_close: Option<RawValue>,
    #[serde(default)]
    market_cap: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetailModule {
    #[serde(default, rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
    #[serde(default, rename = "forwardPE")]
    forward_pe: Option<RawValue>,
    #[serde(default)]
    dividend_yield: Option<RawValue>,
    #[serde(default)]
    trailing_annual_dividend_yield: Option<RawValue>,
    #[serde(default)]
    payout_ratio: Option<RawValue>,
    #[serde(default)]
    previous_close: Option<RawValue>,
    #[serde(default)]
    market_cap: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyStatisticsModule {
    #[serde(default, rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
    #[serde(default, rename = "forwardPE")]
    forward_pe: Option<RawValue>,
    #[serde(default)]
    price_to_book: Option<RawValue>,
    #[serde(default)]
    profit_margins: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinancialDataModule {
    #[serde(default)]
    financial_currency: Option<String>,
    #[serde(default)]
    current_price: Option<RawValue>,
    #[serde(default)]
    return_on_equity: Option<RawValue>,
    #[serde(default)]
    return_on_assets: Option<RawValue>,
    #[serde(default)]
    profit_margins: Option<RawValue>,
    #[serde(default)]
    operating_margins: Option<RawValue>,
    #[serde(default)]
    debt_to_equity: Option<RawValue>,
    #[serde(default)]
    current_ratio: Option<RawValue>,
    #[serde(default)]
    earnings_growth: Option<RawValue>,
    #[serde(default)]
    revenue_growth: Option<RawValue>,
}

/// Yahoo wraps numbers as `{"raw": 0.15, "fmt": "15.00%"}`; empty objects mean absent.
#[derive(Debug, Deserialize)]
struct RawValue {
    #[serde(default)]
    raw: Option<serde_json::Value>,
}

// ============================================================================
// chart wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartData,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    indicators: ChartIndicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing::ScriptedHttpClient;
    use crate::http_client::HttpError;
    use crate::provider::ProviderErrorKind;

    const TOYOTA_SUMMARY: &str = r#"{
        "quoteSummary": {
            "result": [{
                "price": {
                    "longName": "Toyota Motor Corporation",
                    "currency": "JPY",
                    "regularMarketPrice": {"raw": 2850.5, "fmt": "2,850.50"},
                    "regularMarketPreviousClose": {"raw": 2830.0},
                    "marketCap": {"raw": 46500000000000}
                },
                "summaryDetail": {
                    "trailingPE": {"raw": 17.0},
                    "forwardPE": {"raw": 9.1},
                    "dividendYield": {"raw": 0.028},
                    "payoutRatio": {"raw": 0.3}
                },
                "defaultKeyStatistics": {
                    "priceToBook": {"raw": 1.2}
                },
                "financialData": {
                    "returnOnEquity": {"raw": 0.135},
                    "returnOnAssets": {"raw": 0.045},
                    "profitMargins": {"raw": 0.11},
                    "operatingMargins": {},
                    "debtToEquity": {"raw": 105.3},
                    "currentRatio": {"raw": 1.25},
                    "earningsGrowth": {"raw": -0.05},
                    "revenueGrowth": {"raw": 0.12}
                }
            }],
            "error": null
        }
    }"#;

    fn ticker(raw: &str) -> Ticker {
        Ticker::parse(raw).expect("valid ticker")
    }

    fn session(client: ScriptedHttpClient) -> ScriptedHttpClient {
        client
            .json("fc.yahoo.com", 404, "")
            .json("getcrumb", 200, "abc123")
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("metric should be present");
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[tokio::test]
    async fn normalises_quote_summary_into_canonical_units() {
        let client = Arc::new(session(ScriptedHttpClient::new()).json(
            "quoteSummary",
            200,
            TOYOTA_SUMMARY,
        ));
        let adapter = YahooAdapter::new(client.clone());

        let bundle = adapter
            .fetch_fundamentals(&ticker("7203.T"))
            .await
            .expect("summary should parse");

        assert_eq!(bundle.company_name.as_deref(), Some("Toyota Motor Corporation"));
        assert_eq!(bundle.currency.as_deref(), Some("JPY"));
        assert_close(bundle.get(Metric::Price), 2850.5);
        assert_close(bundle.get(Metric::Per), 17.0);
        assert_close(bundle.get(Metric::Pbr), 1.2);
        assert_close(bundle.get(Metric::Roe), 13.5);
        assert_close(bundle.get(Metric::DividendYield), 2.8);
        assert_close(bundle.get(Metric::DebtToEquity), 105.3);
        assert_close(bundle.get(Metric::EarningsGrowth), -5.0);
        assert_close(bundle.get(Metric::PayoutRatio), 30.0);
        assert_eq!(bundle.get(Metric::OperatingMargin), None);

        let summary_url = client
            .recorded()
            .into_iter()
            .find(|request| request.url.contains("quoteSummary"))
            .expect("summary requested")
            .url;
        assert!(summary_url.contains("/7203.T?modules="));
        assert!(summary_url.ends_with("&crumb=abc123"));
    }

    #[tokio::test]
    async fn session_is_reused_between_calls() {
        let client = Arc::new(session(ScriptedHttpClient::new()).json(
            "quoteSummary",
            200,
            TOYOTA_SUMMARY,
        ));
        let adapter = YahooAdapter::new(client.clone());

        for _ in 0..2 {
            adapter
                .fetch_fundamentals(&ticker("7203.T"))
                .await
                .expect("summary should parse");
        }

        assert_eq!(client.count("getcrumb"), 1);
        assert_eq!(client.count("quoteSummary"), 2);
    }

    #[tokio::test]
    async fn unauthorized_refreshes_crumb_and_retries_once() {
        let client = Arc::new(
            session(ScriptedHttpClient::new())
                .json("quoteSummary", 401, "")
                .json("quoteSummary", 200, TOYOTA_SUMMARY),
        );
        let adapter = YahooAdapter::new(client.clone());

        adapter
            .fetch_fundamentals(&ticker("7203.T"))
            .await
            .expect("retry should succeed");

        assert_eq!(client.count("fc.yahoo.com"), 2);
        assert_eq!(client.count("quoteSummary"), 2);
    }

    #[tokio::test]
    async fn bad_gateway_keeps_status_for_failover_decision() {
        let client = Arc::new(session(ScriptedHttpClient::new()).json("quoteSummary", 502, ""));
        let adapter = YahooAdapter::new(client);

        let error = adapter
            .fetch_fundamentals(&ticker("AAPL"))
            .await
            .expect_err("502 must fail");

        assert_eq!(error.kind(), ProviderErrorKind::ServerError);
        assert_eq!(error.status(), Some(502));
    }

    #[tokio::test]
    async fn not_found_body_maps_to_not_found() {
        let body = r#"{"quoteSummary":{"result":null,"error":{"code":"Not Found","description":"Quote not found for symbol: ZZZZ"}}}"#;
        let client = Arc::new(session(ScriptedHttpClient::new()).json("quoteSummary", 200, body));
        let adapter = YahooAdapter::new(client);

        let error = adapter
            .fetch_fundamentals(&ticker("ZZZZ"))
            .await
            .expect_err("unknown ticker");

        assert_eq!(error.kind(), ProviderErrorKind::NotFound);
    }

    #[tokio::test]
    async fn transport_timeout_maps_to_timeout() {
        let client = Arc::new(
            session(ScriptedHttpClient::new())
                .route("quoteSummary", Err(HttpError::timeout("deadline elapsed"))),
        );
        let adapter = YahooAdapter::new(client);

        let error = adapter
            .fetch_fundamentals(&ticker("AAPL"))
            .await
            .expect_err("timeout");

        assert_eq!(error.kind(), ProviderErrorKind::Timeout);
    }

    #[tokio::test]
    async fn profile_and_daily_history_ride_along_with_the_summary() {
        let summary = r#"{"quoteSummary":{"result":[{
            "price": {"longName": "Toyota Motor Corporation", "regularMarketPrice": {"raw": 2850.5}},
            "assetProfile": {"sector": "Consumer Cyclical", "industry": "Auto Manufacturers"}
        }],"error":null}}"#;
        let chart = r#"{"chart":{"result":[{
            "meta": {"symbol": "7203.T"},
            "timestamp": [1, 2, 3, 4],
            "indicators": {"quote": [{
                "close": [2800.0, null, 2820.0, 2850.5],
                "high": [2810.0, null, null, 2860.0],
                "low": [2790.0, null, 2805.0, 2840.0]
            }]}
        }],"error":null}}"#;
        let client = Arc::new(
            session(ScriptedHttpClient::new())
                .json("quoteSummary", 200, summary)
                .json("/v8/finance/chart/7203.T?range=1y&interval=1d", 200, chart),
        );
        let adapter = YahooAdapter::new(client.clone());

        let bundle = adapter
            .fetch_fundamentals(&ticker("7203.T"))
            .await
            .expect("summary should parse");

        assert_eq!(bundle.sector.as_deref(), Some("Consumer Cyclical"));
        assert_eq!(bundle.industry.as_deref(), Some("Auto Manufacturers"));
        assert_eq!(bundle.history.len(), 3, "null close is skipped");
        let third = bundle.history.bars()[1];
        assert_eq!((third.close, third.high, third.low), (2820.0, 2820.0, 2805.0));
        assert!(client.recorded().iter().any(|request| request.url.contains("assetProfile")));
    }

    #[tokio::test]
    async fn missing_history_does_not_fail_the_fetch() {
        let client = Arc::new(
            session(ScriptedHttpClient::new())
                .json("quoteSummary", 200, TOYOTA_SUMMARY)
                .json("finance/chart", 500, ""),
        );
        let adapter = YahooAdapter::new(client.clone());

        let bundle = adapter
            .fetch_fundamentals(&ticker("7203.T"))
            .await
            .expect("fundamentals alone are enough");

        assert!(bundle.history.is_empty());
        assert_eq!(bundle.sector, None);
        assert_eq!(client.count("finance/chart"), 1);
    }

    #[tokio::test]
    async fn exhausted_quota_fails_fast_without_network() {
        let client = Arc::new(session(ScriptedHttpClient::new()).json(
            "quoteSummary",
            200,
            TOYOTA_SUMMARY,
        ));
        let adapter = YahooAdapter::new(client.clone()).with_policy(&ProviderPolicy {
            provider_id: ProviderId::Yahoo,
            quota_window: Duration::from_secs(60),
            quota_limit: 1,
        });

        adapter
            .fetch_fundamentals(&ticker("7203.T"))
            .await
            .expect("first call fits the quota");
        let error = adapter
            .fetch_fundamentals(&ticker("7203.T"))
            .await
            .expect_err("second call exceeds the quota");

        assert_eq!(error.kind(), ProviderErrorKind::RateLimited);
        assert_eq!(client.count("quoteSummary"), 1);
    }
}
