use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::provider::{MarketDataProvider, ProviderError, ProviderFuture};
use crate::provider_policy::ProviderPolicy;
use crate::throttling::QuotaGate;
use crate::{Metric, MetricBundle, ProviderId, Ticker};

const DEFAULT_BASE_URL: &str = "https://finnhub.io/api/v1";

/// Failover provider backed by the Finnhub REST API.
///
/// One fetch costs up to three calls: quote, basic financials and company
/// profile. The quote decides existence; a failed profile only drops the
/// company name and market cap.
#[derive(Clone)]
pub struct FinnhubAdapter {
    http_client: Arc<dyn HttpClient>,
    auth: Option<HttpAuth>,
    base_url: String,
    quota: QuotaGate,
    timeout_ms: u64,
}

impl FinnhubAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: Option<String>) -> Self {
        let auth = api_key
            .filter(|key| !key.trim().is_empty())
            .map(|key| HttpAuth::header("x-finnhub-token", key));
        Self {
            http_client,
            auth,
            base_url: String::from(DEFAULT_BASE_URL),
            quota: QuotaGate::from_policy(&ProviderPolicy::finnhub_default()),
            timeout_ms: 10_000,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_policy(mut self, policy: &ProviderPolicy) -> Self {
        self.quota = QuotaGate::from_policy(policy);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.auth.is_some()
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        auth: &HttpAuth,
        path: &str,
        symbol: &str,
        extra_query: &str,
    ) -> Result<T, ProviderError> {
        if !self.quota.try_acquire() {
            return Err(ProviderError::rate_limited(
                "finnhub request quota exhausted for the current window",
            ));
        }

        let url = format!(
            "{}/{path}?symbol={}{extra_query}",
            self.base_url,
            urlencoding::encode(symbol)
        );
        let request = HttpRequest::get(url)
            .with_auth(auth)
            .with_timeout_ms(self.timeout_ms);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|error| ProviderError::from_http(ProviderId::Finnhub, &error))?;

        if !response.is_success() {
            return Err(ProviderError::from_status(ProviderId::Finnhub, response.status));
        }

        serde_json::from_str(&response.body).map_err(|error| {
            ProviderError::server_error(None, format!("failed to parse finnhub {path}: {error}"))
        })
    }

    async fn fetch_all(&self, ticker: &Ticker) -> Result<MetricBundle, ProviderError> {
        let auth = self
            .auth
            .as_ref()
            .ok_or_else(|| ProviderError::server_error(None, "finnhub api key is not configured"))?;
        let symbol = finnhub_symbol(ticker);

        let quote: QuotePayload = self.get_json(auth, "quote", symbol, "").await?;
        let price = quote.c.filter(|price| *price != 0.0).ok_or_else(|| {
            ProviderError::not_found(format!("finnhub returned an empty quote for {symbol}"))
        })?;

        let metrics: MetricPayload = self
            .get_json(auth, "stock/metric", symbol, "&metric=all")
            .await?;

        let profile = match self
            .get_json::<ProfilePayload>(auth, "stock/profile2", symbol, "")
            .await
        {
            Ok(profile) => profile,
            Err(error) => {
                debug!(ticker = %ticker, error = %error, "finnhub profile unavailable");
                ProfilePayload::default()
            }
        };

        Ok(normalize(
            ticker,
            price,
            quote.pc,
            metrics.metric.unwrap_or_default(),
            profile,
        ))
    }
}

impl MarketDataProvider for FinnhubAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Finnhub
    }

    fn fetch_fundamentals<'a>(&'a self, ticker: &'a Ticker) -> ProviderFuture<'a> {
        Box::pin(self.fetch_all(ticker))
    }
}

/// Finnhub lists Tokyo shares without the `.T` suffix.
fn finnhub_symbol(ticker: &Ticker) -> &str {
    match ticker.suffix() {
        Some("T") => ticker.base(),
        _ => ticker.as_str(),
    }
}

fn normalize(
    ticker: &Ticker,
    price: f64,
    previous_close: Option<f64>,
    metric: MetricFields,
    profile: ProfilePayload,
) -> MetricBundle {
    // Finnhub has a single industry classification; it stands in for both.
    let mut bundle = MetricBundle::new(ticker.clone())
        .with_company_name(profile.name)
        .with_currency(profile.currency)
        .with_classification(profile.finnhub_industry.clone(), profile.finnhub_industry);

    bundle.set(Metric::Price, Some(price));
    bundle.set(Metric::PreviousClose, previous_close.filter(|pc| *pc != 0.0));
    // profile2 reports market capitalization in millions.
    bundle.set(
        Metric::MarketCap,
        profile.market_capitalization.map(|cap| cap * 1_000_000.0),
    );

    bundle.set(Metric::Per, metric.pe_basic_excl_extra_ttm);
    bundle.set(Metric::Pbr, metric.pb_annual);
    bundle.set(Metric::Roe, metric.roe_rfy);
    bundle.set(Metric::Roa, metric.roa_rfy);
    bundle.set(Metric::DividendYield, metric.dividend_yield_indicated_annual);
    bundle.set(Metric::ProfitMargin, metric.net_profit_margin_ttm);
    bundle.set(Metric::OperatingMargin, metric.operating_margin_ttm);
    // Finnhub reports a plain ratio; canonical debt-to-equity is in percent.
    bundle.set(
        Metric::DebtToEquity,
        metric.total_debt_to_equity_annual.map(|ratio| ratio * 100.0),
    );
    bundle.set(Metric::CurrentRatio, metric.current_ratio_annual);
    bundle.set(Metric::EarningsGrowth, metric.eps_growth_ttm_yoy);
    bundle.set(Metric::RevenueGrowth, metric.revenue_growth_ttm_yoy);
    bundle.set(Metric::PayoutRatio, metric.payout_ratio_ttm);

    bundle
}

#[derive(Debug, Deserialize)]
struct QuotePayload {
    #[serde(default)]
    c: Option<f64>,
    #[serde(default)]
    pc: Option<f64>,
}

/// Finnhub answers `{"metric": null}` or `{"metric": {}}` for symbols without data.
#[derive(Debug, Default, Deserialize)]
struct MetricPayload {
    #[serde(default)]
    metric: Option<MetricFields>,
}

#[derive(Debug, Default, Deserialize)]
struct MetricFields {
    #[serde(default, rename = "peBasicExclExtraTTM")]
    pe_basic_excl_extra_ttm: Option<f64>,
    #[serde(default, rename = "pbAnnual")]
    pb_annual: Option<f64>,
    #[serde(default, rename = "roeRfy")]
    roe_rfy: Option<f64>,
    #[serde(default, rename = "roaRfy")]
    roa_rfy: Option<f64>,
    #[serde(default, rename = "dividendYieldIndicatedAnnual")]
    dividend_yield_indicated_annual: Option<f64>,
    #[serde(default, rename = "netProfitMarginTTM")]
    net_profit_margin_ttm: Option<f64>,
    #[serde(default, rename = "operatingMarginTTM")]
    operating_margin_ttm: Option<f64>,
    #[serde(default, rename = "totalDebt/totalEquityAnnual")]
    total_debt_to_equity_annual: Option<f64>,
    #[serde(default, rename = "currentRatioAnnual")]
    current_ratio_annual: Option<f64>,
    #[serde(default, rename = "epsGrowthTTMYoy")]
    eps_growth_ttm_yoy: Option<f64>,
    #[serde(default, rename = "revenueGrowthTTMYoy")]
    revenue_growth_ttm_yoy: Option<f64>,
    #[serde(default, rename = "payoutRatioTTM")]
    payout_ratio_ttm: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfilePayload {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    market_capitalization: Option<f64>,
    #[serde(default)]
    finnhub_industry: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::adapters::testing::ScriptedHttpClient;
    use crate::provider::ProviderErrorKind;

    const QUOTE: &str = r#"{"c": 2850.5, "pc": 2830.0, "h": 2870.0, "l": 2810.0}"#;
    const METRICS: &str = r#"{
        "metric": {
            "peBasicExclExtraTTM": 17.0,
            "pbAnnual": 1.2,
            "roeRfy": 13.5,
            "roaRfy": null,
            "dividendYieldIndicatedAnnual": 2.8,
            "totalDebt/totalEquityAnnual": 1.05,
            "currentRatioAnnual": 1.25
        },
        "symbol": "7203"
    }"#;
    const PROFILE: &str = r#"{"name": "Toyota Motor Corp", "currency": "JPY",
        "marketCapitalization": 46500000, "finnhubIndustry": "Automobiles"}"#;

    fn ticker(raw: &str) -> Ticker {
        Ticker::parse(raw).expect("valid ticker")
    }

    fn full_client() -> ScriptedHttpClient {
        ScriptedHttpClient::new()
            .json("/quote?", 200, QUOTE)
            .json("/stock/metric?", 200, METRICS)
            .json("/stock/profile2?", 200, PROFILE)
    }

    #[tokio::test]
    async fn strips_tokyo_suffix_and_maps_metrics() {
        let client = Arc::new(full_client());
        let adapter = FinnhubAdapter::new(client.clone(), Some(String::from("demo-key")));

        let bundle = adapter
            .fetch_fundamentals(&ticker("7203.T"))
            .await
            .expect("finnhub should answer");

        assert_eq!(bundle.ticker.as_str(), "7203.T");
        assert_eq!(bundle.company_name.as_deref(), Some("Toyota Motor Corp"));
        assert_eq!(bundle.get(Metric::Price), Some(2850.5));
        assert_eq!(bundle.get(Metric::Per), Some(17.0));
        assert_eq!(bundle.get(Metric::Roa), None);
        assert_eq!(bundle.get(Metric::DebtToEquity), Some(105.0));
        assert_eq!(bundle.get(Metric::MarketCap), Some(46_500_000_000_000.0));
        assert_eq!(bundle.sector.as_deref(), Some("Automobiles"));
        assert_eq!(bundle.industry.as_deref(), Some("Automobiles"));

        let requests = client.recorded();
        assert_eq!(requests.len(), 3);
        assert!(requests.iter().all(|request| request.url.contains("symbol=7203")));
        assert!(requests.iter().all(|request| !request.url.contains("7203.T")));
        assert_eq!(
            requests[0].headers.get("x-finnhub-token").map(String::as_str),
            Some("demo-key")
        );
    }

    #[tokio::test]
    async fn zero_price_quote_is_not_found() {
        let client = Arc::new(ScriptedHttpClient::new().json("/quote?", 200, r#"{"c": 0, "pc": 0}"#));
        let adapter = FinnhubAdapter::new(client.clone(), Some(String::from("demo-key")));

        let error = adapter
            .fetch_fundamentals(&ticker("NOPE"))
            .await
            .expect_err("empty quote");

        assert_eq!(error.kind(), ProviderErrorKind::NotFound);
        assert_eq!(client.recorded().len(), 1);
    }

    #[tokio::test]
    async fn profile_failure_only_drops_profile_fields() {
        let client = Arc::new(
            ScriptedHttpClient::new()
                .json("/quote?", 200, QUOTE)
                .json("/stock/metric?", 200, r#"{"metric": {}}"#)
                .json("/stock/profile2?", 500, ""),
        );
        let adapter = FinnhubAdapter::new(client, Some(String::from("demo-key")));

        let bundle = adapter
            .fetch_fundamentals(&ticker("AAPL"))
            .await
            .expect("quote alone is enough");

        assert_eq!(bundle.company_name, None);
        assert_eq!(bundle.get(Metric::MarketCap), None);
        assert_eq!(bundle.get(Metric::Per), None);
        assert_eq!(bundle.get(Metric::PreviousClose), Some(2830.0));
    }

    #[tokio::test]
    async fn null_metric_object_leaves_fundamentals_absent() {
        let client = Arc::new(
            ScriptedHttpClient::new()
                .json("/quote?", 200, QUOTE)
                .json("/stock/metric?", 200, r#"{"metric": null, "symbol": "7203"}"#)
                .json("/stock/profile2?", 200, PROFILE),
        );
        let adapter = FinnhubAdapter::new(client, Some(String::from("demo-key")));

        let bundle = adapter
            .fetch_fundamentals(&ticker("7203.T"))
            .await
            .expect("null metrics are not a failure");

        assert_eq!(bundle.get(Metric::Per), None);
        assert_eq!(bundle.get(Metric::Roe), None);
        assert_eq!(bundle.get(Metric::Price), Some(2850.5));
        assert_eq!(bundle.company_name.as_deref(), Some("Toyota Motor Corp"));
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_network() {
        let client = Arc::new(full_client());
        let adapter = FinnhubAdapter::new(client.clone(), None);

        let error = adapter
            .fetch_fundamentals(&ticker("AAPL"))
            .await
            .expect_err("no key");

        assert_eq!(error.kind(), ProviderErrorKind::ServerError);
        assert!(client.recorded().is_empty());
    }

    #[tokio::test]
    async fn rate_limit_status_and_quota_both_map_to_rate_limited() {
        let limited = Arc::new(ScriptedHttpClient::new().json("/quote?", 429, ""));
        let adapter = FinnhubAdapter::new(limited, Some(String::from("demo-key")));
        let error = adapter
            .fetch_fundamentals(&ticker("AAPL"))
            .await
            .expect_err("429");
        assert_eq!(error.kind(), ProviderErrorKind::RateLimited);

        let adapter = FinnhubAdapter::new(Arc::new(full_client()), Some(String::from("demo-key")))
            .with_policy(&ProviderPolicy {
                provider_id: ProviderId::Finnhub,
                quota_window: Duration::from_secs(60),
                quota_limit: 1,
            });
        let error = adapter
            .fetch_fundamentals(&ticker("AAPL"))
            .await
            .expect_err("metric call exceeds a one-call budget");
        assert_eq!(error.kind(), ProviderErrorKind::RateLimited);
    }
}
