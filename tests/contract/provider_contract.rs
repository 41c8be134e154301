//! Contract tests: both adapters turn canned upstream payloads into
//! canonical metric bundles and classify failures the same way.

use std::sync::{Arc, Mutex};

use kabuscope_core::{
    FinnhubAdapter, HttpClient, HttpFuture, HttpRequest, HttpResponse, MarketDataProvider, Metric,
    ProviderErrorKind, ProviderId, Ticker, YahooAdapter,
};

/// Serves fixed responses by URL fragment; the first matching route wins.
#[derive(Default)]
struct CannedHttpClient {
    routes: Vec<(&'static str, u16, String)>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl CannedHttpClient {
    fn route(mut self, fragment: &'static str, status: u16, body: impl Into<String>) -> Self {
        self.routes.push((fragment, status, body.into()));
        self
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("request log").clone()
    }
}

impl HttpClient for CannedHttpClient {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
        Box::pin(async move {
            let response = self
                .routes
                .iter()
                .find(|(fragment, _, _)| request.url.contains(fragment))
                .map(|(_, status, body)| HttpResponse::new(*status, body.clone()))
                .unwrap_or_else(|| HttpResponse::new(404, ""));
            self.requests.lock().expect("request log").push(request);
            Ok(response)
        })
    }
}

fn ticker(raw: &str) -> Ticker {
    Ticker::parse(raw).expect("valid ticker")
}

fn yahoo(http: CannedHttpClient) -> (Arc<CannedHttpClient>, YahooAdapter) {
    let http = Arc::new(http);
    let adapter = YahooAdapter::new(Arc::clone(&http) as Arc<dyn HttpClient>);
    (http, adapter)
}

fn finnhub(http: CannedHttpClient) -> (Arc<CannedHttpClient>, FinnhubAdapter) {
    let http = Arc::new(http);
    let adapter = FinnhubAdapter::new(
        Arc::clone(&http) as Arc<dyn HttpClient>,
        Some(String::from("test-key")),
    );
    (http, adapter)
}

fn yahoo_session() -> CannedHttpClient {
    CannedHttpClient::default()
        .route("fc.yahoo.com", 404, "")
        .route("getcrumb", 200, "abcCRUMB123")
}

// =============================================================================
// Yahoo
// =============================================================================

const SONY_SUMMARY: &str = r#"{
  "quoteSummary": {
    "result": [{
      "price": {
        "longName": "Sony Group Corporation",
        "currency": "JPY",
        "regularMarketPrice": {"raw": 3120.0, "fmt": "3,120.00"},
        "regularMarketPreviousClose": {"raw": 3100.0},
        "marketCap": {"raw": 19000000000000}
      },
      "summaryDetail": {
        "trailingPE": {"raw": 18.4},
        "dividendYield": {"raw": 0.0065},
        "payoutRatio": {}
      },
      "defaultKeyStatistics": {
        "priceToBook": {"raw": 2.3}
      },
      "financialData": {
        "returnOnEquity": {"raw": 0.135},
        "operatingMargins": {"raw": 0.102},
        "debtToEquity": {"raw": 38.5},
        "currentRatio": null
      }
    }],
    "error": null
  }
}"#;

#[tokio::test]
async fn yahoo_payload_is_normalized_to_canonical_units() {
    let (http, adapter) =
        yahoo(yahoo_session().route("quoteSummary/6758.T", 200, SONY_SUMMARY));

    let bundle = adapter
        .fetch_fundamentals(&ticker("6758.T"))
        .await
        .expect("summary parses");

    assert_eq!(adapter.id(), ProviderId::Yahoo);
    assert_eq!(bundle.company_name.as_deref(), Some("Sony Group Corporation"));
    assert_eq!(bundle.currency.as_deref(), Some("JPY"));
    assert_eq!(bundle.get(Metric::Price), Some(3120.0));
    assert_eq!(bundle.get(Metric::Per), Some(18.4));
    assert_eq!(bundle.get(Metric::Pbr), Some(2.3));
    assert_eq!(bundle.get(Metric::DebtToEquity), Some(38.5));

    let roe = bundle.get(Metric::Roe).expect("roe present");
    assert!((roe - 13.5).abs() < 1e-9, "fractions become percent, got {roe}");
    let dividend = bundle.get(Metric::DividendYield).expect("dividend present");
    assert!((dividend - 0.65).abs() < 1e-9);

    let summary_request = http
        .requests()
        .into_iter()
        .find(|request| request.url.contains("quoteSummary"))
        .expect("summary requested");
    assert!(summary_request.url.contains("crumb=abcCRUMB123"));
}

#[tokio::test]
async fn yahoo_missing_or_empty_fields_are_absent() {
    let (_, adapter) =
        yahoo(yahoo_session().route("quoteSummary/6758.T", 200, SONY_SUMMARY));

    let bundle = adapter
        .fetch_fundamentals(&ticker("6758.T"))
        .await
        .expect("summary parses");

    assert_eq!(bundle.get(Metric::PayoutRatio), None, "empty object");
    assert_eq!(bundle.get(Metric::CurrentRatio), None, "explicit null");
    assert_eq!(bundle.get(Metric::RevenueGrowth), None, "field missing");
    assert!(!bundle.contains(Metric::Roa));
}

#[tokio::test]
async fn yahoo_history_feeds_the_bundle_without_touching_metrics() {
    let closes: Vec<String> = (0..30).map(|day| format!("{}.0", 3000 + day)).collect();
    let chart = format!(
        r#"{{"chart":{{"result":[{{"indicators":{{"quote":[{{"close":[{}]}}]}}}}],"error":null}}}}"#,
        closes.join(",")
    );
    let (_, adapter) = yahoo(
        yahoo_session()
            .route("quoteSummary/6758.T", 200, SONY_SUMMARY)
            .route("finance/chart/6758.T", 200, chart),
    );

    let bundle = adapter
        .fetch_fundamentals(&ticker("6758.T"))
        .await
        .expect("summary parses");

    assert_eq!(bundle.history.len(), 30);
    assert_eq!(bundle.history.closes().last(), Some(3029.0));
    assert_eq!(bundle.get(Metric::Price), Some(3120.0), "quote price is kept");
}

#[tokio::test]
async fn yahoo_statuses_are_classified() {
    let cases = [
        (404, ProviderErrorKind::NotFound, None),
        (429, ProviderErrorKind::RateLimited, Some(429)),
        (502, ProviderErrorKind::ServerError, Some(502)),
    ];

    for (status, kind, expected_status) in cases {
        let (_, adapter) = yahoo(yahoo_session().route("quoteSummary", status, ""));
        let error = adapter
            .fetch_fundamentals(&ticker("AAPL"))
            .await
            .expect_err("non-success status fails");

        assert_eq!(error.kind(), kind, "status {status}");
        if expected_status.is_some() {
            assert_eq!(error.status(), expected_status);
        }
    }
}

#[tokio::test]
async fn yahoo_not_found_envelope_maps_to_not_found() {
    let body = r#"{"quoteSummary":{"result":null,"error":{"code":"Not Found","description":"Quote not found for ticker symbol: ZZZZ"}}}"#;
    let (_, adapter) = yahoo(yahoo_session().route("quoteSummary", 200, body));

    let error = adapter
        .fetch_fundamentals(&ticker("ZZZZ"))
        .await
        .expect_err("unknown ticker");

    assert_eq!(error.kind(), ProviderErrorKind::NotFound);
}

// =============================================================================
// Finnhub
// =============================================================================

const TOYOTA_QUOTE: &str = r#"{"c": 2850.5, "pc": 2830.0, "d": 20.5}"#;
const TOYOTA_METRICS: &str = r#"{
  "metric": {
    "peBasicExclExtraTTM": 9.8,
    "pbAnnual": 1.1,
    "roeRfy": 11.2,
    "totalDebt/totalEquityAnnual": 1.05,
    "currentRatioAnnual": null
  },
  "metricType": "all"
}"#;
const TOYOTA_PROFILE: &str =
    r#"{"name": "Toyota Motor Corp", "currency": "JPY", "marketCapitalization": 42000000.0}"#;

#[tokio::test]
async fn finnhub_payload_is_normalized_to_canonical_units() {
    let (http, adapter) = finnhub(
        CannedHttpClient::default()
            .route("/quote?", 200, TOYOTA_QUOTE)
            .route("/stock/metric?", 200, TOYOTA_METRICS)
            .route("/stock/profile2?", 200, TOYOTA_PROFILE),
    );

    let bundle = adapter
        .fetch_fundamentals(&ticker("7203.T"))
        .await
        .expect("payloads parse");

    assert_eq!(adapter.id(), ProviderId::Finnhub);
    assert_eq!(bundle.ticker.as_str(), "7203.T");
    assert_eq!(bundle.company_name.as_deref(), Some("Toyota Motor Corp"));
    assert_eq!(bundle.get(Metric::Price), Some(2850.5));
    assert_eq!(bundle.get(Metric::PreviousClose), Some(2830.0));
    assert_eq!(bundle.get(Metric::Per), Some(9.8));
    assert_eq!(bundle.get(Metric::Roe), Some(11.2));
    let debt_to_equity = bundle.get(Metric::DebtToEquity).expect("d/e present");
    assert!((debt_to_equity - 105.0).abs() < 1e-9, "ratio becomes percent");
    assert_eq!(bundle.get(Metric::MarketCap), Some(42_000_000_000_000.0));
    assert_eq!(bundle.get(Metric::CurrentRatio), None);
    assert_eq!(bundle.get(Metric::DividendYield), None);

    let requests = http.requests();
    assert!(requests.iter().all(|request| request.url.contains("symbol=7203&")
        || request.url.ends_with("symbol=7203")));
    assert!(requests.iter().all(|request| {
        request.headers.get("x-finnhub-token").map(String::as_str) == Some("test-key")
    }));
    assert!(
        requests.iter().all(|request| !request.url.contains("test-key")),
        "api key never travels in the url"
    );
}

#[tokio::test]
async fn finnhub_empty_quote_is_not_found() {
    let (http, adapter) = finnhub(
        CannedHttpClient::default().route("/quote?", 200, r#"{"c": 0, "pc": 0}"#),
    );

    let error = adapter
        .fetch_fundamentals(&ticker("ZZZZ"))
        .await
        .expect_err("empty quote");

    assert_eq!(error.kind(), ProviderErrorKind::NotFound);
    assert_eq!(http.requests().len(), 1, "no further calls after an empty quote");
}

#[tokio::test]
async fn finnhub_profile_failure_only_drops_profile_fields() {
    let (_, adapter) = finnhub(
        CannedHttpClient::default()
            .route("/quote?", 200, TOYOTA_QUOTE)
            .route("/stock/metric?", 200, r#"{"metric": {}}"#)
            .route("/stock/profile2?", 500, ""),
    );

    let bundle = adapter
        .fetch_fundamentals(&ticker("AAPL"))
        .await
        .expect("quote alone is enough");

    assert_eq!(bundle.company_name, None);
    assert_eq!(bundle.get(Metric::MarketCap), None);
    assert_eq!(bundle.get(Metric::Per), None);
    assert_eq!(bundle.get(Metric::Price), Some(2850.5));
}

#[tokio::test]
async fn finnhub_null_metric_object_scores_as_absent() {
    let (_, adapter) = finnhub(
        CannedHttpClient::default()
            .route("/quote?", 200, TOYOTA_QUOTE)
            .route("/stock/metric?", 200, r#"{"metric": null}"#)
            .route("/stock/profile2?", 200, TOYOTA_PROFILE),
    );

    let bundle = adapter
        .fetch_fundamentals(&ticker("7203.T"))
        .await
        .expect("null metric object still yields a bundle");

    assert_eq!(bundle.get(Metric::Per), None);
    assert_eq!(bundle.get(Metric::DebtToEquity), None);
    assert_eq!(bundle.get(Metric::MarketCap), Some(42_000_000_000_000.0));
}

#[tokio::test]
async fn finnhub_without_key_fails_without_calling_upstream() {
    let http = Arc::new(CannedHttpClient::default().route("/quote?", 200, TOYOTA_QUOTE));
    let adapter = FinnhubAdapter::new(Arc::clone(&http) as Arc<dyn HttpClient>, None);

    let error = adapter
        .fetch_fundamentals(&ticker("AAPL"))
        .await
        .expect_err("no key");

    assert!(!adapter.has_api_key());
    assert_eq!(error.kind(), ProviderErrorKind::ServerError);
    assert_eq!(error.status(), None);
    assert!(http.requests().is_empty());
}

#[tokio::test]
async fn finnhub_rate_limit_is_classified() {
    let (_, adapter) =
        finnhub(CannedHttpClient::default().route("/quote?", 429, r#"{"error":"limit"}"#));

    let error = adapter
        .fetch_fundamentals(&ticker("AAPL"))
        .await
        .expect_err("rate limited");

    assert_eq!(error.kind(), ProviderErrorKind::RateLimited);
}
