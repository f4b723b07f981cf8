//! Daily history from the Yahoo Finance chart endpoint (`/v8/finance/chart/{symbol}`).

use crate::config::ProviderConfig;
use crate::domain::model::DailyBar;
use crate::domain::ports::PriceProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::retry::RetryPolicy;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

pub struct YahooChartProvider {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl YahooChartProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: config.retry_policy(),
        })
    }

    fn chart_url(&self, symbol: &str) -> String {
        format!("{}/v8/finance/chart/{}", self.base_url, symbol)
    }

    async fn fetch_once(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyBar>> {
        let url = self.chart_url(symbol);
        let (period1, period2) = request_window(start, end);
        let (period1, period2) = (period1.to_string(), period2.to_string());

        tracing::debug!("GET {} period1={} period2={}", url, period1, period2);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.as_str()),
                ("period2", period2.as_str()),
                ("interval", "1d"),
                ("events", "div,splits"),
                ("includeAdjustedClose", "true"),
            ])
            .send()
            .await
            .map_err(|e| EtlError::provider(symbol, format!("request failed: {}", e), true))?;

        let status = response.status();
        tracing::debug!("{} chart response status: {}", symbol, status);

        let body = response
            .text()
            .await
            .map_err(|e| EtlError::provider(symbol, format!("reading body failed: {}", e), true))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ChartResponse>(&body)
                .ok()
                .and_then(|r| r.chart.error)
                .map(|e| e.to_string())
                .unwrap_or_else(|| format!("status {}", status));
            return Err(EtlError::provider(symbol, detail, is_retryable_status(status)));
        }

        let parsed: ChartResponse =
            serde_json::from_str(&body).map_err(|e| EtlError::MalformedResponse {
                symbol: symbol.to_string(),
                message: e.to_string(),
            })?;

        parse_chart(symbol, parsed)
    }
}

#[async_trait]
impl PriceProvider for YahooChartProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn fetch_daily(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyBar>> {
        if start >= end {
            tracing::debug!("{}: empty range {} → {}, skipping request", symbol, start, end);
            return Ok(Vec::new());
        }

        let label = format!("fetch {}", symbol);
        self.retry
            .run(&label, || self.fetch_once(symbol, start, end))
            .await
    }
}

/// `period1` starts a day early so sessions dated `start` that open before 00:00 UTC
/// (east of UTC, e.g. NZX) are included. Rows before `start` are dropped in the transform.
fn request_window(start: NaiveDate, end: NaiveDate) -> (i64, i64) {
    let first = start.pred_opt().unwrap_or(start);
    (midnight_utc(first), midnight_utc(end))
}

fn midnight_utc(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn parse_chart(symbol: &str, response: ChartResponse) -> Result<Vec<DailyBar>> {
    if let Some(error) = response.chart.error {
        return Err(EtlError::provider(symbol, error.to_string(), false));
    }

    let Some(result) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Err(EtlError::provider(symbol, "chart response has no result", false));
    };

    // 期間內無交易日時 Yahoo 不回傳 timestamp
    let Some(timestamps) = result.timestamp else {
        return Ok(Vec::new());
    };

    let offset = result.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let adjclose = result
        .indicators
        .adjclose
        .and_then(|a| a.into_iter().next())
        .map(|a| a.adjclose)
        .unwrap_or_default();

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let date = DateTime::from_timestamp(ts + offset, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| EtlError::MalformedResponse {
                symbol: symbol.to_string(),
                message: format!("timestamp {} out of range", ts),
            })?;

        bars.push(DailyBar {
            date,
            open: value_at(&quote.open, i),
            high: value_at(&quote.high, i),
            low: value_at(&quote.low, i),
            close: value_at(&quote.close, i),
            adj_close: value_at(&adjclose, i),
            volume: value_at(&quote.volume, i),
        });
    }

    Ok(bars)
}

fn value_at<T: Copy>(column: &[Option<T>], i: usize) -> Option<T> {
    column.get(i).copied().flatten()
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

impl std::fmt::Display for ChartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {}", self.code, description),
            None => f.write_str(&self.code),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
    #[serde(default)]
    adjclose: Option<Vec<ChartAdjClose>>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct ChartAdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    /// 13:30 UTC, i.e. the NYSE open during daylight time.
    fn open_ts(y: i32, m: u32, d: u32) -> i64 {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(13, 30, 0)
            .unwrap()
            .and_utc()
            .timestamp()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn provider_for(server: &MockServer, retry_attempts: u32) -> YahooChartProvider {
        let config = ProviderConfig {
            base_url: server.base_url(),
            retry_attempts,
            retry_delay_ms: 1,
            ..ProviderConfig::default()
        };
        YahooChartProvider::new(&config).unwrap()
    }

    fn chart_body() -> serde_json::Value {
        serde_json::json!({
            "chart": {
                "result": [{
                    "meta": {"symbol": "AAPL", "currency": "USD", "gmtoffset": -14400},
                    "timestamp": [open_ts(2024, 8, 1), open_ts(2024, 8, 2)],
                    "indicators": {
                        "quote": [{
                            "open": [224.37, 219.15],
                            "high": [224.48, 225.60],
                            "low": [217.02, 217.71],
                            "close": [218.36, 219.86],
                            "volume": [62501000, 105568600]
                        }],
                        "adjclose": [{"adjclose": [217.42, 218.91]}]
                    }
                }],
                "error": null
            }
        })
    }

    #[tokio::test]
    async fn test_fetch_daily_parses_chart() {
        let period1 = midnight_utc(date(2024, 7, 31)).to_string();
        let period2 = midnight_utc(date(2024, 8, 3)).to_string();
        let server = MockServer::start_async().await;
        let api_mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v8/finance/chart/AAPL")
                    .query_param("period1", period1.as_str())
                    .query_param("period2", period2.as_str())
                    .query_param("interval", "1d");
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(chart_body());
            })
            .await;

        let provider = provider_for(&server, 0);
        let bars = provider
            .fetch_daily("AAPL", date(2024, 8, 1), date(2024, 8, 3))
            .await
            .unwrap();

        api_mock.assert_async().await;
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, date(2024, 8, 1));
        assert_eq!(bars[0].close, Some(218.36));
        assert_eq!(bars[0].adj_close, Some(217.42));
        assert_eq!(bars[0].volume, Some(62501000));
        assert_eq!(bars[1].date, date(2024, 8, 2));
    }

    #[tokio::test]
    async fn test_session_opening_before_utc_midnight_is_requested() {
        // NZX opens 10:00 NZST (+12:00), i.e. 22:00 UTC on the previous calendar day
        let open = date(2024, 7, 31)
            .and_hms_opt(22, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp();
        let period1 = midnight_utc(date(2024, 7, 31));
        assert!(period1 <= open);

        let period1 = period1.to_string();
        let server = MockServer::start_async().await;
        let api_mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v8/finance/chart/AIR.NZ")
                    .query_param("period1", period1.as_str());
                then.status(200).json_body(serde_json::json!({
                    "chart": {
                        "result": [{
                            "meta": {"currency": "NZD", "gmtoffset": 43200},
                            "timestamp": [open],
                            "indicators": {"quote": [{"close": [0.61]}]}
                        }],
                        "error": null
                    }
                }));
            })
            .await;

        let provider = provider_for(&server, 0);
        let bars = provider
            .fetch_daily("AIR.NZ", date(2024, 8, 1), date(2024, 8, 2))
            .await
            .unwrap();

        api_mock.assert_async().await;
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date, date(2024, 8, 1));
        assert_eq!(bars[0].close, Some(0.61));
    }

    #[test]
    fn test_request_window_bounds() {
        let (period1, period2) = request_window(date(2025, 1, 1), date(2025, 4, 1));
        assert_eq!(period1, 1_735_603_200); // 2024-12-31T00:00:00Z
        assert_eq!(period2, 1_743_465_600); // 2025-04-01T00:00:00Z
    }

    #[tokio::test]
    async fn test_not_found_is_a_non_retryable_provider_error() {
        let server = MockServer::start_async().await;
        let api_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/v8/finance/chart/NOPE");
                then.status(404).json_body(serde_json::json!({
                    "chart": {
                        "result": null,
                        "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}
                    }
                }));
            })
            .await;

        let provider = provider_for(&server, 3);
        let err = provider
            .fetch_daily("NOPE", date(2024, 8, 1), date(2024, 12, 31))
            .await
            .unwrap_err();

        // 404 is not retried
        assert_eq!(api_mock.hits_async().await, 1);
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("symbol may be delisted"));
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start_async().await;
        let api_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/v8/finance/chart/AAPL");
                then.status(503);
            })
            .await;

        let provider = provider_for(&server, 2);
        let err = provider
            .fetch_daily("AAPL", date(2024, 8, 1), date(2024, 8, 3))
            .await
            .unwrap_err();

        assert_eq!(api_mock.hits_async().await, 3);
        assert!(matches!(err, EtlError::ProviderFetch { retryable: true, .. }));
    }

    #[tokio::test]
    async fn test_empty_range_does_not_call_provider() {
        let server = MockServer::start_async().await;
        let api_mock = server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(200).json_body(chart_body());
            })
            .await;

        let provider = provider_for(&server, 0);
        let bars = provider
            .fetch_daily("AAPL", date(2024, 8, 1), date(2024, 8, 1))
            .await
            .unwrap();

        assert!(bars.is_empty());
        assert_eq!(api_mock.hits_async().await, 0);
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v8/finance/chart/AAPL");
                then.status(200).body("<html>oops</html>");
            })
            .await;

        let provider = provider_for(&server, 0);
        let err = provider
            .fetch_daily("AAPL", date(2024, 8, 1), date(2024, 8, 3))
            .await
            .unwrap_err();
        assert!(matches!(err, EtlError::MalformedResponse { .. }));
    }

    #[test]
    fn test_result_without_timestamps_is_empty() {
        let response: ChartResponse = serde_json::from_value(serde_json::json!({
            "chart": {
                "result": [{"meta": {"gmtoffset": -18000}, "indicators": {"quote": [{}]}}],
                "error": null
            }
        }))
        .unwrap();
        assert!(parse_chart("AAPL", response).unwrap().is_empty());
    }

    #[test]
    fn test_null_values_are_kept_as_missing() {
        let response: ChartResponse = serde_json::from_value(serde_json::json!({
            "chart": {
                "result": [{
                    "timestamp": [open_ts(2024, 8, 1)],
                    "indicators": {"quote": [{"close": [null], "open": [1.0]}]}
                }]
            }
        }))
        .unwrap();
        let bars = parse_chart("AAPL", response).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, None);
        assert_eq!(bars[0].open, Some(1.0));
        assert_eq!(bars[0].adj_close, None);
    }
}
