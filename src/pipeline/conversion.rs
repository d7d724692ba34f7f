//! Currency-conversion decision stage.
//!
//! Annotates a validated record with the JPY-equivalent amount. Lookup
//! failures never abort the pipeline: the annotation degrades to
//! `service_unavailable`/`error` and the original amount is preserved.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;

use crate::models::enums::ConversionStatus;
use crate::models::extraction::ExtractionResult;
use crate::models::record::ConversionAnnotation;

const DOMESTIC_CURRENCY: &str = "JPY";

#[derive(Error, Debug)]
pub enum RateError {
    #[error("No rate available for {from}/{to}")]
    Unavailable { from: String, to: String },

    #[error("Rate service error: {0}")]
    Service(String),
}

/// The exchange-rate collaborator. Callers are expected to wrap it in a
/// [`RateCache`] — providers themselves stay stateless.
pub trait RateProvider {
    fn rate(&self, from: &str, to: &str) -> Result<f64, RateError>;

    /// Tag recorded on annotations produced from this provider's rates.
    fn source_tag(&self) -> &'static str {
        "exchange_rate_api"
    }
}

/// TTL cache in front of any rate provider. Expired entries are evicted
/// on read; failures are never cached.
pub struct RateCache {
    inner: Box<dyn RateProvider + Send + Sync>,
    ttl: Duration,
    cache: Mutex<HashMap<String, (f64, Instant)>>,
}

impl RateCache {
    pub fn new(inner: Box<dyn RateProvider + Send + Sync>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl RateProvider for RateCache {
    fn rate(&self, from: &str, to: &str) -> Result<f64, RateError> {
        let key = format!("{from}/{to}");

        if let Ok(mut cache) = self.cache.lock() {
            if let Some((rate, fetched_at)) = cache.get(&key).copied() {
                if fetched_at.elapsed() < self.ttl {
                    tracing::debug!(pair = %key, rate, "Rate served from cache");
                    return Ok(rate);
                }
                cache.remove(&key);
            }
        }

        let rate = self.inner.rate(from, to)?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, (rate, Instant::now()));
        }
        Ok(rate)
    }

    fn source_tag(&self) -> &'static str {
        self.inner.source_tag()
    }
}

/// Thin client for a free exchange-rate API
/// (`GET {base}/{FROM}` → `{"rates": {"JPY": 148.3, ...}}`).
pub struct ExchangeRateApiClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl ExchangeRateApiClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn default_public() -> Self {
        Self::new("https://api.exchangerate-api.com/v4/latest", 10)
    }
}

#[derive(Deserialize)]
struct RatesResponse {
    #[serde(default)]
    rates: HashMap<String, f64>,
}

impl RateProvider for ExchangeRateApiClient {
    fn rate(&self, from: &str, to: &str) -> Result<f64, RateError> {
        let from = from.to_uppercase();
        let to = to.to_uppercase();
        let url = format!("{}/{from}", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| RateError::Service(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RateError::Service(format!("status {status}")));
        }

        let parsed: RatesResponse = response
            .json()
            .map_err(|e| RateError::Service(e.to_string()))?;

        parsed
            .rates
            .get(&to)
            .copied()
            .ok_or(RateError::Unavailable { from, to })
    }
}

/// Mock rate provider for testing.
pub struct MockRateProvider {
    rates: HashMap<String, f64>,
    fail_with: Option<fn() -> RateError>,
}

impl MockRateProvider {
    pub fn with_rate(pair: &str, rate: f64) -> Self {
        let mut rates = HashMap::new();
        rates.insert(pair.to_string(), rate);
        Self {
            rates,
            fail_with: None,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            rates: HashMap::new(),
            fail_with: None,
        }
    }

    pub fn erroring() -> Self {
        Self {
            rates: HashMap::new(),
            fail_with: Some(|| RateError::Service("connection refused".into())),
        }
    }
}

impl RateProvider for MockRateProvider {
    fn rate(&self, from: &str, to: &str) -> Result<f64, RateError> {
        if let Some(make_err) = self.fail_with {
            return Err(make_err());
        }
        self.rates
            .get(&format!("{from}/{to}"))
            .copied()
            .ok_or_else(|| RateError::Unavailable {
                from: from.into(),
                to: to.into(),
            })
    }

    fn source_tag(&self) -> &'static str {
        "mock"
    }
}

// -- Stage ------------------------------------------------------------------

/// Annotate one validated extraction with its JPY equivalent.
///
/// Domestic (or missing) currency is a no-op at rate 1.0. A missing
/// inclusive amount skips the lookup entirely. Provider failures degrade
/// and preserve the original amount — idempotent on failure.
pub fn convert_to_jpy(result: &ExtractionResult, rates: &dyn RateProvider) -> ConversionAnnotation {
    let amount = result.inclusive_amount();
    let currency = result.currency_or_domestic();

    let Some(amount) = amount else {
        return ConversionAnnotation {
            exchange_rate: None,
            jpy_amount: None,
            status: ConversionStatus::SkippedNoAmount,
            source: None,
            converted_at: Utc::now(),
        };
    };

    if currency == DOMESTIC_CURRENCY {
        return ConversionAnnotation {
            exchange_rate: Some(1.0),
            jpy_amount: Some(amount),
            status: ConversionStatus::NoConversionNeeded,
            source: Some("no_conversion_needed".into()),
            converted_at: Utc::now(),
        };
    }

    match rates.rate(&currency, DOMESTIC_CURRENCY) {
        Ok(rate) => {
            let jpy = round2(amount * rate);
            tracing::info!(
                currency = %currency,
                rate,
                jpy_amount = jpy,
                "Currency converted to JPY"
            );
            ConversionAnnotation {
                exchange_rate: Some(rate),
                jpy_amount: Some(jpy),
                status: ConversionStatus::Converted,
                source: Some(rates.source_tag().into()),
                converted_at: Utc::now(),
            }
        }
        Err(RateError::Unavailable { .. }) => {
            tracing::warn!(currency = %currency, "Exchange rate unavailable — keeping original amount");
            ConversionAnnotation {
                exchange_rate: None,
                jpy_amount: Some(amount),
                status: ConversionStatus::ServiceUnavailable,
                source: None,
                converted_at: Utc::now(),
            }
        }
        Err(e) => {
            tracing::warn!(currency = %currency, error = %e, "Rate lookup failed — keeping original amount");
            ConversionAnnotation {
                exchange_rate: None,
                jpy_amount: Some(amount),
                status: ConversionStatus::Error,
                source: None,
                converted_at: Utc::now(),
            }
        }
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
