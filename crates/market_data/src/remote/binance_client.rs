use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, warn};

use common::models::Candle;

use crate::error::SeedLoadError;
use crate::remote::parse_kline_rows;
use crate::traits::HistorySource;

/// Public (unsigned) kline endpoint client used for the chart seed.
#[derive(Clone)]
pub struct BinanceKlineClient {
    client: Client,
    base_url: String,
    symbol: String,
    interval: String,
    limit: u32,
}

impl BinanceKlineClient {
    pub fn new(
        base_url: impl Into<String>,
        symbol: impl Into<String>,
        interval: impl Into<String>,
        limit: u32,
    ) -> Result<Self, SeedLoadError> {
        let client = Client::builder()
            .user_agent("market_feed_terminal/0.1.0")
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            symbol: symbol.into().to_uppercase(),
            interval: interval.into(),
            limit,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

#[async_trait]
impl HistorySource for BinanceKlineClient {
    async fn fetch_candles(&self) -> Result<Vec<Candle>, SeedLoadError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let limit = self.limit.to_string();

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("symbol", self.symbol.as_str()),
                ("interval", self.interval.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            error!("Binance klines request failed ({}): {}", status, error_text);
            return Err(SeedLoadError::Status(status.as_u16()));
        }

        if let Some(used_weight) = resp.headers().get("x-mbx-used-weight-1m") {
            match used_weight.to_str().ok().and_then(|w| w.parse::<u32>().ok()) {
                Some(w) if w > 1000 => warn!("High API weight usage: {}", w),
                Some(w) => debug!("Used weights: {}/1200", w),
                None => {}
            }
        }

        let body = resp.json::<Value>().await?;
        let candles = parse_kline_rows(body)?;

        debug!("Fetched {} {} klines for {}", candles.len(), self.interval, self.symbol);
        Ok(candles)
    }
}
