use serde::Deserialize;
use serde_json::Value;

use common::models::Candle;

use crate::error::{MalformedMessage, SeedLoadError};
use crate::remote::Numeric;
use crate::traits::RemoteResponse;

/// `<symbol>@kline_<interval>` stream frame.
#[derive(Deserialize, Debug)]
pub struct KlineStreamEvent {
    #[serde(rename(deserialize = "k"))]
    pub data: KlineEvent,
}

#[derive(Deserialize, Debug)]
pub struct KlineEvent {
    #[serde(rename(deserialize = "t"))]
    pub start_time: Numeric,
    #[serde(rename(deserialize = "o"))]
    pub open_price: Numeric,
    #[serde(rename(deserialize = "h"))]
    pub high_price: Numeric,
    #[serde(rename(deserialize = "l"))]
    pub low_price: Numeric,
    #[serde(rename(deserialize = "c"))]
    pub close_price: Numeric,
    #[serde(rename(deserialize = "v"))]
    pub volume: Numeric,
}

impl RemoteResponse<Candle> for KlineStreamEvent {
    fn to_model(&self) -> Result<Candle, MalformedMessage> {
        Ok(Candle {
            timestamp: self.data.start_time.timestamp("t")?,
            open: self.data.open_price.finite("o")?,
            high: self.data.high_price.finite("h")?,
            low: self.data.low_price.finite("l")?,
            close: self.data.close_price.finite("c")?,
            volume: self.data.volume.finite("v")?,
        })
    }
}

/// Parses a `/api/v3/klines` body:
/// `[[openTime, "open", "high", "low", "close", "volume", closeTime, ...], ...]`.
pub fn parse_kline_rows(body: Value) -> Result<Vec<Candle>, SeedLoadError> {
    let Value::Array(rows) = body else {
        return Err(SeedLoadError::NotAnArray);
    };
    if rows.is_empty() {
        return Err(SeedLoadError::Empty);
    }

    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            parse_row(row).map_err(|reason| SeedLoadError::MalformedRow { index, reason })
        })
        .collect()
}

fn parse_row(row: &Value) -> Result<Candle, String> {
    let fields = row.as_array().ok_or("row is not an array")?;
    if fields.len() < 6 {
        return Err(format!("expected at least 6 fields, got {}", fields.len()));
    }

    let open_time = fields[0]
        .as_f64()
        .filter(|t| t.is_finite())
        .ok_or("open time is not a number")?;

    let price = |i: usize, name: &str| -> Result<f64, String> {
        fields[i]
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("{} is not a numeric string", name))
    };

    Ok(Candle {
        timestamp: open_time as i64,
        open: price(1, "open")?,
        high: price(2, "high")?,
        low: price(3, "low")?,
        close: price(4, "close")?,
        volume: price(5, "volume")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stream_event_to_candle() {
        let event: KlineStreamEvent = serde_json::from_value(json!({
            "e": "kline",
            "E": 1_700_000_001_000i64,
            "s": "XRPUSDT",
            "k": {
                "t": 1_700_000_000_000i64,
                "T": 1_700_000_059_999i64,
                "s": "XRPUSDT",
                "i": "1m",
                "o": "0.5000",
                "c": "0.5010",
                "h": "0.5020",
                "l": "0.4990",
                "v": "12345.6",
                "n": 42,
                "x": false,
            }
        }))
        .unwrap();

        let candle = event.to_model().unwrap();
        assert_eq!(candle.timestamp, 1_700_000_000_000);
        assert_eq!(candle.open, 0.5);
        assert_eq!(candle.close, 0.501);
        assert_eq!(candle.volume, 12345.6);
    }

    #[test]
    fn test_rows_parse_in_order() {
        let body = json!([
            [1_000, "1.0", "1.2", "0.9", "1.1", "500", 1_999, "550.0", 10, "250", "275", "0"],
            [2_000, "1.1", "1.3", "1.0", "1.0", "250", 2_999, "250.0", 5, "100", "100", "0"],
        ]);

        let candles = parse_kline_rows(body).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].timestamp, 1_000);
        assert_eq!(candles[0].high, 1.2);
        assert_eq!(candles[1].close, 1.0);
    }

    #[test]
    fn test_non_array_and_empty_rejected() {
        assert!(matches!(
            parse_kline_rows(json!({ "code": -1121, "msg": "Invalid symbol." })),
            Err(SeedLoadError::NotAnArray)
        ));
        assert!(matches!(parse_kline_rows(json!([])), Err(SeedLoadError::Empty)));
    }

    #[test]
    fn test_row_typing_must_match() {
        // open time as string, prices as numbers: both wrong for this endpoint.
        let body = json!([
            [1_000, "1.0", "1.2", "0.9", "1.1", "500"],
            ["2000", 1.1, 1.3, 1.0, 1.0, 250],
        ]);

        assert!(matches!(
            parse_kline_rows(body),
            Err(SeedLoadError::MalformedRow { index: 1, .. })
        ));
    }
}
