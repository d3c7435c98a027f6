use std::collections::BTreeMap;

use serde::Deserialize;

use common::models::{Candle, IndicatorValue, Side, StrategySignal, TradeRecord};

use crate::error::MalformedMessage;
use crate::remote::Numeric;
use crate::traits::RemoteResponse;

#[derive(Deserialize, Debug)]
pub struct CandlePayload {
    pub timestamp: Numeric,
    pub open: Numeric,
    pub high: Numeric,
    pub low: Numeric,
    pub close: Numeric,
    pub volume: Numeric,
}

impl RemoteResponse<Candle> for CandlePayload {
    fn to_model(&self) -> Result<Candle, MalformedMessage> {
        Ok(Candle {
            timestamp: self.timestamp.timestamp("timestamp")?,
            open: self.open.finite("open")?,
            high: self.high.finite("high")?,
            low: self.low.finite("low")?,
            close: self.close.finite("close")?,
            volume: self.volume.finite("volume")?,
        })
    }
}

#[derive(Deserialize, Debug)]
pub struct SignalPayload {
    pub strategy: String,
    pub action: String,
    pub confidence: Numeric,
    #[serde(default)]
    pub indicators: BTreeMap<String, IndicatorValue>,
    pub timestamp: Numeric,
}

impl RemoteResponse<StrategySignal> for SignalPayload {
    fn to_model(&self) -> Result<StrategySignal, MalformedMessage> {
        let confidence = self.confidence.finite("confidence")?;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(MalformedMessage::InvalidValue {
                field: "confidence",
                reason: format!("{} is outside [0, 1]", confidence),
            });
        }

        Ok(StrategySignal {
            strategy: self.strategy.clone(),
            action: parse_side("action", &self.action)?,
            confidence,
            indicators: self.indicators.clone(),
            timestamp: self.timestamp.timestamp("timestamp")?,
        })
    }
}

#[derive(Deserialize, Debug)]
pub struct TradePayload {
    pub side: String,
    pub amount: Numeric,
    pub price: Numeric,
    pub timestamp: Numeric,
}

impl RemoteResponse<TradeRecord> for TradePayload {
    fn to_model(&self) -> Result<TradeRecord, MalformedMessage> {
        Ok(TradeRecord {
            side: parse_side("side", &self.side)?,
            amount: self.amount.positive("amount")?,
            price: self.price.positive("price")?,
            timestamp: self.timestamp.timestamp("timestamp")?,
        })
    }
}

fn parse_side(field: &'static str, raw: &str) -> Result<Side, MalformedMessage> {
    raw.parse::<Side>()
        .map_err(|reason| MalformedMessage::InvalidValue { field, reason })
}
