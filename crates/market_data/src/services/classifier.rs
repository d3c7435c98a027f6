use serde_json::Value;

use common::config::FeedSource;
use common::models::{Candle, StrategySignal, TradeRecord};

use crate::error::MalformedMessage;
use crate::remote::{CandlePayload, KlineStreamEvent, SignalPayload, TradePayload};
use crate::traits::RemoteResponse;

#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    PriceUpdate(Candle),
    StrategySignal(StrategySignal),
    TradeExecution(TradeRecord),
    Unknown,
}

/// Turns one raw text frame into a message. Never partially applies a frame:
/// any field that fails coercion rejects the whole frame.
pub fn classify(source: FeedSource, text: &str) -> Result<InboundMessage, MalformedMessage> {
    let raw: Value = serde_json::from_str(text)?;

    match source {
        FeedSource::Backend => classify_backend(raw),
        FeedSource::Exchange => classify_exchange(raw),
    }
}

fn classify_backend(mut raw: Value) -> Result<InboundMessage, MalformedMessage> {
    let kind = raw.get("type").and_then(Value::as_str).map(str::to_owned);

    match kind.as_deref() {
        Some("price_update") => {
            let payload: CandlePayload = serde_json::from_value(take_field(&mut raw, "candle")?)?;
            Ok(InboundMessage::PriceUpdate(payload.to_model()?))
        }
        Some("strategy_signal") => {
            let payload: SignalPayload = serde_json::from_value(take_field(&mut raw, "signal")?)?;
            Ok(InboundMessage::StrategySignal(payload.to_model()?))
        }
        Some("trade_execution") => {
            let payload: TradePayload = serde_json::from_value(take_field(&mut raw, "trade")?)?;
            Ok(InboundMessage::TradeExecution(payload.to_model()?))
        }
        _ => Ok(InboundMessage::Unknown),
    }
}

fn classify_exchange(raw: Value) -> Result<InboundMessage, MalformedMessage> {
    // Combined streams wrap the event as {"stream": ..., "data": {...}}.
    let event = match raw {
        Value::Object(mut map) if map.contains_key("stream") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };

    if event.get("k").is_none() {
        return Ok(InboundMessage::Unknown);
    }

    let kline: KlineStreamEvent = serde_json::from_value(event)?;
    Ok(InboundMessage::PriceUpdate(kline.to_model()?))
}

fn take_field(raw: &mut Value, field: &'static str) -> Result<Value, MalformedMessage> {
    raw.get_mut(field)
        .map(Value::take)
        .ok_or(MalformedMessage::MissingField(field))
}
