use common::models::{OutboundFrame, OutboundIntent};

use crate::error::SendError;

/// Builds the wire frame for an intent. `price` is the last known close.
pub fn build_frame(
    intent: OutboundIntent,
    price: Option<f64>,
    now_ms: i64,
) -> Result<OutboundFrame, SendError> {
    match intent {
        OutboundIntent::ManualTrade { side, amount } => {
            if !amount.is_finite() || amount <= 0.0 {
                return Err(SendError::InvalidAmount(amount));
            }
            let price = price.ok_or(SendError::NoReferencePrice)?;

            Ok(OutboundFrame::ManualTrade {
                action: side,
                amount,
                timestamp: now_ms,
                price,
            })
        }
        OutboundIntent::SetAutoTrading { enabled } => Ok(OutboundFrame::AutoTrading { enabled }),
    }
}

pub fn encode_intent(
    intent: OutboundIntent,
    price: Option<f64>,
    now_ms: i64,
) -> Result<String, SendError> {
    build_frame(intent, price, now_ms)?
        .to_text()
        .map_err(|e| SendError::Serialize(e.to_string()))
}
