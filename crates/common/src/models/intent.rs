use serde::Serialize;

use super::Side;

/// A user action to be forwarded over the live connection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutboundIntent {
    ManualTrade { side: Side, amount: f64 },
    SetAutoTrading { enabled: bool },
}

/// Wire shape of an outbound frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    ManualTrade {
        action: Side,
        amount: f64,
        timestamp: i64,
        price: f64,
    },
    AutoTrading {
        enabled: bool,
    },
}

impl OutboundFrame {
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
