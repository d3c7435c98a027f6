use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Direction, Side};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndicatorValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategySignal {
    pub strategy: String,
    pub action: Side,
    pub confidence: f64, // 0.0..=1.0
    pub indicators: BTreeMap<String, IndicatorValue>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarkerPosition {
    AboveBar,
    BelowBar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarkerShape {
    ArrowUp,
    ArrowDown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalMarker {
    pub time: i64,
    pub position: MarkerPosition,
    pub shape: MarkerShape,
    pub direction: Direction,
    pub text: String,
}

impl StrategySignal {
    pub fn confidence_pct(&self) -> u32 {
        (self.confidence * 100.0).round() as u32
    }

    pub fn marker(&self) -> SignalMarker {
        let (position, shape) = match self.action {
            Side::Buy => (MarkerPosition::BelowBar, MarkerShape::ArrowUp),
            Side::Sell => (MarkerPosition::AboveBar, MarkerShape::ArrowDown),
        };

        SignalMarker {
            time: self.timestamp / 1000,
            position,
            shape,
            direction: self.action.direction(),
            text: format!("{} ({}%)", self.strategy, self.confidence_pct()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(action: Side, confidence: f64) -> StrategySignal {
        StrategySignal {
            strategy: "momentum".to_string(),
            action,
            confidence,
            indicators: BTreeMap::new(),
            timestamp: 1_700_000_000_500,
        }
    }

    #[test]
    fn test_buy_marker_sits_below_bar() {
        let marker = signal(Side::Buy, 0.855).marker();

        assert_eq!(marker.time, 1_700_000_000);
        assert_eq!(marker.position, MarkerPosition::BelowBar);
        assert_eq!(marker.shape, MarkerShape::ArrowUp);
        assert_eq!(marker.direction, Direction::Up);
        assert_eq!(marker.text, "momentum (86%)");
    }

    #[test]
    fn test_sell_marker_sits_above_bar() {
        let marker = signal(Side::Sell, 0.5).marker();

        assert_eq!(marker.position, MarkerPosition::AboveBar);
        assert_eq!(marker.shape, MarkerShape::ArrowDown);
        assert_eq!(marker.direction, Direction::Down);
        assert_eq!(marker.text, "momentum (50%)");
    }
}
