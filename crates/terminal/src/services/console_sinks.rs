use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use common::models::{
    CandlePoint, ConnectionStatus, IndicatorValue, SignalMarker, StrategySignal, TradeRecord,
    VolumePoint,
};
use market_data::traits::{ChartRenderer, StrategySink, TradeHistorySink};

/// Chart stand-in that logs series updates.
#[derive(Debug, Default)]
pub struct ConsoleChart {
    bars: usize,
    last: Option<CandlePoint>,
}

impl ChartRenderer for ConsoleChart {
    fn seed(&mut self, candles: &[CandlePoint], _volumes: &[VolumePoint]) {
        self.bars = candles.len();
        self.last = candles.last().copied();
        if let Some(last) = &self.last {
            info!("Chart seeded: {} bars, last close {}", self.bars, last.close);
        }
    }

    fn update_candle(&mut self, point: CandlePoint) {
        // Same chart time replaces the forming bar.
        if self.last.map(|p| p.time) != Some(point.time) {
            self.bars += 1;
        }
        debug!(
            "{} O:{} H:{} L:{} C:{}",
            point.time, point.open, point.high, point.low, point.close
        );
        self.last = Some(point);
    }

    fn update_volume(&mut self, point: VolumePoint) {
        debug!("{} V:{} {:?}", point.time, point.value, point.direction);
    }

    fn set_markers(&mut self, markers: Vec<SignalMarker>) {
        for marker in markers {
            info!("Marker @{} {:?}: {}", marker.time, marker.shape, marker.text);
        }
    }
}

pub struct ConsoleStrategy;

impl StrategySink for ConsoleStrategy {
    fn on_signal(&mut self, signal: &StrategySignal) {
        info!(
            "[{}] {} ({}%) {}",
            signal.strategy,
            signal.action,
            signal.confidence_pct(),
            format_indicators(signal)
        );
    }
}

pub struct ConsoleTrades;

impl TradeHistorySink for ConsoleTrades {
    fn on_trades(&mut self, trades: &[TradeRecord]) {
        if let Some(latest) = trades.first() {
            info!("{} ({} shown)", format_trade_row(latest), trades.len());
        }
    }
}

pub fn format_trade_row(trade: &TradeRecord) -> String {
    let time = DateTime::<Utc>::from_timestamp_millis(trade.timestamp)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());

    format!(
        "{} {} {:.4} @ {:.4}",
        time,
        trade.side.as_str().to_uppercase(),
        trade.amount,
        trade.price
    )
}

fn format_indicators(signal: &StrategySignal) -> String {
    signal
        .indicators
        .iter()
        .map(|(name, value)| match value {
            IndicatorValue::Number(n) => format!("{}={:.2}", name, n),
            IndicatorValue::Text(s) => format!("{}={}", name, s),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Mirrors session status to the log until the session goes away.
pub async fn log_status(mut rx: broadcast::Receiver<ConnectionStatus>) {
    loop {
        match rx.recv().await {
            Ok(status @ (ConnectionStatus::Failed { .. } | ConnectionStatus::Error(_))) => {
                error!("{}", status)
            }
            Ok(status @ ConnectionStatus::Disconnected) => warn!("{}", status),
            Ok(status) => info!("{}", status),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Status log lagged behind. Missed {} updates.", n);
            }
            Err(_) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::Side;
    use std::collections::BTreeMap;

    #[test]
    fn test_format_trade_row() {
        let trade = TradeRecord {
            side: Side::Buy,
            amount: 100.0,
            price: 0.61234,
            timestamp: 3_723_000,
        };
        assert_eq!(format_trade_row(&trade), "01:02:03 BUY 100.0000 @ 0.6123");
    }

    #[test]
    fn test_format_indicators_sorted() {
        let mut indicators = BTreeMap::new();
        indicators.insert("rsi".to_string(), IndicatorValue::Number(71.456));
        indicators.insert("trend".to_string(), IndicatorValue::Text("up".to_string()));
        indicators.insert("ema".to_string(), IndicatorValue::Number(0.5));

        let signal = StrategySignal {
            strategy: "momentum".to_string(),
            action: Side::Sell,
            confidence: 0.8,
            indicators,
            timestamp: 0,
        };
        assert_eq!(format_indicators(&signal), "ema=0.50 rsi=71.46 trend=up");
    }

    #[test]
    fn test_chart_counts_new_bars_only() {
        let point = |time, close| CandlePoint {
            time,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close,
        };

        let mut chart = ConsoleChart::default();
        chart.seed(&[point(60, 1.0), point(120, 1.0)], &[]);
        chart.update_candle(point(120, 1.1));
        chart.update_candle(point(180, 1.2));

        assert_eq!(chart.bars, 3);
        assert_eq!(chart.last.map(|p| p.close), Some(1.2));
    }
}
