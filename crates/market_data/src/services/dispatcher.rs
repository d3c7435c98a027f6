use tracing::{debug, info};

use common::models::{Candle, CandlePoint, StrategySignal, TradeHistory, TradeRecord, VolumePoint};

use crate::services::classifier::InboundMessage;
use crate::traits::{ChartRenderer, StrategySink, TradeHistorySink};

/// Routes classified messages to the chart, strategy panel and trade list.
pub struct Dispatcher {
    renderer: Box<dyn ChartRenderer>,
    strategy_sink: Box<dyn StrategySink>,
    trade_sink: Box<dyn TradeHistorySink>,
    trades: TradeHistory,
    last_price: Option<f64>,
}

impl Dispatcher {
    pub fn new(
        renderer: Box<dyn ChartRenderer>,
        strategy_sink: Box<dyn StrategySink>,
        trade_sink: Box<dyn TradeHistorySink>,
        trade_history_cap: usize,
    ) -> Self {
        Self {
            renderer,
            strategy_sink,
            trade_sink,
            trades: TradeHistory::new(trade_history_cap),
            last_price: None,
        }
    }

    /// Close of the most recent candle, seeded or live.
    pub fn last_price(&self) -> Option<f64> {
        self.last_price
    }

    pub fn trades(&self) -> &TradeHistory {
        &self.trades
    }

    /// Replaces the chart contents with a history batch (oldest first).
    pub fn seed(&mut self, candles: &[Candle]) {
        let (points, volumes): (Vec<CandlePoint>, Vec<VolumePoint>) = candles
            .iter()
            .map(|c| (c.candle_point(), c.volume_point()))
            .unzip();

        self.renderer.seed(&points, &volumes);
        if let Some(last) = candles.last() {
            self.last_price = Some(last.close);
        }
        info!("Seeded chart with {} candles", candles.len());
    }

    pub fn dispatch(&mut self, message: InboundMessage) {
        match message {
            InboundMessage::PriceUpdate(candle) => self.on_candle(candle),
            InboundMessage::StrategySignal(signal) => self.on_signal(signal),
            InboundMessage::TradeExecution(trade) => self.on_trade(trade),
            InboundMessage::Unknown => {}
        }
    }

    fn on_candle(&mut self, candle: Candle) {
        self.renderer.update_candle(candle.candle_point());
        self.renderer.update_volume(candle.volume_point());
        self.last_price = Some(candle.close);
    }

    fn on_signal(&mut self, signal: StrategySignal) {
        debug!(
            "Signal {} {} ({}%)",
            signal.strategy,
            signal.action,
            signal.confidence_pct()
        );
        self.renderer.set_markers(vec![signal.marker()]);
        self.strategy_sink.on_signal(&signal);
    }

    fn on_trade(&mut self, trade: TradeRecord) {
        info!(
            "Trade executed: {} {} @ {}",
            trade.side, trade.amount, trade.price
        );
        self.trades.push(trade);
        self.trade_sink.on_trades(self.trades.as_slice());
    }
}
