use async_trait::async_trait;

use common::models::{Candle, CandlePoint, SignalMarker, StrategySignal, TradeRecord, VolumePoint};

use crate::error::{MalformedMessage, SeedLoadError, TransportError};

/// Converts a raw wire payload into a validated domain model.
pub trait RemoteResponse<T> {
    fn to_model(&self) -> Result<T, MalformedMessage>;
}

/// Chart drawing surface. Rendering itself lives outside this crate.
#[cfg_attr(test, mockall::automock)]
pub trait ChartRenderer: Send {
    /// Replaces all series data in one call.
    fn seed(&mut self, candles: &[CandlePoint], volumes: &[VolumePoint]);
    fn update_candle(&mut self, point: CandlePoint);
    fn update_volume(&mut self, point: VolumePoint);
    fn set_markers(&mut self, markers: Vec<SignalMarker>);
}

#[cfg_attr(test, mockall::automock)]
pub trait StrategySink: Send {
    fn on_signal(&mut self, signal: &StrategySignal);
}

#[cfg_attr(test, mockall::automock)]
pub trait TradeHistorySink: Send {
    /// Receives the full display list, most recent first.
    fn on_trades(&mut self, trades: &[TradeRecord]);
}

/// One bounded batch of historical candles, oldest first.
#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn fetch_candles(&self) -> Result<Vec<Candle>, SeedLoadError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Text(String),
    /// Diagnostic only; an authoritative `Closed` always follows.
    Error(String),
    Closed(Option<String>),
}

#[async_trait]
pub trait Transport: Send {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Waits for the next frame or lifecycle event.
    async fn next_event(&mut self) -> TransportEvent;

    async fn close(&mut self);
}

#[async_trait]
pub trait Connector: Send + Sync {
    type Transport: Transport;

    /// Resolves once the connection is open.
    async fn connect(&self, url: &str) -> Result<Self::Transport, TransportError>;
}
