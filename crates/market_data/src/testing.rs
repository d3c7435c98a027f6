//! In-memory fakes for driving the feed session without a network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::future;
use tokio::sync::mpsc;

use common::models::{Candle, CandlePoint, SignalMarker, StrategySignal, TradeRecord, VolumePoint};

use crate::error::{SeedLoadError, TransportError};
use crate::services::dispatcher::Dispatcher;
use crate::traits::{
    ChartRenderer, Connector, HistorySource, StrategySink, TradeHistorySink, Transport,
    TransportEvent,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectOutcome {
    /// Opens and stays open until the test pushes events.
    Open,
    /// Opens, then reports a close on the first read.
    OpenThenClose,
    Refuse,
}

/// Test-side end of one fake connection.
#[derive(Clone)]
pub struct FakeLink {
    pub events: Option<mpsc::UnboundedSender<TransportEvent>>,
    pub sent: Arc<Mutex<Vec<String>>>,
    pub closed: Arc<AtomicBool>,
}

impl FakeLink {
    pub fn push(&self, event: TransportEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct ConnectorState {
    script: VecDeque<ConnectOutcome>,
    links: Vec<FakeLink>,
}

/// Scripted connector; refuses once the script runs out.
#[derive(Clone, Default)]
pub struct FakeConnector {
    state: Arc<Mutex<ConnectorState>>,
    attempts: Arc<AtomicUsize>,
}

impl FakeConnector {
    pub fn scripted(outcomes: &[ConnectOutcome]) -> Self {
        let connector = Self::default();
        connector.state.lock().unwrap().script = outcomes.iter().copied().collect();
        connector
    }

    pub fn connect_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn links(&self) -> Vec<FakeLink> {
        self.state.lock().unwrap().links.clone()
    }

    pub fn last_link(&self) -> FakeLink {
        self.links().pop().expect("no connection was opened")
    }
}

#[async_trait]
impl Connector for FakeConnector {
    type Transport = FakeTransport;

    async fn connect(&self, _url: &str) -> Result<FakeTransport, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        let outcome = state.script.pop_front().unwrap_or(ConnectOutcome::Refuse);

        if outcome == ConnectOutcome::Refuse {
            return Err(TransportError::Connect("connection refused".to_string()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let link = FakeLink {
            events: (outcome == ConnectOutcome::Open).then_some(tx),
            sent: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
        };
        state.links.push(link.clone());

        Ok(FakeTransport {
            events: rx,
            sent: link.sent,
            closed: link.closed,
        })
    }
}

/// Connector whose attempts never resolve.
#[derive(Clone, Default)]
pub struct StalledConnector {
    attempts: Arc<AtomicUsize>,
}

impl StalledConnector {
    pub fn connect_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for StalledConnector {
    type Transport = FakeTransport;

    async fn connect(&self, _url: &str) -> Result<FakeTransport, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        future::pending().await
    }
}

pub struct FakeTransport {
    events: mpsc::UnboundedReceiver<TransportEvent>,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn next_event(&mut self) -> TransportEvent {
        match self.events.recv().await {
            Some(event) => event,
            None => TransportEvent::Closed(None),
        }
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    Seed(usize),
    Candle(CandlePoint),
    Volume(VolumePoint),
    Markers(Vec<SignalMarker>),
}

#[derive(Clone, Default)]
pub struct RecordingRenderer {
    pub calls: Arc<Mutex<Vec<RenderCall>>>,
}

impl RecordingRenderer {
    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl ChartRenderer for RecordingRenderer {
    fn seed(&mut self, candles: &[CandlePoint], _volumes: &[VolumePoint]) {
        self.calls.lock().unwrap().push(RenderCall::Seed(candles.len()));
    }

    fn update_candle(&mut self, point: CandlePoint) {
        self.calls.lock().unwrap().push(RenderCall::Candle(point));
    }

    fn update_volume(&mut self, point: VolumePoint) {
        self.calls.lock().unwrap().push(RenderCall::Volume(point));
    }

    fn set_markers(&mut self, markers: Vec<SignalMarker>) {
        self.calls.lock().unwrap().push(RenderCall::Markers(markers));
    }
}

pub struct NullSink;

impl StrategySink for NullSink {
    fn on_signal(&mut self, _signal: &StrategySignal) {}
}

impl TradeHistorySink for NullSink {
    fn on_trades(&mut self, _trades: &[TradeRecord]) {}
}

pub fn recording_dispatcher() -> (Dispatcher, RecordingRenderer) {
    let renderer = RecordingRenderer::default();
    let dispatcher = Dispatcher::new(
        Box::new(renderer.clone()),
        Box::new(NullSink),
        Box::new(NullSink),
        10,
    );
    (dispatcher, renderer)
}

/// Returns the scripted results in order, then keeps succeeding.
pub struct FakeHistory {
    script: Mutex<VecDeque<Result<Vec<Candle>, SeedLoadError>>>,
    fallback: Vec<Candle>,
    pub calls: Arc<AtomicUsize>,
}

impl FakeHistory {
    pub fn new(script: Vec<Result<Vec<Candle>, SeedLoadError>>, fallback: Vec<Candle>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl HistorySource for FakeHistory {
    async fn fetch_candles(&self) -> Result<Vec<Candle>, SeedLoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

pub fn candle(timestamp: i64, open: f64, close: f64) -> Candle {
    Candle {
        timestamp,
        open,
        high: open.max(close),
        low: open.min(close),
        close,
        volume: 100.0,
    }
}
