use std::pin::Pin;
use std::time::Duration;

use chrono::Utc;
use futures_util::future;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::error::Elapsed;
use tokio::time::{self, Sleep};
use tracing::{Instrument, debug, error, info, info_span, trace, warn};
use uuid::Uuid;

use common::config::{FeedSource, ReconnectPolicy};
use common::models::{ConnectionStatus, OutboundIntent, SessionState};

use crate::error::{FeedError, SendError, TransportError};
use crate::services::classifier::{InboundMessage, classify};
use crate::services::dispatcher::Dispatcher;
use crate::services::outbound::encode_intent;
use crate::traits::{Connector, HistorySource, Transport, TransportEvent};

const STATUS_CAPACITY: usize = 64;

/// Requests sent to a running session.
#[derive(Debug)]
pub enum SessionCommand {
    Send {
        intent: OutboundIntent,
        reply: oneshot::Sender<Result<(), SendError>>,
    },
    /// Resets the attempt counter and connects again, e.g. out of `Failed`.
    Restart,
    Stop,
}

/// Cloneable front-end for a session running in [`FeedSession::run`].
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SessionCommand>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    pub async fn send(&self, intent: OutboundIntent) -> Result<(), SendError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Send { intent, reply })
            .await
            .map_err(|_| SendError::NotConnected(SessionState::Closed))?;
        rx.await
            .unwrap_or(Err(SendError::NotConnected(SessionState::Closed)))
    }

    pub async fn restart(&self) {
        let _ = self.tx.send(SessionCommand::Restart).await;
    }

    pub async fn stop(&self) {
        let _ = self.tx.send(SessionCommand::Stop).await;
    }
}

/// Owns the single live connection, its reconnect timer and the dispatcher.
pub struct FeedSession<C: Connector> {
    id: Uuid,
    url: String,
    source: FeedSource,
    policy: ReconnectPolicy,
    connect_timeout: Duration,
    state: SessionState,
    attempts: u32,
    connector: C,
    transport: Option<C::Transport>,
    reconnect_timer: Option<Pin<Box<Sleep>>>,
    dispatcher: Dispatcher,
    history: Option<Box<dyn HistorySource>>,
    seed_retry_delay: Duration,
    auto_trading: bool,
    stopped: bool,
    status_tx: broadcast::Sender<ConnectionStatus>,
}

impl<C: Connector> FeedSession<C> {
    pub fn new(
        connector: C,
        url: impl Into<String>,
        source: FeedSource,
        dispatcher: Dispatcher,
    ) -> Self {
        let (status_tx, _) = broadcast::channel(STATUS_CAPACITY);
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            source,
            policy: ReconnectPolicy::default(),
            connect_timeout: Duration::from_secs(10),
            state: SessionState::Idle,
            attempts: 0,
            connector,
            transport: None,
            reconnect_timer: None,
            dispatcher,
            history: None,
            seed_retry_delay: Duration::from_millis(5000),
            auto_trading: false,
            stopped: false,
            status_tx,
        }
    }

    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_history(mut self, history: Box<dyn HistorySource>, retry_delay: Duration) -> Self {
        self.history = Some(history);
        self.seed_retry_delay = retry_delay;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_timer.is_some()
    }

    /// Last auto-trading flag successfully sent to the backend.
    pub fn auto_trading(&self) -> bool {
        self.auto_trading
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    fn emit(&self, status: ConnectionStatus) {
        debug!("Status: {}", status);
        let _ = self.status_tx.send(status);
    }

    /// Releases any previous handle and pending timer, then connects.
    /// The URL is fixed at construction; every attempt reuses it.
    pub async fn start(&mut self) {
        self.connect_serving(None).await;
    }

    /// Connects while serving `commands`, if given, so a stop never waits
    /// for the connect timeout.
    async fn connect_serving(&mut self, mut commands: Option<&mut mpsc::Receiver<SessionCommand>>) {
        self.begin_connect().await;

        let result = {
            let attempt = time::timeout(self.connect_timeout, self.connector.connect(&self.url));
            tokio::pin!(attempt);

            loop {
                let Some(commands) = commands.as_deref_mut() else {
                    break Some((&mut attempt).await);
                };

                tokio::select! {
                    result = &mut attempt => break Some(result),
                    cmd = commands.recv() => match cmd {
                        Some(SessionCommand::Send { reply, .. }) => {
                            let _ = reply.send(Err(SendError::NotConnected(SessionState::Connecting)));
                        }
                        Some(SessionCommand::Restart) => {
                            info!("Restart requested while connecting");
                            self.attempts = 0;
                        }
                        Some(SessionCommand::Stop) | None => break None,
                    },
                }
            }
        };

        match result {
            Some(result) => self.finish_connect(result),
            None => {
                debug!("Connect to {} abandoned", self.url);
                self.stop().await;
            }
        }
    }

    async fn begin_connect(&mut self) {
        self.reconnect_timer = None;
        if let Some(mut previous) = self.transport.take() {
            debug!("Closing previous connection before reconnecting");
            previous.close().await;
        }

        self.state = SessionState::Connecting;
        self.emit(ConnectionStatus::Connecting);
    }

    fn finish_connect(&mut self, result: Result<Result<C::Transport, TransportError>, Elapsed>) {
        let result = result.unwrap_or_else(|_| {
            Err(TransportError::Timeout(self.connect_timeout.as_millis() as u64))
        });

        match result {
            Ok(transport) => self.on_open(transport),
            Err(e) => {
                self.on_error(e.to_string());
                self.on_close(None);
            }
        }
    }

    /// External restart: forgets previous failures.
    pub async fn restart(&mut self) {
        self.restart_serving(None).await;
    }

    async fn restart_serving(&mut self, commands: Option<&mut mpsc::Receiver<SessionCommand>>) {
        info!("Restarting feed session");
        self.attempts = 0;
        self.stopped = false;
        self.connect_serving(commands).await;
    }

    pub async fn stop(&mut self) {
        self.reconnect_timer = None;
        if let Some(mut transport) = self.transport.take() {
            transport.close().await;
        }
        self.state = SessionState::Closed;
        self.stopped = true;
        info!("Feed session stopped");
        self.emit(ConnectionStatus::Stopped);
    }

    /// Writes an intent to the live connection. Nothing is written unless open.
    pub async fn send(&mut self, intent: OutboundIntent) -> Result<(), SendError> {
        if self.state != SessionState::Open {
            return Err(SendError::NotConnected(self.state));
        }
        if self.source == FeedSource::Exchange {
            return Err(SendError::ReadOnlyFeed);
        }

        let text = encode_intent(
            intent,
            self.dispatcher.last_price(),
            Utc::now().timestamp_millis(),
        )?;

        let Some(transport) = self.transport.as_mut() else {
            return Err(SendError::NotConnected(self.state));
        };
        transport.send_text(text).await?;

        if let OutboundIntent::SetAutoTrading { enabled } = intent {
            self.auto_trading = enabled;
        }
        debug!("Sent {:?}", intent);
        Ok(())
    }

    pub async fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Text(text) => self.handle_frame(&text),
            TransportEvent::Error(msg) => self.on_error(msg),
            TransportEvent::Closed(reason) => self.on_close(reason),
        }
    }

    /// Classifies and dispatches one frame. Bad frames are logged and dropped.
    pub fn handle_frame(&mut self, text: &str) {
        match classify(self.source, text) {
            Ok(InboundMessage::Unknown) => trace!("Ignoring unrecognized frame"),
            Ok(message) => self.dispatcher.dispatch(message),
            Err(e) => warn!("Dropping frame: {}", FeedError::from(e)),
        }
    }

    /// Called when the reconnect timer fires.
    pub async fn reconnect_due(&mut self) {
        self.reconnect_serving(None).await;
    }

    async fn reconnect_serving(&mut self, commands: Option<&mut mpsc::Receiver<SessionCommand>>) {
        self.reconnect_timer = None;
        if self.state == SessionState::Reconnecting {
            self.connect_serving(commands).await;
        }
    }

    fn on_open(&mut self, transport: C::Transport) {
        info!("Connected to {}", self.url);
        self.transport = Some(transport);
        self.state = SessionState::Open;
        self.attempts = 0;
        self.emit(ConnectionStatus::Connected);
    }

    // Diagnostic only. Reconnects are driven by the close that follows.
    fn on_error(&mut self, msg: String) {
        warn!("Transport error ({}): {}", self.state, msg);
        self.emit(ConnectionStatus::Error(msg));
    }

    fn on_close(&mut self, reason: Option<String>) {
        if !matches!(self.state, SessionState::Open | SessionState::Connecting) {
            debug!("Ignoring close while {}", self.state);
            return;
        }

        self.transport = None;
        self.state = SessionState::Closed;
        info!(
            "Disconnected from {}{}",
            self.url,
            reason.map(|r| format!(": {}", r)).unwrap_or_default()
        );
        self.emit(ConnectionStatus::Disconnected);

        if let Some(max) = self.policy.max_attempts {
            if self.attempts >= max {
                self.state = SessionState::Failed;
                error!(
                    "{}",
                    FeedError::ExhaustedRetries {
                        attempts: self.attempts
                    }
                );
                self.emit(ConnectionStatus::Failed {
                    attempts: self.attempts,
                });
                return;
            }
        }

        self.attempts += 1;
        self.state = SessionState::Reconnecting;
        info!(
            "Reconnecting in {:?} (attempt {})",
            self.policy.delay, self.attempts
        );
        self.emit(ConnectionStatus::Reconnecting {
            attempt: self.attempts,
            max: self.policy.max_attempts,
        });
        self.reconnect_timer = Some(Box::pin(time::sleep(self.policy.delay)));
    }

    async fn seed(&mut self) -> Result<(), FeedError> {
        let Some(history) = self.history.as_ref() else {
            return Ok(());
        };

        self.emit(ConnectionStatus::LoadingHistory);
        let candles = history.fetch_candles().await?;
        self.dispatcher.seed(&candles);
        self.emit(ConnectionStatus::HistoryLoaded);
        Ok(())
    }

    /// Seeds the chart, then serves commands, frames and the reconnect timer
    /// until stopped or every [`SessionHandle`] is dropped.
    pub async fn run(self, commands: mpsc::Receiver<SessionCommand>) {
        let span = info_span!("feed", session = %self.id);
        self.run_inner(commands).instrument(span).await
    }

    async fn run_inner(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        info!("Starting {} feed session for {}", self.source, self.url);

        if !self.seed_until_ready(&mut commands).await {
            return;
        }
        self.connect_serving(Some(&mut commands)).await;

        while !self.stopped {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd, &mut commands).await,
                    None => self.stop().await,
                },
                event = next_event(&mut self.transport) => self.on_transport_event(event).await,
                _ = wait_timer(&mut self.reconnect_timer) => {
                    self.reconnect_serving(Some(&mut commands)).await
                }
            }
        }
    }

    /// Returns `false` if the session was stopped before history loaded.
    async fn seed_until_ready(&mut self, commands: &mut mpsc::Receiver<SessionCommand>) -> bool {
        loop {
            let err = match self.seed().await {
                Ok(()) => return true,
                Err(e) => e,
            };

            error!(
                "Failed to load history: {}. Retrying in {:?}...",
                err, self.seed_retry_delay
            );
            self.emit(ConnectionStatus::Error(err.to_string()));

            let retry = time::sleep(self.seed_retry_delay);
            tokio::pin!(retry);

            loop {
                tokio::select! {
                    _ = &mut retry => break,
                    cmd = commands.recv() => match cmd {
                        Some(SessionCommand::Send { reply, .. }) => {
                            let _ = reply.send(Err(SendError::NotConnected(self.state)));
                        }
                        Some(SessionCommand::Restart) => break,
                        Some(SessionCommand::Stop) | None => {
                            self.stop().await;
                            return false;
                        }
                    },
                }
            }
        }
    }

    async fn handle_command(
        &mut self,
        cmd: SessionCommand,
        commands: &mut mpsc::Receiver<SessionCommand>,
    ) {
        match cmd {
            SessionCommand::Send { intent, reply } => {
                let result = self.send(intent).await;
                if let Err(ref e) = result {
                    warn!("Intent {:?} not sent: {}", intent, e);
                }
                let _ = reply.send(result);
            }
            SessionCommand::Restart => self.restart_serving(Some(commands)).await,
            SessionCommand::Stop => self.stop().await,
        }
    }
}

async fn next_event<T: Transport>(transport: &mut Option<T>) -> TransportEvent {
    match transport {
        Some(t) => t.next_event().await,
        None => future::pending().await,
    }
}

async fn wait_timer(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => future::pending().await,
    }
}
