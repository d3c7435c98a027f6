use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::traits::{Connector, Transport, TransportEvent};

#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    type Transport = WsTransport;

    async fn connect(&self, url: &str) -> Result<WsTransport, TransportError> {
        info!("Connecting to: {}", url);
        let (ws_stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        Ok(WsTransport {
            stream: ws_stream,
            errored: false,
            closed: false,
        })
    }
}

pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    errored: bool,
    closed: bool,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if self.closed || self.errored {
            return Err(TransportError::Closed);
        }
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn next_event(&mut self) -> TransportEvent {
        // A reported error is always followed by exactly one close.
        if self.errored && !self.closed {
            self.closed = true;
            return TransportEvent::Closed(None);
        }
        if self.closed {
            return futures_util::future::pending().await;
        }

        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return TransportEvent::Text(text.as_str().to_owned()),
                Some(Ok(Message::Ping(pg))) => {
                    if let Err(e) = self.stream.send(Message::Pong(pg)).await {
                        warn!("Failed to answer ping: {}", e);
                    }
                    debug!("Ping - Pong message sent to websocket.");
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!("Close message received");
                    self.closed = true;
                    return TransportEvent::Closed(frame.map(|f| f.reason.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(_))) => debug!("Ignoring binary frame"),
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    self.errored = true;
                    return TransportEvent::Error(e.to_string());
                }
                None => {
                    self.closed = true;
                    return TransportEvent::Closed(None);
                }
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.stream.close(None).await {
            debug!("Close handshake failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

    /// Accepts one websocket client and hands the server side to `handler`.
    async fn serve_once<F, Fut>(handler: F) -> String
    where
        F: FnOnce(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            handler(ws).await;
        });

        format!("ws://{}", addr)
    }

    async fn assert_silent(transport: &mut WsTransport) {
        let next = tokio::time::timeout(Duration::from_millis(200), transport.next_event()).await;
        assert!(next.is_err(), "expected no further events, got {:?}", next);
    }

    #[tokio::test]
    async fn test_close_frame_reports_reason_once() {
        let url = serve_once(|mut ws| async move {
            ws.send(Message::Text("hello".into())).await.unwrap();
            ws.close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "bye".into(),
            }))
            .await
            .unwrap();
            while ws.next().await.is_some() {}
        })
        .await;

        let mut transport = WsConnector.connect(&url).await.unwrap();

        assert_eq!(
            transport.next_event().await,
            TransportEvent::Text("hello".to_string())
        );
        assert_eq!(
            transport.next_event().await,
            TransportEvent::Closed(Some("bye".to_string()))
        );
        assert_silent(&mut transport).await;
        assert_eq!(
            transport.send_text("late".to_string()).await,
            Err(TransportError::Closed)
        );
    }

    #[tokio::test]
    async fn test_protocol_error_then_single_close() {
        let url = serve_once(|mut ws| async move {
            // FIN frame with reserved opcode 0x3.
            ws.get_mut().write_all(&[0x83, 0x00]).await.unwrap();
            let _ = ws.next().await;
        })
        .await;

        let mut transport = WsConnector.connect(&url).await.unwrap();

        assert!(matches!(
            transport.next_event().await,
            TransportEvent::Error(_)
        ));
        assert_eq!(transport.next_event().await, TransportEvent::Closed(None));
        assert_silent(&mut transport).await;
        assert_eq!(
            transport.send_text("late".to_string()).await,
            Err(TransportError::Closed)
        );
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = WsConnector.connect(&format!("ws://{}", addr)).await;
        assert!(matches!(result, Err(TransportError::Connect(_))));
    }
}
