pub mod binance_client;
pub mod feed_response;
pub mod kline_response;
pub mod numeric;
pub mod ws_transport;

pub use binance_client::BinanceKlineClient;
pub use feed_response::{CandlePayload, SignalPayload, TradePayload};
pub use kline_response::{KlineStreamEvent, parse_kline_rows};
pub use numeric::Numeric;
pub use ws_transport::{WsConnector, WsTransport};
