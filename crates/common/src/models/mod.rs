pub mod candle;
pub mod intent;
pub mod side;
pub mod signal;
pub mod status;
pub mod trade;

pub use candle::{Candle, CandlePoint, Direction, VolumePoint};
pub use intent::{OutboundFrame, OutboundIntent};
pub use side::Side;
pub use signal::{IndicatorValue, MarkerPosition, MarkerShape, SignalMarker, StrategySignal};
pub use status::{ConnectionStatus, SessionState};
pub use trade::{TradeHistory, TradeRecord};
