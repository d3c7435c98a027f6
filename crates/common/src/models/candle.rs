use serde::{Deserialize, Serialize};

/// Up/down classification shared by candles, volume bars and signal markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// A flat candle (close == open) counts as `Up`.
    pub fn of(open: f64, close: f64) -> Self {
        if close >= open { Self::Up } else { Self::Down }
    }
}

/// One OHLCV bucket. `timestamp` is the bucket open time in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CandlePoint {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VolumePoint {
    pub time: i64,
    pub value: f64,
    pub direction: Direction,
}

impl Candle {
    pub fn direction(&self) -> Direction {
        Direction::of(self.open, self.close)
    }

    /// Chart time axis is in whole seconds.
    pub fn chart_time(&self) -> i64 {
        self.timestamp / 1000
    }

    pub fn candle_point(&self) -> CandlePoint {
        CandlePoint {
            time: self.chart_time(),
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
        }
    }

    pub fn volume_point(&self) -> VolumePoint {
        VolumePoint {
            time: self.chart_time(),
            value: self.volume,
            direction: self.direction(),
        }
    }
}
