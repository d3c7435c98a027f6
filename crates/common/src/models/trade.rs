use std::collections::VecDeque;

use serde::Serialize;

use super::Side;

pub const DEFAULT_TRADE_HISTORY_CAP: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub side: Side,
    pub amount: f64,
    pub price: f64,
    pub timestamp: i64,
}

/// Most-recent-first list of executions, truncated on every insert.
#[derive(Debug, Clone)]
pub struct TradeHistory {
    records: VecDeque<TradeRecord>,
    cap: usize,
}

impl TradeHistory {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            records: VecDeque::with_capacity(cap),
            cap,
        }
    }

    pub fn push(&mut self, record: TradeRecord) {
        self.records.push_front(record);
        self.records.truncate(self.cap);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn latest(&self) -> Option<&TradeRecord> {
        self.records.front()
    }

    pub fn as_slice(&mut self) -> &[TradeRecord] {
        self.records.make_contiguous()
    }
}

impl Default for TradeHistory {
    fn default() -> Self {
        Self::new(DEFAULT_TRADE_HISTORY_CAP)
    }
}
