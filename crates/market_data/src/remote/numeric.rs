use serde::Deserialize;

use crate::error::MalformedMessage;

/// A numeric wire field that may be encoded as a JSON number or a string.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    pub fn finite(&self, field: &'static str) -> Result<f64, MalformedMessage> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().map_err(|_| MalformedMessage::NotFinite {
                field,
                value: s.clone(),
            })?,
        };

        if value.is_finite() {
            Ok(value)
        } else {
            Err(MalformedMessage::NotFinite {
                field,
                value: value.to_string(),
            })
        }
    }

    pub fn positive(&self, field: &'static str) -> Result<f64, MalformedMessage> {
        let value = self.finite(field)?;
        if value > 0.0 {
            Ok(value)
        } else {
            Err(MalformedMessage::InvalidValue {
                field,
                reason: format!("{} is not positive", value),
            })
        }
    }

    /// Millisecond timestamps, truncated to whole milliseconds.
    pub fn timestamp(&self, field: &'static str) -> Result<i64, MalformedMessage> {
        Ok(self.finite(field)? as i64)
    }
}
