use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Connecting,
    Open,
    Closed,
    Reconnecting,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Reconnecting => "reconnecting",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// User-visible status line published by the feed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    LoadingHistory,
    HistoryLoaded,
    Connecting,
    Connected,
    Disconnected,
    Reconnecting { attempt: u32, max: Option<u32> },
    Failed { attempts: u32 },
    Error(String),
    Stopped,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadingHistory => write!(f, "Loading historical data..."),
            Self::HistoryLoaded => write!(f, "Historical data loaded"),
            Self::Connecting => write!(f, "Connecting..."),
            Self::Connected => write!(f, "Connected"),
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Reconnecting {
                attempt,
                max: Some(max),
            } => write!(f, "Reconnecting ({}/{})", attempt, max),
            Self::Reconnecting { attempt, max: None } => write!(f, "Reconnecting ({})", attempt),
            Self::Failed { attempts } => {
                write!(f, "Connection failed after {} attempts", attempts)
            }
            Self::Error(msg) => write!(f, "Error: {}", msg),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}
