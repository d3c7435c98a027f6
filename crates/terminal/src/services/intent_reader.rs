use std::io::BufRead;
use std::thread;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use common::models::{OutboundIntent, Side};
use market_data::services::feed_session::SessionHandle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TerminalCommand {
    Intent(OutboundIntent),
    Restart,
    Quit,
}

#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    #[error("unknown command '{0}' (try: buy <amount>, sell <amount>, auto on|off, restart, quit)")]
    UnknownCommand(String),
    #[error("'{0}' needs an amount")]
    MissingAmount(&'static str),
    #[error("invalid amount '{0}'")]
    InvalidAmount(String),
    #[error("auto expects on or off, got '{0}'")]
    InvalidSwitch(String),
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<TerminalCommand>, ParseError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };

    let command = match head.to_ascii_lowercase().as_str() {
        "buy" => trade(Side::Buy, words.next())?,
        "sell" => trade(Side::Sell, words.next())?,
        "auto" => {
            let switch = words.next().unwrap_or_default();
            let enabled = match switch.to_ascii_lowercase().as_str() {
                "on" | "true" | "1" => true,
                "off" | "false" | "0" => false,
                _ => return Err(ParseError::InvalidSwitch(switch.to_string())),
            };
            TerminalCommand::Intent(OutboundIntent::SetAutoTrading { enabled })
        }
        "restart" | "reconnect" => TerminalCommand::Restart,
        "quit" | "exit" | "q" => TerminalCommand::Quit,
        other => return Err(ParseError::UnknownCommand(other.to_string())),
    };

    Ok(Some(command))
}

fn trade(side: Side, amount: Option<&str>) -> Result<TerminalCommand, ParseError> {
    let raw = amount.ok_or(ParseError::MissingAmount(side.as_str()))?;
    let amount: f64 = raw
        .parse()
        .map_err(|_| ParseError::InvalidAmount(raw.to_string()))?;

    Ok(TerminalCommand::Intent(OutboundIntent::ManualTrade { side, amount }))
}

/// Reads stdin on its own thread. A blocked read there never holds up
/// runtime shutdown.
pub fn stdin_lines(capacity: usize) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(capacity);

    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to read input: {}", e);
                    break;
                }
            }
        }
    });

    rx
}

/// Feeds operator commands into the session until quit or end of input.
pub async fn read_commands(mut lines: mpsc::Receiver<String>, handle: SessionHandle) {
    loop {
        let Some(line) = lines.recv().await else {
            info!("Input closed; commands disabled");
            return;
        };

        match parse_line(&line) {
            Ok(Some(TerminalCommand::Intent(intent))) => match handle.send(intent).await {
                Ok(()) => info!("Sent {:?}", intent),
                Err(e) => warn!("Not sent: {}", e),
            },
            Ok(Some(TerminalCommand::Restart)) => handle.restart().await,
            Ok(Some(TerminalCommand::Quit)) => {
                handle.stop().await;
                return;
            }
            Ok(None) => {}
            Err(e) => warn!("{}", e),
        }
    }
}
