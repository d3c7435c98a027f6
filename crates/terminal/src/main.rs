use dotenvy::dotenv;
use tracing::{info, warn};

use common::config::FeedConfig;
use common::logger;
use market_data::remote::{BinanceKlineClient, WsConnector};
use market_data::services::dispatcher::Dispatcher;
use market_data::services::feed_session::{FeedSession, SessionHandle};

use crate::services::console_sinks::{ConsoleChart, ConsoleStrategy, ConsoleTrades, log_status};
use crate::services::intent_reader::{read_commands, stdin_lines};

mod services;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    logger::setup_logger();

    let config = FeedConfig::from_env()?;
    info!(
        "Feed terminal starting: {} {} {} via {}",
        config.source, config.symbol, config.interval, config.ws_url
    );

    let dispatcher = Dispatcher::new(
        Box::new(ConsoleChart::default()),
        Box::new(ConsoleStrategy),
        Box::new(ConsoleTrades),
        config.trade_history_cap,
    );

    let mut session = FeedSession::new(WsConnector, config.ws_url.clone(), config.source, dispatcher)
        .with_policy(config.reconnect)
        .with_connect_timeout(config.connect_timeout);

    match &config.history {
        Some(history) => {
            let client = BinanceKlineClient::new(
                history.base_url.clone(),
                config.symbol.clone(),
                config.interval.clone(),
                history.limit,
            )?;
            session = session.with_history(Box::new(client), history.retry_delay);
        }
        None => info!("History seeding disabled"),
    }

    let (handle, commands) = SessionHandle::channel(32);

    tokio::spawn(log_status(session.subscribe()));
    let reader = tokio::spawn(read_commands(stdin_lines(16), handle.clone()));

    let ctrl_c = handle.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupted, shutting down");
                ctrl_c.stop().await;
            }
            Err(e) => warn!("Ctrl-C handler unavailable: {}", e),
        }
    });

    // `handle` is held to the end: the session only exits on Stop.
    session.run(commands).await;
    reader.abort();
    info!("Feed terminal exited");
    Ok(())
}
