pub mod classifier;
pub mod dispatcher;
pub mod feed_session;
pub mod outbound;
