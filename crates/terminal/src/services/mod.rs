pub mod console_sinks;
pub mod intent_reader;
