pub mod error;
pub mod remote;
pub mod services;
pub mod traits;

#[cfg(test)]
pub mod testing;
