pub mod avatar_cache;
pub mod error_sink;
pub mod errors;
pub mod ports;
pub mod scope;
pub mod server_cache;

#[cfg(test)]
pub mod testing;
