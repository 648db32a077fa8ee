pub mod cache;
pub mod client;
pub mod config;
pub mod data;
pub mod protocol;
pub mod server;
pub mod storage;
pub mod transport;
