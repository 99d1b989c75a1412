pub mod configuration;
pub mod export;
pub mod proxy;
pub mod reporter;
pub mod server;
