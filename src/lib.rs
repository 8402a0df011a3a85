pub mod api;
pub mod batch;
pub mod config;
pub mod error;
pub mod history;
pub mod http_client;
pub mod innings;
pub mod provider;
pub mod situation;
pub mod slate;
pub mod state;
