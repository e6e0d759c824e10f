// src/lib.rs

pub mod config;
pub mod db;
pub mod engine;
pub mod repositories;
pub mod services;
pub mod http;
pub mod utils;
pub mod test_utils;

pub use config::LedgerConfig;
pub use db::Database;
pub use ledgerbot_common::error::Error;
pub use services::LedgerBot;
