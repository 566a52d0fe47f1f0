pub mod analysis;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod models;
pub mod screener;
pub mod sync;
