pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod import;
pub mod models;
pub mod service;

pub use config::AppConfig;
pub use db::{create_pool, InvoiceStore, MemoryInvoiceStore, PgInvoiceStore};
pub use service::{build_chains, Matcher};
