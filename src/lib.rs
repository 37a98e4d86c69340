//! Sales pipeline reporting over C0-C3 deal stage sheets.
//!
//! Data flows one way: a [`source::DataSource`] (optionally behind the
//! [`cache::CachedSource`] TTL cache) yields raw tables, the [`loader`]
//! normalizes them into typed records, and [`dashboard::compute`] derives
//! every view for a filter selection. [`output`] writes the exports.

pub mod aggregate;
pub mod cache;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod filter;
pub mod forecast;
pub mod funnel;
pub mod insights;
pub mod loader;
pub mod metrics;
pub mod output;
pub mod revenue;
pub mod source;
pub mod types;
pub mod util;
