//! studiopass - credit-based class booking backend for yoga studios
//!
//! Members buy passes through Stripe Checkout, spend credits to book
//! scheduled classes and get them back when cancelling in time. Studio
//! staff import the weekly schedule from CSV and adjust balances.
//!
//! # Architecture
//! - `storage`: SeaORM backend, credit ledger and bookings
//! - `services`: booking, catalog, checkout, webhook and import logic
//! - `api`: HTTP routes, auth middleware and response envelope
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle and execution modes
//! - `system`: Logging

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
