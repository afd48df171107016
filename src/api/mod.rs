//! HTTP API
//!
//! - `/api/v1`: mobile client endpoints (user JWT)
//! - `/admin/v1`: studio staff endpoints (static admin token)
//! - `/webhooks/stripe`: payment provider callbacks (signed)
//! - `/health`: probes

pub mod constants;
pub mod jwt;
pub mod middleware;
pub mod services;
