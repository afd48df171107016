//! Service layer for business logic
//!
//! Shared by the HTTP API and the CLI. Services own the business rules and
//! delegate persistence to `SeaOrmStorage`.

mod booking_service;
mod catalog_service;
mod checkout_service;
pub mod payment;
mod profile_service;
pub mod schedule_import;
mod stats_service;
pub mod webhook_service;

pub use booking_service::*;
pub use catalog_service::*;
pub use checkout_service::*;
pub use payment::{CheckoutSession, CheckoutSessionRequest, PaymentGateway, StripeGateway};
pub use profile_service::*;
pub use schedule_import::{ImportReport, ScheduleImporter};
pub use stats_service::*;
pub use webhook_service::{WebhookOutcome, WebhookService};
