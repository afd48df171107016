pub mod booking;
pub mod class;
pub mod class_session;
pub mod credit_ledger;
pub mod csv_upload;
pub mod pass;
pub mod profile;
pub mod purchase;

pub use booking::Entity as BookingEntity;
pub use class::Entity as ClassEntity;
pub use class_session::Entity as ClassSessionEntity;
pub use credit_ledger::Entity as CreditLedgerEntity;
pub use csv_upload::Entity as CsvUploadEntity;
pub use pass::Entity as PassEntity;
pub use profile::Entity as ProfileEntity;
pub use purchase::Entity as PurchaseEntity;
