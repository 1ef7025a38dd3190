pub mod auth;
pub mod backup;
pub mod core;
pub mod records;
pub mod reports;
pub mod requests;
pub mod setup;
