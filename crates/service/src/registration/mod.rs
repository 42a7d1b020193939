//! Reseller registration: domain, errors, repository port and adapters, service.
//!
//! A registration is staged in a pending payment, and only a confirmed
//! payment produces the reseller account and its store.

pub mod domain;
pub mod errors;
pub mod repository;
pub mod repo;
pub mod service;

#[cfg(test)]
mod tests;

pub use errors::{ConflictKind, RegistrationError};
pub use service::{RegistrationService, RegistrationSettings};
