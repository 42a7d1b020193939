//! Service layer for payment-gated reseller onboarding.
//! - Ports (`PaymentGateway`, `RegistrationRepository`, `NotificationSink`) with SeaORM, HTTP and in-memory adapters.
//! - Reuses validation and entity definitions in `models` crate.
//! - Framework independent; the `server` crate maps its errors onto HTTP.

pub mod errors;
pub mod notification;
pub mod password;
pub mod payment;
pub mod registration;
pub mod subdomain;
#[cfg(test)]
pub mod test_support;
