//! Payment contracts shared by every workflow that charges through the gateway.

pub mod domain;
pub mod gateway;
pub mod status;

pub use domain::{
    ChargeHandle, ChargeRequest, GatewayOutcome, PaymentMetadata, PaymentStatus, PaymentType, PendingPayment,
    RegistrationData, StagedPassword,
};
pub use gateway::{mock, GatewayError, HttpPaymentGateway, PaymentGateway};
pub use status::{PaymentStatusView, RedirectPolicy};
