pub mod admin;
pub mod customer;
pub mod month;
pub mod payment;
pub mod payment_request;

pub use admin::Admin;
pub use customer::{Customer, CustomerIdentity};
pub use month::{MonthKey, MonthKeyError};
pub use payment::{Payment, PaymentStatus};
pub use payment_request::PaymentRequest;
