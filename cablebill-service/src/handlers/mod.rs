pub mod auth;
pub mod customers;
pub mod dashboard;
pub mod metrics;
pub mod payment_requests;
pub mod payments;
pub mod setup;

use std::time::Duration;

pub(crate) fn ttl(seconds: u64) -> Duration {
    Duration::from_secs(seconds)
}
