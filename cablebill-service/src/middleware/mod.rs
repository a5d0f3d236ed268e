pub mod auth;

pub use auth::{require_role, AdminAuth, AuthError, CustomerAuth};
