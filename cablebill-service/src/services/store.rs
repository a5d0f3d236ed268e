use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, DateTime};
use thiserror::Error;

use crate::models::{
    Admin, Customer, CustomerIdentity, MonthKey, Payment, PaymentRequest, PaymentStatus,
};

/// Maximum number of payment requests returned by a listing.
pub const PAYMENT_REQUEST_LIST_LIMIT: usize = 100;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Duplicate key: {0}")]
    Duplicate(String),

    #[error("Store error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Partial customer update; `None` leaves the stored field unchanged.
#[derive(Debug, Clone, Default)]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub village: Option<String>,
    pub bill_amount: Option<i64>,
}

/// Upsert keyed by `(customer_id, month)`.
///
/// `status: None` keeps the stored status (new rows start unpaid) and
/// `transaction_id: None` keeps the stored id (new rows start empty).
/// Paid stamps `paidAt` and `verifiedByAdmin`; unpaid clears `paidAt`.
#[derive(Debug, Clone)]
pub struct PaymentUpsert {
    pub customer_id: ObjectId,
    pub month: MonthKey,
    pub status: Option<PaymentStatus>,
    pub transaction_id: Option<String>,
}

impl PaymentUpsert {
    pub fn paid(customer_id: ObjectId, month: MonthKey, transaction_id: String) -> Self {
        Self {
            customer_id,
            month,
            status: Some(PaymentStatus::Paid),
            transaction_id: Some(transaction_id),
        }
    }

    /// Apply to an existing row, or to a fresh one when none exists yet.
    pub fn apply(&self, existing: Option<Payment>, now: DateTime) -> Payment {
        let mut payment = existing.unwrap_or_else(|| Payment::new(self.customer_id, self.month));

        if let Some(status) = self.status {
            payment.status = status;
            match status {
                PaymentStatus::Paid => {
                    payment.paid_at = Some(now);
                    payment.verified_by_admin = true;
                }
                PaymentStatus::Unpaid => payment.paid_at = None,
            }
        }
        if let Some(transaction_id) = &self.transaction_id {
            payment.transaction_id = transaction_id.clone();
        }
        payment.updated_at = now;
        payment
    }
}

/// A payment request joined with the customer it resolved to, if any.
#[derive(Debug, Clone)]
pub struct PaymentRequestWithCustomer {
    pub request: PaymentRequest,
    pub customer: Option<Customer>,
}

/// Single source of truth for admins, customers, payments and payment requests.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn health_check(&self) -> Result<(), StoreError>;

    // Admins
    /// Fails with [`StoreError::Duplicate`] when the email is taken.
    async fn insert_admin(&self, admin: &Admin) -> Result<(), StoreError>;
    async fn find_admin(&self, id: ObjectId) -> Result<Option<Admin>, StoreError>;
    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, StoreError>;
    async fn update_admin_password(
        &self,
        id: ObjectId,
        password_hash: &str,
    ) -> Result<bool, StoreError>;

    // Customers
    async fn insert_customer(&self, customer: &Customer) -> Result<(), StoreError>;
    async fn find_customer(&self, id: ObjectId) -> Result<Option<Customer>, StoreError>;
    async fn update_customer(
        &self,
        id: ObjectId,
        patch: &CustomerPatch,
    ) -> Result<Option<Customer>, StoreError>;
    /// All customers in creation order.
    async fn list_customers(&self) -> Result<Vec<Customer>, StoreError>;
    /// First customer in creation order matching the identity.
    async fn find_customer_by_identity(
        &self,
        identity: &CustomerIdentity,
    ) -> Result<Option<Customer>, StoreError>;
    /// Delete the customer's payments, then the customer. Returns false if
    /// the customer did not exist.
    async fn delete_customer_cascade(&self, id: ObjectId) -> Result<bool, StoreError>;

    // Payments
    /// Payments for one customer, month descending.
    async fn list_payments(&self, customer_id: ObjectId) -> Result<Vec<Payment>, StoreError>;
    async fn list_all_payments(&self) -> Result<Vec<Payment>, StoreError>;
    async fn upsert_payment(&self, upsert: &PaymentUpsert) -> Result<Payment, StoreError>;
    /// Sum of the owning customer's bill amount over every unpaid payment.
    async fn unpaid_bill_total(&self) -> Result<i64, StoreError>;

    // Payment requests
    async fn insert_payment_request(&self, request: &PaymentRequest) -> Result<(), StoreError>;
    async fn find_payment_request(
        &self,
        id: ObjectId,
    ) -> Result<Option<PaymentRequest>, StoreError>;
    /// Newest first, at most [`PAYMENT_REQUEST_LIST_LIMIT`] rows.
    async fn list_payment_requests(
        &self,
        verified: Option<bool>,
    ) -> Result<Vec<PaymentRequestWithCustomer>, StoreError>;
    async fn set_request_customer(
        &self,
        id: ObjectId,
        customer_id: ObjectId,
    ) -> Result<(), StoreError>;
    async fn mark_request_approved(
        &self,
        id: ObjectId,
        admin_id: ObjectId,
        at: DateTime,
    ) -> Result<(), StoreError>;
    /// Sets `verified = false` and touches nothing else.
    async fn mark_request_rejected(&self, id: ObjectId) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month() -> MonthKey {
        "2025-03".parse().unwrap()
    }

    #[test]
    fn test_new_row_defaults() {
        let upsert = PaymentUpsert {
            customer_id: ObjectId::new(),
            month: month(),
            status: None,
            transaction_id: None,
        };
        let payment = upsert.apply(None, DateTime::now());

        assert_eq!(payment.status, PaymentStatus::Unpaid);
        assert_eq!(payment.transaction_id, "");
        assert!(payment.paid_at.is_none());
        assert!(!payment.verified_by_admin);
    }

    #[test]
    fn test_paid_stamps_and_unpaid_clears() {
        let customer_id = ObjectId::new();
        let now = DateTime::now();
        let paid = PaymentUpsert::paid(customer_id, month(), "TXN1".to_string()).apply(None, now);

        assert_eq!(paid.status, PaymentStatus::Paid);
        assert_eq!(paid.paid_at, Some(now));
        assert!(paid.verified_by_admin);

        let unpaid = PaymentUpsert {
            customer_id,
            month: month(),
            status: Some(PaymentStatus::Unpaid),
            transaction_id: None,
        }
        .apply(Some(paid.clone()), now);

        assert_eq!(unpaid.id, paid.id);
        assert_eq!(unpaid.status, PaymentStatus::Unpaid);
        assert!(unpaid.paid_at.is_none());
        assert_eq!(unpaid.transaction_id, "TXN1");
    }

    #[test]
    fn test_absent_status_keeps_existing() {
        let customer_id = ObjectId::new();
        let now = DateTime::now();
        let paid = PaymentUpsert::paid(customer_id, month(), "TXN1".to_string()).apply(None, now);

        let touched = PaymentUpsert {
            customer_id,
            month: month(),
            status: None,
            transaction_id: Some("TXN2".to_string()),
        }
        .apply(Some(paid), now);

        assert_eq!(touched.status, PaymentStatus::Paid);
        assert_eq!(touched.transaction_id, "TXN2");
    }
}
